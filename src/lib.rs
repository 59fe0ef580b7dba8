//! Multi-tenant cash-flow engine: projections, forecasts, loan
//! amortisation, recurring automation, alerts, approvals and the
//! tenancy/ownership layer underneath them.

pub mod alerts;
pub mod amortization;
pub mod audit;
pub mod auth;
pub mod automation;
pub mod config;
pub mod coordinators;
pub mod currency;
pub mod dashboard;
pub mod errors;
pub mod forecast;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod money;
pub mod pagination;
pub mod projection;
pub mod routes;
pub mod state;
pub mod tenancy;
pub mod validation;
