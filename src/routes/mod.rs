// routes/mod.rs
// Route handler modules. Many entities share handler names (create/list/
// update/delete), so this stays mod-qualified rather than a flat glob
// re-export; main.rs addresses handlers as `routes::transactions::create`.

pub mod alerts;
pub mod approvals;
pub mod audit;
pub mod auth;
pub mod automation;
pub mod balances;
pub mod categories;
pub mod credit_cards;
pub mod dashboard;
pub mod forecast;
pub mod installments;
pub mod loans;
pub mod organizations;
pub mod recurring;
pub mod transactions;
