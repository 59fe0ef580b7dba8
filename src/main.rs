// main.rs
// Axum server wiring: builds the MongoDB-backed state, assembles the
// router and serves on config.bind_addr.

use axum::{
    Router, middleware,
    http::{HeaderName, HeaderValue},
    routing::{delete, get, patch, post},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use cashflow_engine::config::Config;
use cashflow_engine::middleware as app_middleware;
use cashflow_engine::routes;
use cashflow_engine::state::{self, AppState};

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=63072000; includeSubDomains"),
    ("content-security-policy", "default-src 'self'"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
    ("x-api-version", "v1"),
];

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let addr = config.bind_addr;

    let state = Arc::new(
        state::init_state(config)
            .await
            .expect("failed to initialize MongoDB state"),
    );

    let public = Router::new()
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/login", post(routes::auth::login));

    let protected = Router::new()
        .route("/api/v1/auth/logout", post(routes::auth::logout))
        .route("/api/v1/organizations", post(routes::organizations::create))
        .route(
            "/api/v1/organizations/{org_id}/members",
            get(routes::organizations::list_members).post(routes::organizations::add_member),
        )
        .route(
            "/api/v1/organizations/{org_id}/members/{member_id}",
            patch(routes::organizations::set_member_role).delete(routes::organizations::remove_member),
        )
        .route(
            "/api/v1/organizations/{org_id}/audit-log",
            get(routes::audit::list),
        )
        .route(
            "/api/v1/categories",
            get(routes::categories::list).post(routes::categories::create),
        )
        .route(
            "/api/v1/categories/{id}",
            patch(routes::categories::update).delete(routes::categories::delete),
        )
        .route(
            "/api/v1/transactions",
            get(routes::transactions::list).post(routes::transactions::create),
        )
        .route(
            "/api/v1/transactions/{id}",
            patch(routes::transactions::update).delete(routes::transactions::delete),
        )
        .route("/api/v1/transactions/bulk", post(routes::transactions::bulk_create))
        .route(
            "/api/v1/transactions/bulk-delete",
            post(routes::transactions::bulk_delete),
        )
        .route(
            "/api/v1/fixed-schedules",
            get(routes::recurring::list_fixed_schedules).post(routes::recurring::create_fixed_schedule),
        )
        .route(
            "/api/v1/fixed-schedules/{id}",
            delete(routes::recurring::delete_fixed_schedule),
        )
        .route(
            "/api/v1/fixed-schedules/{id}/pause",
            post(routes::recurring::pause_fixed_schedule),
        )
        .route(
            "/api/v1/fixed-schedules/{id}/resume",
            post(routes::recurring::resume_fixed_schedule),
        )
        .route(
            "/api/v1/subscriptions",
            get(routes::recurring::list_subscriptions).post(routes::recurring::create_subscription),
        )
        .route(
            "/api/v1/subscriptions/{id}",
            delete(routes::recurring::delete_subscription),
        )
        .route(
            "/api/v1/subscriptions/{id}/pause",
            post(routes::recurring::pause_subscription),
        )
        .route(
            "/api/v1/subscriptions/{id}/resume",
            post(routes::recurring::resume_subscription),
        )
        .route(
            "/api/v1/bank-balances",
            get(routes::balances::list_balances).post(routes::balances::record_balance),
        )
        .route(
            "/api/v1/expected-income",
            get(routes::balances::list_expected_incomes).put(routes::balances::set_expected_income),
        )
        .route(
            "/api/v1/expected-income/{id}",
            delete(routes::balances::delete_expected_income),
        )
        .route(
            "/api/v1/credit-cards",
            get(routes::credit_cards::list).post(routes::credit_cards::create),
        )
        .route("/api/v1/credit-cards/{id}", delete(routes::credit_cards::deactivate))
        .route(
            "/api/v1/loans",
            get(routes::loans::list).post(routes::loans::create),
        )
        .route(
            "/api/v1/loans/{id}",
            patch(routes::loans::update).delete(routes::loans::delete),
        )
        .route("/api/v1/loans/{id}/payments", post(routes::loans::record_payment))
        .route(
            "/api/v1/loans/{id}/payments/reverse",
            post(routes::loans::reverse_payment),
        )
        .route(
            "/api/v1/installments",
            get(routes::installments::list).post(routes::installments::create),
        )
        .route("/api/v1/installments/{id}", delete(routes::installments::delete))
        .route(
            "/api/v1/installments/{id}/payments",
            post(routes::installments::mark_paid),
        )
        .route(
            "/api/v1/installments/{id}/payments/reverse",
            post(routes::installments::reverse_payment),
        )
        .route(
            "/api/v1/organizations/{org_id}/approvals",
            get(routes::approvals::list).post(routes::approvals::submit),
        )
        .route(
            "/api/v1/organizations/{org_id}/approvals/{approval_id}/approve",
            post(routes::approvals::approve),
        )
        .route(
            "/api/v1/organizations/{org_id}/approvals/{approval_id}/reject",
            post(routes::approvals::reject),
        )
        .route("/api/v1/dashboard/summary", get(routes::dashboard::summary))
        .route("/api/v1/dashboard/series", get(routes::dashboard::series))
        .route("/api/v1/dashboard/categories", get(routes::dashboard::categories))
        .route("/api/v1/dashboard/upcoming", get(routes::dashboard::upcoming))
        .route("/api/v1/dashboard/health", get(routes::dashboard::health))
        .route("/api/v1/forecast/monthly", get(routes::forecast::monthly))
        .route("/api/v1/forecast/weekly", get(routes::forecast::weekly))
        .route(
            "/api/v1/automation/process-recurring",
            post(routes::automation::process_recurring),
        )
        .route("/api/v1/alerts/generate", post(routes::alerts::generate))
        .route("/api/v1/alerts", get(routes::alerts::list))
        .route("/api/v1/alerts/{id}/read", post(routes::alerts::mark_read))
        .route("/api/v1/alerts/{id}/dismiss", post(routes::alerts::dismiss))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::rate_limit,
        ));

    let mut app = Router::new().merge(public).merge(protected).with_state(state);
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app = app.layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
