//! `AppState`: typed MongoDB collections, one per entity, and startup wiring.

use std::sync::Arc;

use anyhow::Result;
use mongodb::{Client, Collection, Database};

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::models::*;

mod alerts;
mod audit;
mod bank_balances;
mod categories;
mod credit_cards;
mod expected_income;
mod expense_approvals;
mod fixed_schedules;
mod installments;
mod loans;
mod organizations;
mod subscriptions;
mod transactions;
mod users;

pub use alerts::*;
pub use audit::*;
pub use bank_balances::*;
pub use categories::*;
pub use credit_cards::*;
pub use expected_income::*;
pub use expense_approvals::*;
pub use fixed_schedules::*;
pub use installments::*;
pub use loans::*;
pub use organizations::*;
pub use subscriptions::*;
pub use transactions::*;
pub use users::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Collection<User>,
    pub organizations: Collection<Organization>,
    pub org_members: Collection<OrgMember>,
    pub sessions: Collection<Session>,
    pub categories: Collection<Category>,
    pub transactions: Collection<Transaction>,
    pub fixed_schedules: Collection<FixedSchedule>,
    pub installments: Collection<Installment>,
    pub loans: Collection<Loan>,
    pub bank_balances: Collection<BankBalance>,
    pub expected_incomes: Collection<ExpectedIncome>,
    pub alerts: Collection<Alert>,
    pub subscriptions: Collection<Subscription>,
    pub credit_cards: Collection<CreditCard>,
    pub expense_approvals: Collection<ExpenseApproval>,
    pub audit_log: Collection<AuditLogEntry>,
    pub rate_limiter: Arc<RateLimiter>,
}

const COLLECTION_NAMES: &[&str] = &[
    "users",
    "organizations",
    "org_members",
    "sessions",
    "categories",
    "transactions",
    "fixed_schedules",
    "installments",
    "loans",
    "bank_balances",
    "expected_incomes",
    "alerts",
    "subscriptions",
    "credit_cards",
    "expense_approvals",
    "audit_log",
];

async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in COLLECTION_NAMES {
        if !existing.iter().any(|n| n == name) {
            db.create_collection(*name).await?;
        }
    }
    Ok(())
}

pub async fn init_state(config: Config) -> Result<AppState> {
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.mongodb_db);

    ensure_collections(&db).await?;

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));

    Ok(AppState {
        users: db.collection("users"),
        organizations: db.collection("organizations"),
        org_members: db.collection("org_members"),
        sessions: db.collection("sessions"),
        categories: db.collection("categories"),
        transactions: db.collection("transactions"),
        fixed_schedules: db.collection("fixed_schedules"),
        installments: db.collection("installments"),
        loans: db.collection("loans"),
        bank_balances: db.collection("bank_balances"),
        expected_incomes: db.collection("expected_incomes"),
        alerts: db.collection("alerts"),
        subscriptions: db.collection("subscriptions"),
        credit_cards: db.collection("credit_cards"),
        expense_approvals: db.collection("expense_approvals"),
        audit_log: db.collection("audit_log"),
        rate_limiter,
        config,
    })
}
