//! Domain models for the cash-flow engine (spec §3).
//!
//! Every scoped entity carries `user_id` and an optional `organization_id`
//! — the owner scope — and is persisted as its own MongoDB collection,
//! the teacher's one-collection-per-entity layout.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::Id;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_zero() -> Decimal {
    Decimal::ZERO
}

/// ---------- OWNERSHIP ----------

/// The pair `(user_id, organization_id?)` that owns a row (GLOSSARY: owner scope).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerScope {
    pub user_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Id>,
}

impl OwnerScope {
    pub fn personal(user_id: Id) -> Self {
        OwnerScope {
            user_id,
            organization_id: None,
        }
    }

    pub fn organizational(user_id: Id, organization_id: Id) -> Self {
        OwnerScope {
            user_id,
            organization_id: Some(organization_id),
        }
    }
}

/// ---------- PLATFORM LAYER ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_organization_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl OrgRole {
    /// `owner ⊃ admin ⊃ member ⊃ viewer` — higher rank means broader capability.
    pub fn rank(&self) -> u8 {
        match self {
            OrgRole::Owner => 3,
            OrgRole::Admin => 2,
            OrgRole::Member => 1,
            OrgRole::Viewer => 0,
        }
    }

    pub fn at_least(&self, floor: OrgRole) -> bool {
        self.rank() >= floor.rank()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub owner_id: Id,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMember {
    #[serde(rename = "_id")]
    pub id: Id,
    pub org_id: Id,
    pub user_id: Id,
    pub role: OrgRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: Id,
    pub token: String,
    pub user_id: Id,
    pub expires_at: DateTime<Utc>,
}

/// ---------- SHARED ENUMS ----------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryPattern {
    OneTime,
    Recurring,
    Installment,
    LoanPayment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Completed,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl BillingCycle {
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::SemiAnnual => 6,
            BillingCycle::Annual => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// ---------- FINANCE ENTITIES ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    #[serde(default)]
    pub name_he: Option<String>,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub color: String,
    pub icon: String,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub description: String,
    pub date: NaiveDate,
    pub entry_pattern: EntryPattern,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_source_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSchedule {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub day_of_month: u32,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    pub total_amount: Decimal,
    pub monthly_amount: Decimal,
    pub number_of_payments: u32,
    #[serde(default)]
    pub payments_completed: u32,
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub start_date: NaiveDate,
    pub day_of_month: u32,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    pub original_amount: Decimal,
    pub monthly_payment: Decimal,
    #[serde(default = "default_zero")]
    pub interest_rate: Decimal,
    pub total_payments: u32,
    #[serde(default)]
    pub payments_made: u32,
    pub remaining_balance: Decimal,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub day_of_month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount_fx: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankBalance {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub balance: Decimal,
    pub currency: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedIncome {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    /// First-of-month anchor.
    pub month: NaiveDate,
    pub expected_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    /// Deterministic key used to match regenerations (GLOSSARY).
    pub key: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_month: Option<NaiveDate>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    pub amount: Decimal,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_renewal_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub auto_renew: bool,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCard {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub owner: OwnerScope,
    pub name: String,
    pub last_four_digits: String,
    pub card_network: String,
    pub issuer: String,
    pub credit_limit: Decimal,
    pub billing_day: u32,
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseApproval {
    #[serde(rename = "_id")]
    pub id: Id,
    pub org_id: Id,
    pub requested_by: Id,
    pub status: ApprovalStatus,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Id>,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(rename = "_id")]
    pub id: Id,
    pub table_name: String,
    pub record_id: Id,
    pub user_id: Id,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_values: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_values: Option<serde_json::Value>,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Id>,
}
