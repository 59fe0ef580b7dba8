#[path = "common/mod.rs"]
mod common;

use cashflow_engine::coordinators::{approval, loan as loan_coordinator};
use cashflow_engine::models::{LoanStatus, OrgRole, User};
use cashflow_engine::state::{self, NewLoan};
use cashflow_engine::tenancy::DataContext;
use rust_decimal_macros::dec;

fn sample_user(username: &str) -> User {
    User {
        id: cashflow_engine::ids::new_id(),
        username: username.into(),
        email: format!("{username}@example.com"),
        password_hash: "unused".into(),
        is_admin: false,
        is_super_admin: false,
        is_active: true,
        current_organization_id: None,
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn loan_payment_and_reversal_round_trip() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let user = sample_user("borrower");
    state::insert_user(&state, user.clone()).await.unwrap();
    let data_ctx = DataContext::personal(user.id);

    let loan = state::create_loan(
        &state,
        &data_ctx,
        NewLoan {
            name: "Car loan".into(),
            original_amount: dec!(12000),
            monthly_payment: dec!(1100),
            interest_rate: dec!(6),
            total_payments: 12,
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            day_of_month: 5,
            category_id: None,
            currency: "USD".into(),
            original_amount_fx: None,
            original_currency: None,
            exchange_rate: None,
        },
    )
    .await
    .unwrap();

    let after_payment = loan_coordinator::record_payment(&state, &data_ctx, loan.id, dec!(1100))
        .await
        .unwrap();
    assert_eq!(after_payment.payments_made, 1);
    assert_eq!(after_payment.remaining_balance, dec!(10900));
    assert_eq!(after_payment.status, LoanStatus::Active);

    let after_reverse = loan_coordinator::reverse_payment(&state, &data_ctx, loan.id)
        .await
        .unwrap();
    assert_eq!(after_reverse.payments_made, 0);
    assert_eq!(after_reverse.remaining_balance, dec!(12000));

    // reversing with no payments made is rejected
    assert!(loan_coordinator::reverse_payment(&state, &data_ctx, loan.id).await.is_err());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn approving_an_expense_creates_a_transaction() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let owner = sample_user("owner");
    let member = sample_user("member");
    state::insert_user(&state, owner.clone()).await.unwrap();
    state::insert_user(&state, member.clone()).await.unwrap();

    let org = state::create_organization(&state, owner.id, "Acme Co").await.unwrap();
    state::add_member(&state, org.id, member.id, OrgRole::Member).await.unwrap();

    let submitted = approval::submit(
        &state,
        org.id,
        member.id,
        OrgRole::Member,
        dec!(250),
        "USD".into(),
        None,
        "Conference tickets".into(),
    )
    .await
    .unwrap();

    let org_ctx = DataContext::organizational(owner.id, org.id);
    assert!(state::list_transactions(&state, &org_ctx, &Default::default()).await.unwrap().is_empty());

    let approved = approval::approve(&state, org.id, submitted.id, owner.id, OrgRole::Owner)
        .await
        .unwrap();
    assert!(approved.transaction_id.is_some());

    let transactions = state::list_transactions(&state, &org_ctx, &Default::default()).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, dec!(250));

    // a member cannot approve their own submission
    let second = approval::submit(
        &state,
        org.id,
        member.id,
        OrgRole::Member,
        dec!(50),
        "USD".into(),
        None,
        "Office snacks".into(),
    )
    .await
    .unwrap();
    assert!(approval::approve(&state, org.id, second.id, member.id, OrgRole::Member).await.is_err());

    common::teardown(Some(ctx)).await;
}
