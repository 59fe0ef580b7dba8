#[path = "common/mod.rs"]
mod common;

use cashflow_engine::models::{FlowType, User};
use cashflow_engine::state::{self, NewCategory};
use cashflow_engine::tenancy::DataContext;

fn sample_user() -> User {
    User {
        id: cashflow_engine::ids::new_id(),
        username: "alice".into(),
        email: "alice@example.com".into(),
        password_hash: "unused".into(),
        is_admin: false,
        is_super_admin: false,
        is_active: true,
        current_organization_id: None,
        created_at: chrono::Utc::now(),
    }
}

fn sample_category(name: &str) -> NewCategory {
    NewCategory {
        name: name.into(),
        name_he: None,
        flow_type: FlowType::Expense,
        color: "#112233".into(),
        icon: "cart".into(),
        parent_id: None,
        display_order: 0,
    }
}

#[tokio::test]
async fn category_crud_round_trips() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let user = sample_user();
    state::insert_user(&state, user.clone()).await.unwrap();
    let data_ctx = DataContext::personal(user.id);

    let created = state::create_category(&state, &data_ctx, sample_category("Groceries"))
        .await
        .unwrap();
    assert_eq!(state::list_categories(&state, &data_ctx).await.unwrap().len(), 1);

    let updated = state::update_category(
        &state,
        &data_ctx,
        created.id,
        Some("Groceries & Dining".into()),
        None,
        None,
        None,
    )
    .await
    .unwrap();
    assert_eq!(updated.name, "Groceries & Dining");

    state::delete_category(&state, &data_ctx, created.id).await.unwrap();
    assert!(state::list_categories(&state, &data_ctx).await.unwrap().is_empty());

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn personal_and_organizational_rows_stay_disjoint() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let user = sample_user();
    state::insert_user(&state, user.clone()).await.unwrap();

    let org = state::create_organization(&state, user.id, "Acme Co").await.unwrap();

    let personal_ctx = DataContext::personal(user.id);
    let org_ctx = DataContext::organizational(user.id, org.id);

    state::create_category(&state, &personal_ctx, sample_category("Personal"))
        .await
        .unwrap();
    state::create_category(&state, &org_ctx, sample_category("Team"))
        .await
        .unwrap();

    assert_eq!(state::list_categories(&state, &personal_ctx).await.unwrap().len(), 1);
    assert_eq!(state::list_categories(&state, &org_ctx).await.unwrap().len(), 1);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn duplicate_category_name_and_type_is_rejected() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let user = sample_user();
    state::insert_user(&state, user.clone()).await.unwrap();
    let data_ctx = DataContext::personal(user.id);

    state::create_category(&state, &data_ctx, sample_category("Rent")).await.unwrap();
    let err = state::create_category(&state, &data_ctx, sample_category("Rent")).await;
    assert!(err.is_err());

    common::teardown(Some(ctx)).await;
}
