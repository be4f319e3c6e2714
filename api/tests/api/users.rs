//! User listing, the staged-edit overlay, and administrative actions.

use payloads::{ListQuery, OneOrMany, ProfileKind, UserRole, UserStatus};
use reqwest::StatusCode;

use test_helpers::{assert_error_code, assert_status_code, spawn_app};

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn list_users_filters_and_paginates() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    for i in 0..12 {
        app.create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            &format!("user{i}@example.com"),
        )
        .await?;
    }

    let page = app.client.list_users(&ListQuery::default()).await?;
    assert_eq!(page.count, 12);
    assert_eq!(page.items.len(), 10); // default page size

    let filtered = app
        .client
        .list_users(&ListQuery {
            query: Some("user3@".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(filtered.count, 1);
    assert_eq!(
        filtered.items[0].email.as_deref(),
        Some("user3@example.com")
    );

    let none = app
        .client
        .list_users(&ListQuery {
            status: Some(OneOrMany::One("banned".to_string())),
            ..Default::default()
        })
        .await?;
    assert_eq!(none.count, 0);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn retrieve_applies_staged_edits() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let (user, profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "canonical@example.com",
        )
        .await?;
    app.stage_profile_updates(
        &profile,
        serde_json::json!({"email": "staged@example.com"}),
    )
    .await?;

    // an unconfirmed profile reads through its overlay
    let borrower = app.client.list_borrowers(&ListQuery::default()).await?;
    assert_eq!(borrower.count, 1);

    let user_details = app.client.get_user(&user).await?;
    assert_eq!(
        user_details.contact.email.as_deref(),
        Some("canonical@example.com")
    );

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn confirm_profile_folds_overlay_into_columns() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let (_, profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "before@example.com",
        )
        .await?;
    app.stage_profile_updates(
        &profile,
        serde_json::json!({"email": "after@example.com", "phone": "+70001"}),
    )
    .await?;

    let confirmed = app
        .client
        .confirm_profile(&profile, &app.confirmation_code())
        .await?;
    assert_eq!(confirmed.contact.email.as_deref(), Some("after@example.com"));
    assert_eq!(confirmed.contact.phone.as_deref(), Some("+70001"));

    // confirming again conflicts: the staged state is gone
    let again = app
        .client
        .confirm_profile(&profile, &app.confirmation_code())
        .await;
    assert_error_code(again, 409002);

    // the overlay column is actually cleared
    let (updates,): (Option<serde_json::Value>,) = sqlx::query_as(
        "SELECT updates FROM user_profiles WHERE id = $1;",
    )
    .bind(profile)
    .fetch_one(&app.db_pool)
    .await?;
    assert!(updates.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn confirm_profile_requires_step_up() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let (_, profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "stepup@example.com",
        )
        .await?;
    app.stage_profile_updates(&profile, serde_json::json!({})).await?;

    let result = app.client.confirm_profile(&profile, "000000").await;
    assert_error_code(result, 403006); // confirmation failed

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn ban_and_unban_round_trip() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let (user, _, _) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "bannable@example.com",
        )
        .await?;

    app.client.ban_user(&user).await?;
    let details = app.client.get_user(&user).await?;
    assert_eq!(details.status, UserStatus::Banned);

    // banning twice conflicts
    let again = app.client.ban_user(&user).await;
    assert_error_code(again, 409002);

    app.client.unban_user(&user).await?;
    let details = app.client.get_user(&user).await?;
    assert_eq!(details.status, UserStatus::Active);

    // the user got notified both times
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM user_notifications WHERE user_id = $1;",
    )
    .bind(user)
    .fetch_one(&app.db_pool)
    .await?;
    assert_eq!(count, 2);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn delete_refused_while_debt_remains() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (borrower, borrower_profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "debtor@example.com",
        )
        .await?;
    app.create_loan(
        &borrower_profile,
        &borrower,
        rust_decimal::dec!(1000),
        now,
    )
    .await?;

    let result = app
        .client
        .delete_user(&borrower, &app.confirmation_code())
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // unknown users 404
    let missing = payloads::UserId(uuid::Uuid::new_v4());
    let result = app
        .client
        .delete_user(&missing, &app.confirmation_code())
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}
