//! Withdrawal execution: wallet debit, bank operation record, status
//! guards and the step-up check.

use payloads::{ListQuery, ProfileKind, UserRole, WithdrawalStatus, requests};
use rust_decimal::dec;

use test_helpers::{assert_error_code, spawn_app};

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn execute_debits_wallet_and_records_bank_operation()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (_, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "payout@example.com",
        )
        .await?;
    let withdrawal =
        app.create_withdrawal(&wallet, dec!(2500), now).await?;

    let details = app
        .client
        .execute_withdrawal(&withdrawal, &app.confirmation_code())
        .await?;
    assert_eq!(details.withdrawal.status, WithdrawalStatus::Executed);
    // seeded wallets start at 100000
    assert_eq!(details.wallet.balance, dec!(97500));
    let operation = details.bank_operation.expect("bank operation recorded");
    assert_eq!(operation.amount, Some(dec!(2500)));

    // a second execute conflicts
    let again = app
        .client
        .execute_withdrawal(&withdrawal, &app.confirmation_code())
        .await;
    assert_error_code(again, 409002);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn execute_refused_without_confirmation_header() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (_, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "payout2@example.com",
        )
        .await?;
    let withdrawal = app.create_withdrawal(&wallet, dec!(1), now).await?;

    let result = app
        .client
        .execute_withdrawal(&withdrawal, "not-a-code")
        .await;
    assert_error_code(result, 403006);

    // the withdrawal is untouched
    let page = app.client.list_withdrawals(&ListQuery::default()).await?;
    assert_eq!(page.items[0].status, WithdrawalStatus::Pending);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn insufficient_funds_conflict() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (_, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "payout3@example.com",
        )
        .await?;
    // more than the seeded balance
    let withdrawal =
        app.create_withdrawal(&wallet, dec!(999999), now).await?;

    let result = app
        .client
        .execute_withdrawal(&withdrawal, &app.confirmation_code())
        .await;
    assert_error_code(result, 409000);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn decline_keeps_the_money() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (_, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "payout4@example.com",
        )
        .await?;
    let withdrawal =
        app.create_withdrawal(&wallet, dec!(100), now).await?;

    let details = app
        .client
        .decline_withdrawal(
            &withdrawal,
            &app.confirmation_code(),
            &requests::DeclineWithdrawal {
                comment: Some("payout details mismatch".into()),
            },
        )
        .await?;
    assert_eq!(details.withdrawal.status, WithdrawalStatus::Declined);
    assert_eq!(
        details.withdrawal.comment.as_deref(),
        Some("payout details mismatch")
    );
    assert_eq!(details.wallet.balance, dec!(100000));
    assert!(details.bank_operation.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn status_filter_accepts_scalar_and_array() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let now = app.time_source.now();

    let (_, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "payout5@example.com",
        )
        .await?;
    let first = app.create_withdrawal(&wallet, dec!(10), now).await?;
    app.create_withdrawal(&wallet, dec!(20), now).await?;
    app.client
        .execute_withdrawal(&first, &app.confirmation_code())
        .await?;

    let pending = app
        .client
        .list_withdrawals(&ListQuery {
            status: Some(payloads::OneOrMany::One("pending".into())),
            ..Default::default()
        })
        .await?;
    assert_eq!(pending.count, 1);

    let both = app
        .client
        .list_withdrawals(&ListQuery {
            status: Some(payloads::OneOrMany::Many(vec![
                "pending".into(),
                "executed".into(),
            ])),
            ..Default::default()
        })
        .await?;
    assert_eq!(both.count, 2);

    Ok(())
}
