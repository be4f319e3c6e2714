//! Ledger view properties: row multiplicity, income/expense
//! exclusivity, descending date order with the id tie-break, and the
//! borrower three-row scenario.

use jiff::{Span, Timestamp};
use payloads::{ListQuery, OperationKind, ProfileKind, UserRole};
use rust_decimal::dec;

use test_helpers::{TestApp, spawn_app};

fn base_time(app: &TestApp) -> Timestamp {
    app.time_source.now() - Span::new().hours(720)
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn investor_ledger_has_one_row_per_operation() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let t0 = base_time(&app);

    let (investor, investor_profile, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "investor@example.com",
        )
        .await?;
    let (borrower, borrower_profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "borrower@example.com",
        )
        .await?;

    app.create_deposit(&wallet, dec!(1000), t0).await?;
    app.create_withdrawal(&wallet, dec!(200), t0 + Span::new().hours(24))
        .await?;
    let loan = app
        .create_loan(
            &borrower_profile,
            &borrower,
            dec!(5000),
            t0 + Span::new().hours(48),
        )
        .await?;
    let investment = app
        .create_investment(
            &loan,
            &investor,
            &investor_profile,
            dec!(500),
            t0 + Span::new().hours(72),
        )
        .await?;
    // one executed payment with both components: two ledger rows for
    // the investor (interest + principal)
    app.create_executed_payment(
        &loan,
        &investment,
        dec!(50),
        dec!(25),
        t0 + Span::new().hours(96),
    )
    .await?;
    app.create_fee(
        &investor,
        &investor_profile,
        dec!(10),
        t0 + Span::new().hours(120),
    )
    .await?;

    let page = app
        .client
        .investor_history(&investor, &ListQuery::default())
        .await?;
    assert_eq!(page.count, 6);

    // newest first
    let kinds: Vec<OperationKind> = page
        .items
        .iter()
        .map(|entry| entry.operation().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Fee,
            OperationKind::MainDutyPayment,
            OperationKind::InterestPayment,
            OperationKind::Investment,
            OperationKind::Withdraw,
            OperationKind::Deposit,
        ]
    );

    for entry in &page.items {
        // exactly one of income/expense per row
        assert_eq!(
            entry.income.is_some(),
            entry.expense.is_none(),
            "row {:?} must have exactly one amount",
            entry.operation_type
        );
    }
    for window in page.items.windows(2) {
        assert!(window[0].date >= window[1].date);
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn payment_rows_carry_a_single_side() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let t0 = base_time(&app);

    let (investor, investor_profile, _) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "investor2@example.com",
        )
        .await?;
    let (borrower, borrower_profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entrepreneur,
            "borrower2@example.com",
        )
        .await?;
    let loan = app
        .create_loan(&borrower_profile, &borrower, dec!(1000), t0)
        .await?;
    let investment = app
        .create_investment(
            &loan,
            &investor,
            &investor_profile,
            dec!(1000),
            t0,
        )
        .await?;
    app.create_executed_payment(
        &loan,
        &investment,
        dec!(80),
        dec!(25),
        t0 + Span::new().hours(24),
    )
    .await?;

    let page = app
        .client
        .investor_history(&investor, &ListQuery::default())
        .await?;
    let interest = page
        .items
        .iter()
        .find(|e| e.operation().unwrap() == OperationKind::InterestPayment)
        .expect("interest row present");
    assert_eq!(interest.income, Some(dec!(80)));
    assert_eq!(interest.expense, None);

    let principal = page
        .items
        .iter()
        .find(|e| e.operation().unwrap() == OperationKind::MainDutyPayment)
        .expect("principal row present");
    assert_eq!(principal.income, Some(dec!(25)));

    Ok(())
}

/// The end-to-end borrower scenario: one accepted loan issue, one
/// executed (interest-only) payment, one fee — three rows, descending,
/// correctly tagged.
#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn borrower_ledger_three_row_scenario() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let t0 = base_time(&app);

    let (investor, investor_profile, _) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "investor3@example.com",
        )
        .await?;
    let (borrower, borrower_profile, _) = app
        .create_profile(
            UserRole::Borrower,
            ProfileKind::Entity,
            "borrower3@example.com",
        )
        .await?;

    let loan = app
        .create_loan(&borrower_profile, &borrower, dec!(9000), t0)
        .await?;
    let investment = app
        .create_investment(&loan, &investor, &investor_profile, dec!(9000), t0)
        .await?;
    app.create_loan_issue(&loan, t0 + Span::new().hours(24)).await?;
    app.create_executed_payment(
        &loan,
        &investment,
        dec!(93.75),
        dec!(0),
        t0 + Span::new().hours(48),
    )
    .await?;
    app.create_fee(
        &borrower,
        &borrower_profile,
        dec!(45),
        t0 + Span::new().hours(72),
    )
    .await?;

    let page = app
        .client
        .borrower_history(&borrower, &ListQuery::default())
        .await?;
    assert_eq!(page.count, 3);

    let kinds: Vec<OperationKind> = page
        .items
        .iter()
        .map(|entry| entry.operation().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Fee,
            OperationKind::InterestPayment,
            OperationKind::LoanIssue,
        ]
    );

    // the issue credits the invested sum; payments and fees debit
    assert_eq!(page.items[2].income, Some(dec!(9000)));
    assert_eq!(page.items[1].expense, Some(dec!(93.75)));
    assert_eq!(page.items[0].expense, Some(dec!(45)));

    // contract metadata rides along for loan-linked rows
    assert_eq!(
        page.items[2].additional_data["borrower"],
        "Working capital"
    );

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn identical_timestamps_break_ties_by_operation_id()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let t0 = base_time(&app);

    let (investor, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "investor4@example.com",
        )
        .await?;
    app.create_deposit(&wallet, dec!(1), t0).await?;
    app.create_deposit(&wallet, dec!(2), t0).await?;
    app.create_deposit(&wallet, dec!(3), t0).await?;

    let page = app
        .client
        .investor_history(&investor, &ListQuery::default())
        .await?;
    assert_eq!(page.count, 3);
    for window in page.items.windows(2) {
        assert_eq!(window[0].date, window[1].date);
        assert!(
            window[0].operation_id > window[1].operation_id,
            "ties order by operation_id DESC"
        );
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn history_paginates_and_bounds_by_date() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;
    let t0 = base_time(&app);

    let (investor, _, wallet) = app
        .create_profile(
            UserRole::Investor,
            ProfileKind::Individual,
            "investor5@example.com",
        )
        .await?;
    for day in 0..15 {
        app.create_deposit(
            &wallet,
            dec!(10),
            t0 + Span::new().hours(day * 24),
        )
        .await?;
    }

    // default page size is ten
    let page = app
        .client
        .investor_history(&investor, &ListQuery::default())
        .await?;
    assert_eq!(page.count, 15);
    assert_eq!(page.items.len(), 10);

    let second = app
        .client
        .investor_history(
            &investor,
            &ListQuery {
                offset: Some(10),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(second.items.len(), 5);

    // a [from, to] window cuts the result down
    let bounded = app
        .client
        .investor_history(
            &investor,
            &ListQuery {
                from: Some(t0 + Span::new().hours(120)),
                to: Some(t0 + Span::new().hours(216)),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(bounded.count, 5);

    Ok(())
}
