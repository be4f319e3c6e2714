//! Wallet-affecting money movements: deposits, withdrawals, the bank
//! operation registry and the virtual-balance reconciliation rows.

use sqlx::PgPool;

use payloads::responses::{
    BankOperationDetails, BankOperationItem, BankReviseItem, DepositItem,
    WalletItem, WithdrawalDetails, WithdrawalItem,
};
use payloads::{
    BankOperationId, DepositId, ListQuery, WithdrawalId, WithdrawalStatus,
};

use crate::listing::{ListSpec, SortColumns};
use crate::store::StoreError;
use crate::time::TimeSource;

const MONEY_SORT: SortColumns = SortColumns(&[
    ("createdAt", "created_at"),
    ("amount", "amount"),
    ("status", "status"),
]);

pub async fn list_deposits(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<DepositItem>), StoreError> {
    let spec = ListSpec::from_query(query, &MONEY_SORT)?
        .search(query.query.as_deref(), &["status"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, wallet_id, amount, status, created_at",
            "FROM deposits",
            pool,
        )
        .await?)
}

pub async fn read_deposit(
    pool: &PgPool,
    id: &DepositId,
) -> Result<DepositItem, StoreError> {
    sqlx::query_as::<_, DepositItem>(
        "SELECT id, wallet_id, amount, status, created_at
        FROM deposits WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::DepositNotFound))
}

pub async fn list_withdrawals(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<WithdrawalItem>), StoreError> {
    let spec = ListSpec::from_query(query, &MONEY_SORT)?
        .search(query.query.as_deref(), &["status"])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, wallet_id, amount, status, comment, created_at",
            "FROM withdrawals",
            pool,
        )
        .await?)
}

pub async fn read_withdrawal(
    pool: &PgPool,
    id: &WithdrawalId,
) -> Result<WithdrawalItem, StoreError> {
    sqlx::query_as::<_, WithdrawalItem>(
        "SELECT id, wallet_id, amount, status, comment, created_at
        FROM withdrawals WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::WithdrawalNotFound))
}

pub async fn withdrawal_details(
    pool: &PgPool,
    id: &WithdrawalId,
) -> Result<WithdrawalDetails, StoreError> {
    let withdrawal = read_withdrawal(pool, id).await?;
    let wallet = sqlx::query_as::<_, WalletItem>(
        "SELECT w.id, w.account_number, w.balance, w.blocked_balance
        FROM wallets w
        JOIN withdrawals wd ON wd.wallet_id = w.id
        WHERE wd.id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    let bank_operation = sqlx::query_as::<_, BankOperationItem>(
        "SELECT o.id, o.type AS kind, o.status, o.amount, o.created_at
        FROM bank_operations o
        JOIN withdrawals wd ON wd.bank_operation_id = o.id
        WHERE wd.id = $1;",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(WithdrawalDetails {
        withdrawal,
        wallet,
        bank_operation,
    })
}

/// Pay a pending withdrawal out: debit the wallet, record the bank
/// operation and flip the status, all in one transaction.
#[tracing::instrument(skip(pool, time_source))]
pub async fn execute_withdrawal(
    id: &WithdrawalId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<WithdrawalDetails, StoreError> {
    let mut tx = pool.begin().await?;

    let withdrawal = sqlx::query_as::<_, WithdrawalItem>(
        "SELECT id, wallet_id, amount, status, comment, created_at
        FROM withdrawals WHERE id = $1 FOR UPDATE;",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::WithdrawalNotFound)?;

    if withdrawal.status != WithdrawalStatus::Pending {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    let debited = sqlx::query(
        "UPDATE wallets SET balance = balance - $2, updated_at = $3
        WHERE id = $1 AND balance >= $2;",
    )
    .bind(withdrawal.wallet_id)
    .bind(withdrawal.amount)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if debited == 0 {
        // insufficient funds
        return Err(StoreError::Conflict);
    }

    let bank_operation_id = sqlx::query_as::<_, BankOperationId>(
        "INSERT INTO bank_operations (type, status, amount, created_at, updated_at)
        VALUES ('withdrawal', 'completed', $1, $2, $2)
        RETURNING id;",
    )
    .bind(withdrawal.amount)
    .bind(time_source.now_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE withdrawals
        SET status = 'executed', bank_operation_id = $2, updated_at = $3
        WHERE id = $1;",
    )
    .bind(id)
    .bind(bank_operation_id)
    .bind(time_source.now_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    withdrawal_details(pool, id).await
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn decline_withdrawal(
    id: &WithdrawalId,
    comment: Option<&str>,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<WithdrawalDetails, StoreError> {
    let withdrawal = read_withdrawal(pool, id).await?;
    if withdrawal.status != WithdrawalStatus::Pending {
        return Err(StoreError::StatusAlreadyAssigned);
    }

    sqlx::query(
        "UPDATE withdrawals
        SET status = 'declined', comment = COALESCE($2, comment),
            updated_at = $3
        WHERE id = $1;",
    )
    .bind(id)
    .bind(comment)
    .bind(time_source.now_sqlx())
    .execute(pool)
    .await?;

    withdrawal_details(pool, id).await
}

/// Beneficiary-registry exchanges with the bank. The raw payload
/// columns stay out of the list shape.
pub async fn list_registry(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<BankOperationItem>), StoreError> {
    let spec = ListSpec::from_query(query, &MONEY_SORT)?
        .filter_any("type", vec!["beneficiary_registry".to_string()])
        .filter_any("status", query.status_values())
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, type AS kind, status, amount, created_at",
            "FROM bank_operations",
            pool,
        )
        .await?)
}

pub async fn read_bank_operation(
    pool: &PgPool,
    id: &BankOperationId,
) -> Result<BankOperationDetails, StoreError> {
    sqlx::query_as::<_, BankOperationDetails>(
        "SELECT id, type AS kind, status, amount, request_data, response_data,
            callback_data, created_at
        FROM bank_operations WHERE id = $1;",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::not_found(StoreError::BankOperationNotFound))
}

pub async fn list_revise(
    query: &ListQuery,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(i64, Vec<BankReviseItem>), StoreError> {
    const REVISE_SORT: SortColumns = SortColumns(&[
        ("createdAt", "created_at"),
        ("accountNumber", "account_number"),
        ("difference", "difference"),
    ]);
    let spec = ListSpec::from_query(query, &REVISE_SORT)?
        .search(query.query.as_deref(), &["account_number"])
        .date_range("created_at", query, time_source.now());
    Ok(spec
        .fetch(
            "SELECT id, account_number, platform_balance, bank_balance,
                difference, created_at",
            "FROM bank_revises",
            pool,
        )
        .await?)
}
