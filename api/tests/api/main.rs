//! End-to-end tests driving the API over HTTP against a disposable
//! Postgres database.
//!
//! Every test here is `#[ignore]`d: they need the Postgres instance from
//! docker-compose (localhost:5433). Run them with
//!
//! ```sh
//! cargo test -- --ignored
//! ```

mod auth;
mod history;
mod users;
mod withdrawals;
