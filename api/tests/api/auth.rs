use payloads::requests;
use reqwest::StatusCode;

use test_helpers::{
    ROOT_EMAIL, ROOT_PASSWORD, assert_error_code, assert_status_code,
    spawn_app,
};

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn login_refused_for_unknown_email() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app
        .client
        .login(&requests::LoginAdmin {
            email: "nobody@backoffice.test".into(),
            password: "whatever".into(),
            totp: None,
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn login_requires_totp_once_activated() -> anyhow::Result<()> {
    let app = spawn_app().await;

    // without a code
    let result = app
        .client
        .login(&requests::LoginAdmin {
            email: ROOT_EMAIL.into(),
            password: ROOT_PASSWORD.into(),
            totp: None,
        })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // with the current code
    app.login_root().await?;
    let stats = app.client.user_stats().await?;
    assert_eq!(stats.total, 0);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn refresh_rotates_the_session() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let first = app.client.refresh().await?;
    // the old session is finished; its refresh token is now dead, the
    // new pair works
    let second = app.client.refresh().await?;
    assert_ne!(first.refresh, second.refresh);

    let stats = app.client.user_stats().await?;
    assert_eq!(stats.total, 0);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn logout_kills_the_session() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    // logout clears client tokens; keep a copy to replay
    let pair = app.client.login(&requests::LoginAdmin {
        email: ROOT_EMAIL.into(),
        password: ROOT_PASSWORD.into(),
        totp: Some(app.confirmation_code()),
    })
    .await?;
    app.client.logout().await?;

    app.client.set_tokens(pair);
    let result = app.client.user_stats().await;
    assert_error_code(result, 401003); // session not found

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn requests_without_token_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.user_stats().await;
    assert_error_code(result, 401002); // invalid token

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn registered_admin_logs_in_with_one_time_password()
-> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let password = app
        .client
        .register_admin(&requests::RegisterAdmin {
            email: "junior@backoffice.test".into(),
            grants: payloads::RoleGrants::uniform(
                payloads::PermissionLevel::Read,
            ),
        })
        .await?;

    // fresh accounts have no 2FA yet; the one-time password suffices
    app.client.logout().await?;
    app.client
        .login(&requests::LoginAdmin {
            email: "junior@backoffice.test".into(),
            password,
            totp: None,
        })
        .await?;

    // read-only grants: listing users works, banning does not
    let users = app.client.list_users(&Default::default()).await?;
    assert_eq!(users.count, 0);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn duplicate_admin_email_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let details = requests::RegisterAdmin {
        email: "dup@backoffice.test".into(),
        grants: payloads::RoleGrants::none(),
    };
    app.client.register_admin(&details).await?;
    let result = app.client.register_admin(&details).await;
    assert_error_code(result, 409001); // email exists

    Ok(())
}

#[tokio::test]
#[ignore = "requires Postgres (docker-compose up)"]
async fn validation_collects_all_violations() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_root().await?;

    let result = app
        .client
        .register_admin(&requests::RegisterAdmin {
            email: "not-an-email".into(),
            grants: payloads::RoleGrants::none(),
        })
        .await;
    match result {
        Err(payloads::ClientError::Api { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.code, 400000);
            let violations = body.data.as_array().unwrap();
            assert_eq!(violations[0]["field"], "email");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    Ok(())
}
