pub mod auth;
pub mod listing;
pub mod password;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod time;
pub mod totp;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use secrecy::SecretString;
use sqlx::PgPool;
use std::net::TcpListener;

use crate::time::TimeSource;

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub async fn build(
    config: &mut Config,
    time_source: TimeSource,
) -> std::io::Result<Server> {
    let db_pool =
        web::Data::new(PgPool::connect(&config.database_url).await.unwrap());
    let time_source = web::Data::new(time_source);
    let auth_config = web::Data::new(config.auth.clone());

    // Clone config values for use in closure
    let allowed_origins = config.allowed_origins.clone();

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        // Configure CORS based on allowed origins
        let cors = if allowed_origins.contains(&"*".to_string()) {
            // Allow any origin (for development)
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            // Production: Only allow specified origins
            let mut cors = Cors::default()
                .allow_any_method()
                .allow_any_header();

            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .wrap(cors)
            .service(routes::api_services())
            .app_data(db_pool.clone())
            .app_data(time_source.clone())
            .app_data(auth_config.clone())
            // malformed bodies and path segments speak the same failure
            // envelope as everything else
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                routes::ApiError::with_msg(
                    routes::ErrorCode::InvalidPayload,
                    err.to_string(),
                )
                .into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                routes::ApiError::with_msg(
                    routes::ErrorCode::InvalidPayload,
                    err.to_string(),
                )
                .into()
            }))
    })
    .listen(listener)?
    .run();
    Ok(server)
}

pub struct Config {
    pub database_url: String,
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// List of allowed CORS origins. Use "*" to allow any origin (development only)
    pub allowed_origins: Vec<String>,
    pub auth: AuthConfig,
}

/// Everything the auth layer needs: JWT signing keys and lifetimes plus
/// the issuer shown in authenticator apps.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    /// access token lifetime in seconds
    pub access_lifetime: i64,
    /// refresh token lifetime in seconds
    pub refresh_lifetime: i64,
    pub totp_issuer: String,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string()) // Default to allow any origin for development
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let auth = AuthConfig {
            access_secret: SecretString::from(var("JWT_ACCESS_SECRET").unwrap()),
            refresh_secret: SecretString::from(
                var("JWT_REFRESH_SECRET").unwrap(),
            ),
            access_lifetime: var("JWT_ACCESS_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            refresh_lifetime: var("JWT_REFRESH_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86400),
            totp_issuer: var("TOTP_ISSUER")
                .unwrap_or_else(|_| "backoffice".to_string()),
        };

        Config {
            database_url: var("DATABASE_URL").unwrap(),
            ip: var("IP_ADDRESS").unwrap(),
            port: var("PORT").unwrap().parse().unwrap(),
            allowed_origins,
            auth,
        }
    }
}
