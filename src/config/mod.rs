//! Configuration management for Patio Core

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

/// Default location of the signing-secret fallback file
const DEFAULT_SECRET_FILE: &str = "./jwt.secret";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Token signing / gateway authentication configuration
    pub auth: AuthConfig,
    /// User service client configuration
    pub user_service: UserServiceConfig,
    /// SMTP configuration; `None` runs the dev-mode log sender
    pub smtp: Option<SmtpConfig>,
    /// Verification-code flow configuration
    pub verification: VerificationConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric signing secret; `None` means the process runs keyless and
    /// every token verification fails
    pub signing_secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub email_token_ttl_secs: i64,
}

impl AuthConfig {
    /// Resolve the signing secret: an explicitly configured value first, then
    /// the `JWT_SECRET` environment variable, then the fallback secret file
    /// (`JWT_SECRET_FILE`, default `./jwt.secret`). Returns `None` when no
    /// source yields a non-empty secret.
    pub fn resolve_signing_secret(configured: Option<String>) -> Option<String> {
        if let Some(secret) = configured {
            if !secret.is_empty() {
                return Some(secret);
            }
        }

        if let Ok(secret) = env::var("JWT_SECRET") {
            if !secret.is_empty() {
                return Some(secret);
            }
        }

        let path = env::var("JWT_SECRET_FILE").unwrap_or_else(|_| DEFAULT_SECRET_FILE.to_string());
        read_secret_file(Path::new(&path))
    }
}

/// Read a secret from a file, trimming trailing whitespace/newlines.
fn read_secret_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Base URL of the user service (e.g., http://user-service:8080)
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long a verification code stays valid
    pub code_ttl_secs: i64,
    /// Backoff seed for the send flow (first wait)
    pub send_backoff_base_secs: i64,
    /// Backoff seed for the check flow (first wait)
    pub check_backoff_base_secs: i64,
    /// Upper bound on any backoff wait
    pub backoff_cap_secs: i64,
    /// Number of digits in a generated code
    pub code_length: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600,
            send_backoff_base_secs: 30,
            check_backoff_base_secs: 30,
            backoff_cap_secs: 3600,
            code_length: 6,
        }
    }
}

/// Rate limiting configuration for the open verification endpoints
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Requests allowed per window per client IP
    pub max_requests: u64,
    /// Window size in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            auth: AuthConfig {
                signing_secret: AuthConfig::resolve_signing_secret(None),
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "patio-auth".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "patio".to_string()),
                access_token_ttl_secs: env::var("JWT_ACCESS_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                refresh_token_ttl_secs: env::var("JWT_REFRESH_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "604800".to_string())
                    .parse()
                    .unwrap_or(604800),
                email_token_ttl_secs: env::var("JWT_EMAIL_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400),
            },
            user_service: {
                let base_url = env::var("USER_SERVICE_URL")
                    .unwrap_or_else(|_| "http://user-service:8080".to_string());
                url::Url::parse(&base_url).context("Invalid USER_SERVICE_URL")?;
                UserServiceConfig { base_url }
            },
            smtp: match env::var("SMTP_HOST") {
                Ok(host) => Some(SmtpConfig {
                    host,
                    port: env::var("SMTP_PORT")
                        .unwrap_or_else(|_| "587".to_string())
                        .parse()
                        .context("Invalid SMTP_PORT")?,
                    username: env::var("SMTP_USERNAME").ok(),
                    password: env::var("SMTP_PASSWORD").ok(),
                    from_email: env::var("SMTP_FROM_EMAIL")
                        .unwrap_or_else(|_| "no-reply@patio.app".to_string()),
                    from_name: env::var("SMTP_FROM_NAME").ok(),
                    use_tls: env::var("SMTP_USE_TLS")
                        .map(|s| s.to_lowercase() == "true")
                        .unwrap_or(true),
                }),
                Err(_) => None,
            },
            verification: VerificationConfig {
                code_ttl_secs: env::var("VERIFICATION_CODE_TTL_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
                send_backoff_base_secs: env::var("VERIFICATION_SEND_BACKOFF_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                check_backoff_base_secs: env::var("VERIFICATION_CHECK_BACKOFF_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                backoff_cap_secs: env::var("VERIFICATION_BACKOFF_CAP_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                code_length: env::var("VERIFICATION_CODE_LENGTH")
                    .unwrap_or_else(|_| "6".to_string())
                    .parse()
                    .unwrap_or(6),
            },
            rate_limit: RateLimitConfig {
                enabled: env::var("RATE_LIMIT_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(true),
                max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
