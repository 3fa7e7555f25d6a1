//! Common test utilities

use patio_core::clients::UserServiceClient;
use patio_core::config::{
    AuthConfig, Config, RateLimitConfig, RedisConfig, UserServiceConfig, VerificationConfig,
};
use patio_core::email::LogOnlyEmailSender;
use patio_core::jwt::JwtCodec;
use patio_core::middleware::RateLimiter;
use patio_core::server::{build_router, AppState};
use patio_core::verification::{InMemoryVerificationStore, VerificationService};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::MockServer;

#[allow(dead_code)]
pub struct TestApp {
    pub addr: SocketAddr,
    pub config: Config,
    pub codec: JwtCodec,
    /// Stands in for the user service; register expectations per test.
    pub mock_server: MockServer,
}

#[allow(dead_code)]
impl TestApp {
    /// Create a test configuration
    pub fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 0, // Random port
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            auth: AuthConfig {
                signing_secret: Some("test-secret-key-for-testing-purposes".to_string()),
                issuer: "patio-auth".to_string(),
                audience: "patio".to_string(),
                access_token_ttl_secs: 3600,
                refresh_token_ttl_secs: 604800,
                email_token_ttl_secs: 86400,
            },
            user_service: UserServiceConfig {
                // Replaced with the mock server URI in spawn().
                base_url: "http://127.0.0.1:9".to_string(),
            },
            smtp: None,
            verification: VerificationConfig {
                code_ttl_secs: 600,
                send_backoff_base_secs: 30,
                check_backoff_base_secs: 30,
                backoff_cap_secs: 3600,
                code_length: 6,
            },
            rate_limit: RateLimitConfig {
                // Off by default so unrelated tests never trip it.
                enabled: false,
                max_requests: 10,
                window_secs: 60,
            },
        }
    }

    /// Create HTTP client for testing
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client")
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Issue a valid access token for `subject`.
    pub fn access_token(&self, subject: &str) -> String {
        self.codec
            .issue_access_token(subject)
            .expect("test codec has a key")
    }

    pub async fn spawn() -> Self {
        Self::spawn_with(Self::test_config()).await
    }

    pub async fn spawn_with(mut config: Config) -> Self {
        // Start mock server standing in for the user service
        let mock_server = MockServer::start().await;
        config.user_service.base_url = mock_server.uri();

        let codec = JwtCodec::new(&config.auth);
        let store = Arc::new(InMemoryVerificationStore::new(&config.verification));
        let verification = Arc::new(VerificationService::new(
            store,
            Arc::new(LogOnlyEmailSender),
            &config.verification,
        ));
        let user_client =
            UserServiceClient::new(&config.user_service).expect("Failed to build user client");
        let rate_limiter = RateLimiter::new(config.rate_limit.clone(), None);

        let state = AppState {
            config: Arc::new(config.clone()),
            codec: Arc::new(codec.clone()),
            user_client,
            verification,
            rate_limiter,
            metrics_handle: Arc::new(None),
        };

        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let addr = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        TestApp {
            addr,
            config,
            codec,
            mock_server,
        }
    }
}
