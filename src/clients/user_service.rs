//! User service HTTP client.
//!
//! All lookups here cross a network boundary, so every failure mode of a
//! call (connect, timeout, non-2xx status, undecodable body) is routed
//! through one fallback closure that logs the operation and identifier and
//! surfaces [`AppError::UpstreamUnavailable`]. Whether that error degrades
//! the response or propagates as 503 is decided by the caller, not here.

use crate::config::UserServiceConfig;
use crate::domain::{UserExists, UserProfile, UserSummary};
use crate::error::{AppError, Result};
use anyhow::Context;
use metrics::counter;
use reqwest::{redirect, Client};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Time allowed to establish a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed for the full request once connected.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_REDIRECTS: usize = 10;

/// Client for the user service's read endpoints.
#[derive(Clone)]
pub struct UserServiceClient {
    base_url: String,
    http: Client,
}

impl UserServiceClient {
    /// Create a client with the production timeouts.
    pub fn new(config: &UserServiceConfig) -> Result<Self> {
        Self::with_timeouts(config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a client with explicit timeouts. Tests use this to keep
    /// timeout scenarios fast.
    pub fn with_timeouts(
        config: &UserServiceConfig,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("failed to build user service HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the compact representation of a user.
    pub async fn get_user(&self, user_id: &str) -> Result<UserSummary> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        self.get_json("get_user", user_id, url, &[]).await
    }

    /// Fetch the full profile of a user.
    pub async fn get_user_full(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!("{}/users/{}/full", self.base_url, user_id);
        self.get_json("get_user_full", user_id, url, &[]).await
    }

    /// Fetch the friends of a user as compact representations.
    pub async fn get_user_friends(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        let url = format!("{}/users/{}/friends", self.base_url, user_id);
        self.get_json("get_user_friends", user_id, url, &[]).await
    }

    /// Look up a user by exact username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<UserSummary> {
        let url = format!("{}/users/by-username", self.base_url);
        self.get_json("get_user_by_username", username, url, &[("username", username)])
            .await
    }

    /// Probe whether a username is taken.
    pub async fn user_exists_by_username(&self, username: &str) -> Result<UserExists> {
        let url = format!("{}/users/exists/by-username", self.base_url);
        self.get_json(
            "user_exists_by_username",
            username,
            url,
            &[("username", username)],
        )
        .await
    }

    /// Probe whether an email address is taken.
    pub async fn user_exists_by_email(&self, email: &str) -> Result<UserExists> {
        let url = format!("{}/users/exists/by-email", self.base_url);
        self.get_json("user_exists_by_email", email, url, &[("email", email)])
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        identifier: &str,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let fallback = |cause: anyhow::Error| {
            tracing::warn!(
                operation,
                identifier,
                cause = format!("{cause:#}"),
                "user service call failed, falling back"
            );
            counter!(
                "patio_upstream_requests_total",
                "operation" => operation,
                "outcome" => "fallback"
            )
            .increment(1);
            AppError::UpstreamUnavailable {
                operation: operation.to_string(),
                source: cause,
            }
        };

        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(fallback(anyhow::Error::new(e).context("request failed"))),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(fallback(anyhow::anyhow!("unexpected status {status}")));
        }

        match response.json::<T>().await {
            Ok(value) => {
                counter!(
                    "patio_upstream_requests_total",
                    "operation" => operation,
                    "outcome" => "ok"
                )
                .increment(1);
                Ok(value)
            }
            Err(e) => Err(fallback(
                anyhow::Error::new(e).context("response body was not valid JSON"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> UserServiceConfig {
        UserServiceConfig {
            base_url: base_url.to_string(),
        }
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = UserServiceClient::new(&config("http://users.internal:8081/")).unwrap();
        assert_eq!(client.base_url(), "http://users.internal:8081");
    }

    #[test]
    fn constructor_keeps_clean_base_url() {
        let client = UserServiceClient::new(&config("http://users.internal:8081")).unwrap();
        assert_eq!(client.base_url(), "http://users.internal:8081");
    }

    #[test]
    fn with_timeouts_accepts_sub_second_values() {
        let client = UserServiceClient::with_timeouts(
            &config("http://users.internal:8081"),
            Duration::from_millis(50),
            Duration::from_millis(100),
        );
        assert!(client.is_ok());
    }
}
