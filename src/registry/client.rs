//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry logic (max 3 retries)
//! - Rate limit error handling
//! - Optional authentication for private registries

use crate::domain::Credential;
use crate::error::RegistryError;
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::time::Duration;

/// Default timeout for HTTP requests (30 seconds)
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("kira-deps/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
pub(crate) const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
pub(crate) const BASE_DELAY_MS: u64 = 100;

/// How requests to a private registry authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum RegistryAuth {
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl RegistryAuth {
    /// Username and password when both are set, otherwise the token
    pub fn from_credential(credential: &Credential) -> Option<Self> {
        let username = credential.username.as_deref().filter(|u| !u.is_empty());
        let password = credential.password.as_deref().filter(|p| !p.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Some(RegistryAuth::Basic {
                username: username.to_string(),
                password: Some(password.to_string()),
            }),
            _ => credential.secret().map(|token| RegistryAuth::Bearer(token.to_string())),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            RegistryAuth::Bearer(token) => request.bearer_auth(token),
            RegistryAuth::Basic { username, password } => request.basic_auth(username, password.as_ref()),
        }
    }
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryAuth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            RegistryAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    auth: Option<RegistryAuth>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            auth: None,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// A copy of this client that authenticates every request
    pub fn with_auth(mut self, auth: Option<RegistryAuth>) -> Self {
        self.auth = auth;
        self
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.auth {
            Some(auth) => auth.apply(request),
            None => request,
        }
    }

    /// Perform a GET request with retry logic and error context
    pub async fn get_with_context(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            tracing::debug!(url, attempt, "registry request");
            match self.request(url).send().await {
                Ok(response) => {
                    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(RegistryError::rate_limit_exceeded(registry));

                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                            delay *= 2;
                            continue;
                        }
                        break;
                    }

                    if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(RegistryError::package_not_found(package, registry));
                    }

                    if !response.status().is_success() {
                        let status = response.status();
                        return Err(RegistryError::network_error(
                            package,
                            registry,
                            format!("HTTP {}", status),
                        ));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(RegistryError::timeout(package, registry));
                    } else {
                        last_error = Some(RegistryError::network_error(
                            package,
                            registry,
                            e.to_string(),
                        ));
                    }

                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RegistryError::network_error(package, registry, "unknown error")))
    }

    /// Perform a GET request and parse JSON response with retry on parse errors
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            // Network errors are already retried in get_with_context
            let response = self.get_with_context(url, package, registry).await?;

            match response.json::<T>().await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => {
                    last_error = Some(RegistryError::invalid_response(
                        package,
                        registry,
                        format!("failed to parse JSON: {}", e),
                    ));

                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RegistryError::invalid_response(package, registry, "unknown JSON parse error")
        }))
    }
}
