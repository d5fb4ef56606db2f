//! Base configuration shared by every call a service makes.

use std::time::Duration;

/// Timeout applied to each request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where calls are sent and how long each one may take.
///
/// # Examples
///
/// ```
/// use tether::Configuration;
/// use std::time::Duration;
///
/// let config = Configuration::new("https://api.example.com/v1")
///     .timeout(Duration::from_secs(30));
///
/// assert_eq!(config.base_url(), "https://api.example.com/v1");
/// assert_eq!(config.request_timeout(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct Configuration {
    base_url: String,
    timeout: Duration,
}

impl Configuration {
    /// Creates a configuration for the given base URL with the default timeout.
    ///
    /// The URL is not validated here; building a request from a call fails with
    /// [`Error::InvalidUrl`](crate::Error::InvalidUrl) when it does not resolve.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The base URL calls are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The timeout applied to each request.
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }
}
