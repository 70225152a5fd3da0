use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

/// Error type for provider and transport failures.
#[derive(Error, Debug, Clone)]
pub enum AiError {
    #[error("Network request failed: {message}")]
    NetworkError {
        message: String,
        retryable: bool,
        status_code: Option<u16>,
    },

    #[error("Connection timeout after {timeout:?}")]
    TimeoutError { timeout: Duration, retryable: bool },

    #[error("Connection refused to {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("Invalid API key for provider {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded. Retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Provider error from {provider}: {message}")]
    ProviderError {
        provider: String,
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("Stream error: {message}")]
    StreamError { message: String, retryable: bool },

    #[error("JSON error: {message}")]
    JsonError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl AiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::NetworkError { retryable, .. } => *retryable,
            AiError::TimeoutError { retryable, .. } => *retryable,
            AiError::ConnectionRefused { .. } => true,
            AiError::RateLimitExceeded { .. } => true,
            AiError::ProviderError { retryable, .. } => *retryable,
            AiError::StreamError { retryable, .. } => *retryable,

            AiError::InvalidApiKey { .. }
            | AiError::InvalidRequest { .. }
            | AiError::MalformedResponse { .. }
            | AiError::JsonError { .. }
            | AiError::ConfigurationError { .. } => false,
        }
    }

    /// Delay requested by the server, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AiError::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            AiError::InvalidApiKey { provider } | AiError::ProviderError { provider, .. } => {
                Some(provider)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::TimeoutError {
                timeout: Duration::from_secs(30),
                retryable: true,
            }
        } else if err.is_connect() {
            AiError::ConnectionRefused {
                endpoint: err.url().map_or("unknown".to_string(), |u| u.to_string()),
            }
        } else {
            let status_code = err.status().map(|s| s.as_u16());
            AiError::NetworkError {
                message: err.to_string(),
                retryable: err.status().is_some_and(|s| s.is_server_error()),
                status_code,
            }
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::JsonError {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AiError>;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    pub jitter: JitterStrategy,
    /// Honor server-provided retry-after delays over computed backoff.
    pub respect_retry_after: bool,
    pub max_total_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::Exponential { multiplier: 2.0 },
            jitter: JitterStrategy::Full,
            respect_retry_after: true,
            max_total_time: Some(Duration::from_secs(300)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    Fixed,
    /// delay = initial_delay * attempt
    Linear,
    /// delay = initial_delay * multiplier^(attempt - 1)
    Exponential { multiplier: f64 },
}

#[derive(Debug, Clone)]
pub enum JitterStrategy {
    None,
    /// Random delay in [0, computed delay].
    Full,
    /// Half the computed delay plus random jitter up to that half.
    Half,
}

/// Runs an async operation with retries for retryable errors.
pub struct RetryExecutor {
    config: RetryConfig,
    start_time: Instant,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
        }
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            if let Some(max_time) = self.config.max_total_time {
                if self.start_time.elapsed() >= max_time {
                    return Err(last_error.unwrap_or(AiError::TimeoutError {
                        timeout: max_time,
                        retryable: false,
                    }));
                }
            }

            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    last_error = Some(error.clone());

                    if attempt < self.config.max_attempts {
                        let delay = self.calculate_delay(attempt, &error);
                        if let Some(max_time) = self.config.max_total_time {
                            if self.start_time.elapsed() + delay >= max_time {
                                return Err(error);
                            }
                        }
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AiError::NetworkError {
            message: "retry loop completed without error".to_string(),
            retryable: false,
            status_code: None,
        }))
    }

    fn calculate_delay(&self, attempt: u32, error: &AiError) -> Duration {
        if self.config.respect_retry_after {
            if let Some(retry_after) = error.retry_after() {
                return std::cmp::min(retry_after, self.config.max_delay);
            }
        }

        let base_delay = match &self.config.backoff {
            BackoffStrategy::Fixed => self.config.initial_delay,
            BackoffStrategy::Linear => Duration::from_millis(
                self.config.initial_delay.as_millis() as u64 * attempt as u64,
            ),
            BackoffStrategy::Exponential { multiplier } => {
                let delay_ms = self.config.initial_delay.as_millis() as f64
                    * multiplier.powi((attempt - 1) as i32);
                Duration::from_millis(delay_ms as u64)
            }
        };

        std::cmp::min(self.apply_jitter(base_delay), self.config.max_delay)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();

        match &self.config.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                let jitter_ms = rng.gen_range(0..=delay.as_millis() as u64);
                Duration::from_millis(jitter_ms)
            }
            JitterStrategy::Half => {
                let base_ms = delay.as_millis() as u64 / 2;
                Duration::from_millis(base_ms + rng.gen_range(0..=base_ms))
            }
        }
    }
}
