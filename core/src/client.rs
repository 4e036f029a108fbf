use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ModelConfig, RetrySettings};
use crate::errors::{TransportError, TransportResult};
use crate::transport::{ChatTransport, OpenAiTransport};
use crate::types::Turn;

/// Exponential backoff with jitter for transient transport failures.
///
/// The delay after attempt `n` is `min(max_delay, e + U[0, e))` with
/// `e = min(max_delay, base_delay * 2^(n-1))`, so successive delays never
/// decrease and never exceed `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
        }
    }

    /// Delay to wait after the `attempt`-th failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.max_delay.as_millis() as u64;
        let shift = attempt.saturating_sub(1).min(32);
        let exp = (self.base_delay.as_millis() as u64)
            .saturating_mul(1_u64 << shift)
            .min(cap);
        let jitter = if exp > 0 {
            rand::thread_rng().gen_range(0..exp)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter).min(cap))
    }
}

/// What the normalizer needs to know about the target model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    pub supports_system_role: bool,
    pub context_budget: usize,
}

impl ModelProfile {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            supports_system_role: config.system_prompt_support,
            context_budget: config.context_budget(),
        }
    }
}

/// Client for the text-generation service.
///
/// Wraps a single-attempt [`ChatTransport`] and retries transient failures
/// with [`RetryPolicy`]. Holds no mutable state, so one client can serve
/// independent callers concurrently.
#[derive(Debug, Clone)]
pub struct LlmClient<T> {
    transport: T,
    policy: RetryPolicy,
    profile: ModelProfile,
}

impl LlmClient<OpenAiTransport> {
    /// Create a client for an OpenAI-compatible endpoint
    pub fn from_config(model: &ModelConfig, retry: &RetrySettings) -> TransportResult<Self> {
        let transport = OpenAiTransport::new(model)?;
        Ok(Self::new(
            transport,
            RetryPolicy::from_settings(retry),
            ModelProfile::from_config(model),
        ))
    }
}

impl<T: ChatTransport> LlmClient<T> {
    pub fn new(transport: T, policy: RetryPolicy, profile: ModelProfile) -> Self {
        Self {
            transport,
            policy,
            profile,
        }
    }

    pub fn profile(&self) -> ModelProfile {
        self.profile
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends an already-normalized conversation and returns the raw answer text.
    ///
    /// Transient failures are retried until `max_attempts` is reached, after
    /// which the last one is returned wrapped in `RetriesExhausted`. Any other
    /// failure is returned immediately.
    pub async fn send(&self, turns: &[Turn], json_format: bool) -> TransportResult<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.transport.complete(turns, json_format).await {
                Ok(text) => {
                    debug!(attempt, "Completion succeeded");
                    return Ok(text);
                }
                Err(e) if e.is_transient() => {
                    if attempt >= self.policy.max_attempts {
                        warn!(attempt, error = %e, "Transient failures exhausted retry budget");
                        return Err(TransportError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient transport failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
