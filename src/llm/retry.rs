//! Bounded, randomized exponential backoff around a completion provider.
//!
//! The wait before attempt `n + 1` is drawn uniformly from
//! `[min_wait, clamp(multiplier * 2^(n-1), min_wait, max_wait)]`. Every error is
//! retried; the provider gives no reliable signal separating transient from
//! permanent failures, so a bad request simply burns its attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::provider::CompletionProvider;
use super::types::{ChatCompletion, ChatRequest};
use crate::core::config::settings::RetrySettings;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub multiplier: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            min_wait: secs(settings.min_wait_secs),
            max_wait: secs(settings.max_wait_secs),
            multiplier: secs(settings.multiplier_secs),
        }
    }

    /// Largest wait allowed after the `attempt`-th failure (1-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let raw = self.multiplier.as_secs_f64() * 2f64.powi(exponent);
        let bounded = raw
            .max(self.min_wait.as_secs_f64())
            .min(self.max_wait.as_secs_f64());
        secs(bounded)
    }

    pub fn backoff<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let low = self.min_wait.min(self.max_wait).as_secs_f64();
        let high = self.ceiling(attempt).as_secs_f64();
        if high <= low {
            return secs(low);
        }
        secs(rng.random_range(low..=high))
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

pub struct RetryingProvider {
    inner: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        self.policy.backoff(attempt, &mut rand::rng())
    }
}

#[async_trait]
impl CompletionProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ChatRequest,
        model_id: &str,
    ) -> Result<ChatCompletion, ApiError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.complete(request.clone(), model_id).await {
                Ok(completion) => {
                    if attempt > 1 {
                        tracing::info!(
                            "{} completion succeeded on attempt {}/{}",
                            self.inner.name(),
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(completion);
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(
                        "{} completion failed after {} attempts: {}",
                        self.inner.name(),
                        max_attempts,
                        err
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.next_delay(attempt);
                    tracing::warn!(
                        "{} completion failed (attempt {}/{}), retrying in {:?}: {}",
                        self.inner.name(),
                        attempt,
                        max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use crate::testing::ScriptedProvider;
    use tokio::time::Instant;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("find me a stats course")])
    }

    #[test]
    fn ceiling_doubles_and_saturates() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.ceiling(1), Duration::from_secs(1));
        assert_eq!(policy.ceiling(2), Duration::from_secs(2));
        assert_eq!(policy.ceiling(3), Duration::from_secs(4));
        assert_eq!(policy.ceiling(7), Duration::from_secs(60));
        assert_eq!(policy.ceiling(40), Duration::from_secs(60));
    }

    #[test]
    fn backoff_stays_within_bounds() {
        let policy = RetryPolicy::default();
        let mut rng = rand::rng();

        for attempt in 1..10 {
            for _ in 0..50 {
                let delay = policy.backoff(attempt, &mut rng);
                assert!(delay >= Duration::from_secs(1), "{:?}", delay);
                assert!(delay <= policy.ceiling(attempt), "{:?}", delay);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_then_success_waits_two_intervals() {
        let scripted = Arc::new(ScriptedProvider::new(vec![
            Err("429 rate limited".to_string()),
            Err("connection reset".to_string()),
            Ok("third time lucky".to_string()),
        ]));
        let provider = RetryingProvider::new(scripted.clone(), RetryPolicy::default());

        let started = Instant::now();
        let completion = provider.complete(request(), "gpt-4-turbo").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(completion.content, "third time lucky");
        assert_eq!(scripted.call_count(), 3);
        // 1s after the first failure, then somewhere in [1s, 2s].
        assert!(elapsed >= Duration::from_secs(2), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_secs(3), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_attempts_propagates_last_error() {
        let scripted = Arc::new(ScriptedProvider::new(vec![
            Err("boom 1".to_string()),
            Err("boom 2".to_string()),
            Err("boom 3".to_string()),
            Ok("never reached".to_string()),
        ]));
        let provider = RetryingProvider::new(scripted.clone(), RetryPolicy::default());

        let err = provider.complete(request(), "gpt-4-turbo").await.unwrap_err();

        assert!(err.to_string().contains("boom 3"));
        assert_eq!(scripted.call_count(), 3);
    }

    #[tokio::test]
    async fn first_success_does_not_wait() {
        let scripted = Arc::new(ScriptedProvider::new(vec![Ok("hello".to_string())]));
        let provider = RetryingProvider::new(scripted.clone(), RetryPolicy::default());

        let completion = provider.complete(request(), "gpt-3.5-turbo").await.unwrap();

        assert_eq!(completion.content, "hello");
        assert_eq!(scripted.call_count(), 1);
        assert_eq!(scripted.requests()[0].1, "gpt-3.5-turbo");
    }
}
