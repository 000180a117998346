//! Retry/backoff executor for Oracle calls.
//!
//! Fixed schedule: 15s, 30s, 60s between attempts, rate-limit signals only.
//! Any other error propagates immediately. Exhausting the schedule yields a
//! terminal `OracleUnavailable`.

use crate::error::{CadenceError, Result};
use crate::oracle::{Oracle, OracleError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Backoff sleeps between attempts, in order.
pub const BACKOFF_SCHEDULE: [Duration; 3] = [
    Duration::from_secs(15),
    Duration::from_secs(30),
    Duration::from_secs(60),
];

/// Maximum retries after the first attempt (so at most 4 attempts total).
pub const MAX_RETRIES: u32 = 3;

/// Injectable sleep, so tests record delays instead of waiting them out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Wraps an Oracle with the fixed backoff policy.
///
/// The retrier has no awareness of what the Oracle returns; it only
/// classifies transient-vs-terminal failure.
pub struct Retrier {
    oracle: Arc<dyn Oracle>,
    sleeper: Arc<dyn Sleeper>,
}

impl Retrier {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(oracle: Arc<dyn Oracle>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { oracle, sleeper }
    }

    /// Call the Oracle, retrying rate-limit failures per the schedule.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let mut last_message = String::new();

        for attempt in 0..=MAX_RETRIES {
            match self.oracle.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_rate_limit() => {
                    last_message = err.to_string();
                    if attempt < MAX_RETRIES {
                        let delay = BACKOFF_SCHEDULE[attempt as usize];
                        tracing::warn!(
                            attempt = attempt + 1,
                            delay_secs = delay.as_secs(),
                            "oracle rate limited, backing off"
                        );
                        self.sleeper.sleep(delay).await;
                    }
                }
                Err(err) => return Err(map_terminal(err)),
            }
        }

        Err(CadenceError::OracleUnavailable {
            attempts: MAX_RETRIES + 1,
            message: last_message,
        })
    }
}

fn map_terminal(err: OracleError) -> CadenceError {
    CadenceError::Oracle(err.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingSleeper, ScriptedOracle};
    use super::*;

    fn secs(slept: &[Duration]) -> Vec<u64> {
        slept.iter().map(|d| d.as_secs()).collect()
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_no_sleep() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            Arc::new(ScriptedOracle::rate_limited(0, "ok")),
            sleeper.clone(),
        );

        assert_eq!(retrier.generate("p").await.unwrap(), "ok");
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_rate_limits_then_success() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            Arc::new(ScriptedOracle::rate_limited(2, "ok")),
            sleeper.clone(),
        );

        assert_eq!(retrier.generate("p").await.unwrap(), "ok");
        // Exactly two sleeps: 15s then 30s, success on the 3rd attempt
        assert_eq!(secs(&sleeper.slept.lock().unwrap()), vec![15, 30]);
    }

    #[tokio::test]
    async fn test_three_rate_limits_then_success_on_final_attempt() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            Arc::new(ScriptedOracle::rate_limited(3, "ok")),
            sleeper.clone(),
        );

        assert_eq!(retrier.generate("p").await.unwrap(), "ok");
        assert_eq!(secs(&sleeper.slept.lock().unwrap()), vec![15, 30, 60]);
    }

    #[tokio::test]
    async fn test_four_rate_limits_exhausts_with_no_extra_sleep() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let retrier = Retrier::with_sleeper(
            Arc::new(ScriptedOracle::rate_limited(4, "never")),
            sleeper.clone(),
        );

        let err = retrier.generate("p").await.unwrap_err();
        assert!(matches!(
            err,
            CadenceError::OracleUnavailable { attempts: 4, .. }
        ));
        // No sleep after the final failed attempt
        assert_eq!(secs(&sleeper.slept.lock().unwrap()), vec![15, 30, 60]);
    }

    #[tokio::test]
    async fn test_quota_message_is_retried() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let oracle = ScriptedOracle::new(
            vec![OracleError::ApiError {
                status: 400,
                message: "quota exceeded for this project".to_string(),
            }],
            "ok",
        );
        let retrier = Retrier::with_sleeper(Arc::new(oracle), sleeper.clone());

        assert_eq!(retrier.generate("p").await.unwrap(), "ok");
        assert_eq!(secs(&sleeper.slept.lock().unwrap()), vec![15]);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_propagates_immediately() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let oracle = ScriptedOracle::new(
            vec![OracleError::ApiError {
                status: 500,
                message: "internal".to_string(),
            }],
            "never",
        );
        let retrier = Retrier::with_sleeper(Arc::new(oracle), sleeper.clone());

        let err = retrier.generate("p").await.unwrap_err();
        assert!(matches!(err, CadenceError::Oracle(_)));
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }
}
