// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic retry-with-backoff combinator shared by the local and remote
//! clients (spec §4.3).

use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn local_default() -> Self {
        Self { base: Duration::from_millis(200), cap: Duration::from_secs(5), max_attempts: 3 }
    }

    pub fn remote_default() -> Self {
        Self { base: Duration::from_millis(500), cap: Duration::from_secs(30), max_attempts: 5 }
    }

    /// Exponential backoff with full jitter for attempt `n` (0-indexed).
    fn delay_for_attempt(&self, n: u32) -> Duration {
        let exp = self.base.saturating_mul(1u32.checked_shl(n).unwrap_or(u32::MAX));
        let capped = exp.min(self.cap);
        let jittered_ms = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64);
        Duration::from_millis(jittered_ms)
    }
}

/// Retry `op` under `policy`, classifying each error via `is_transient`.
/// Terminal errors return immediately; transient errors sleep (honoring
/// `retry_after` when the error carries one) and retry until `max_attempts`
/// is exhausted, at which point the last error is returned.
pub async fn with_retry<T, E, F, Fut>(
    policy: BackoffPolicy,
    is_transient: impl Fn(&E) -> bool,
    retry_after: impl Fn(&E) -> Option<Duration>,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_transient(&err) {
                    return Err(err);
                }
                let wait = retry_after(&err).unwrap_or_else(|| policy.delay_for_attempt(attempt - 1));
                tracing::debug!(attempt, wait_ms = wait.as_millis() as u64, "retrying after transient error");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum FakeError {
        Transient,
        Terminal,
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = BackoffPolicy { base: Duration::from_millis(1), cap: Duration::from_millis(5), max_attempts: 5 };
        let result: Result<u32, FakeError> = with_retry(
            policy,
            |e: &FakeError| matches!(e, FakeError::Transient),
            |_| None,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(FakeError::Transient) } else { Ok(42) } }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let policy = BackoffPolicy::local_default();
        let result: Result<u32, FakeError> = with_retry(
            policy,
            |e: &FakeError| matches!(e, FakeError::Transient),
            |_| None,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Terminal) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts_on_persistent_transient_error() {
        let calls = AtomicU32::new(0);
        let policy = BackoffPolicy { base: Duration::from_millis(1), cap: Duration::from_millis(2), max_attempts: 3 };
        let result: Result<u32, FakeError> = with_retry(
            policy,
            |e: &FakeError| matches!(e, FakeError::Transient),
            |_| None,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FakeError::Transient) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
