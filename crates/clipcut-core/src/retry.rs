// crates/clipcut-core/src/retry.rs
//
// Bounded retry with a fixed pause between attempts. Used by the download
// path (3 attempts, 500 ms apart) and by handle recreation (one attempt).

use std::thread;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff:      Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts, backoff }
    }
}

/// Outcome of an exhausted retry: the last error and how many attempts ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts:   u32,
    pub last_error: E,
}

/// Call `op(attempt)` (1-based) until it succeeds or the policy runs out.
/// Sleeps `policy.backoff` between failed attempts, never after the last one.
pub fn retry<T, E, F>(policy: RetryPolicy, mut op: F) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= max => {
                return Err(Exhausted { attempts: attempt, last_error: e });
            }
            Err(e) => {
                warn!(attempt, max, "attempt failed: {e}");
                if !policy.backoff.is_zero() {
                    thread::sleep(policy.backoff);
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_on_a_later_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let out = retry(policy, |n| if n < 3 { Err(format!("fail {n}")) } else { Ok(n) });
        assert_eq!(out, Ok(3));
    }

    #[test]
    fn reports_last_error_when_exhausted() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let out: Result<(), _> = retry(policy, |n| {
            calls += 1;
            Err(format!("fail {n}"))
        });
        assert_eq!(calls, 3);
        assert_eq!(out, Err(Exhausted { attempts: 3, last_error: "fail 3".to_string() }));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let out: Result<u32, Exhausted<String>> = retry(RetryPolicy::new(0, Duration::ZERO), |n| Ok(n));
        assert_eq!(out, Ok(1));
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
