//! Fixed-delay bounded retry loop.

use std::fmt;
use std::thread;
use std::time::Duration;

/// Outcome of a single failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Worth retrying (network error, timeout, non-2xx status).
    Transient(String),
    /// Retrying cannot help (e.g. an unparseable response body).
    Fatal(String),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transient(msg) | AttemptError::Fatal(msg) => f.write_str(msg),
        }
    }
}

/// The retry loop gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: AttemptError,
}

/// `max_attempts` total attempts, sleeping `delay` between consecutive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, returns a fatal error, or the attempt
    /// budget is spent. `op` receives the 1-based attempt number.
    ///
    /// There is no sleep after the last attempt.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Result<T, AttemptError>,
    {
        let mut attempt = 1;
        loop {
            tracing::info!(
                "{}: attempt {}/{}",
                label,
                attempt,
                self.max_attempts
            );
            match op(attempt) {
                Ok(value) => {
                    tracing::info!("{}: attempt {}/{} succeeded", label, attempt, self.max_attempts);
                    return Ok(value);
                }
                Err(AttemptError::Fatal(msg)) => {
                    tracing::error!(
                        "{}: attempt {}/{} failed, not retrying: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        msg
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: AttemptError::Fatal(msg),
                    });
                }
                Err(AttemptError::Transient(msg)) => {
                    tracing::warn!(
                        "{}: attempt {}/{} failed: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        msg
                    );
                    if attempt >= self.max_attempts {
                        tracing::error!("{}: max retries reached", label);
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: AttemptError::Transient(msg),
                        });
                    }
                    if !self.delay.is_zero() {
                        tracing::info!("{}: retrying in {:?}", label, self.delay);
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
