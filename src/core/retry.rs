//! Bounded retries for managed network stack calls.

use std::time::Duration;

use core::time::Env;
use {
    Error,
    Result,
};

/// Maximum attempts and the fixed backoff slept between failed attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff,
        }
    }

    pub fn from_millis(max_attempts: usize, backoff_ms: u64) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms))
    }

    /// Calls f with the 1 based attempt number until it succeeds or the
    /// attempts run out.
    ///
    /// # Errors
    ///
    /// The error of the last attempt, or `Error::Exhausted` if the policy
    /// allows no attempts at all.
    pub fn run<E, F, T>(&self, env: &E, op: &str, mut f: F) -> Result<T>
    where
        E: Env,
        F: FnMut(usize) -> Result<T>,
    {
        let mut last_err = Error::Exhausted;

        for attempt in 1 ..= self.max_attempts {
            match f(attempt) {
                Ok(res) => {
                    debug!("{} OK (attempt {}/{}).", op, attempt, self.max_attempts);
                    return Ok(res);
                }
                Err(err) => {
                    warn!(
                        "{} attempt {}/{} failed with {:?}.",
                        op, attempt, self.max_attempts, err
                    );
                    last_err = err;
                }
            }

            if attempt < self.max_attempts {
                env.sleep(self.backoff);
            }
        }

        Err(last_err)
    }
}
