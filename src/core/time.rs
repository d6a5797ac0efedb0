//! Abstractions for providing the current time and waiting.

use std::fmt::Debug;
use std::sync::{
    Arc,
    Condvar,
    Mutex,
    MutexGuard,
};
use std::thread;
use std::time::{
    Duration,
    Instant,
};

use core::lock;

/// An environment that provides the current time and lets a task wait.
pub trait Env: Clone + Debug + Send + Sync + 'static {
    /// Returns an instance corresponding to "now".
    fn now_instant(&self) -> Instant;

    /// Blocks the calling task for the specified duration.
    fn sleep(&self, duration: Duration);

    /// Waits on a condition variable for at most timeout, returning the
    /// reacquired guard and whether the wait timed out.
    fn wait_timeout<'a, T>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool);
}

/// An environment that provides system based time.
#[derive(Clone, Debug)]
pub struct SystemEnv;

impl SystemEnv {
    pub fn new() -> SystemEnv {
        SystemEnv {}
    }
}

impl Env for SystemEnv {
    fn now_instant(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }

    fn wait_timeout<'a, T>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        let (guard, res) = match condvar.wait_timeout(guard, timeout) {
            Ok(waited) => waited,
            Err(err) => err.into_inner(),
        };
        (guard, res.timed_out())
    }
}

/// An environment with a virtual clock. Sleeping advances the clock
/// instantly and is recorded, clones share the same clock.
///
/// Condition waits still block for a real millisecond so notifications from
/// other threads are observed, but a timed out wait advances the clock by the
/// full timeout.
#[derive(Clone, Debug)]
pub struct MockEnv {
    now: Arc<Mutex<Instant>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockEnv {
    pub fn new() -> MockEnv {
        MockEnv {
            now: Arc::new(Mutex::new(Instant::now())),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Moves the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        *lock(&self.now) += duration;
    }

    /// Returns every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    /// Returns the sum of all sleeps requested so far.
    pub fn slept(&self) -> Duration {
        lock(&self.sleeps)
            .iter()
            .fold(Duration::from_secs(0), |acc, sleep| acc + *sleep)
    }
}

impl Env for MockEnv {
    fn now_instant(&self) -> Instant {
        *lock(&self.now)
    }

    fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        self.advance(duration);
    }

    fn wait_timeout<'a, T>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, T>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        let real = ::std::cmp::min(timeout, Duration::from_millis(1));
        let (guard, timed_out) = SystemEnv.wait_timeout(condvar, guard, real);
        if timed_out {
            self.advance(timeout);
        }
        (guard, timed_out)
    }
}
