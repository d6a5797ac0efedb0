//! Core, platform independent bridge code.

pub mod bridge;
pub mod config;
pub mod interface;
pub mod lease;
pub mod netif;
pub mod provision;
pub mod readiness;
pub mod relay;
pub mod repr;
pub mod retry;
pub mod sim;
pub mod storage;
pub mod tcpip;
pub mod time;
pub mod upstream;

use std::sync::{
    Mutex,
    MutexGuard,
};

/// Locks a mutex, recovering the guard if a panicking task poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(err) => err.into_inner(),
    }
}
