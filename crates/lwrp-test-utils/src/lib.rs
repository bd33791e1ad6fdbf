//! Common test helpers and utilities for LWRP tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A scripted mock LWRP device with RAII cleanup
//! - An event collector for client subscriptions

mod collector;
mod device;

pub use collector::EventCollector;
pub use device::MockDevice;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Find a TCP port with nothing listening on it
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for a synchronous condition
pub async fn wait_until<F>(check: F, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    wait_for(|| std::future::ready(check()), DEFAULT_CHECK_INTERVAL, max_wait).await
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_until(|| counter.load(Ordering::SeqCst) >= target, max_wait).await
}

/// Wait for a boolean flag to become true
pub async fn wait_for_flag(flag: &AtomicBool, max_wait: Duration) -> bool {
    wait_until(|| flag.load(Ordering::SeqCst), max_wait).await
}
