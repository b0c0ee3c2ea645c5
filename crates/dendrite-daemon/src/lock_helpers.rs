//! Bounded lock acquisition for process records.
//!
//! Listing and diagnostics must not block behind a record whose owner is
//! mid-terminate; they try for a bounded time and report the record as
//! busy instead.

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;
use std::time::Instant;

pub const LOCK_TIMEOUT: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_millis(20);

pub fn try_lock_timeout<T>(lock: &Mutex<T>, timeout: Duration) -> Option<MutexGuard<'_, T>> {
    let start = Instant::now();
    let mut backoff = Duration::from_micros(100);

    loop {
        if let Ok(guard) = lock.try_lock() {
            return Some(guard);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        thread::sleep(backoff);
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_uncontended_lock_acquired() {
        let lock = Mutex::new(5);
        let guard = try_lock_timeout(&lock, Duration::from_millis(10)).unwrap();
        assert_eq!(*guard, 5);
    }

    #[test]
    fn test_held_lock_times_out() {
        let lock = Arc::new(Mutex::new(5));
        let _held = lock.lock().unwrap();
        assert!(try_lock_timeout(&lock, Duration::from_millis(20)).is_none());
    }

    #[test]
    fn test_lock_acquired_after_release() {
        let lock = Arc::new(Mutex::new(0));
        let contender = Arc::clone(&lock);
        let handle = thread::spawn(move || {
            let mut guard = contender.lock().unwrap();
            *guard = 1;
            thread::sleep(Duration::from_millis(20));
        });

        thread::sleep(Duration::from_millis(5));
        let guard = try_lock_timeout(&lock, Duration::from_millis(500)).unwrap();
        assert_eq!(*guard, 1);
        drop(guard);
        handle.join().unwrap();
    }
}
