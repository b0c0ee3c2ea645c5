//! Poisoned-lock recovery.
//!
//! A panic while holding a lock poisons it; every registry in the daemon
//! is shared across worker and streamer threads, so one panicking thread
//! must not wedge the rest of the system. Recovery takes the inner value
//! as-is, which is safe for the map types guarded here (the maps stay
//! structurally valid even if a logical update was lost mid-panic).

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use tracing::warn;

pub fn rwlock_read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned rwlock (read)");
        poisoned.into_inner()
    })
}

pub fn rwlock_write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned rwlock (write)");
        poisoned.into_inner()
    })
}

pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!("recovering from poisoned mutex");
        poisoned.into_inner()
    })
}
