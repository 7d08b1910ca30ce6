//! Shared helpers for tests that touch process environment variables

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub(crate) struct EnvVarGuard {
    key: String,
    original: Option<String>,
}

impl EnvVarGuard {
    pub(crate) fn set(key: &str, value: &str) -> Self {
        let original = std::env::var(key).ok();
        // SAFETY: tests serialize env mutations with ENV_LOCK.
        unsafe { std::env::set_var(key, value) };
        Self {
            key: key.to_string(),
            original,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(value) = &self.original {
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::set_var(&self.key, value) };
        } else {
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::remove_var(&self.key) };
        }
    }
}

pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
