//! Shared helpers for integration tests.

use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily set or removed.
///
/// Process environment is global state; this serializes tests that mutate it
/// and restores the previous values when `f` returns or panics.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore::capture(changes);

    for (key, value) in changes {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    f()
}

struct EnvRestore {
    saved: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn capture(changes: &[(&str, Option<&str>)]) -> Self {
        let mut saved: Vec<(String, Option<String>)> = Vec::with_capacity(changes.len());
        for (key, _) in changes {
            if saved.iter().any(|(k, _)| k == key) {
                continue;
            }
            saved.push((key.to_string(), std::env::var(key).ok()));
        }
        Self { saved }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}
