use std::env;
use std::ffi::OsStr;

/// Guard that temporarily sets an environment variable and restores the previous value on drop.
///
/// Environment mutation is process-global, so tests using this guard should be marked
/// `#[serial]`.
///
/// # Examples
///
/// ```no_run
/// use utils::EnvVarGuard;
///
/// let _guard = EnvVarGuard::set("VAULT_UPLOAD_UPLOAD_MAX_CONCURRENT_UPLOADS", "4");
/// // When _guard is dropped, the previous value (or absence) is restored.
/// ```
pub struct EnvVarGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.prev {
            unsafe {
                env::set_var(self.key, v);
            }
        } else {
            unsafe {
                env::remove_var(self.key);
            }
        }
    }
}

/// Runs a callback when dropped unless it was disarmed first.
///
/// Drop also runs while unwinding, so the callback fires on every exit path of the scope
/// that owns the guard, including panics and a future being dropped mid-await.
pub struct CallbackGuard<F: FnOnce()> {
    callback: Option<F>,
}

impl<F: FnOnce()> CallbackGuard<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Prevent the callback from running.
    pub fn disarm(mut self) {
        self.callback = None;
    }
}

impl<F: FnOnce()> Drop for CallbackGuard<F> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}
