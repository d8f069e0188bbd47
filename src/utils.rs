//! Utility objects.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs the given function and logs instead of unwinding if it panics.
///
/// The vote worker loop and the per-frame tick must survive any single bad
/// iteration, so their bodies are wrapped in this function. Returns `None`
/// when the function panicked.
pub fn catch_and_log<R>(context: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(rv) => Some(rv),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("Box<dyn Any>");

            error!("Panic in {context}: {message}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_and_log_returns_value() {
        assert_eq!(catch_and_log("test", || 7), Some(7));
    }

    #[test]
    fn catch_and_log_swallows_panic() {
        assert_eq!(catch_and_log("test", || -> i32 { panic!("boom") }), None);
    }
}
