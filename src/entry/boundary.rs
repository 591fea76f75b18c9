//! Entry point boundary
//!
//! Nothing native may unwind into the host. `run_guarded` catches both error
//! returns and panics and hands back a [`Fatal`], which the JNI export turns
//! into `FatalError`.

use crate::errors::BridgeResult;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info_span};

/// Unrecoverable outcome of an entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub entry: &'static str,
    pub message: String,
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rusty_jni::{} aborted: {}", self.entry, self.message)
    }
}

impl std::error::Error for Fatal {}

pub fn run_guarded<T>(entry: &'static str, body: impl FnOnce() -> BridgeResult<T>) -> Result<T, Fatal> {
    let span = info_span!("entry_point", name = entry);
    let _enter = span.enter();

    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            error!(entry, error = %err, "Entry point failed");
            Err(Fatal {
                entry,
                message: err.to_string(),
            })
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(entry, panic = %message, "Entry point panicked");
            Err(Fatal {
                entry,
                message: format!("panic: {}", message),
            })
        }
    }
}

/// [`run_guarded`] with the one-time process setup inside the guard, so a
/// failure while installing config or logging is reported like any other
pub fn run_entry<T>(entry: &'static str, body: impl FnOnce() -> BridgeResult<T>) -> Result<T, Fatal> {
    run_guarded(entry, || {
        crate::init();
        body()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BridgeError;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(run_guarded("ok", || Ok(7)), Ok(7));
    }

    #[test]
    fn test_errors_become_fatal() {
        let outcome: Result<(), Fatal> =
            run_guarded("broken", || Err(BridgeError::Assertion("x".to_string())));
        let fatal = outcome.unwrap_err();
        assert_eq!(fatal.entry, "broken");
        assert_eq!(fatal.message, "native assertion failed: x");
    }

    #[test]
    fn test_panics_are_caught() {
        let outcome: Result<(), Fatal> = run_guarded("panicky", || panic!("kaboom"));
        let fatal = outcome.unwrap_err();
        assert_eq!(fatal.message, "panic: kaboom");
        assert!(fatal.to_string().contains("panicky"));
    }

    #[test]
    fn test_entry_setup_runs_inside_the_guard() {
        assert_eq!(run_entry("setup", || Ok(crate::initialized())), Ok(true));

        let outcome: Result<(), Fatal> = run_entry("setup_panics", || panic!("after setup"));
        assert_eq!(outcome.unwrap_err().message, "panic: after setup");
    }

    #[test]
    fn test_formatted_panics_are_caught() {
        let outcome: Result<(), Fatal> = run_guarded("fmt", || panic!("bad index {}", 3));
        assert_eq!(outcome.unwrap_err().message, "panic: bad index 3");
    }
}
