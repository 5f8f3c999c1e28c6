//! Process-wide error reporting.
//!
//! Handler adapters in this crate have nowhere to return errors to, so they
//! pass them to [`report`]. By default the error and its source chain are
//! logged with `tracing::error!`; install a different sink with
//! [`set_error_handler`].
//!
//! ```
//! use sprout_core::error_handler;
//!
//! error_handler::set_error_handler(|err| eprintln!("sprout: {err}"));
//! error_handler::report(&std::io::Error::other("disk on fire"));
//! error_handler::reset_error_handler();
//! ```

use core::error::Error;
use parking_lot::RwLock;
use std::sync::Arc;

/// Callback receiving reported errors.
pub type ErrorHandler = Arc<dyn Fn(&(dyn Error + 'static)) + Send + Sync>;

static HANDLER: RwLock<Option<ErrorHandler>> = parking_lot::const_rwlock(None);

/// Replaces the process-wide handler.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&(dyn Error + 'static)) + Send + Sync + 'static,
{
    *HANDLER.write() = Some(Arc::new(handler));
}

/// Restores the default handler, which logs through `tracing`.
pub fn reset_error_handler() {
    *HANDLER.write() = None;
}

/// Passes `error` to the current handler.
///
/// The handler runs outside the lock, so it may itself call [`report`] or
/// [`set_error_handler`].
pub fn report(error: &(dyn Error + 'static)) {
    let handler = HANDLER.read().clone();
    match handler {
        Some(handler) => handler(error),
        None => tracing::error!(error = %display_chain(error), "unhandled sprout error"),
    }
}

/// Renders an error followed by its sources, separated by `": "`.
#[must_use]
pub fn display_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        // thiserror's transparent and `{0}` formats often repeat the source.
        if !rendered.ends_with(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        source = cause.source();
    }
    rendered
}

/// Serializes tests that swap the global handler.
#[cfg(test)]
pub(crate) fn test_lock() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
    LOCK.lock()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("refresh failed")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn custom_handler_receives_errors() {
        let _guard = test_lock();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        set_error_handler(move |err| sink.lock().unwrap().push(err.to_string()));

        report(&std::io::Error::other("first"));
        report(&std::io::Error::other("second"));
        reset_error_handler();
        report(&std::io::Error::other("logged, not captured"));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn handler_may_report_reentrantly() {
        let _guard = test_lock();
        let seen = Arc::new(Mutex::new(0_usize));
        let sink = seen.clone();
        set_error_handler(move |err| {
            *sink.lock().unwrap() += 1;
            if let Some(source) = err.source() {
                report(source);
            }
        });

        report(&Outer(std::io::Error::other("inner")));
        reset_error_handler();

        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn chain_includes_sources() {
        let err = Outer(std::io::Error::other("connection reset"));
        assert_eq!(display_chain(&err), "refresh failed: connection reset");
    }

    #[test]
    fn chain_skips_repeated_source_text() {
        #[derive(Debug, thiserror::Error)]
        #[error("stat failed: {0}")]
        struct Wrapped(#[source] std::io::Error);

        let err = Wrapped(std::io::Error::other("not found"));
        assert_eq!(display_chain(&err), "stat failed: not found");
    }
}
