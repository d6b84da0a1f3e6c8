//! Developer trace events with a thread-local sink for deterministic tests.
//! The tail reader reports its state transitions here; tests assert on them without
//! racing over the global logger.

use std::cell::RefCell;

/// Log target used for developer traces.
pub const DEV_TARGET: &str = "cappedlite::dev";

thread_local! {
    static TL_SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Guard that disables the thread-local sink on drop.
pub struct DevSinkGuard;
impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        TL_SINK.with(|s| *s.borrow_mut() = None);
    }
}

/// Enable the thread-local sink for the current thread. Returns a guard that will disable
/// it on drop.
#[must_use]
pub fn enable_thread_sink() -> DevSinkGuard {
    TL_SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

/// Push a message into the thread-local sink if enabled.
pub fn write_str(msg: &str) {
    TL_SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

#[must_use]
pub fn sink_enabled() -> bool {
    TL_SINK.with(|s| s.borrow().is_some())
}

/// Drain and return the captured messages for the current thread. If disabled, returns an
/// empty vec.
#[must_use]
pub fn drain() -> Vec<String> {
    TL_SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Peek at the current captured messages without clearing them.
#[must_use]
pub fn snapshot() -> Vec<String> {
    TL_SINK.with(|s| s.borrow().as_ref().cloned().unwrap_or_default())
}

/// Emit a developer trace and capture it in the thread-local sink if enabled.
#[macro_export]
macro_rules! dev_trace {
    ($($arg:tt)*) => {{
        if $crate::utils::devlog::sink_enabled()
            || log::log_enabled!(target: $crate::utils::devlog::DEV_TARGET, log::Level::Trace)
        {
            let __s = format!($($arg)*);
            $crate::utils::devlog::write_str(&__s);
            log::log!(target: $crate::utils::devlog::DEV_TARGET, log::Level::Trace, "{}", __s);
        }
    }};
}
