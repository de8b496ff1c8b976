//! Progress and log callback plumbing across the C boundary.
//!
//! Progress callbacks arrive per call in the descriptor; log callbacks are
//! registered globally and receive severity-tagged messages from any
//! thread. Both must tolerate null pointers and reentrancy.

use axial_core::{LogLevel, ProgressSink};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

/// `(status_utf8, progress in [0,1], user_data) -> nonzero to cancel`.
pub type ProgressCallback =
    Option<unsafe extern "C" fn(*const c_char, f32, *mut c_void) -> c_int>;

/// `(level, domain_utf8, message_utf8, user_data)`.
pub type LogCallback =
    Option<unsafe extern "C" fn(c_int, *const c_char, *const c_char, *mut c_void)>;

struct LogSinkEntry {
    callback: unsafe extern "C" fn(c_int, *const c_char, *const c_char, *mut c_void),
    user_data: usize,
}

// Callbacks are invoked from worker threads; the registry only stores the
// raw pointers the caller handed over.
unsafe impl Send for LogSinkEntry {}

static LOG_SINKS: Lazy<Mutex<HashMap<i32, LogSinkEntry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_LOG_HANDLE: AtomicI32 = AtomicI32::new(1);

/// Install the optional diagnostic tracing subscriber once. Opt-in via the
/// `AXIAL_DEBUG` environment variable.
pub fn init_diagnostics() {
    static ONCE: Lazy<()> = Lazy::new(|| {
        if std::env::var_os("AXIAL_DEBUG").is_some() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
                )
                .try_init();
        }
    });
    Lazy::force(&ONCE);
}

pub fn register_log_callback(
    callback: LogCallback,
    user_data: *mut c_void,
) -> i32 {
    let Some(callback) = callback else { return 0 };
    let handle = NEXT_LOG_HANDLE.fetch_add(1, Ordering::Relaxed);
    LOG_SINKS.lock().unwrap().insert(
        handle,
        LogSinkEntry {
            callback,
            user_data: user_data as usize,
        },
    );
    handle
}

pub fn unregister_log_callback(handle: i32) {
    LOG_SINKS.lock().unwrap().remove(&handle);
}

/// Fan a message out to every registered sink and mirror it as a tracing
/// event.
pub fn dispatch_log(level: LogLevel, domain: Option<&str>, message: &str) {
    match level {
        LogLevel::Verbose => tracing::debug!(domain, "{message}"),
        LogLevel::Info => tracing::info!(domain, "{message}"),
        LogLevel::Warning => tracing::warn!(domain, "{message}"),
        LogLevel::Error => tracing::error!(domain, "{message}"),
    }
    let sinks = LOG_SINKS.lock().unwrap();
    if sinks.is_empty() {
        return;
    }
    let c_domain = domain.and_then(|d| CString::new(d).ok());
    let Ok(c_message) = CString::new(message) else {
        return;
    };
    for entry in sinks.values() {
        unsafe {
            (entry.callback)(
                level as c_int,
                c_domain
                    .as_ref()
                    .map_or(std::ptr::null(), |d| d.as_ptr()),
                c_message.as_ptr(),
                entry.user_data as *mut c_void,
            );
        }
    }
}

/// Progress sink bridging a per-call C callback into the engine.
///
/// Invocations are throttled to roughly one per 100 ms; a cancellation
/// request latches, so throttled polls still observe it.
pub struct FfiProgress {
    callback: ProgressCallback,
    user_data: usize,
    started: std::time::Instant,
    last_call_ms: std::sync::atomic::AtomicU64,
    cancelled: std::sync::atomic::AtomicBool,
}

// The caller contract requires the callback to be reentrant-safe and
// callable from any thread.
unsafe impl Sync for FfiProgress {}
unsafe impl Send for FfiProgress {}

const PROGRESS_THROTTLE_MS: u64 = 100;

impl FfiProgress {
    pub fn new(callback: ProgressCallback, user_data: *mut c_void) -> Self {
        Self {
            callback,
            user_data: user_data as usize,
            started: std::time::Instant::now(),
            last_call_ms: std::sync::atomic::AtomicU64::new(u64::MAX),
            cancelled: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl ProgressSink for FfiProgress {
    fn report(&self, status: Option<&str>, progress: f32) -> bool {
        let Some(callback) = self.callback else {
            return false;
        };
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        let now_ms = self.started.elapsed().as_millis() as u64;
        let last = self.last_call_ms.load(Ordering::Relaxed);
        if last != u64::MAX && now_ms.saturating_sub(last) < PROGRESS_THROTTLE_MS {
            return false;
        }
        self.last_call_ms.store(now_ms, Ordering::Relaxed);
        let status_c = status.and_then(|s| CString::new(s).ok());
        let cancel = unsafe {
            callback(
                status_c.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
                progress,
                self.user_data as *mut c_void,
            )
        };
        if cancel != 0 {
            self.cancelled.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn log(&self, level: LogLevel, domain: Option<&str>, message: &str) {
        dispatch_log(level, domain, message);
    }
}

/// Convenience for tests: read back a C string.
#[allow(dead_code)]
pub(crate) unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}
