/// Domain-aware logging macros.
///
/// Each macro injects a `domain` field so log lines can be grouped by the
/// part of the pipeline that emitted them: `sys`, `conf`, `src`, `win`,
/// `ckpt`.
///
/// ```ignore
/// eg_info!(src, source = %name, messages = 120, "input loaded");
/// eg_warn!(win, window = idx, error = %e, "window too large, splitting");
/// ```
///
/// The domain is a bare identifier, not a string.

#[doc(hidden)]
macro_rules! eg_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

#[allow(unused_macros)]
macro_rules! eg_error {
    ($domain:ident, $($rest:tt)*) => {
        eg_log!(error, $domain, $($rest)*)
    };
}

macro_rules! eg_warn {
    ($domain:ident, $($rest:tt)*) => {
        eg_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! eg_info {
    ($domain:ident, $($rest:tt)*) => {
        eg_log!(info, $domain, $($rest)*)
    };
}

macro_rules! eg_debug {
    ($domain:ident, $($rest:tt)*) => {
        eg_log!(debug, $domain, $($rest)*)
    };
}

#[allow(unused_macros)]
macro_rules! eg_trace {
    ($domain:ident, $($rest:tt)*) => {
        eg_log!(trace, $domain, $($rest)*)
    };
}
