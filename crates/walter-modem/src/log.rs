//! Thin wrappers around the `log` crate macros.
//!
//! The wrappers exist so call sites can optionally prefix a static component
//! tag (`"parser"`, `"dispatcher"`, `"lifecycle"`, ...) without building a
//! runtime string -- everything here is `const`/`&'static str`, so these
//! macros work the same whether or not `alloc` is available.

macro_rules! my_info {
    ($tag:literal, $fmt:literal $(, $($arg:tt)+)?) => {
        log::info!(concat!("[{}] ", $fmt), $tag $(, $($arg)+)?);
    };
    ($fmt:literal $(, $($arg:tt)+)?) => {
        log::info!($fmt $(, $($arg)+)?);
    };
}

macro_rules! my_warn {
    ($tag:literal, $fmt:literal $(, $($arg:tt)+)?) => {
        log::warn!(concat!("[{}] ", $fmt), $tag $(, $($arg)+)?);
    };
    ($fmt:literal $(, $($arg:tt)+)?) => {
        log::warn!($fmt $(, $($arg)+)?);
    };
}

macro_rules! my_error {
    ($tag:literal, $fmt:literal $(, $($arg:tt)+)?) => {
        log::error!(concat!("[{}] ", $fmt), $tag $(, $($arg)+)?);
    };
    ($fmt:literal $(, $($arg:tt)+)?) => {
        log::error!($fmt $(, $($arg)+)?);
    };
}

macro_rules! my_debug {
    ($tag:literal, $fmt:literal $(, $($arg:tt)+)?) => {
        log::debug!(concat!("[{}] ", $fmt), $tag $(, $($arg)+)?);
    };
    ($fmt:literal $(, $($arg:tt)+)?) => {
        log::debug!($fmt $(, $($arg)+)?);
    };
}

macro_rules! my_trace {
    ($tag:literal, $fmt:literal $(, $($arg:tt)+)?) => {
        log::trace!(concat!("[{}] ", $fmt), $tag $(, $($arg)+)?);
    };
    ($fmt:literal $(, $($arg:tt)+)?) => {
        log::trace!($fmt $(, $($arg)+)?);
    };
}

pub(crate) use my_debug;
pub(crate) use my_error;
pub(crate) use my_info;
pub(crate) use my_trace;
pub(crate) use my_warn;
