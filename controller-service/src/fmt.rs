//! Logging macros
//!
//! Each level macro forwards to [`__log!`](crate::__log), whose backend is fixed when this crate is
//! built: `defmt`, `log`, or nothing. Arguments must implement `core::fmt::Debug`/`Display` and
//! `defmt::Format` for the placeholders they are used with so that either backend builds.

#[cfg(all(feature = "log", feature = "defmt", not(doc)))]
compile_error!("features `log` and `defmt` are mutually exclusive");

#[cfg(all(not(doc), feature = "defmt"))]
#[doc(hidden)]
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! __log {
    ($level:ident, $s:literal $(, $x:expr)*) => {
        ::defmt::$level!($s $(, $x)*)
    };
}

#[cfg(all(not(doc), feature = "log"))]
#[doc(hidden)]
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! __log {
    ($level:ident, $s:literal $(, $x:expr)*) => {
        ::log::$level!($s $(, $x)*)
    };
}

// Arguments are still borrowed so that values computed only for logging do not warn
#[cfg(any(doc, not(any(feature = "defmt", feature = "log"))))]
#[doc(hidden)]
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! __log {
    ($level:ident, $s:literal $(, $x:expr)*) => {{
        let _ = ($(&$x),*);
    }};
}

/// Per-tick detail: trial status checks, block writes, received requests
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log!(trace, $s $(, $x)*)
    };
}

/// State transitions: gates changed, trial configured, started, expired or cleared
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log!(info, $s $(, $x)*)
    };
}

/// Denied passwords and refused operations
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log!(warn, $s $(, $x)*)
    };
}

/// Unusable stored records and failed requests
#[macro_export]
#[collapse_debuginfo(yes)]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        $crate::__log!(error, $s $(, $x)*)
    };
}
