//! Logging shims.
//!
//! Forward to `defmt` or `log` depending on which feature is enabled, and
//! compile to nothing (arguments still type-checked) when neither is.
//! `defmt` takes precedence if both are enabled.

#![allow(unused_macros)]

macro_rules! ftl_log {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::$level!($($arg)+);
        #[cfg(not(any(feature = "defmt", feature = "log")))]
        {
            let _ = || {
                let _ = ::core::format_args!($($arg)+);
            };
        }
    }};
}

macro_rules! trace {
    ($($arg:tt)+) => { $crate::internal::fmt::ftl_log!(trace, $($arg)+) };
}

macro_rules! debug {
    ($($arg:tt)+) => { $crate::internal::fmt::ftl_log!(debug, $($arg)+) };
}

macro_rules! info {
    ($($arg:tt)+) => { $crate::internal::fmt::ftl_log!(info, $($arg)+) };
}

macro_rules! warning {
    ($($arg:tt)+) => { $crate::internal::fmt::ftl_log!(warn, $($arg)+) };
}

macro_rules! error {
    ($($arg:tt)+) => { $crate::internal::fmt::ftl_log!(error, $($arg)+) };
}

pub(crate) use {debug, error, ftl_log, info, trace, warning};
