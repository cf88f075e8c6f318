//! Logging shims.
//!
//! Each macro forwards to the `tracing` macro of the same name when the `tracing` feature is
//! enabled, and expands to nothing otherwise.

#![allow(unused_macros)]

macro_rules! error {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "tracing")]
            {
                ::tracing::error!($($tt)*)
            }
        }
    };
}

macro_rules! warn {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "tracing")]
            {
                ::tracing::warn!($($tt)*)
            }
        }
    };
}

macro_rules! info {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "tracing")]
            {
                ::tracing::info!($($tt)*)
            }
        }
    };
}

macro_rules! debug {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "tracing")]
            {
                ::tracing::debug!($($tt)*)
            }
        }
    };
}

macro_rules! trace {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "tracing")]
            {
                ::tracing::trace!($($tt)*)
            }
        }
    };
}
