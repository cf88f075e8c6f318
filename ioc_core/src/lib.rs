//! Core types and traits for `ioc` library.
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod erased;
pub mod error;
pub mod key;
pub mod lifecycle;

pub use erased::Erased;
pub use error::{BoxError, Error, LifecycleErrors, LifecycleFailure, Result};
pub use key::Key;
pub use lifecycle::{Lifecycle, Phase};
