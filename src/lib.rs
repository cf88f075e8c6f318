//! Synchronous dependency injection container with lazily built singletons.
//!
//! Register zero-argument providers on a [`Container`](container::Container), request values by
//! type or by [`Key`], and start or stop every lifecycle-capable service in one call. A
//! [`Scope`](scope::Scope) lets a single request shadow values of the container without touching
//! it.
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub use ioc_core::{
    BoxError, Erased, Error, Key, Lifecycle, LifecycleErrors, LifecycleFailure, Phase, Result,
};

#[macro_use]
pub(crate) mod macros;

mod guard;
pub mod lifecycle;
pub mod mount;
pub mod provider;
pub mod scope;
pub mod store;

pub mod container;

pub use container::{Construction, Container, ContainerBuilder};
pub use scope::Scope;
