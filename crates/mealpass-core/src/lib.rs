//! Core types and trait definitions for the mealpass check-in service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the delivery-registration workflow and the seams ([`store::DeliveryStore`],
//! [`notify::Notifier`], [`clock::Clock`]) that the other crates plug into.

// Trait impls use native `async fn`; the `Send` bounds are spelled out on the
// trait declarations instead.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod delivery;
pub mod error;
pub mod notify;
pub mod person;
pub mod registrar;
pub mod store;
pub mod user;
pub mod window;

pub use error::{Error, Result};
