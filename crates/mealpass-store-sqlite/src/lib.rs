//! SQLite backend for the mealpass record store.
//!
//! Database calls go through [`tokio_rusqlite`], which owns the connection on
//! a background thread so queries never block the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{NewPerson, SqliteStore};
