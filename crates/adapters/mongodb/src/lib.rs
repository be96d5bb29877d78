//! policy-adapter-mongodb - MongoDB 适配器

mod adapter;
mod config;
mod connection;
mod document;
mod error;
mod store;
mod transaction;

pub use adapter::*;
pub use config::*;
pub use connection::*;
pub use document::*;
pub use error::*;
pub use store::*;
