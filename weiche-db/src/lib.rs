pub mod client;
mod memory;
mod postgres;
pub mod record;

pub use client::{DbClient, DbError};
