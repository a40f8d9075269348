#[macro_use]
extern crate tracing;

pub mod config;
pub mod controller;
pub mod error;
pub mod keys;
pub mod processor;
pub mod request;
pub mod routes;
pub mod storage;
mod utils;


pub use controller::ThumbnailResolver;
pub use error::ThumbnailError;
pub use request::{ThumbnailParams, ThumbnailRequest};
