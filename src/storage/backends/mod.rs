pub mod blob_storage;
pub mod filesystem;
pub mod register;
pub mod transport;

pub use register::{Backend, BackendRegistry};
