//! Device discovery and capture-handle acquisition

mod acquirer;
mod catalog;

pub use acquirer::{StreamAcquirer, StreamRole};
pub use catalog::DeviceCatalog;
