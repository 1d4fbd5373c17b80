//! Backend boundary: wire model, HTTP client, and the transport retry policy.

pub mod client;
pub mod model;
pub mod retry;

pub use client::{HttpFileService, RemoteFileService, ServiceConfig};
pub use model::{validate_file, FileRecord};
pub use retry::RetryPolicy;

#[cfg(test)]
pub mod testing;
