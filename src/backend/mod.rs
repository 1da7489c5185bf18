//! Backend client module for gRPC communication

mod client;
mod traits;

pub use client::{BackendClient, ADDRESS_ENV, DEFAULT_ADDRESS};
pub use traits::{BackendClientTrait, CreateAnnouncement};

#[cfg(test)]
pub use traits::MockBackendClientTrait;
