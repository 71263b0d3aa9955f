//! HTTP transport for the Transloadit assemblies API.

mod client;
#[cfg(feature = "test-util")]
pub mod mock;
mod signature;

pub use client::{HttpTransport, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
#[cfg(feature = "test-util")]
pub use mock::ScriptedTransport;
pub use signature::{sign_params, verify_signature, SignedParams};
pub use transloadit_types::{AssemblyTransport, TransportError};
