//! Client for the Transloadit media-processing API.
//!
//! [`Transloadit::submit`] creates an assembly and optionally waits for it to finish;
//! [`Transloadit::get_status`] looks up an existing assembly by id.

mod client;

pub use client::Transloadit;
pub use tokio_util::sync::CancellationToken;
pub use transloadit_http::{HttpTransport, DEFAULT_ENDPOINT};
pub use transloadit_poller::StatusPoller;
pub use transloadit_types::{
    Assembly, AssemblyError, AssemblySpec, AssemblyStatus, AssemblyTransport, ConfigError,
    Credentials, PollConfig, ResultFile, StepConfig, TransportError,
};
