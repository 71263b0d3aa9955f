//! Core types and the transport seam for the Transloadit assembly client.
//!
//! Wire DTOs follow the JSON shapes of the Transloadit `/assemblies` endpoints.

mod assembly;
mod config;
mod spec;
mod traits;

pub use assembly::*;
pub use config::*;
pub use spec::*;
pub use traits::*;
