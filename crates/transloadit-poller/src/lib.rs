//! Status poller: cooperative wait loop until an assembly reaches a terminal status.

mod poller;

pub use poller::StatusPoller;
pub use tokio_util::sync::CancellationToken;
pub use transloadit_types::{Assembly, AssemblyError, AssemblyStatus, PollConfig};
