#![forbid(unsafe_code)]

mod coordinator;
mod error;
mod extract;
mod handle;
mod sink;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use coordinator::{CoordinatorState, RequestCoordinator};
pub use error::TransportError;
pub use extract::{identity, Extractor};
pub use handle::CoordinatorHandle;
pub use sink::ResponseSink;
pub use transport::{
    completion_channel, Completion, CompletionSender, IssueOptions, RequestToken, Transport,
};
