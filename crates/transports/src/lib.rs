#![forbid(unsafe_code)]

mod jsonp;
mod shape;
mod utils;

use searchgate_coordinator::Transport;
use serde_json::Value;

pub use jsonp::JsonpTransport;
pub use shape::PayloadShape;
pub use utils::create_transport;

/// A transport for search strings answering with JSON.
pub type BoxTransport = Box<dyn Transport<Query = String, Payload = Value>>;
