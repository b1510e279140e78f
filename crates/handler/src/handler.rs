use std::sync::Arc;

use searchgate_coordinator::{IssueOptions, Transport};
use searchgate_transports::{BoxTransport, PayloadShape};
use serde_json::Value;
use warp::ws::Ws;
use warp::{Filter, Rejection, Reply};

use crate::server;

/// Creates a fresh transport for every connection.
pub type TransportFactory = Arc<dyn Fn() -> BoxTransport + Send + Sync>;

#[derive(Clone)]
pub struct HandlerConfig {
    pub transport_factory: TransportFactory,
    pub options: IssueOptions,
    pub payload_shape: PayloadShape,
}

impl HandlerConfig {
    /// Every connection gets its own clone of `transport`.
    pub fn new<T>(transport: T) -> Self
    where
        T: Transport<Query = String, Payload = Value> + Clone + Sync,
    {
        Self {
            transport_factory: Arc::new(move || Box::new(transport.clone()) as BoxTransport),
            options: IssueOptions::default(),
            payload_shape: PayloadShape::default(),
        }
    }

    pub fn options(self, options: IssueOptions) -> Self {
        Self { options, ..self }
    }

    pub fn payload_shape(self, payload_shape: PayloadShape) -> Self {
        Self {
            payload_shape,
            ..self
        }
    }
}

pub fn search_websocket(
    config: HandlerConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::ws().and(warp::get()).map({
        move |ws: Ws| {
            let config = config.clone();
            ws.on_upgrade(move |websocket| server::server(config, websocket))
        }
    })
}
