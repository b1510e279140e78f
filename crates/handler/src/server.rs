use futures_util::sink::Sink;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use searchgate_coordinator::CoordinatorHandle;
use tokio::sync::mpsc;
use warp::ws::Message;
use warp::Error;

use crate::handler::HandlerConfig;
use crate::protocol::{ClientMessage, ServerMessage};

pub async fn server(
    config: HandlerConfig,
    stream: impl Stream<Item = Result<Message, Error>> + Sink<Message>,
) {
    let (mut sink, mut stream) = stream.split();
    let (tx_payload, mut rx_payload) = mpsc::unbounded_channel();
    let coordinator = CoordinatorHandle::spawn(
        (config.transport_factory)(),
        tx_payload,
        config.options,
        config.payload_shape.extractor(),
    );
    tracing::info!("Search connection opened.");

    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(message)) if message.is_text() => {
                    let text = message.to_str().unwrap_or_default();
                    match ClientMessage::parse(text) {
                        Some(ClientMessage::Query { query }) => coordinator.query(query),
                        None => tracing::debug!(message = text, "Ignore unknown client message."),
                    }
                }
                Some(Ok(message)) if message.is_close() => break,
                Some(Err(_)) | None => break,
                _ => {}
            },
            Some(payload) = rx_payload.recv() => {
                let response = ServerMessage::Response { payload };
                if sink.send(Message::text(serde_json::to_string(&response).unwrap())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the handle stops the coordinator and cancels its request.
    drop(coordinator);
    tracing::info!("Search connection closed.");
}
