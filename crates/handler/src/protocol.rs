use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Query { query: String },
}

impl ClientMessage {
    /// Parses a text frame.
    ///
    /// Frames that are not JSON objects are taken as a bare query string.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => Some(message),
            Err(_) if text.trim_start().starts_with('{') => None,
            Err(_) => Some(ClientMessage::Query {
                query: text.to_string(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Response { payload: Value },
}
