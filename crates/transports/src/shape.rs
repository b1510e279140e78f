use searchgate_coordinator::Extractor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which part of a JSON payload reaches the client.
///
/// Some providers answer with a tuple such as `[query, results, ...]`;
/// `Element` picks one entry of such an array.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PayloadShape {
    #[default]
    Raw,
    Element {
        index: usize,
    },
}

impl PayloadShape {
    pub fn extract(&self, payload: Value) -> Option<Value> {
        match (self, payload) {
            (PayloadShape::Raw, payload) => Some(payload),
            (PayloadShape::Element { index }, Value::Array(mut items)) if *index < items.len() => {
                Some(items.swap_remove(*index))
            }
            (PayloadShape::Element { .. }, _) => None,
        }
    }

    pub fn extractor(self) -> Extractor<Value> {
        Box::new(move |payload| self.extract(payload))
    }
}
