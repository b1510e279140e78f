use std::collections::HashMap;

use once_cell::sync::Lazy;
use searchgate_coordinator::{
    CompletionSender, IssueOptions, RequestToken, Transport, TransportError,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(Default::default);

const DEFAULT_QUERY_PARAM: &str = "q";
const DEFAULT_CALLBACK_PARAM: &str = "callback";
const DEFAULT_CALLBACK_PREFIX: &str = "__jp";

/// Fetches JSONP resources.
///
/// Every request gets its own callback name (`<prefix><n>`), which is passed
/// in the callback parameter and stripped from the response body again.
/// Bodies that are not wrapped in the callback are parsed as plain JSON.
///
/// Cloning yields a transport with the same settings and no requests in
/// flight.
pub struct JsonpTransport {
    url: Url,
    query_param: String,
    callback_param: String,
    callback_prefix: String,
    next_id: u64,
    in_flight: HashMap<RequestToken, JoinHandle<()>>,
}

impl JsonpTransport {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            callback_param: DEFAULT_CALLBACK_PARAM.to_string(),
            callback_prefix: DEFAULT_CALLBACK_PREFIX.to_string(),
            next_id: 0,
            in_flight: HashMap::new(),
        }
    }

    pub fn query_param(mut self, query_param: impl Into<String>) -> Self {
        self.query_param = query_param.into();
        self
    }

    pub fn callback_param(mut self, callback_param: impl Into<String>) -> Self {
        self.callback_param = callback_param.into();
        self
    }

    pub fn callback_prefix(mut self, callback_prefix: impl Into<String>) -> Self {
        self.callback_prefix = callback_prefix.into();
        self
    }

    fn request_url(&self, query: &str, callback: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair(&self.query_param, query)
            .append_pair(&self.callback_param, callback);
        url
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Clone for JsonpTransport {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            query_param: self.query_param.clone(),
            callback_param: self.callback_param.clone(),
            callback_prefix: self.callback_prefix.clone(),
            next_id: 0,
            in_flight: HashMap::new(),
        }
    }
}

impl Drop for JsonpTransport {
    fn drop(&mut self) {
        for handle in self.in_flight.values() {
            handle.abort();
        }
    }
}

impl Transport for JsonpTransport {
    type Query = String;
    type Payload = Value;

    fn issue(
        &mut self,
        query: String,
        options: IssueOptions,
        completer: CompletionSender<Value>,
    ) -> RequestToken {
        self.in_flight.retain(|_, handle| !handle.is_finished());

        let id = self.next_id;
        self.next_id += 1;
        let token = RequestToken::new(id);
        let callback = format!("{}{}", self.callback_prefix, id);
        let url = self.request_url(&query, &callback);

        tracing::debug!(url = %url, token = %token, "Fetch jsonp resource.");
        let handle = tokio::spawn(async move {
            let result = match options.timeout() {
                Some(timeout) => tokio::time::timeout(timeout, fetch(url, &callback))
                    .await
                    .unwrap_or(Err(TransportError::Timeout)),
                None => fetch(url, &callback).await,
            };
            completer.complete(token, result);
        });
        self.in_flight.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: RequestToken) {
        if let Some(handle) = self.in_flight.remove(&token) {
            handle.abort();
        }
    }
}

async fn fetch(url: Url, callback: &str) -> Result<Value, TransportError> {
    let resp = HTTP_CLIENT
        .get(url)
        .send()
        .await
        .map_err(|err| TransportError::Failed(err.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    let body = resp
        .text()
        .await
        .map_err(|err| TransportError::Failed(err.to_string()))?;
    serde_json::from_str(strip_padding(&body, callback))
        .map_err(|err| TransportError::Decode(err.to_string()))
}

/// Returns the argument of `callback(...)`, or the whole body if it is not
/// wrapped in `callback`.
fn strip_padding<'a>(body: &'a str, callback: &str) -> &'a str {
    let body = body.trim();
    // Some servers prepend an empty comment to defuse content sniffing.
    let wrapped = body.strip_prefix("/**/").unwrap_or(body).trim_start();
    let inner = wrapped
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| {
            let rest = rest.trim_end();
            let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
            rest.strip_suffix(')')
        });
    inner.unwrap_or(body)
}
