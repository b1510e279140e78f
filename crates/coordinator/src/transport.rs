use std::fmt::{self, Display};

use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::TransportError;

/// Identifies exactly one issued request.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RequestToken(u64);

impl RequestToken {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-request options handed to [`Transport::issue`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct IssueOptions {
    /// Timeout in milliseconds, `0` disables it.
    pub timeout: u64,
}

impl IssueOptions {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }
}

/// The settled result of one request, tagged with its token.
#[derive(Debug)]
pub struct Completion<P> {
    pub token: RequestToken,
    pub result: Result<P, TransportError>,
}

/// Delivers completions back to the task that owns the coordinator.
pub struct CompletionSender<P> {
    tx: mpsc::UnboundedSender<Completion<P>>,
}

impl<P> Clone for CompletionSender<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> CompletionSender<P> {
    pub fn complete(&self, token: RequestToken, result: Result<P, TransportError>) {
        self.tx.send(Completion { token, result }).ok();
    }
}

pub fn completion_channel<P>() -> (CompletionSender<P>, mpsc::UnboundedReceiver<Completion<P>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, rx)
}

/// An asynchronous data provider.
///
/// `issue` must return without waiting for the request and must call the
/// completer at most once for the returned token. Once `cancel` has been
/// called for a token the completer must not fire for it anymore. `cancel`
/// is idempotent and a no-op for tokens that already settled.
pub trait Transport: Send + 'static {
    type Query: Send + 'static;
    type Payload: Send + 'static;

    fn issue(
        &mut self,
        query: Self::Query,
        options: IssueOptions,
        completer: CompletionSender<Self::Payload>,
    ) -> RequestToken;

    fn cancel(&mut self, token: RequestToken);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    type Query = T::Query;
    type Payload = T::Payload;

    fn issue(
        &mut self,
        query: Self::Query,
        options: IssueOptions,
        completer: CompletionSender<Self::Payload>,
    ) -> RequestToken {
        (**self).issue(query, options, completer)
    }

    fn cancel(&mut self, token: RequestToken) {
        (**self).cancel(token)
    }
}
