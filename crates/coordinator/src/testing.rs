//! A recording transport for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::{sleep, Duration};

use crate::{CompletionSender, IssueOptions, RequestToken, Transport, TransportError};

/// One call observed by [`MockTransport`], in call order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call<Q> {
    Issue(RequestToken, Q),
    Cancel(RequestToken),
}

struct State<Q, P> {
    next_id: u64,
    calls: Vec<Call<Q>>,
    options: Vec<IssueOptions>,
    completers: HashMap<RequestToken, CompletionSender<P>>,
    live: HashSet<RequestToken>,
}

/// Transport that never settles on its own.
///
/// Clones share the same state, so a test can keep one clone and hand the
/// other to the coordinator. Requests are settled with [`MockTransport::complete`].
pub struct MockTransport<Q, P> {
    state: Arc<Mutex<State<Q, P>>>,
}

impl<Q, P> Clone for MockTransport<Q, P> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<Q, P> Default for MockTransport<Q, P> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                calls: Vec::new(),
                options: Vec::new(),
                completers: HashMap::new(),
                live: HashSet::new(),
            })),
        }
    }
}

impl<Q, P> MockTransport<Q, P> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State<Q, P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<Call<Q>>
    where
        Q: Clone,
    {
        self.lock().calls.clone()
    }

    /// Waits until at least `n` calls were recorded.
    pub async fn wait_for_calls(&self, n: usize) -> Vec<Call<Q>>
    where
        Q: Clone,
    {
        loop {
            let calls = self.calls();
            if calls.len() >= n {
                return calls;
            }
            sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn issued_options(&self) -> Vec<IssueOptions> {
        self.lock().options.clone()
    }

    /// Tokens in the order they were issued.
    pub fn tokens(&self) -> Vec<RequestToken> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Issue(token, _) => Some(*token),
                Call::Cancel(_) => None,
            })
            .collect()
    }

    pub fn is_live(&self, token: RequestToken) -> bool {
        self.lock().live.contains(&token)
    }

    /// Settles a live request. Returns `false` if the token was cancelled,
    /// already settled or never issued.
    pub fn complete(&self, token: RequestToken, result: Result<P, TransportError>) -> bool {
        let mut state = self.lock();
        if !state.live.remove(&token) {
            return false;
        }
        match state.completers.remove(&token) {
            Some(completer) => {
                completer.complete(token, result);
                true
            }
            None => false,
        }
    }

    /// Settles a request even if it was cancelled, as a transport that
    /// breaks the cancellation contract would.
    pub fn complete_stale(&self, token: RequestToken, result: Result<P, TransportError>) -> bool {
        let mut state = self.lock();
        state.live.remove(&token);
        match state.completers.remove(&token) {
            Some(completer) => {
                completer.complete(token, result);
                true
            }
            None => false,
        }
    }
}

impl<Q, P> Transport for MockTransport<Q, P>
where
    Q: Send + 'static,
    P: Send + 'static,
{
    type Query = Q;
    type Payload = P;

    fn issue(
        &mut self,
        query: Q,
        options: IssueOptions,
        completer: CompletionSender<P>,
    ) -> RequestToken {
        let mut state = self.lock();
        let token = RequestToken::new(state.next_id);
        state.next_id += 1;
        state.calls.push(Call::Issue(token, query));
        state.options.push(options);
        state.completers.insert(token, completer);
        state.live.insert(token);
        token
    }

    fn cancel(&mut self, token: RequestToken) {
        let mut state = self.lock();
        state.calls.push(Call::Cancel(token));
        state.live.remove(&token);
    }
}
