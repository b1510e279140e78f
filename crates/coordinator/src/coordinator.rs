use crate::extract::{identity, Extractor};
use crate::{Completion, CompletionSender, IssueOptions, RequestToken, ResponseSink, Transport};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CoordinatorState {
    Idle,
    Pending(RequestToken),
}

/// Keeps at most one request in flight and forwards only the payload of the
/// most recent query.
///
/// The coordinator itself never waits. Completions produced by the transport
/// travel through the [`CompletionSender`] given to [`RequestCoordinator::new`]
/// and must be fed back with [`RequestCoordinator::on_complete`] by whoever
/// owns the receiving end, normally a [`crate::CoordinatorHandle`] task.
pub struct RequestCoordinator<T: Transport, S> {
    transport: T,
    sink: S,
    completer: CompletionSender<T::Payload>,
    extractor: Extractor<T::Payload>,
    options: IssueOptions,
    state: CoordinatorState,
}

impl<T, S> RequestCoordinator<T, S>
where
    T: Transport,
    S: ResponseSink<T::Payload>,
{
    pub fn new(transport: T, sink: S, completer: CompletionSender<T::Payload>) -> Self {
        Self {
            transport,
            sink,
            completer,
            extractor: identity(),
            options: IssueOptions::default(),
            state: CoordinatorState::Idle,
        }
    }

    pub fn extractor(self, extractor: Extractor<T::Payload>) -> Self {
        Self { extractor, ..self }
    }

    pub fn options(self, options: IssueOptions) -> Self {
        Self { options, ..self }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Cancels the outstanding request, if any, then issues `query`.
    pub fn on_query(&mut self, query: T::Query) {
        if let CoordinatorState::Pending(token) = self.state {
            tracing::debug!(token = %token, "Cancel superseded request.");
            self.transport.cancel(token);
        }
        let token = self
            .transport
            .issue(query, self.options, self.completer.clone());
        tracing::debug!(token = %token, "Request issued.");
        self.state = CoordinatorState::Pending(token);
    }

    pub fn on_complete(&mut self, completion: Completion<T::Payload>) {
        let Completion { token, result } = completion;
        if self.state != CoordinatorState::Pending(token) {
            tracing::trace!(token = %token, "Discard completion of a stale request.");
            return;
        }
        self.state = CoordinatorState::Idle;

        match result {
            Ok(payload) => match (self.extractor)(payload) {
                Some(payload) => self.sink.send(payload),
                None => {
                    tracing::debug!(token = %token, "Discard payload with unexpected shape.")
                }
            },
            Err(err) => tracing::debug!(token = %token, error = %err, "Request failed."),
        }
    }

    /// Cancels the outstanding request and returns to `Idle`.
    pub fn shutdown(&mut self) {
        if let CoordinatorState::Pending(token) = self.state {
            tracing::debug!(token = %token, "Cancel request on shutdown.");
            self.transport.cancel(token);
            self.state = CoordinatorState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::testing::{Call, MockTransport};
    use crate::{completion_channel, TransportError};

    type Mock = MockTransport<&'static str, String>;

    struct Harness {
        transport: Mock,
        coordinator: RequestCoordinator<Mock, mpsc::UnboundedSender<String>>,
        completions: mpsc::UnboundedReceiver<Completion<String>>,
        payloads: mpsc::UnboundedReceiver<String>,
    }

    impl Harness {
        fn new() -> Self {
            let transport = Mock::new();
            let (completer, completions) = completion_channel();
            let (tx, payloads) = mpsc::unbounded_channel();
            let coordinator = RequestCoordinator::new(transport.clone(), tx, completer);
            Self {
                transport,
                coordinator,
                completions,
                payloads,
            }
        }

        fn with_extractor(extractor: Extractor<String>) -> Self {
            let Self {
                transport,
                coordinator,
                completions,
                payloads,
            } = Self::new();
            Self {
                transport,
                coordinator: coordinator.extractor(extractor),
                completions,
                payloads,
            }
        }

        /// Feeds every queued completion to the coordinator.
        fn pump(&mut self) {
            while let Ok(completion) = self.completions.try_recv() {
                self.coordinator.on_complete(completion);
            }
        }

        fn sent(&mut self) -> Vec<String> {
            let mut sent = Vec::new();
            while let Ok(payload) = self.payloads.try_recv() {
                sent.push(payload);
            }
            sent
        }
    }

    #[test]
    fn single_query_delivers_once() {
        let mut h = Harness::new();
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);

        h.coordinator.on_query("cats");
        let token = h.transport.tokens()[0];
        assert_eq!(h.coordinator.state(), CoordinatorState::Pending(token));

        assert!(h.transport.complete(token, Ok("cats-result".to_string())));
        h.pump();

        assert_eq!(h.sent(), vec!["cats-result".to_string()]);
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    }

    #[test]
    fn newer_query_supersedes_pending_one() {
        let mut h = Harness::new();
        h.coordinator.on_query("cats");
        h.coordinator.on_query("dogs");

        let tokens = h.transport.tokens();
        assert_eq!(
            h.transport.calls(),
            vec![
                Call::Issue(tokens[0], "cats"),
                Call::Cancel(tokens[0]),
                Call::Issue(tokens[1], "dogs"),
            ]
        );
        assert!(!h.transport.is_live(tokens[0]));
        assert!(!h.transport.complete(tokens[0], Ok("cats-result".to_string())));

        assert!(h.transport.complete(tokens[1], Ok("dogs-result".to_string())));
        h.pump();
        assert_eq!(h.sent(), vec!["dogs-result".to_string()]);
    }

    #[test]
    fn error_is_silent_and_returns_to_idle() {
        let mut h = Harness::new();
        h.coordinator.on_query("x");
        let token = h.transport.tokens()[0];
        h.transport
            .complete(token, Err(TransportError::Failed("boom".to_string())));
        h.pump();

        assert!(h.sent().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);

        h.coordinator.on_query("y");
        let calls = h.transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[1], Call::Issue(_, "y")));
    }

    #[test]
    fn burst_cancels_every_previous_request() {
        let mut h = Harness::new();
        h.coordinator.on_query("a");
        h.coordinator.on_query("b");
        h.coordinator.on_query("c");

        let calls = h.transport.calls();
        let issues = calls
            .iter()
            .filter(|call| matches!(call, Call::Issue(..)))
            .count();
        let cancels: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::Cancel(token) => Some(*token),
                Call::Issue(..) => None,
            })
            .collect();
        let tokens = h.transport.tokens();
        assert_eq!(issues, 3);
        assert_eq!(cancels, vec![tokens[0], tokens[1]]);

        h.transport.complete(tokens[2], Ok("c-result".to_string()));
        h.pump();
        assert_eq!(h.sent(), vec!["c-result".to_string()]);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut h = Harness::new();
        h.coordinator.on_query("cats");
        h.coordinator.on_query("dogs");
        let tokens = h.transport.tokens();

        // A transport that ignores cancellation.
        assert!(h
            .transport
            .complete_stale(tokens[0], Ok("cats-result".to_string())));
        h.pump();
        assert!(h.sent().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::Pending(tokens[1]));

        h.transport.complete(tokens[1], Ok("dogs-result".to_string()));
        h.pump();
        assert_eq!(h.sent(), vec!["dogs-result".to_string()]);
    }

    #[test]
    fn stale_error_does_not_reset_pending_request() {
        let mut h = Harness::new();
        h.coordinator.on_query("cats");
        h.coordinator.on_query("dogs");
        let tokens = h.transport.tokens();

        h.transport.complete_stale(tokens[0], Err(TransportError::Timeout));
        h.pump();
        assert_eq!(h.coordinator.state(), CoordinatorState::Pending(tokens[1]));
    }

    #[test]
    fn completion_while_idle_is_ignored() {
        let mut h = Harness::new();
        h.coordinator.on_query("cats");
        let token = h.transport.tokens()[0];
        h.transport.complete(token, Ok("first".to_string()));
        h.pump();
        assert_eq!(h.sent(), vec!["first".to_string()]);

        h.coordinator.on_complete(Completion {
            token,
            result: Ok("again".to_string()),
        });
        assert!(h.sent().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    }

    #[test]
    fn extractor_reshapes_and_filters_payloads() {
        let mut h = Harness::with_extractor(Box::new(|payload: String| {
            payload.split_once(':').map(|(_, data)| data.to_string())
        }));

        h.coordinator.on_query("cats");
        let token = h.transport.tokens()[0];
        h.transport.complete(token, Ok("ok:cats-result".to_string()));
        h.pump();
        assert_eq!(h.sent(), vec!["cats-result".to_string()]);

        h.coordinator.on_query("dogs");
        let token = h.transport.tokens()[1];
        h.transport.complete(token, Ok("malformed".to_string()));
        h.pump();
        assert!(h.sent().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
    }

    #[test]
    fn options_are_passed_to_every_issue() {
        let transport = Mock::new();
        let (completer, _completions) = completion_channel();
        let (tx, _payloads) = mpsc::unbounded_channel();
        let mut coordinator = RequestCoordinator::new(transport.clone(), tx, completer)
            .options(IssueOptions { timeout: 1500 });

        coordinator.on_query("a");
        coordinator.on_query("b");
        assert_eq!(
            transport.issued_options(),
            vec![IssueOptions { timeout: 1500 }; 2]
        );
    }

    #[test]
    fn shutdown_cancels_outstanding_request() {
        let mut h = Harness::new();
        h.coordinator.shutdown();
        assert!(h.transport.calls().is_empty());

        h.coordinator.on_query("cats");
        let token = h.transport.tokens()[0];
        h.coordinator.shutdown();
        h.coordinator.shutdown();

        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
        assert_eq!(
            h.transport.calls(),
            vec![Call::Issue(token, "cats"), Call::Cancel(token)]
        );
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut transport = Mock::new();
        let (completer, _completions) = completion_channel();
        let token = transport.issue("cats", IssueOptions::default(), completer);
        transport.complete(token, Ok("cats-result".to_string()));

        transport.cancel(token);
        transport.cancel(token);
        assert!(!transport.is_live(token));
        assert!(!transport.complete(token, Ok("late".to_string())));
    }
}
