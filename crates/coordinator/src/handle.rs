use tokio::sync::mpsc;

use crate::coordinator::RequestCoordinator;
use crate::{completion_channel, Completion, Extractor, IssueOptions, ResponseSink, Transport};

enum Command<Q> {
    Query(Q),
}

/// Feeds queries to a coordinator running in its own task.
///
/// The task owns the coordinator, so queries and completions are handled one
/// at a time. Dropping every handle shuts the coordinator down, cancelling
/// the outstanding request.
pub struct CoordinatorHandle<Q> {
    tx_command: mpsc::UnboundedSender<Command<Q>>,
}

impl<Q> Clone for CoordinatorHandle<Q> {
    fn clone(&self) -> Self {
        Self {
            tx_command: self.tx_command.clone(),
        }
    }
}

impl<Q: Send + 'static> CoordinatorHandle<Q> {
    pub fn spawn<T, S>(
        transport: T,
        sink: S,
        options: IssueOptions,
        extractor: Extractor<T::Payload>,
    ) -> Self
    where
        T: Transport<Query = Q>,
        S: ResponseSink<T::Payload>,
    {
        let (tx_command, rx_command) = mpsc::unbounded_channel();
        let (completer, rx_completion) = completion_channel();
        let coordinator = RequestCoordinator::new(transport, sink, completer)
            .options(options)
            .extractor(extractor);
        tokio::spawn(main_loop(coordinator, rx_command, rx_completion));
        Self { tx_command }
    }

    /// Never waits. A query sent after the task stopped is dropped.
    pub fn query(&self, query: Q) {
        self.tx_command.send(Command::Query(query)).ok();
    }

    pub fn is_closed(&self) -> bool {
        self.tx_command.is_closed()
    }
}

async fn main_loop<T, S>(
    mut coordinator: RequestCoordinator<T, S>,
    mut rx_command: mpsc::UnboundedReceiver<Command<T::Query>>,
    mut rx_completion: mpsc::UnboundedReceiver<Completion<T::Payload>>,
) where
    T: Transport,
    S: ResponseSink<T::Payload>,
{
    loop {
        tokio::select! {
            command = rx_command.recv() => match command {
                Some(Command::Query(query)) => coordinator.on_query(query),
                None => {
                    coordinator.shutdown();
                    return;
                }
            },
            Some(completion) = rx_completion.recv() => coordinator.on_complete(completion),
        }
    }
}
