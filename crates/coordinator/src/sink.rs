use tokio::sync::mpsc;

/// Receives the payloads the coordinator decides to forward.
pub trait ResponseSink<P>: Send + 'static {
    fn send(&mut self, payload: P);
}

impl<P: Send + 'static> ResponseSink<P> for mpsc::UnboundedSender<P> {
    fn send(&mut self, payload: P) {
        mpsc::UnboundedSender::send(self, payload).ok();
    }
}
