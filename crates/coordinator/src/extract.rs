/// Turns a successful transport payload into the value handed to the sink.
///
/// Returning `None` drops the payload, the same as a failed request.
pub type Extractor<P> = Box<dyn Fn(P) -> Option<P> + Send + Sync>;

/// Forwards payloads unchanged.
pub fn identity<P: 'static>() -> Extractor<P> {
    Box::new(Some)
}
