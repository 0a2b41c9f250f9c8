/// Error kinds an adapter's public surface can produce. Transient and
/// rate-limited failures are handled internally by the retry loop (see
/// `retry.rs`) and never escape as these variants — only an exhausted
/// retry budget surfaces as `DataUnavailable`.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("source payload failed validation")]
    InvalidPayload,
    #[error("live fetch unavailable and no cached payload exists for this source")]
    DataUnavailable,
    #[error("http error: {0}")]
    Http(String),
}
