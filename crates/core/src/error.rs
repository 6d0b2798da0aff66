/// Errors produced by pure core logic.
///
/// I/O failures (storage, network) live in the engine and db crates; this
/// enum covers only what can go wrong before any collaborator is touched.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed source record: {0}")]
    MalformedRecord(String),
}
