//! Transport collaborator seam.

/// A transport error that can tell "object does not exist" apart from every
/// other failure without looking at its message.
pub trait RemoteError: std::error::Error + Send + Sync + 'static {
    fn is_not_found(&self) -> bool;
}

/// Uniform create/get/update/delete access to one remote collection.
///
/// Implementations own serialization, connection reuse, the API key header
/// and the request timeout.
pub trait RemoteStore<R> {
    type Error: RemoteError;

    fn create(&self, object: &R) -> Result<R, Self::Error>;

    /// Fails with an error whose `is_not_found()` is true for unknown ids.
    fn get(&self, id: &str) -> Result<R, Self::Error>;

    fn update(&self, id: &str, object: &R) -> Result<R, Self::Error>;

    fn delete(&self, id: &str) -> Result<(), Self::Error>;
}
