use async_trait::async_trait;

use crate::{BackendReply, Invocation, Result};

/// A remote model with a prompt-in/text-out contract.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the identifier of this backend.
    fn name(&self) -> &str;

    /// Checks whether this backend is currently able to accept requests.
    async fn is_available(&self) -> bool;

    /// Generates text for the invocation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unavailable`] when the backend cannot be reached,
    /// [`crate::Error::Timeout`] when it misses its deadline, and other
    /// variants when the reply cannot be interpreted.
    async fn invoke(&self, invocation: &Invocation) -> Result<BackendReply>;
}
