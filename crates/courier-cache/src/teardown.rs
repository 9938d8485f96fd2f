//! Teardown capability for cached resources.

use courier_core::Result;

/// A resource that holds something which must be released explicitly.
///
/// [`ResourceCache`] invokes [`Teardown::teardown`] exactly once per cached
/// instance: on natural eviction, on explicit removal, or on full teardown,
/// whichever happens first.
///
/// [`ResourceCache`]: crate::ResourceCache
///
/// # Example
///
/// ```ignore
/// #[async_trait::async_trait]
/// impl Teardown for QueueConnection {
///     async fn teardown(&self) -> Result<()> {
///         self.link.close().await.map_err(|e| Error::teardown().with_source(e))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Teardown: Send + Sync + 'static {
    /// Releases everything held by this resource.
    ///
    /// Completes when the resource is fully released.
    async fn teardown(&self) -> Result<()>;
}
