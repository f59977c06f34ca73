//! Entrypoint resolution
//!
//! The client does not know its server URL up front. `connect` takes an
//! [`EntrypointProvider`] and resolves it once per connection attempt, so a
//! provider backed by a discovery call sees every reconnect.
//!
//! Any `Fn() -> impl Future<Output = Result<String>>` is a provider:
//!
//! ```rust,no_run
//! use jsonlink_client::JsonRpcClient;
//! use jsonlink_core::Error;
//!
//! # async fn demo(client: JsonRpcClient) -> jsonlink_core::Result<()> {
//! client
//!     .connect(|| async { Ok::<_, Error>("ws://127.0.0.1:8080/api".to_string()) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use jsonlink_core::Result;
use std::future::Future;

/// Asynchronously produces the URL to connect to
#[async_trait]
pub trait EntrypointProvider: Send + Sync {
    /// Resolve the entrypoint URL
    async fn entrypoint(&self) -> Result<String>;
}

#[async_trait]
impl<F, Fut> EntrypointProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    async fn entrypoint(&self) -> Result<String> {
        (self)().await
    }
}

/// A provider that always yields the same URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntrypoint(String);

impl StaticEntrypoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl EntrypointProvider for StaticEntrypoint {
    async fn entrypoint(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
