use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::{decode_bearer_with_config, AuthContext, AuthProvider};
use crate::config;
use crate::database::{DatabaseError, RowStore};
use crate::error::StatsError;

/// Capability bundle for one authenticated request.
///
/// Built by the host per request and passed down explicitly: the caller's
/// identity, the store handle the request may read through, and a token the
/// host cancels when the client goes away.
#[derive(Clone)]
pub struct RequestContext {
    auth: AuthContext,
    store: Arc<dyn RowStore>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(auth: AuthContext, store: Arc<dyn RowStore>) -> Self {
        Self {
            auth,
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_provider(provider: &dyn AuthProvider, store: Arc<dyn RowStore>) -> Result<Self, StatsError> {
        Ok(Self::new(AuthContext::from_provider(provider)?, store))
    }

    /// Context for the caller named by an `Authorization: Bearer` header,
    /// verified with the configured signing secret
    pub fn from_bearer(header: Option<&str>, store: Arc<dyn RowStore>) -> Result<Self, StatsError> {
        let claims = decode_bearer_with_config(header, &config::config().security)?;
        Self::from_provider(&claims, store)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn store(&self) -> &dyn RowStore {
        self.store.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn ensure_active(&self) -> Result<(), StatsError> {
        if self.cancel.is_cancelled() {
            return Err(StatsError::Cancelled);
        }
        Ok(())
    }

    /// Run a store call, abandoning it as soon as the request is cancelled
    pub async fn guard<T, F>(&self, call: F) -> Result<T, StatsError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StatsError::Cancelled),
            result = call => result.map_err(StatsError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::error::ErrorKind;

    #[test]
    fn missing_bearer_is_unauthenticated() {
        let err = RequestContext::from_bearer(None, Arc::new(MemoryStore::new())).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[tokio::test]
    async fn guard_stops_on_cancellation() {
        let cancel = CancellationToken::new();
        let ctx = RequestContext::new(
            AuthContext::new(uuid::Uuid::new_v4(), crate::auth::Role::Teacher),
            Arc::new(MemoryStore::new()),
        )
        .with_cancellation(cancel.clone());
        assert_eq!(ctx.guard(async { Ok::<_, DatabaseError>(1) }).await.unwrap(), 1);

        cancel.cancel();
        assert!(matches!(ctx.ensure_active(), Err(StatsError::Cancelled)));
        let pending = std::future::pending::<Result<(), DatabaseError>>();
        assert!(matches!(ctx.guard(pending).await, Err(StatsError::Cancelled)));
    }
}
