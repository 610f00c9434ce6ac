use std::sync::{Arc, PoisonError, RwLock};

/// Process-scoped model credential.
///
/// Seeded from `ANTHROPIC_API_KEY` at startup and replaced by `POST /configure`.
/// Every clone shares the same slot, so a key set through the API is visible to
/// the LLM client on its next call.
#[derive(Clone, Default)]
pub struct ApiKeyHandle {
    inner: Arc<RwLock<Option<String>>>,
}

impl ApiKeyHandle {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set(&self, key: String) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_configured(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for ApiKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyHandle")
            .field("configured", &self.is_configured())
            .finish()
    }
}
