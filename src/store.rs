use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::csrf::CsrfService;
use crate::error::{ApiError, ApiResult};
use crate::loading::{Loadable, LoadingGuard};
use crate::resources::{Resource, ResourceService};
use crate::utils::ResourceKey;

/// Client-side view of one resource collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<T> {
    /// In API response order. Ids are assumed unique.
    pub items: Vec<T>,
    /// Last item fetched on its own; not necessarily a member of `items`.
    pub current: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            loading: false,
            error: None,
        }
    }
}

impl<T: Send + Sync + 'static> Loadable for CollectionState<T> {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

impl<T: Resource> CollectionState<T> {
    pub fn find(&self, key: &ResourceKey) -> Option<&T> {
        self.items.iter().find(|item| key.matches(item.id()))
    }
}

/// Cache of one collection kept in sync with the API.
///
/// Writes run the CSRF handshake first. Reads swallow failures after
/// recording them; writes record and return them. `loading` is cleared on
/// every exit path, including a dropped action future. Concurrent calls are
/// not queued: whichever response lands last decides the final state.
#[derive(Clone, Debug)]
pub struct ResourceStore<T: Resource> {
    service: ResourceService<T>,
    csrf: CsrfService,
    state: Arc<RwLock<CollectionState<T>>>,
}

impl<T: Resource> ResourceStore<T> {
    pub fn new(service: ResourceService<T>, csrf: CsrfService) -> Self {
        Self {
            service,
            csrf,
            state: Arc::new(RwLock::new(CollectionState::default())),
        }
    }

    pub fn service(&self) -> &ResourceService<T> {
        &self.service
    }

    pub async fn snapshot(&self) -> CollectionState<T> {
        self.state.read().await.clone()
    }

    pub async fn items(&self) -> Vec<T> {
        self.state.read().await.items.clone()
    }

    pub async fn current(&self) -> Option<T> {
        self.state.read().await.current.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn find_by_id(&self, key: impl Into<ResourceKey>) -> Option<T> {
        let key = key.into();
        self.state.read().await.find(&key).cloned()
    }

    /// Drops all cached data, e.g. after the session ends.
    pub async fn reset(&self) {
        *self.state.write().await = CollectionState::default();
    }

    async fn with_handshake<Fut, R>(&self, request: Fut) -> ApiResult<R>
    where
        Fut: Future<Output = ApiResult<R>>,
    {
        self.csrf.obtain_token().await?;
        request.await
    }

    async fn begin(&self) -> LoadingGuard<CollectionState<T>> {
        LoadingGuard::begin(&self.state).await
    }

    /// Replaces `items` with the outcome of `request`; failures are recorded
    /// and swallowed.
    pub(crate) async fn load_items<F>(&self, request: F, fallback: String)
    where
        F: Future<Output = ApiResult<Vec<T>>>,
    {
        let _loading = self.begin().await;
        let result = request.await;

        let mut state = self.state.write().await;
        match result {
            Ok(items) => state.items = items,
            Err(e) => record_failure(&mut state, &e, &fallback),
        }
    }

    pub async fn fetch_all(&self) {
        let fallback = format!("Failed to fetch {}", T::PLURAL);
        self.load_items(self.service.list(), fallback).await;
    }

    pub async fn fetch_one(&self, key: impl Into<ResourceKey>) {
        let key = key.into();
        let _loading = self.begin().await;
        let result = self.service.get(&key).await;

        let mut state = self.state.write().await;
        match result {
            Ok(item) => state.current = Some(item),
            Err(e) => record_failure(
                &mut state,
                &e,
                &format!("Failed to fetch {} with ID {}", T::SINGULAR, key),
            ),
        }
    }

    pub async fn create(&self, draft: &T::Draft) -> ApiResult<T> {
        let _loading = self.begin().await;
        let result = self.with_handshake(self.service.create(draft)).await;

        let mut state = self.state.write().await;
        match &result {
            Ok(item) => state.items.push(item.clone()),
            Err(e) => record_failure(&mut state, e, &format!("Failed to create {}", T::SINGULAR)),
        }
        result
    }

    pub async fn update(&self, key: impl Into<ResourceKey>, draft: &T::Draft) -> ApiResult<T> {
        let key = key.into();
        let _loading = self.begin().await;
        let result = self.with_handshake(self.service.update(&key, draft)).await;

        let mut state = self.state.write().await;
        match &result {
            Ok(item) => {
                let index = state.items.iter().position(|i| key.matches(i.id()));
                match index {
                    Some(index) => state.items[index] = item.clone(),
                    None => tracing::debug!(id = %key, "updated {} is not cached", T::SINGULAR),
                }
            }
            Err(e) => record_failure(
                &mut state,
                e,
                &format!("Failed to update {} with ID {}", T::SINGULAR, key),
            ),
        }
        result
    }

    pub async fn delete(&self, key: impl Into<ResourceKey>) -> ApiResult<()> {
        let key = key.into();
        let _loading = self.begin().await;
        let result = self.with_handshake(self.service.delete(&key)).await;

        let mut state = self.state.write().await;
        match &result {
            Ok(()) => state.items.retain(|item| !key.matches(item.id())),
            Err(e) => record_failure(
                &mut state,
                e,
                &format!("Failed to delete {} with ID {}", T::SINGULAR, key),
            ),
        }
        result
    }

    pub(crate) async fn read<R>(&self, f: impl FnOnce(&CollectionState<T>) -> R) -> R {
        f(&*self.state.read().await)
    }
}

fn record_failure<T>(state: &mut CollectionState<T>, error: &ApiError, fallback: &str) {
    let message = error.user_message(fallback);
    tracing::error!(error = %error, "{}", message);
    state.error = Some(message);
}
