use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::api::{ApiClient, read_json};
use crate::error::{ApiError, ApiResult};
use crate::utils::ResourceKey;

/// A collection-typed entity exposed by the API under `PATH`.
///
/// Responses wrap payloads in an envelope keyed by `PLURAL` for lists and
/// `SINGULAR` for single items, e.g. `{"categories": [...]}` and
/// `{"category": {...}}`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Body sent on create and update.
    type Draft: Serialize + Debug + Send + Sync;

    const PATH: &'static str;
    const SINGULAR: &'static str;
    const PLURAL: &'static str;

    fn id(&self) -> i64;
}

/// Pulls `key` out of a response envelope and decodes it.
pub fn unwrap_envelope<T: DeserializeOwned>(mut body: Value, key: &str) -> ApiResult<T> {
    let inner = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ApiError::Decode(format!("missing '{}' in response", key)))?;
    serde_json::from_value(inner).map_err(|e| ApiError::Decode(e.to_string()))
}

/// CRUD request builders for one resource type.
#[derive(Clone, Debug)]
pub struct ResourceService<T: Resource> {
    api: ApiClient,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceService<T> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            _marker: PhantomData,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn item_path(key: &ResourceKey) -> String {
        format!("{}/{}", T::PATH, key.path_segment())
    }

    /// Lists from `path`, which may differ from `T::PATH` for filtered views.
    pub async fn list_at(&self, path: &str) -> ApiResult<Vec<T>> {
        let body: Value = read_json(self.api.get(path).await?).await?;
        unwrap_envelope(body, T::PLURAL)
    }

    pub async fn list(&self) -> ApiResult<Vec<T>> {
        self.list_at(T::PATH).await
    }

    pub async fn list_with_query<Q>(&self, query: &Q) -> ApiResult<Vec<T>>
    where
        Q: Serialize + ?Sized,
    {
        let body: Value = read_json(self.api.get_with_query(T::PATH, query).await?).await?;
        unwrap_envelope(body, T::PLURAL)
    }

    pub async fn get(&self, key: &ResourceKey) -> ApiResult<T> {
        let body: Value = read_json(self.api.get(&Self::item_path(key)).await?).await?;
        unwrap_envelope(body, T::SINGULAR)
    }

    pub async fn create(&self, draft: &T::Draft) -> ApiResult<T> {
        let body: Value = read_json(self.api.post(T::PATH, draft).await?).await?;
        unwrap_envelope(body, T::SINGULAR)
    }

    pub async fn update(&self, key: &ResourceKey, draft: &T::Draft) -> ApiResult<T> {
        let body: Value = read_json(self.api.put(&Self::item_path(key), draft).await?).await?;
        unwrap_envelope(body, T::SINGULAR)
    }

    pub async fn delete(&self, key: &ResourceKey) -> ApiResult<()> {
        self.api.delete(&Self::item_path(key)).await?;
        Ok(())
    }
}
