use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, cookie::Jar};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::config::Config;
use crate::constants::*;
use crate::cookies::xsrf_token;
use crate::error::{ApiError, ApiResult};
use crate::utils::endpoint;

/// Builds the underlying HTTP client: JSON headers and a cookie jar shared
/// with every other client built on the same jar.
pub fn build_http_client(jar: Arc<Jar>, user_agent: &str) -> ApiResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .cookie_provider(jar)
        .user_agent(user_agent)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// The single transport to the remote API.
///
/// Every request carries the session cookies from the jar and, when the
/// server has issued one, the `X-XSRF-TOKEN` header. Non-2xx responses become
/// [`ApiError::Status`]. There is no retry and no timeout.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        Self::with_jar(config, Arc::new(Jar::default()))
    }

    pub fn with_jar(config: &Config, jar: Arc<Jar>) -> ApiResult<Self> {
        let http = build_http_client(jar.clone(), &config.user_agent)?;
        Ok(Self {
            http,
            jar,
            base_url: config.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// The raw client, without anti-forgery header injection.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> ApiResult<Url> {
        Ok(endpoint(&self.base_url, path)?)
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "api request");

        let mut builder = self.http.request(method, url);
        if let Some(token) = xsrf_token(&self.jar, &self.base_url, XSRF_COOKIE_NAME) {
            builder = builder.header(XSRF_HEADER_NAME, token);
        }
        Ok(builder)
    }

    pub async fn get(&self, path: &str) -> ApiResult<Response> {
        send(self.request(Method::GET, path)?).await
    }

    pub async fn get_with_query<Q>(&self, path: &str, query: &Q) -> ApiResult<Response>
    where
        Q: Serialize + ?Sized,
    {
        send(self.request(Method::GET, path)?.query(query)).await
    }

    pub async fn post<B>(&self, path: &str, body: &B) -> ApiResult<Response>
    where
        B: Serialize + ?Sized,
    {
        send(self.request(Method::POST, path)?.json(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> ApiResult<Response> {
        send(self.request(Method::POST, path)?).await
    }

    pub async fn put<B>(&self, path: &str, body: &B) -> ApiResult<Response>
    where
        B: Serialize + ?Sized,
    {
        send(self.request(Method::PUT, path)?.json(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Response> {
        send(self.request(Method::DELETE, path)?).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        read_json(self.get(path).await?).await
    }
}

/// Sends a prepared request, turning non-2xx statuses into errors.
pub async fn send(builder: RequestBuilder) -> ApiResult<Response> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
