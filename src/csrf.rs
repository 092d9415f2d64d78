use reqwest::{Client, Method};
use url::Url;

use crate::api::{ApiClient, send};
use crate::constants::CSRF_COOKIE_PATH;
use crate::error::ApiResult;
use crate::utils::endpoint;

/// Fetches the session-scoped anti-forgery cookie.
///
/// Uses the bare client (same cookie jar, no header injection). Callers run
/// it before every mutating request instead of tracking token expiry.
#[derive(Clone, Debug)]
pub struct CsrfService {
    http: Client,
    url: Url,
}

impl CsrfService {
    pub fn new(api: &ApiClient) -> ApiResult<Self> {
        Ok(Self {
            http: api.http().clone(),
            url: endpoint(api.base_url(), CSRF_COOKIE_PATH)?,
        })
    }

    pub async fn obtain_token(&self) -> ApiResult<()> {
        tracing::debug!(url = %self.url, "requesting csrf cookie");
        send(self.http.request(Method::GET, self.url.clone())).await?;
        Ok(())
    }
}
