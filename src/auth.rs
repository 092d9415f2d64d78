use url::Url;

use crate::api::{ApiClient, read_json};
use crate::constants::*;
use crate::error::ApiResult;
use crate::models::{Credentials, PasswordUpdate, ProfileUpdate, Registration, User, UserEnvelope};

/// Request builders for the authentication endpoints.
#[derive(Clone, Debug)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_user(&self) -> ApiResult<User> {
        self.api.get_json(USER_PATH).await
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<()> {
        self.api.post(LOGIN_PATH, credentials).await?;
        Ok(())
    }

    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        self.api.post(REGISTER_PATH, registration).await?;
        Ok(())
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.api.post_empty(LOGOUT_PATH).await?;
        Ok(())
    }

    /// Returns the updated user from the `{"user": ...}` envelope.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let response = self.api.put(USER_PROFILE_PATH, update).await?;
        let envelope: UserEnvelope = read_json(response).await?;
        Ok(envelope.user)
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> ApiResult<()> {
        self.api.put(USER_PASSWORD_PATH, update).await?;
        Ok(())
    }

    /// Where to send the user to start the Google OAuth flow.
    pub fn google_auth_url(&self) -> ApiResult<Url> {
        self.api.url(GOOGLE_AUTH_PATH)
    }
}
