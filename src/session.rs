use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use url::Url;

use crate::auth::AuthService;
use crate::constants::*;
use crate::csrf::CsrfService;
use crate::error::{ApiError, ApiResult};
use crate::loading::{Loadable, LoadingGuard};
use crate::models::{Credentials, PasswordUpdate, ProfileUpdate, Registration, User};

/// Authenticated-user state.
///
/// `error` is advisory: it may be set while `user` is still present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Loadable for SessionState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the current user and the login/register/logout/profile lifecycle.
///
/// Every mutating action performs the CSRF handshake first. Actions never
/// return errors; failures are recorded in `error` and reported through the
/// return value (`None` / `false`). `loading` is reset when an action ends,
/// including when its future is dropped early.
#[derive(Clone, Debug)]
pub struct SessionStore {
    auth: AuthService,
    csrf: CsrfService,
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new(auth: AuthService, csrf: CsrfService) -> Self {
        Self {
            auth,
            csrf,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Display name, empty when anonymous.
    pub async fn user_full_name(&self) -> String {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    pub async fn user_avatar(&self) -> Option<String> {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .and_then(|u| u.avatar.clone())
    }

    pub fn google_auth_url(&self) -> ApiResult<Url> {
        self.auth.google_auth_url()
    }

    async fn begin(&self) -> LoadingGuard<SessionState> {
        LoadingGuard::begin(&self.state).await
    }

    async fn fail(&self, error: &ApiError, fallback: &str) {
        let message = error.user_message(fallback);
        tracing::error!(error = %error, "{}", message);
        self.state.write().await.error = Some(message);
    }

    /// Handshake, then `request`. A handshake failure aborts the request.
    async fn with_handshake<F, Fut, T>(&self, request: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.csrf.obtain_token().await?;
        request().await
    }

    async fn load_user(&self) -> Option<User> {
        match self.auth.get_user().await {
            Ok(user) => {
                self.state.write().await.user = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                self.fail(&e, ERR_FETCH_USER).await;
                self.state.write().await.user = None;
                None
            }
        }
    }

    /// Loads the current user. On failure the user is cleared.
    pub async fn fetch_user(&self) -> Option<User> {
        let _loading = self.begin().await;
        self.load_user().await
    }

    /// Returns the freshly loaded user, or `None` on any failure. A failed
    /// handshake or login call leaves the previous `user` untouched.
    pub async fn login(&self, credentials: &Credentials) -> Option<User> {
        let _loading = self.begin().await;
        let result = self.with_handshake(|| self.auth.login(credentials)).await;

        match result {
            Ok(()) => self.load_user().await,
            Err(e) => {
                self.fail(&e, ERR_LOGIN).await;
                None
            }
        }
    }

    pub async fn register(&self, registration: &Registration) -> Option<User> {
        let _loading = self.begin().await;
        let result = self
            .with_handshake(|| self.auth.register(registration))
            .await;

        match result {
            Ok(()) => self.load_user().await,
            Err(e) => {
                self.fail(&e, ERR_REGISTER).await;
                None
            }
        }
    }

    pub async fn logout(&self) -> bool {
        let _loading = self.begin().await;
        match self.with_handshake(|| self.auth.logout()).await {
            Ok(()) => {
                self.state.write().await.user = None;
                true
            }
            Err(e) => {
                self.fail(&e, ERR_LOGOUT).await;
                false
            }
        }
    }

    /// Replaces `user` with the server's copy on success.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Option<User> {
        let _loading = self.begin().await;
        let result = self
            .with_handshake(|| self.auth.update_profile(update))
            .await;

        match result {
            Ok(user) => {
                self.state.write().await.user = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                self.fail(&e, ERR_UPDATE_PROFILE).await;
                None
            }
        }
    }

    pub async fn update_password(&self, update: &PasswordUpdate) -> bool {
        let _loading = self.begin().await;
        let result = self
            .with_handshake(|| self.auth.update_password(update))
            .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                self.fail(&e, ERR_UPDATE_PASSWORD).await;
                false
            }
        }
    }
}
