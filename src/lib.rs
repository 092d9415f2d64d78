pub mod api;
pub mod auth;
pub mod categories;
pub mod config;
pub mod constants;
pub mod cookies;
pub mod csrf;
pub mod deposits;
pub mod error;
pub mod expenses;
mod loading;
pub mod models;
pub mod resources;
pub mod router;
pub mod session;
pub mod statistics;
pub mod store;
pub mod utils;

use std::sync::Arc;

use reqwest::cookie::Jar;

// Re-export types at crate root for convenient importing
pub use crate::api::ApiClient;
pub use crate::config::Config;
pub use crate::error::{ApiError, ApiResult};
pub use crate::session::SessionStore;
pub use crate::store::ResourceStore;
pub use crate::utils::ResourceKey;

use crate::auth::AuthService;
use crate::categories::CategoryStore;
use crate::csrf::CsrfService;
use crate::deposits::DepositStore;
use crate::expenses::ExpenseStore;
use crate::resources::ResourceService;
use crate::router::NavigationGuard;
use crate::statistics::StatisticsService;

/// Application root. Owns the single API client and every store built on it.
#[derive(Clone, Debug)]
pub struct App {
    pub api: ApiClient,
    pub csrf: CsrfService,
    pub session: SessionStore,
    pub categories: CategoryStore,
    pub deposits: DepositStore,
    pub expenses: ExpenseStore,
    pub statistics: StatisticsService,
    pub guard: NavigationGuard,
}

impl App {
    pub fn new(config: &Config) -> ApiResult<Self> {
        Self::with_jar(config, Arc::new(Jar::default()))
    }

    /// Builds the app on an existing cookie jar, e.g. one restored from disk.
    pub fn with_jar(config: &Config, jar: Arc<Jar>) -> ApiResult<Self> {
        let api = ApiClient::with_jar(config, jar)?;
        let csrf = CsrfService::new(&api)?;
        let session = SessionStore::new(AuthService::new(api.clone()), csrf.clone());

        Ok(Self {
            categories: CategoryStore::new(ResourceService::new(api.clone()), csrf.clone()),
            deposits: DepositStore::new(ResourceService::new(api.clone()), csrf.clone()),
            expenses: ExpenseStore::new(ResourceService::new(api.clone()), csrf.clone()),
            statistics: StatisticsService::new(api.clone()),
            guard: NavigationGuard::new(session.clone()),
            session,
            csrf,
            api,
        })
    }

    /// Startup handshake. A failure is logged and ignored so it never blocks
    /// the application from starting.
    pub async fn bootstrap(config: &Config, jar: Arc<Jar>) -> ApiResult<Self> {
        let app = Self::with_jar(config, jar)?;
        if let Err(e) = app.csrf.obtain_token().await {
            tracing::warn!(error = %e, "failed to fetch csrf token during startup");
        }
        Ok(app)
    }

    /// Ends the session and drops cached collections when the server agrees.
    pub async fn logout(&self) -> bool {
        let ok = self.session.logout().await;
        if ok {
            self.categories.reset().await;
            self.deposits.reset().await;
            self.expenses.reset().await;
        }
        ok
    }
}
