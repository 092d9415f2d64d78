use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::RwLock;

/// Store state with a `loading` flag and a last-error slot.
pub(crate) trait Loadable: Send + Sync + 'static {
    fn set_loading(&mut self, loading: bool);
    fn clear_error(&mut self);
}

/// Marks a store action as in flight. Dropping the guard clears `loading`,
/// so the flag is reset on success, failure and cancellation alike.
#[must_use = "loading is cleared as soon as the guard is dropped"]
pub(crate) struct LoadingGuard<S: Loadable> {
    state: Arc<RwLock<S>>,
}

impl<S: Loadable> LoadingGuard<S> {
    /// Sets `loading` and clears the previous error.
    pub(crate) async fn begin(state: &Arc<RwLock<S>>) -> Self {
        {
            let mut guard = state.write().await;
            guard.set_loading(true);
            guard.clear_error();
        }
        Self {
            state: state.clone(),
        }
    }
}

impl<S: Loadable> Drop for LoadingGuard<S> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_write() {
            state.set_loading(false);
            return;
        }

        // Another action holds the lock; reset once it is released.
        let state = self.state.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    state.write().await.set_loading(false);
                });
            }
            Err(_) => tracing::warn!("no runtime to clear loading flag"),
        }
    }
}
