use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::{AuthSnapshot, AuthState};
use crate::home::HomeSuggestions;
use crate::saved::SavedRecipesStore;

/// Spawn the loop that clears user data whenever the session ends.
///
/// The loop exits when the auth state sender is dropped.
pub fn spawn_session_watcher(
    mut auth: watch::Receiver<AuthSnapshot>,
    saved: Arc<SavedRecipesStore>,
    home: Arc<HomeSuggestions>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = auth.borrow_and_update().state;
        while auth.changed().await.is_ok() {
            let state = auth.borrow_and_update().state;
            if state == last {
                continue;
            }
            debug!(from = ?last, to = ?state, "Auth state changed");
            if state == AuthState::SignedOut {
                info!("Session ended, clearing user data");
                saved.reset();
                home.reset();
            }
            last = state;
        }
        debug!("Session watcher stopped");
    })
}
