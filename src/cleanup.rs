//! Background sweep for expired admin sessions.
//!
//! `AuthGate::authorize` already rejects and destroys an expired session
//! when it is presented. Sessions that are simply abandoned would otherwise
//! sit in the memory store until restart, so this job periodically purges
//! them. The Redis store expires keys itself and reports nothing to purge.

use crate::models::{unix_now, SessionPolicy};
use crate::storage::{SessionStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Purges expired sessions every `interval`. Never returns.
pub async fn run_session_sweep(
    sessions: Arc<dyn SessionStore>,
    policy: SessionPolicy,
    interval: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;

        if let Err(e) = sweep_expired_sessions(sessions.as_ref(), &policy).await {
            tracing::error!(error = %e, "Session sweep failed");
        }
    }
}

/// Purge expired sessions once, returning how many were removed.
pub async fn sweep_expired_sessions(
    sessions: &dyn SessionStore,
    policy: &SessionPolicy,
) -> Result<usize, StoreError> {
    let purged = sessions.purge_expired(policy, unix_now()).await?;

    if purged > 0 {
        tracing::info!(action = "session_sweep", purged = purged, "Expired sessions purged");
    }

    Ok(purged)
}
