//! Admin authentication and session authorization.
//!
//! `AuthGate` checks logins against the credential store, issues and
//! destroys sessions, and answers the authorization question asked before
//! every mutating admin endpoint runs.

use super::password::{hash_password, verify_password};
use crate::models::{unix_now, SessionPolicy};
use crate::storage::{AdminStore, SessionStore, StoreError};
use std::sync::{Arc, LazyLock};
use zeroize::Zeroizing;

/// Argon2id hash (default params) verified against when the username is
/// unknown, so both failure paths pay the same hashing cost.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("eventreg-dummy-password").ok());

/// Authentication failures.
///
/// `InvalidCredentials` covers both an unknown username and a wrong
/// password; callers cannot tell which check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    InvalidInput,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized { admin_id: String },
    Unauthorized,
}

/// The admin auth gate.
pub struct AuthGate {
    admins: Arc<dyn AdminStore>,
    sessions: Arc<dyn SessionStore>,
    policy: SessionPolicy,
}

impl AuthGate {
    pub fn new(
        admins: Arc<dyn AdminStore>,
        sessions: Arc<dyn SessionStore>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            admins,
            sessions,
            policy,
        }
    }

    /// Check a username/password pair and open a session.
    ///
    /// Returns the new session token on success. No session is created on
    /// any failure path.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let admin = self.admins.find_admin_by_username(username).await?;

        let hash = match &admin {
            Some(admin) => Zeroizing::new(admin.password_hash.clone()),
            None => Zeroizing::new(DUMMY_HASH.clone().unwrap_or_default()),
        };

        // Argon2/bcrypt are deliberately slow; keep them off the async workers.
        let password = Zeroizing::new(password.to_string());
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?;

        let Some(admin) = admin.filter(|_| verified) else {
            tracing::warn!(action = "login_failed", username = %username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let token = self.sessions.create(&admin.admin_id).await?;

        tracing::info!(action = "login_success", username = %username, admin_id = %admin.admin_id, "Admin authenticated");

        Ok(token)
    }

    /// Decide whether a presented session credential is valid.
    ///
    /// An absent credential is simply unauthorized. Expired sessions are
    /// destroyed on sight; live ones have their idle clock reset.
    pub async fn authorize(&self, credential: Option<&str>) -> Result<AuthDecision, AuthError> {
        let Some(token) = credential.filter(|t| !t.is_empty()) else {
            return Ok(AuthDecision::Unauthorized);
        };

        let Some(session) = self.sessions.lookup(token).await? else {
            return Ok(AuthDecision::Unauthorized);
        };

        let now = unix_now();
        if session.is_expired(&self.policy, now) {
            self.sessions.destroy(token).await?;
            tracing::info!(action = "session_expired", admin_id = %session.admin_id, "Session expired");
            return Ok(AuthDecision::Unauthorized);
        }

        self.sessions.touch(token, now).await?;

        Ok(AuthDecision::Authorized {
            admin_id: session.admin_id,
        })
    }

    /// Like [`authorize`](Self::authorize) but denial is an error, for use
    /// as a guard in front of mutations.
    pub async fn require_authorized(&self, credential: Option<&str>) -> Result<String, AuthError> {
        match self.authorize(credential).await? {
            AuthDecision::Authorized { admin_id } => Ok(admin_id),
            AuthDecision::Unauthorized => Err(AuthError::Unauthorized),
        }
    }

    /// Destroy the session behind `credential`, if any.
    pub async fn logout(&self, credential: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = credential.filter(|t| !t.is_empty()) {
            self.sessions.destroy(token).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::models::{AdminAccount, Session};
    use crate::storage::memory::{MemorySessionStore, MemoryStore};
    use async_trait::async_trait;

    const POLICY: SessionPolicy = SessionPolicy {
        absolute_ttl_secs: 3600,
        idle_ttl_secs: 600,
    };

    async fn gate_with_admin(policy: SessionPolicy) -> (AuthGate, Arc<MemorySessionStore>) {
        let admins = Arc::new(MemoryStore::new());
        let hash = hash_password("correct horse").unwrap();
        admins.upsert_admin("admin", &hash).await.unwrap();
        let sessions = Arc::new(MemorySessionStore::new());
        let gate = AuthGate::new(admins, sessions.clone(), policy);
        (gate, sessions)
    }

    #[tokio::test]
    async fn test_authenticate_success_creates_session() {
        let (gate, sessions) = gate_with_admin(POLICY).await;
        let token = gate.authenticate("admin", "correct horse").await.unwrap();

        let session = sessions.lookup(&token).await.unwrap().unwrap();
        let admin_id = session.admin_id.clone();
        assert_eq!(
            gate.authorize(Some(&token)).await.unwrap(),
            AuthDecision::Authorized { admin_id }
        );
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
        let (gate, sessions) = gate_with_admin(POLICY).await;

        let unknown = gate.authenticate("nobody", "correct horse").await.unwrap_err();
        let wrong = gate.authenticate("admin", "battery staple").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_pays_hashing_cost() {
        let (gate, _) = gate_with_admin(POLICY).await;

        // Warm up the dummy hash so its one-time computation is not timed.
        let _ = gate.authenticate("nobody", "x").await;

        let mut unknown = std::time::Duration::ZERO;
        let mut wrong = std::time::Duration::ZERO;
        for _ in 0..3 {
            let start = std::time::Instant::now();
            assert!(gate.authenticate("nobody", "x").await.is_err());
            unknown += start.elapsed();

            let start = std::time::Instant::now();
            assert!(gate.authenticate("admin", "x").await.is_err());
            wrong += start.elapsed();
        }

        assert!(
            wrong < unknown * 10,
            "unknown user {:?} vs wrong password {:?}",
            unknown,
            wrong
        );
        assert!(
            unknown < wrong * 10,
            "unknown user {:?} vs wrong password {:?}",
            unknown,
            wrong
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_not_a_credential_mismatch() {
        let (gate, _) = gate_with_admin(POLICY).await;
        assert!(matches!(
            gate.authenticate("", "x").await,
            Err(AuthError::InvalidInput)
        ));
        assert!(matches!(
            gate.authenticate("admin", "").await,
            Err(AuthError::InvalidInput)
        ));
    }

    #[tokio::test]
    async fn test_no_lockout_after_failures() {
        let (gate, sessions) = gate_with_admin(POLICY).await;
        for _ in 0..3 {
            assert!(matches!(
                gate.authenticate("admin", "wrong").await,
                Err(AuthError::InvalidCredentials)
            ));
        }
        assert!(sessions.is_empty());
        assert!(gate.authenticate("admin", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn test_never_issued_token_unauthorized() {
        let (gate, _) = gate_with_admin(POLICY).await;
        assert_eq!(
            gate.authorize(Some("never-issued")).await.unwrap(),
            AuthDecision::Unauthorized
        );
        assert_eq!(gate.authorize(None).await.unwrap(), AuthDecision::Unauthorized);
        assert_eq!(gate.authorize(Some("")).await.unwrap(), AuthDecision::Unauthorized);
        assert!(matches!(
            gate.require_authorized(None).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_is_idempotent() {
        let (gate, _) = gate_with_admin(POLICY).await;
        let token = gate.authenticate("admin", "correct horse").await.unwrap();

        gate.logout(Some(&token)).await.unwrap();
        gate.logout(Some(&token)).await.unwrap();
        gate.logout(None).await.unwrap();

        assert_eq!(
            gate.authorize(Some(&token)).await.unwrap(),
            AuthDecision::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_expired_session_is_destroyed() {
        let zero = SessionPolicy {
            absolute_ttl_secs: 0,
            idle_ttl_secs: 0,
        };
        let (gate, sessions) = gate_with_admin(zero).await;
        let token = gate.authenticate("admin", "correct horse").await.unwrap();

        assert_eq!(
            gate.authorize(Some(&token)).await.unwrap(),
            AuthDecision::Unauthorized
        );
        assert!(sessions.lookup(&token).await.unwrap().is_none());
    }

    struct FailingStore;

    #[async_trait]
    impl AdminStore for FailingStore {
        async fn find_admin_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<AdminAccount>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn upsert_admin(
            &self,
            _username: &str,
            _password_hash: &str,
        ) -> Result<AdminAccount, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn create(&self, _admin_id: &str) -> Result<String, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn lookup(&self, _token: &str) -> Result<Option<Session>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn touch(&self, _token: &str, _now: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn destroy(&self, _token: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn purge_expired(
            &self,
            _policy: &SessionPolicy,
            _now: u64,
        ) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_not_credential_failures() {
        let store = Arc::new(FailingStore);
        let gate = AuthGate::new(store.clone(), store, POLICY);

        assert!(matches!(
            gate.authenticate("admin", "pw").await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            gate.authorize(Some("token")).await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            gate.logout(Some("token")).await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
