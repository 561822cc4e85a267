//! Admin authentication: password verification, sessions and the request gate.

pub mod gate;
pub mod middleware;
pub mod password;
pub mod session;

pub use gate::{AuthDecision, AuthError, AuthGate};
pub use middleware::{AdminSession, AppState, SessionCredential};
pub use password::{hash_password, verify_password};
pub use session::generate_session_token;
