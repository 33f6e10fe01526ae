use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::repository::Repository;

/// Role
///
/// Resolved RBAC role of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    /// Maps the `profiles.role` column onto a role. Unknown values resolve to no role,
    /// which every guard treats as "not admin".
    pub fn from_profile(role: &str) -> Option<Self> {
        match role {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// The identity part of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// AuthSession
///
/// Snapshot of the externally owned auth state. While `loading` is true, `user` and
/// `role` are not final and no guard may redirect based on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: Option<SessionUser>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl AuthSession {
    /// Initial state: identity resolution has not finished yet.
    pub fn loading() -> Self {
        Self {
            user: None,
            role: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            role: None,
            loading: false,
        }
    }

    pub fn signed_in(user: SessionUser, role: Option<Role>) -> Self {
        Self {
            user: Some(user),
            role,
            loading: false,
        }
    }

    pub fn has_user(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::loading()
    }
}

/// AuthProvider
///
/// Single writer of the auth session. Guards and the guard runtime only ever hold
/// receivers obtained from [`AuthProvider::subscribe`].
pub struct AuthProvider {
    tx: watch::Sender<AuthSession>,
}

impl AuthProvider {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthSession::loading());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> AuthSession {
        self.tx.borrow().clone()
    }

    /// An auth event arrived; the current identity is no longer final.
    pub fn begin_resolution(&self) {
        self.tx.send_modify(|session| session.loading = true);
    }

    pub fn resolve(&self, user: SessionUser, role: Option<Role>) {
        self.tx.send_replace(AuthSession::signed_in(user, role));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(AuthSession::signed_out());
    }

    /// resolve_from_profiles
    ///
    /// Looks the user's role up in `profiles` and publishes the resolved session.
    /// A missing profile still yields a signed-in session, just without a role.
    pub async fn resolve_from_profiles(&self, repo: &dyn Repository, user_id: Uuid) {
        self.begin_resolution();

        let (email, role) = match repo.get_user(user_id).await {
            Some(profile) => (Some(profile.email), Role::from_profile(&profile.role)),
            None => {
                tracing::warn!(%user_id, "no profile found while resolving role");
                (None, None)
            }
        };

        tracing::debug!(%user_id, role = ?role, "auth session resolved");
        self.resolve(SessionUser { id: user_id, email }, role);
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::new()
    }
}
