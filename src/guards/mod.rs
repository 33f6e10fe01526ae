//! Route guards.
//!
//! Every guard is a pure function of an [`AuthSession`] snapshot and the current
//! client path. The result is a [`GuardOutcome`]: what to render and, optionally,
//! where to navigate. Side effects live in [`runtime::GuardRuntime`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

pub mod guard;
pub mod routes;
pub mod runtime;
pub mod session;

pub use guard::{AdminGuard, AuthGuard, HomeAdminRedirector, should_redirect_home_to_admin};
pub use routes::{RouteAccess, RouteTable};
pub use runtime::{GuardRuntime, History, Navigator};
pub use session::{AuthProvider, AuthSession, Role, SessionUser};

pub const HOME_ROUTE: &str = "/";
pub const SIGN_IN_ROUTE: &str = "/auth";
pub const ADMIN_ROUTE: &str = "/admin";

/// What a guard decided to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum View {
    /// Identity is still resolving.
    Loading,
    /// Inline sign-in surface, rendered in place of the protected content.
    SignIn,
    AccessDenied,
    /// The guarded content itself.
    Children,
    /// Render nothing (a redirect is about to take over).
    Nothing,
}

/// A navigation the guard wants performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Navigation {
    pub to: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

impl Navigation {
    pub fn replace(to: &str) -> Self {
        Self {
            to: to.to_string(),
            replace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GuardOutcome {
    pub view: View,
    pub navigation: Option<Navigation>,
}

impl GuardOutcome {
    pub fn render(view: View) -> Self {
        Self {
            view,
            navigation: None,
        }
    }

    pub fn redirect(view: View, to: &str) -> Self {
        Self {
            view,
            navigation: Some(Navigation::replace(to)),
        }
    }
}

/// RouteGuard
///
/// A rendering/navigation decision over a session snapshot.
pub trait RouteGuard: Send + Sync {
    fn evaluate(&self, session: &AuthSession, path: &str) -> GuardOutcome;
}
