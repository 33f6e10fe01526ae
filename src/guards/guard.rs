use super::{
    ADMIN_ROUTE, AuthSession, GuardOutcome, HOME_ROUTE, Role, RouteGuard, SIGN_IN_ROUTE, View,
};

/// AuthGuard
///
/// Keeps protected content hidden while identity resolves and shows the sign-in
/// surface inline when nobody is signed in. Never navigates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthGuard {
    pub require_auth: bool,
}

impl AuthGuard {
    pub fn optional() -> Self {
        Self {
            require_auth: false,
        }
    }
}

impl Default for AuthGuard {
    fn default() -> Self {
        Self { require_auth: true }
    }
}

impl RouteGuard for AuthGuard {
    fn evaluate(&self, session: &AuthSession, _path: &str) -> GuardOutcome {
        if session.loading {
            return GuardOutcome::render(View::Loading);
        }
        if self.require_auth && !session.has_user() {
            return GuardOutcome::render(View::SignIn);
        }
        GuardOutcome::render(View::Children)
    }
}

/// AdminGuard
///
/// Restricts a subtree to admins. Signed-out visitors are sent to sign-in; signed-in
/// non-admins see the denial view while being sent home. The denial view only flashes
/// until the navigation lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminGuard;

impl RouteGuard for AdminGuard {
    fn evaluate(&self, session: &AuthSession, _path: &str) -> GuardOutcome {
        if session.loading {
            return GuardOutcome::render(View::Loading);
        }
        if !session.has_user() {
            return GuardOutcome::redirect(View::Nothing, SIGN_IN_ROUTE);
        }
        if !session.is_admin() {
            return GuardOutcome::redirect(View::AccessDenied, HOME_ROUTE);
        }
        GuardOutcome::render(View::Children)
    }
}

/// The only trigger for sending an admin from the landing page to the admin area.
/// Shared by the render decision and the navigation effect.
pub fn should_redirect_home_to_admin(role: Option<Role>, loading: bool, path: &str) -> bool {
    !loading && role == Some(Role::Admin) && path == HOME_ROUTE
}

/// HomeAdminRedirector
///
/// Layered over another guard. While the redirect predicate holds it renders nothing
/// and asks for a replacing navigation to the admin area; otherwise the inner guard
/// decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomeAdminRedirector<G> {
    pub inner: G,
}

impl<G> HomeAdminRedirector<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<G: RouteGuard> RouteGuard for HomeAdminRedirector<G> {
    fn evaluate(&self, session: &AuthSession, path: &str) -> GuardOutcome {
        if should_redirect_home_to_admin(session.role, session.loading, path) {
            return GuardOutcome::redirect(View::Nothing, ADMIN_ROUTE);
        }
        self.inner.evaluate(session, path)
    }
}

/// Renders children unconditionally. Used for public routes and as the default
/// inner guard of the redirector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passthrough;

impl RouteGuard for Passthrough {
    fn evaluate(&self, _session: &AuthSession, _path: &str) -> GuardOutcome {
        GuardOutcome::render(View::Children)
    }
}
