use super::{
    ADMIN_ROUTE, AuthSession, GuardOutcome, HOME_ROUTE, RouteGuard,
    guard::{AdminGuard, AuthGuard, HomeAdminRedirector, Passthrough},
};

/// RouteAccess
///
/// Which guard stack protects a client path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// The landing page: admins are forwarded to the admin area.
    Home,
    Authenticated,
    AdminOnly,
}

/// RouteTable
///
/// Maps client paths onto guard stacks. Prefixes match whole path segments, so
/// `/courses` covers `/courses/42` but not `/coursesx`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    authenticated: Vec<&'static str>,
    admin: Vec<&'static str>,
    home: HomeAdminRedirector<AuthGuard>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            authenticated: vec!["/courses", "/dashboard", "/certification", "/profile"],
            admin: vec![ADMIN_ROUTE],
            home: HomeAdminRedirector::new(AuthGuard::optional()),
        }
    }
}

fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl RouteTable {
    pub fn access_for(&self, path: &str) -> RouteAccess {
        let path = normalize(path);
        if path == HOME_ROUTE {
            RouteAccess::Home
        } else if self.admin.iter().any(|prefix| under(path, prefix)) {
            RouteAccess::AdminOnly
        } else if self.authenticated.iter().any(|prefix| under(path, prefix)) {
            RouteAccess::Authenticated
        } else {
            RouteAccess::Public
        }
    }

    /// resolve
    ///
    /// Runs the guard stack registered for `path` against a session snapshot.
    pub fn resolve(&self, session: &AuthSession, path: &str) -> GuardOutcome {
        let normalized = normalize(path);
        match self.access_for(normalized) {
            RouteAccess::Public => Passthrough.evaluate(session, normalized),
            RouteAccess::Home => self.home.evaluate(session, normalized),
            RouteAccess::Authenticated => AuthGuard::default().evaluate(session, normalized),
            RouteAccess::AdminOnly => AdminGuard.evaluate(session, normalized),
        }
    }
}

/// Drops the query string, fragment and a trailing slash (except for the root).
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = path.get(..end).unwrap_or(path);
    match path.strip_suffix('/') {
        Some("") | None => {
            if path.is_empty() {
                HOME_ROUTE
            } else {
                path
            }
        }
        Some(trimmed) => trimmed,
    }
}
