//! Route guard and the router location container.
//!
//! The guard itself is pure and synchronous: given the declared access rule,
//! the current session status, and the requested path it produces a
//! [`RouteDecision`] and performs no I/O. [`Router`] layers the mutable
//! bits on top - the current location and the remembered return path.

use std::sync::{Arc, RwLock};

use crate::routes::{LOGIN_PATH, RouteAccess, default_landing, match_route};
use crate::store::session::SessionStatus;

/// Outcome of guarding one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session state is unknown; render a neutral loading indicator, do not
    /// redirect.
    Loading,
    /// Render the requested view.
    Render,
    /// Not signed in on a protected route; go to login and remember where
    /// the user was headed.
    RedirectToLogin { from: String },
    /// Signed in but not allowed here (or hit a public-only view); go to
    /// the role's landing page. Never surfaced as an error.
    Redirect { to: String },
    /// No route matches the path.
    NotFound,
}

/// Decide what to do with a navigation, given the session status.
#[must_use]
pub fn evaluate(access: RouteAccess, status: SessionStatus, path: &str) -> RouteDecision {
    match access {
        RouteAccess::PublicOnly => match status {
            SessionStatus::Loading => RouteDecision::Loading,
            SessionStatus::Unauthenticated => RouteDecision::Render,
            SessionStatus::Authenticated(role) => RouteDecision::Redirect {
                to: default_landing(role).to_owned(),
            },
        },
        RouteAccess::Protected { allowed_roles } => match status {
            SessionStatus::Loading => RouteDecision::Loading,
            SessionStatus::Unauthenticated => RouteDecision::RedirectToLogin {
                from: path.to_owned(),
            },
            SessionStatus::Authenticated(role) => {
                if allowed_roles.is_empty() || allowed_roles.contains(&role) {
                    RouteDecision::Render
                } else {
                    RouteDecision::Redirect {
                        to: default_landing(role).to_owned(),
                    }
                }
            }
        },
    }
}

// =============================================================================
// Router
// =============================================================================

#[derive(Debug)]
struct RouterInner {
    current: RwLock<String>,
    return_to: RwLock<Option<String>>,
}

/// Current location plus the post-login return path.
///
/// Cheaply cloneable; every clone shares the same location.
#[derive(Debug, Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Router positioned at `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                current: RwLock::new("/".to_owned()),
                return_to: RwLock::new(None),
            }),
        }
    }

    /// Guard a navigation and apply its decision to the location.
    ///
    /// On `RedirectToLogin` the requested path is remembered for
    /// [`Self::post_login_destination`].
    pub fn resolve(&self, path: &str, status: SessionStatus) -> RouteDecision {
        let Some(route) = match_route(path) else {
            return RouteDecision::NotFound;
        };

        let decision = evaluate(route.access, status, path);
        match &decision {
            RouteDecision::Render => self.set_current(path),
            RouteDecision::RedirectToLogin { from } => {
                *self
                    .inner
                    .return_to
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(from.clone());
                self.set_current(LOGIN_PATH);
            }
            RouteDecision::Redirect { to } => self.set_current(to),
            RouteDecision::Loading | RouteDecision::NotFound => {}
        }
        decision
    }

    /// Move to a path without guarding (used by forced redirects).
    pub fn navigate(&self, path: &str) {
        self.set_current(path);
    }

    /// Current location.
    #[must_use]
    pub fn current(&self) -> String {
        self.inner
            .current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Take the remembered pre-login path, if any. Consuming: a second call
    /// returns `None`.
    #[must_use]
    pub fn take_return_to(&self) -> Option<String> {
        self.inner
            .return_to
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }

    /// Where to go after a successful login: the remembered path, or the
    /// role's landing page.
    #[must_use]
    pub fn post_login_destination(&self, role: coursedeck_core::Role) -> String {
        self.take_return_to()
            .unwrap_or_else(|| default_landing(role).to_owned())
    }

    fn set_current(&self, path: &str) {
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = path.to_owned();
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursedeck_core::Role;

    #[test]
    fn test_loading_renders_nothing() {
        let router = Router::new();
        let decision = router.resolve("/dashboard", SessionStatus::Loading);
        assert_eq!(decision, RouteDecision::Loading);
        assert_eq!(router.current(), "/");
    }

    #[test]
    fn test_unauthenticated_protected_redirects_to_login() {
        let router = Router::new();
        let decision = router.resolve("/cart", SessionStatus::Unauthenticated);
        assert_eq!(
            decision,
            RouteDecision::RedirectToLogin {
                from: "/cart".to_owned()
            }
        );
        assert_eq!(router.current(), "/login");
        // The original destination is remembered for after login.
        assert_eq!(
            router.post_login_destination(Role::Student),
            "/cart".to_owned()
        );
    }

    #[test]
    fn test_instructor_on_student_route_bounces_to_instructor_landing() {
        let router = Router::new();
        let decision = router.resolve(
            "/dashboard",
            SessionStatus::Authenticated(Role::Instructor),
        );
        assert_eq!(
            decision,
            RouteDecision::Redirect {
                to: "/instructor/courses".to_owned()
            }
        );
        assert_eq!(router.current(), "/instructor/courses");
    }

    #[test]
    fn test_student_renders_student_route() {
        let router = Router::new();
        let decision = router.resolve("/courses", SessionStatus::Authenticated(Role::Student));
        assert_eq!(decision, RouteDecision::Render);
        assert_eq!(router.current(), "/courses");
    }

    #[test]
    fn test_any_role_route_admits_both() {
        let router = Router::new();
        assert_eq!(
            router.resolve("/profile", SessionStatus::Authenticated(Role::Student)),
            RouteDecision::Render
        );
        assert_eq!(
            router.resolve("/profile", SessionStatus::Authenticated(Role::Instructor)),
            RouteDecision::Render
        );
    }

    #[test]
    fn test_public_only_bounces_authenticated() {
        let router = Router::new();
        let decision = router.resolve("/login", SessionStatus::Authenticated(Role::Student));
        assert_eq!(
            decision,
            RouteDecision::Redirect {
                to: "/dashboard".to_owned()
            }
        );
    }

    #[test]
    fn test_public_only_renders_unauthenticated() {
        let router = Router::new();
        assert_eq!(
            router.resolve("/register", SessionStatus::Unauthenticated),
            RouteDecision::Render
        );
    }

    #[test]
    fn test_post_login_destination_defaults_to_landing() {
        let router = Router::new();
        assert_eq!(router.post_login_destination(Role::Instructor), "/instructor/courses");
        assert_eq!(router.post_login_destination(Role::Student), "/dashboard");
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let router = Router::new();
        assert_eq!(
            router.resolve("/does/not/exist", SessionStatus::Unauthenticated),
            RouteDecision::NotFound
        );
    }
}
