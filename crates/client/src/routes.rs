//! The marketplace route table.
//!
//! Patterns use `:name` segments for path parameters. Matching is
//! segment-wise and ignores any query string.

use coursedeck_core::Role;

/// Well-known paths.
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const INSTRUCTOR_COURSES_PATH: &str = "/instructor/courses";
pub const PAYMENT_SUCCESS_PATH: &str = "/paymentsuccess";

/// Access rule declared for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Only reachable signed out (login/register); authenticated users are
    /// bounced to their landing page.
    PublicOnly,
    /// Requires a session; an empty role list admits every role.
    Protected { allowed_roles: &'static [Role] },
}

/// One entry in the route table.
#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub pattern: &'static str,
    pub access: RouteAccess,
}

const STUDENT_ONLY: &[Role] = &[Role::Student];
const INSTRUCTOR_ONLY: &[Role] = &[Role::Instructor];
const ANY_ROLE: &[Role] = &[];

/// The full route table, in match order.
pub const ROUTES: &[RouteSpec] = &[
    // Public-only
    RouteSpec {
        pattern: "/login",
        access: RouteAccess::PublicOnly,
    },
    RouteSpec {
        pattern: "/register",
        access: RouteAccess::PublicOnly,
    },
    // Student
    RouteSpec {
        pattern: "/",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/dashboard",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/courses",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/cart",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/enrolled-courses",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/my-quiz-attempts",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/paymentsuccess",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    RouteSpec {
        pattern: "/enrolled-course/:course_id",
        access: RouteAccess::Protected {
            allowed_roles: STUDENT_ONLY,
        },
    },
    // Any authenticated role
    RouteSpec {
        pattern: "/course/:id",
        access: RouteAccess::Protected {
            allowed_roles: ANY_ROLE,
        },
    },
    RouteSpec {
        pattern: "/course/:course_id/video/:video_id",
        access: RouteAccess::Protected {
            allowed_roles: ANY_ROLE,
        },
    },
    RouteSpec {
        pattern: "/profile",
        access: RouteAccess::Protected {
            allowed_roles: ANY_ROLE,
        },
    },
    // Instructor
    RouteSpec {
        pattern: "/instructor/profile",
        access: RouteAccess::Protected {
            allowed_roles: INSTRUCTOR_ONLY,
        },
    },
    RouteSpec {
        pattern: "/instructor/courses",
        access: RouteAccess::Protected {
            allowed_roles: INSTRUCTOR_ONLY,
        },
    },
    RouteSpec {
        pattern: "/instructor/create-course",
        access: RouteAccess::Protected {
            allowed_roles: INSTRUCTOR_ONLY,
        },
    },
    RouteSpec {
        pattern: "/instructor/course/:course_id/lessons",
        access: RouteAccess::Protected {
            allowed_roles: INSTRUCTOR_ONLY,
        },
    },
];

/// Landing page for a role after login or an authorization bounce.
#[must_use]
pub const fn default_landing(role: Role) -> &'static str {
    match role {
        Role::Instructor => INSTRUCTOR_COURSES_PATH,
        Role::Student => DASHBOARD_PATH,
    }
}

/// Find the route matching a path, if any.
#[must_use]
pub fn match_route(path: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|route| pattern_matches(route.pattern, path))
}

/// Segment-wise pattern match; `:name` segments match any single segment.
#[must_use]
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let path = strip_query(path);
    let pattern_segments: Vec<&str> = segments(pattern).collect();
    let path_segments: Vec<&str> = segments(path).collect();

    pattern_segments.len() == path_segments.len()
        && pattern_segments
            .iter()
            .zip(&path_segments)
            .all(|(expected, actual)| expected.starts_with(':') || expected == actual)
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(pattern_matches("/dashboard", "/dashboard"));
        assert!(!pattern_matches("/dashboard", "/courses"));
    }

    #[test]
    fn test_param_match() {
        assert!(pattern_matches("/course/:id", "/course/64af01"));
        assert!(pattern_matches(
            "/course/:course_id/video/:video_id",
            "/course/c-1/video/v-9"
        ));
        assert!(!pattern_matches("/course/:id", "/course"));
        assert!(!pattern_matches("/course/:id", "/course/c-1/video/v-9"));
    }

    #[test]
    fn test_query_string_ignored() {
        assert!(pattern_matches("/paymentsuccess", "/paymentsuccess?reference=pay_1"));
    }

    #[test]
    fn test_root_route() {
        assert!(pattern_matches("/", "/"));
        assert!(!pattern_matches("/", "/dashboard"));
    }

    #[test]
    fn test_match_route_table() {
        let route = match_route("/instructor/course/c-1/lessons").expect("route");
        assert_eq!(route.pattern, "/instructor/course/:course_id/lessons");
        assert!(match_route("/nope/nope").is_none());
    }

    #[test]
    fn test_default_landing() {
        assert_eq!(default_landing(Role::Instructor), "/instructor/courses");
        assert_eq!(default_landing(Role::Student), "/dashboard");
    }
}
