//! User roles with different marketplace capabilities.

use serde::{Deserialize, Deserializer, Serialize};

/// Marketplace user role.
///
/// The server stores roles as strings with inconsistent casing, so
/// deserialization and parsing are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses, purchases, and consumes courses.
    Student,
    /// Authors courses and lessons.
    Instructor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("Instructor".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!("STUDENT".parse::<Role>(), Ok(Role::Student));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_deserialize() {
        let role: Role = serde_json::from_str("\"Student\"").expect("deserialize");
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_role_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Instructor).expect("serialize"),
            "\"instructor\""
        );
    }
}
