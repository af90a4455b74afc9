//! Dashboard user roles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Role a dashboard view is projected for.
///
/// Parsing is case-insensitive and never fails: anything that is not one of
/// the four known roles becomes [`UserRole::Other`], which sees nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRole {
    Admin,
    Manager,
    Editor,
    User,
    Other(String),
}

impl UserRole {
    /// Parse a role name, ignoring ASCII case and surrounding whitespace.
    pub fn parse(role: &str) -> Self {
        let normalized = role.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "admin" => UserRole::Admin,
            "manager" => UserRole::Manager,
            "editor" => UserRole::Editor,
            "user" => UserRole::User,
            _ => UserRole::Other(normalized),
        }
    }

    /// Privilege rank; higher sees more.
    pub fn rank(&self) -> u8 {
        match self {
            UserRole::Admin => 4,
            UserRole::Manager => 3,
            UserRole::Editor => 2,
            UserRole::User => 1,
            UserRole::Other(_) => 0,
        }
    }

    /// Pick the most privileged role out of a role list.
    pub fn highest<'a, I>(roles: I) -> Option<UserRole>
    where
        I: IntoIterator<Item = &'a str>,
    {
        roles
            .into_iter()
            .map(UserRole::parse)
            .max_by_key(UserRole::rank)
    }

    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Editor => "editor",
            UserRole::User => "user",
            UserRole::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(UserRole::parse(&raw))
    }
}

impl std::str::FromStr for UserRole {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(UserRole::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(UserRole::parse("ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::parse(" Editor "), UserRole::Editor);
        assert_eq!(UserRole::parse("uSeR"), UserRole::User);
    }

    #[test]
    fn test_unknown_role_kept_lowercase() {
        assert_eq!(
            UserRole::parse("Auditor"),
            UserRole::Other("auditor".to_string())
        );
    }

    #[test]
    fn test_serializes_as_plain_string() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&UserRole::Manager)?, "\"manager\"");
        let parsed: UserRole = serde_json::from_str("\"EDITOR\"")?;
        assert_eq!(parsed, UserRole::Editor);
        Ok(())
    }

    #[test]
    fn test_highest_role() {
        let roles = ["user", "Manager", "guest"];
        assert_eq!(UserRole::highest(roles), Some(UserRole::Manager));
        assert_eq!(UserRole::highest(Vec::<&str>::new()), None);
    }
}
