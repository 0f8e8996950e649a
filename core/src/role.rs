//! Account roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role an identity acts under.
///
/// `Organizer` exists because clients may request it, but it is a synonym of
/// `Host`: [`Role::canonical`] folds it, and stored identities are never
/// `Organizer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Takes part in events.
    Participant,
    /// Runs events once approved by an administrator.
    Host,
    /// Synonym of `Host` accepted at registration.
    Organizer,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// Canonical stored form of the role.
    #[must_use]
    pub const fn canonical(self) -> Self {
        match self {
            Self::Organizer => Self::Host,
            other => other,
        }
    }

    /// Whether this role is subject to the host approval gate.
    #[must_use]
    pub const fn is_host(self) -> bool {
        matches!(self.canonical(), Self::Host)
    }

    /// Upper-case wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "PARTICIPANT",
            Self::Host => "HOST",
            Self::Organizer => "ORGANIZER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARTICIPANT" => Ok(Self::Participant),
            "HOST" => Ok(Self::Host),
            "ORGANIZER" => Ok(Self::Organizer),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}
