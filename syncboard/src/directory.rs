//! User directory and session establishment.
//!
//! Stands in for the authentication collaborator: a session is obtained once
//! at startup via [`Directory::login`] and carries the identity and role the
//! visibility predicate needs. The directory also resolves identities to
//! display names and lists employees for assignment pickers.

use syncboard_proto::task::UserId;
use uuid::Uuid;

/// What a user is allowed to do on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sees every task; creates, edits, and drags freely.
    Admin,
    /// Sees only assigned tasks; mutates status through dedicated controls.
    Employee,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        };
        write!(f, "{s}")
    }
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Stable identity.
    pub id: UserId,
    /// Display name, unique within the directory.
    pub name: String,
    /// Board role.
    pub role: Role,
}

/// Opaque bearer token issued at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn issue() -> Self {
        Self(Uuid::now_v7())
    }
}

/// An authenticated session: who is acting, and with which token.
#[derive(Debug, Clone)]
pub struct Session {
    /// The authenticated user's profile.
    pub profile: UserProfile,
    /// Token for subsequent requests.
    pub token: SessionToken,
}

/// Errors from directory lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// No user with the given name exists.
    #[error("unknown user: {0}")]
    UnknownUser(String),
}

/// Read-only set of known users.
#[derive(Debug)]
pub struct Directory {
    users: Vec<UserProfile>,
}

impl Directory {
    /// Creates a directory from a fixed user list.
    #[must_use]
    pub const fn new(users: Vec<UserProfile>) -> Self {
        Self { users }
    }

    /// Seeds the demo population: one admin and five employees.
    #[must_use]
    pub fn seed_demo() -> Self {
        let mut users = vec![UserProfile {
            id: UserId::new(),
            name: "Morgan".into(),
            role: Role::Admin,
        }];
        for name in ["Alex", "Blair", "Casey", "Devon", "Emery"] {
            users.push(UserProfile {
                id: UserId::new(),
                name: name.into(),
                role: Role::Employee,
            });
        }
        Self { users }
    }

    /// Looks up a profile by identity.
    #[must_use]
    pub fn profile(&self, id: &UserId) -> Option<&UserProfile> {
        self.users.iter().find(|u| &u.id == id)
    }

    /// Looks up a profile by display name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.name == name)
    }

    /// All employee profiles, for assignment pickers.
    #[must_use]
    pub fn employees(&self) -> Vec<&UserProfile> {
        self.users
            .iter()
            .filter(|u| u.role == Role::Employee)
            .collect()
    }

    /// Authenticates by name and issues a session.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UnknownUser`] if the name is not in the
    /// directory.
    pub fn login(&self, name: &str) -> Result<Session, DirectoryError> {
        let profile = self
            .find_by_name(name)
            .ok_or_else(|| DirectoryError::UnknownUser(name.to_string()))?;
        let session = Session {
            profile: profile.clone(),
            token: SessionToken::issue(),
        };
        tracing::debug!(user = %profile.name, role = %profile.role, "session opened");
        Ok(session)
    }
}
