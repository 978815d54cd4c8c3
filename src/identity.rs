// Identity of the people who submit training runs
//
// Only the pieces the run record needs: a stable key and a username.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;

/// Maximum username length accepted by the users table
pub const MAX_USERNAME_LEN: usize = 150;

/// Primary key of a user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of training runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    /// Check a username before it is stored
    ///
    /// The username becomes a directory name under the TensorBoard log root,
    /// so path separators are rejected along with empty names.
    pub fn validate_username(username: &str) -> Result<(), ValidationError> {
        if username.trim().is_empty() {
            return Err(ValidationError::EmptyField("username"));
        }
        let len = username.chars().count();
        if len > MAX_USERNAME_LEN {
            return Err(ValidationError::TooLong {
                field: "username",
                len,
                max: MAX_USERNAME_LEN,
            });
        }
        if username.contains(['/', '\\']) || username == "." || username == ".." {
            return Err(ValidationError::InvalidPathComponent {
                field: "username",
                value: username.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
