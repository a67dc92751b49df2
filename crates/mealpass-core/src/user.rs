//! Staff accounts and the roles carried inside a session.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The role of a signed-in staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// Front-of-house staff working the check-in queue.
  Operator,
  /// Read-only access to dashboards.
  Viewer,
  /// Full administrative access.
  Superviewer,
}

impl Role {
  pub const ALL: [Role; 3] = [Role::Operator, Role::Viewer, Role::Superviewer];

  pub fn as_str(self) -> &'static str {
    match self {
      Role::Operator => "operator",
      Role::Viewer => "viewer",
      Role::Superviewer => "superviewer",
    }
  }

  /// Where the client should navigate after a successful login.
  pub fn landing_path(self) -> &'static str {
    match self {
      Role::Superviewer => "/admin",
      Role::Viewer => "/metrics",
      Role::Operator => "/queue",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "operator" => Ok(Role::Operator),
      "viewer" => Ok(Role::Viewer),
      "superviewer" => Ok(Role::Superviewer),
      other => Err(Error::UnknownRole(other.to_owned())),
    }
  }
}

/// A staff login as read from the store. Only login reads this.
#[derive(Debug, Clone)]
pub struct UserAccount {
  pub id:            i64,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
  pub active:        bool,
  pub last_login_at: Option<DateTime<Utc>>,
}
