//! Shared domain enums stored as TEXT columns
//!
//! Each enum serializes to the same upper-case string in JSON and in the
//! database, so a status read from a query string, a request body or a row
//! always compares equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Application role carried in the token and the `users.role` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    Parent,
    Tutor,
    Staff,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "PARENT",
            Role::Tutor => "TUTOR",
            Role::Staff => "STAFF",
            Role::Manager => "MANAGER",
        }
    }

    /// Staff and managers moderate content
    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::Staff | Role::Manager)
    }
}

/// Moderation state of submitted content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approve,
    Reject,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approve => "APPROVE",
            ApprovalStatus::Reject => "REJECT",
        }
    }
}

/// Lifecycle of a tutor/child teaching relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum StudentProfileStatus {
    Pending,
    Teaching,
    Reject,
    Stop,
}

impl StudentProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentProfileStatus::Pending => "PENDING",
            StudentProfileStatus::Teaching => "TEACHING",
            StudentProfileStatus::Reject => "REJECT",
            StudentProfileStatus::Stop => "STOP",
        }
    }
}

/// Whether the child showed up to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    NotYet,
    Attended,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::NotYet => "NOT_YET",
            AttendanceStatus::Attended => "ATTENDED",
            AttendanceStatus::Absent => "ABSENT",
        }
    }
}

/// Tutor's evaluation of a session's exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassingStatus {
    NotYet,
    Passed,
    NotPassed,
}

impl PassingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassingStatus::NotYet => "NOT_YET",
            PassingStatus::Passed => "PASSED",
            PassingStatus::NotPassed => "NOT_PASSED",
        }
    }
}

/// Error returned when a status string matches no variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! impl_text_enum {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == upper)
                    .ok_or_else(|| UnknownVariant(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_text_enum!(Role, [Role::Parent, Role::Tutor, Role::Staff, Role::Manager]);
impl_text_enum!(
    ApprovalStatus,
    [ApprovalStatus::Pending, ApprovalStatus::Approve, ApprovalStatus::Reject]
);
impl_text_enum!(
    StudentProfileStatus,
    [
        StudentProfileStatus::Pending,
        StudentProfileStatus::Teaching,
        StudentProfileStatus::Reject,
        StudentProfileStatus::Stop,
    ]
);
impl_text_enum!(
    AttendanceStatus,
    [AttendanceStatus::NotYet, AttendanceStatus::Attended, AttendanceStatus::Absent]
);
impl_text_enum!(
    PassingStatus,
    [PassingStatus::NotYet, PassingStatus::Passed, PassingStatus::NotPassed]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert_eq!(Role::Manager.to_string(), "MANAGER");
        assert!("JANITOR".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_json_matches_column_text() {
        let json = serde_json::to_string(&AttendanceStatus::NotYet).unwrap();
        assert_eq!(json, "\"NOT_YET\"");
        assert_eq!(
            serde_json::from_str::<ApprovalStatus>("\"APPROVE\"").unwrap(),
            ApprovalStatus::Approve
        );
    }

    #[test]
    fn test_moderator_roles() {
        assert!(Role::Staff.is_moderator());
        assert!(Role::Manager.is_moderator());
        assert!(!Role::Tutor.is_moderator());
        assert!(!Role::Parent.is_moderator());
    }
}
