//! Transaction modes passed through to the resource when a unit of work
//! begins.
//!
//! The unit-of-work core never interprets these values; it hands them to
//! [`Resource::begin_tx`](super::Resource::begin_tx) verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// The weakest level a resource offers. Resources without dirty reads,
    /// such as [`MemoryStore`](crate::memory::MemoryStore), treat it as
    /// [`ReadCommitted`](IsolationLevel::ReadCommitted).
    ReadUncommitted,

    /// Each read sees the latest committed data at the time of the read.
    #[default]
    ReadCommitted,

    /// All reads see a consistent snapshot taken when the transaction began.
    RepeatableRead,

    /// Snapshot reads, and commit fails if the data changed underneath.
    Serializable,
}

impl IsolationLevel {
    /// Check if this isolation level reads from a begin-time snapshot.
    pub fn uses_snapshot(&self) -> bool {
        matches!(
            self,
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable
        )
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
            IsolationLevel::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ UNCOMMITTED" | "READ_UNCOMMITTED" | "READUNCOMMITTED" => {
                Ok(IsolationLevel::ReadUncommitted)
            }
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" | "SNAPSHOT" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(format!("unknown isolation level: {}", s)),
        }
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn is_read_only(&self) -> bool {
        matches!(self, AccessMode::ReadOnly)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadWrite => write!(f, "READ WRITE"),
            AccessMode::ReadOnly => write!(f, "READ ONLY"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ WRITE" | "READ_WRITE" | "READWRITE" => Ok(AccessMode::ReadWrite),
            "READ ONLY" | "READ_ONLY" | "READONLY" => Ok(AccessMode::ReadOnly),
            _ => Err(format!("unknown access mode: {}", s)),
        }
    }
}

/// Whether a read-only serializable transaction may wait for a safe snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferrableMode {
    #[default]
    NotDeferrable,
    Deferrable,
}

impl fmt::Display for DeferrableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferrableMode::NotDeferrable => write!(f, "NOT DEFERRABLE"),
            DeferrableMode::Deferrable => write!(f, "DEFERRABLE"),
        }
    }
}

impl FromStr for DeferrableMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOT DEFERRABLE" | "NOT_DEFERRABLE" | "NOTDEFERRABLE" => {
                Ok(DeferrableMode::NotDeferrable)
            }
            "DEFERRABLE" => Ok(DeferrableMode::Deferrable),
            _ => Err(format!("unknown deferrable mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
        assert_eq!(AccessMode::default(), AccessMode::ReadWrite);
        assert_eq!(DeferrableMode::default(), DeferrableMode::NotDeferrable);
    }

    #[test]
    fn test_uses_snapshot() {
        assert!(!IsolationLevel::ReadUncommitted.uses_snapshot());
        assert!(!IsolationLevel::ReadCommitted.uses_snapshot());
        assert!(IsolationLevel::RepeatableRead.uses_snapshot());
        assert!(IsolationLevel::Serializable.uses_snapshot());
    }

    #[test]
    fn test_parse_isolation() {
        assert_eq!(
            "read committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "snapshot".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert_eq!(
            "Serializable".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("chaos".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("read_only".parse::<AccessMode>().unwrap(), AccessMode::ReadOnly);
        assert_eq!(
            "DEFERRABLE".parse::<DeferrableMode>().unwrap(),
            DeferrableMode::Deferrable
        );
        assert_eq!(AccessMode::ReadOnly.to_string(), "READ ONLY");
        assert_eq!(DeferrableMode::NotDeferrable.to_string(), "NOT DEFERRABLE");
    }
}
