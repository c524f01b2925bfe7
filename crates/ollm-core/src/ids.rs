//! Branded identifier newtypes.
//!
//! Each ID wraps a uuid-v7 string so ordering by ID roughly follows creation
//! time. The newtypes exist so a `SnapshotId` can never be passed where a
//! `SessionId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh id.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::now_v7()))
            }

            /// Wrap an existing id string (from disk or a caller).
            #[must_use]
            pub fn from_string(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The underlying string form.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }
    };
}

branded_id!(
    /// Stable identifier for one conversation session.
    SessionId,
    "sess"
);
branded_id!(
    /// Globally unique identifier for a persisted context snapshot.
    SnapshotId,
    "snap"
);
branded_id!(
    /// Identifier for a compression checkpoint.
    CheckpointId,
    "ckpt"
);
branded_id!(
    /// Identifier for a registered lifecycle hook.
    HookId,
    "hook"
);

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_carry_prefix() {
        assert!(SessionId::generate().as_str().starts_with("sess-"));
        assert!(SnapshotId::generate().as_str().starts_with("snap-"));
        assert!(CheckpointId::generate().as_str().starts_with("ckpt-"));
        assert!(HookId::generate().as_str().starts_with("hook-"));
    }

    #[test]
    fn serde_is_transparent() {
        let id = SnapshotId::from_string("snap-fixed");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"snap-fixed\"");
        let back: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_as_str() {
        let id = SessionId::from_string("sess-x");
        assert_eq!(id.to_string(), "sess-x");
        assert_eq!(id.as_str(), "sess-x");
    }
}
