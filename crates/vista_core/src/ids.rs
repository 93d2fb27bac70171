//! Stable identities for scene entities.

use serde::{Deserialize, Serialize};

/// Unique identifier for anything the scene tracks: presences, composite
/// groups and the individual parts inside a group share one id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Invalid/null entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Returns true if this is a null/invalid ID.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_id() {
        assert!(EntityId::default().is_null());
        assert!(!EntityId(7).is_null());
        assert_eq!(EntityId(7).to_string(), "#7");
    }
}
