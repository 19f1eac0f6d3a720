//! Identity model - the (display name, color) pair a session claims

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated display name and color
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub color: String,
}

impl Identity {
    /// Build an identity, rejecting blank names or colors
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let color = color.into();

        if name.trim().is_empty() {
            return Err(Error::InvalidIdentity("username is empty".into()));
        }
        if color.trim().is_empty() {
            return Err(Error::InvalidIdentity("color is empty".into()));
        }

        Ok(Self { name, color })
    }

    /// Key used for case-insensitive name uniqueness
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rejects_blank_fields() {
        assert!(matches!(
            Identity::new("", "#f00"),
            Err(Error::InvalidIdentity(_))
        ));
        assert!(matches!(
            Identity::new("Alice", "  "),
            Err(Error::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_name_key_is_lowercase() {
        let identity = Identity::new("AlIcE", "#f00").unwrap();
        assert_eq!(identity.name_key(), "alice");
        assert_eq!(identity.name, "AlIcE");
    }
}
