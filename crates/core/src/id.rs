//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Opaque identifier assigned by the document store.
///
/// The store decides the format; the domain only requires it to be a
/// non-empty string without path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::invalid_id("document id cannot be empty"));
        }
        if id.contains('/') {
            return Err(DomainError::invalid_id(format!(
                "document id cannot contain '/': {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Generate a fresh identifier for a document about to be created.
    ///
    /// Uses UUIDv7 (time-ordered) in its 32-character hex form. Prefer passing
    /// IDs explicitly in tests for determinism.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

macro_rules! impl_document_newtype {
    ($t:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(pub DocumentId);

        impl $t {
            pub fn new(id: DocumentId) -> Self {
                Self(id)
            }

            pub fn as_document_id(&self) -> &DocumentId {
                &self.0
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<DocumentId> for $t {
            fn from(value: DocumentId) -> Self {
                Self(value)
            }
        }

        impl From<$t> for DocumentId {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(DocumentId::new(s)?))
            }
        }
    };
}

impl_document_newtype!(TireId, "Identifier of a tire record in the `inventory` collection.");
impl_document_newtype!(PullLogId, "Identifier of a pull log entry in the `tireLogs` collection.");

/// Technician badge number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechId(u32);

impl TechId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for TechId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TechId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("TechId: {e}")))
    }
}

/// Identity of the person using a screen (session actor).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("user id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_rejects_empty_and_slashes() {
        assert!(DocumentId::new("").is_err());
        assert!(DocumentId::new("inventory/abc").is_err());
        assert_eq!(DocumentId::new("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn generated_document_ids_are_unique_and_valid() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(DocumentId::new(a.as_str()).is_ok());
    }

    #[test]
    fn tire_id_parses_and_displays() {
        let id: TireId = "Xy12".parse().unwrap();
        assert_eq!(id.to_string(), "Xy12");
        assert_eq!(id.as_document_id().as_str(), "Xy12");
    }

    #[test]
    fn tech_id_parses_trimmed_numbers() {
        assert_eq!(" 2719 ".parse::<TechId>().unwrap(), TechId::new(2719));
        assert!("abc".parse::<TechId>().is_err());
        assert!("-5".parse::<TechId>().is_err());
    }

    #[test]
    fn user_id_is_trimmed_and_non_empty() {
        assert_eq!(UserId::new("  night-room ").unwrap().as_str(), "night-room");
        assert!(UserId::new("   ").is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id: TireId = "abc".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(serde_json::to_string(&TechId::new(2720)).unwrap(), "2720");
    }
}
