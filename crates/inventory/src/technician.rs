//! Technician roster used to gate pulls on the Tech screen.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use nightstocker_core::{DomainError, DomainResult, TechId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechId,
    pub name: String,
}

impl Technician {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: TechId::new(id),
            name: name.into(),
        }
    }
}

/// Result of matching free-text input against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification<'a> {
    /// Nothing was entered (or the prompt was cancelled).
    Blank,
    /// Input did not match any technician.
    Unknown(String),
    Known(&'a Technician),
}

/// Fixed set of technicians allowed to perform gated pulls.
///
/// Loaded from configuration at startup; not mutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TechnicianRoster {
    technicians: Vec<Technician>,
}

impl TechnicianRoster {
    pub fn new(technicians: Vec<Technician>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for t in &technicians {
            if t.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "technician {} has an empty name",
                    t.id
                )));
            }
            if !seen.insert(t.id) {
                return Err(DomainError::validation(format!(
                    "duplicate technician id {}",
                    t.id
                )));
            }
        }
        Ok(Self { technicians })
    }

    pub fn lookup(&self, id: TechId) -> Option<&Technician> {
        self.technicians.iter().find(|t| t.id == id)
    }

    /// Match prompt input by numeric equality with a technician id.
    pub fn identify(&self, input: &str) -> Identification<'_> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Identification::Blank;
        }
        parse_numeric(trimmed)
            .and_then(|n| self.lookup(TechId::new(n)))
            .map(Identification::Known)
            .unwrap_or_else(|| Identification::Unknown(trimmed.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technician> {
        self.technicians.iter()
    }

    pub fn len(&self) -> usize {
        self.technicians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technicians.is_empty()
    }
}

/// Numeric value of the input if it denotes a non-negative whole number
/// (`"2719"`, `"2719.0"`, `"+2719"`).
fn parse_numeric(input: &str) -> Option<u32> {
    input.parse::<u32>().ok().or_else(|| {
        input
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    })
}
