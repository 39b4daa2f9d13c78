use serde::Serialize;
use serde_json::{Map, Value};

use nightstocker_core::{DomainError, DomainResult, Entity, TireId};

use crate::stock::MAX_QUANTITY;

/// Collection holding one document per tire type.
pub const INVENTORY_COLLECTION: &str = "inventory";

/// Message shown when the creation form is rejected.
pub const INVALID_TIRE_MESSAGE: &str =
    "Please enter valid Name, Size, and Quantity (must be 0 or greater).";

/// Document field names in the `inventory` collection.
pub mod fields {
    pub const NAME: &str = "name";
    pub const SIZE: &str = "size";
    pub const QUANTITY: &str = "quantity";
}

/// One inventory line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TireRecord {
    id: TireId,
    name: String,
    size: String,
    quantity: u64,
}

impl TireRecord {
    pub fn new(id: TireId, name: impl Into<String>, size: impl Into<String>, quantity: u64) -> Self {
        Self {
            id,
            name: name.into(),
            size: size.into(),
            quantity,
        }
    }

    /// Decode a record from its store document fields.
    ///
    /// A missing quantity reads as zero, and so does a negative one: quantity
    /// is never observed below zero. Quantities above [`MAX_QUANTITY`] read as
    /// the cap. A fractional quantity is malformed.
    pub fn from_fields(id: TireId, doc: &Map<String, Value>) -> DomainResult<Self> {
        let name = string_field(doc, fields::NAME)?;
        let size = string_field(doc, fields::SIZE)?;
        let quantity = match doc.get(fields::QUANTITY) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    v.min(MAX_QUANTITY)
                } else if n.as_i64().is_some() {
                    0
                } else {
                    integral_quantity(n.as_f64())?
                }
            }
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "quantity must be a number, got {other}"
                )));
            }
        };

        Ok(Self {
            id,
            name,
            size,
            quantity,
        })
    }

    pub fn id_typed(&self) -> &TireId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Human-readable description used in pull logs (`"{name} {size}"`).
    pub fn description(&self) -> String {
        format!("{} {}", self.name, self.size)
    }

    /// Key the inventory list is ordered by.
    pub fn sort_key(&self) -> String {
        let mut key = String::with_capacity(self.name.len() + self.size.len());
        key.push_str(&self.name);
        key.push_str(&self.size);
        key
    }

    /// Whether a pull is possible (the pull control is disabled otherwise).
    pub fn can_pull(&self) -> bool {
        self.quantity > 0
    }
}

impl Entity for TireRecord {
    type Id = TireId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn integral_quantity(value: Option<f64>) -> DomainResult<u64> {
    match value {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            Ok(if f <= 0.0 { 0 } else { (f as u64).min(MAX_QUANTITY) })
        }
        _ => Err(DomainError::validation(format!(
            "quantity must be a whole number, got {}",
            value.map_or_else(|| "NaN".to_string(), |f| f.to_string())
        ))),
    }
}

fn string_field(doc: &Map<String, Value>, key: &str) -> DomainResult<String> {
    match doc.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DomainError::validation(format!(
            "{key} must be a string, got {other}"
        ))),
        None => Err(DomainError::validation(format!("{key} is missing"))),
    }
}

/// A validated request to add a tire type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTire {
    name: String,
    size: String,
    quantity: u64,
}

impl NewTire {
    /// Trim and validate the creation fields.
    pub fn new(name: &str, size: &str, quantity: i64) -> DomainResult<Self> {
        let name = name.trim();
        let size = size.trim();
        if name.is_empty() || size.is_empty() || quantity < 0 {
            return Err(DomainError::validation(INVALID_TIRE_MESSAGE));
        }
        Ok(Self {
            name: name.to_string(),
            size: size.to_string(),
            quantity: quantity as u64,
        })
    }

    /// Validate raw form input, where the quantity arrives as text.
    pub fn parse(name: &str, size: &str, quantity: &str) -> DomainResult<Self> {
        let quantity = quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::validation(INVALID_TIRE_MESSAGE))?;
        Self::new(name, size, quantity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Fields of the document to create.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(fields::NAME.to_string(), Value::from(self.name.clone()));
        doc.insert(fields::SIZE.to_string(), Value::from(self.size.clone()));
        doc.insert(fields::QUANTITY.to_string(), Value::from(self.quantity));
        doc
    }
}

/// Partial update touching only the quantity field.
pub fn quantity_fields(quantity: u64) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert(fields::QUANTITY.to_string(), Value::from(quantity));
    doc
}
