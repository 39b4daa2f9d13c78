use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use nightstocker_core::DocumentId;

/// Document contents: a JSON object keyed by field name.
///
/// Timestamps are carried as RFC 3339 strings.
pub type Fields = Map<String, Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
    pub create_time: DateTime<Utc>,
    /// Changes on every committed write; used for optimistic concurrency.
    pub update_time: DateTime<Utc>,
}

/// Full state of one collection at `read_time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub collection: String,
    pub documents: Vec<Document>,
    pub read_time: DateTime<Utc>,
}

/// Condition a document must meet for an update to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document must exist.
    Exists,
    /// The document must exist and not have changed since `update_time`.
    UpdateTime(DateTime<Utc>),
}

/// One write inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create a new document; fails if the id is taken.
    Create {
        collection: String,
        id: DocumentId,
        fields: Fields,
        /// Fields set to the commit time by the store.
        server_timestamps: Vec<String>,
    },
    /// Merge `fields` into an existing document.
    Update {
        collection: String,
        id: DocumentId,
        fields: Fields,
        precondition: Precondition,
    },
    /// Delete a document; deleting a missing document is not an error.
    Delete { collection: String, id: DocumentId },
}

impl Write {
    /// Create with a freshly generated id (the id is known before the commit).
    pub fn create(collection: impl Into<String>, fields: Fields) -> Self {
        Write::Create {
            collection: collection.into(),
            id: DocumentId::generate(),
            fields,
            server_timestamps: Vec::new(),
        }
    }

    /// Create under a caller-chosen id.
    pub fn create_with_id(collection: impl Into<String>, id: DocumentId, fields: Fields) -> Self {
        Write::Create {
            collection: collection.into(),
            id,
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn update(collection: impl Into<String>, id: DocumentId, fields: Fields) -> Self {
        Write::Update {
            collection: collection.into(),
            id,
            fields,
            precondition: Precondition::Exists,
        }
    }

    pub fn delete(collection: impl Into<String>, id: DocumentId) -> Self {
        Write::Delete {
            collection: collection.into(),
            id,
        }
    }

    /// Ask the store to fill `field` with the commit time (create only).
    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        if let Write::Create {
            server_timestamps, ..
        } = &mut self
        {
            server_timestamps.push(field.into());
        }
        self
    }

    /// Replace the precondition of an update.
    pub fn with_precondition(mut self, value: Precondition) -> Self {
        if let Write::Update { precondition, .. } = &mut self {
            *precondition = value;
        }
        self
    }

    pub fn collection(&self) -> &str {
        match self {
            Write::Create { collection, .. }
            | Write::Update { collection, .. }
            | Write::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &DocumentId {
        match self {
            Write::Create { id, .. } | Write::Update { id, .. } | Write::Delete { id, .. } => id,
        }
    }
}

/// Outcome of one write in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub id: DocumentId,
    /// New update time of the document (`None` for deletes).
    pub update_time: Option<DateTime<Utc>>,
}

/// Canonical string form of a timestamp stored in document fields.
pub fn timestamp_value(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::Nanos, true))
}
