//! Cloud Firestore backend over the REST v1 API.
//!
//! - Writes go through `documents:commit`, so a batch is atomic.
//! - `listen` polls the collection and emits a snapshot whenever the set of
//!   `(id, update_time)` pairs changes. A local commit wakes pollers early.

pub mod value;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Notify;

use nightstocker_core::DocumentId;

use crate::document::{Document, Precondition, Snapshot, Write, WriteResult};
use crate::subscription::Subscription;
use crate::r#trait::{DocumentStore, StoreError};

const PAGE_SIZE: usize = 300;

fn default_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

/// Connection settings (the `[store.firestore]` config section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `?key=`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sent as a bearer token.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: default_database(),
            base_url: default_base_url(),
            api_key: None,
            access_token: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Resource path of the documents root.
    fn root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn document_name(&self, collection: &str, id: &DocumentId) -> String {
        format!("{}/{collection}/{id}", self.root())
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: Client,
    config: Arc<FirestoreConfig>,
    committed: Arc<Notify>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWriteResult {
    update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<RawWriteResult>,
    commit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl RawDocument {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .ok_or_else(|| StoreError::Decode(format!("bad document name {}", self.name)))?;
        let id = DocumentId::new(id).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Document {
            id,
            fields: value::decode_fields(self.fields.as_ref())?,
            create_time: self.create_time,
            update_time: self.update_time,
        })
    }
}

/// Map a Firestore error status onto `StoreError`.
fn classify(status: StatusCode, body: &str) -> StoreError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.status, env.error.message),
        Err(_) => (String::new(), body.to_string()),
    };
    match code.as_str() {
        "NOT_FOUND" => StoreError::NotFound(message),
        "ALREADY_EXISTS" | "FAILED_PRECONDITION" | "ABORTED" => StoreError::Conflict(message),
        "UNAVAILABLE" | "DEADLINE_EXCEEDED" => StoreError::Unavailable(message),
        "INVALID_ARGUMENT" => StoreError::InvalidWrite(message),
        _ => match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(message),
            StatusCode::CONFLICT => StoreError::Conflict(message),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                StoreError::Unavailable(message)
            }
            _ => StoreError::Backend(format!("{status}: {message}")),
        },
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// JSON body of one commit write.
fn encode_write(config: &FirestoreConfig, write: &Write) -> Value {
    match write {
        Write::Create {
            collection,
            id,
            fields,
            server_timestamps,
        } => {
            let mut w = json!({
                "update": {
                    "name": config.document_name(collection, id),
                    "fields": value::encode_fields(fields),
                },
                "currentDocument": { "exists": false },
            });
            if !server_timestamps.is_empty() {
                let transforms: Vec<Value> = server_timestamps
                    .iter()
                    .map(|f| json!({ "fieldPath": f, "setToServerValue": "REQUEST_TIME" }))
                    .collect();
                w["updateTransforms"] = Value::Array(transforms);
            }
            w
        }
        Write::Update {
            collection,
            id,
            fields,
            precondition,
        } => {
            let current = match precondition {
                Precondition::Exists => json!({ "exists": true }),
                Precondition::UpdateTime(t) => json!({ "updateTime": t }),
            };
            let paths: Vec<&String> = fields.keys().collect();
            json!({
                "update": {
                    "name": config.document_name(collection, id),
                    "fields": value::encode_fields(fields),
                },
                "updateMask": { "fieldPaths": paths },
                "currentDocument": current,
            })
        }
        Write::Delete { collection, id } => json!({
            "delete": config.document_name(collection, id),
        }),
    }
}

/// Order-insensitive fingerprint of a snapshot.
fn signature(snapshot: &Snapshot) -> Vec<(DocumentId, DateTime<Utc>)> {
    let mut sig: Vec<_> = snapshot
        .documents
        .iter()
        .map(|d| (d.id.clone(), d.update_time))
        .collect();
    sig.sort();
    sig
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Backend(format!("http client: {e}")))?;
        Ok(Self {
            client,
            config: Arc::new(config),
            committed: Arc::new(Notify::new()),
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.config.api_key {
            req = req.query(&[("key", key)]);
        }
        if let Some(token) = &self.config.access_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = self.authorize(req).send().await.map_err(transport)?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse, StoreError> {
        let url = self.url(&format!("{}/{collection}", self.config.root()));
        let mut req = self
            .client
            .get(url)
            .query(&[("pageSize", PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }
        self.send(req)
            .await?
            .json::<ListResponse>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn poll(self, collection: String, tx: crate::subscription::SnapshotSender) {
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(100));
        let mut last: Option<Vec<(DocumentId, DateTime<Utc>)>> = None;
        let mut failing = false;

        loop {
            if tx.is_closed() {
                break;
            }
            match self.list(&collection).await {
                Ok(snapshot) => {
                    let sig = signature(&snapshot);
                    if failing || last.as_ref() != Some(&sig) {
                        if tx.send(Ok(snapshot)).is_err() {
                            break;
                        }
                        last = Some(sig);
                    }
                    failing = false;
                }
                Err(e) => {
                    // Report once per outage.
                    if !failing {
                        tracing::warn!(collection = %collection, error = %e, "firestore poll failed");
                        if tx.send(Err(e)).is_err() {
                            break;
                        }
                    }
                    failing = true;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.committed.notified() => {}
                _ = tx.closed() => break,
            }
        }
        tracing::debug!(collection = %collection, "firestore listener stopped");
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError> {
        let (tx, subscription) = Subscription::channel();
        tokio::spawn(self.clone().poll(collection.to_string(), tx));
        Ok(subscription)
    }

    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let url = self.url(&self.config.document_name(collection, id));
        match self.send(self.client.get(url)).await {
            Ok(resp) => {
                let raw = resp
                    .json::<RawDocument>()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                raw.into_document().map(Some)
            }
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError> {
        let mut documents = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_page(collection, token.as_deref()).await?;
            for raw in page.documents {
                documents.push(raw.into_document()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(Snapshot {
            collection: collection.to_string(),
            documents,
            read_time: Utc::now(),
        })
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<Vec<WriteResult>, StoreError> {
        if writes.is_empty() {
            return Ok(vec![]);
        }
        let body = json!({
            "writes": writes
                .iter()
                .map(|w| encode_write(&self.config, w))
                .collect::<Vec<_>>(),
        });
        let url = self.url(&format!("{}:commit", self.config.root()));
        let resp: CommitResponse = self
            .send(self.client.post(url).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        self.committed.notify_waiters();
        tracing::debug!(writes = writes.len(), commit_time = ?resp.commit_time, "firestore commit applied");

        Ok(writes
            .iter()
            .enumerate()
            .map(|(i, w)| WriteResult {
                id: w.id().clone(),
                update_time: match w {
                    Write::Delete { .. } => None,
                    _ => resp
                        .write_results
                        .get(i)
                        .and_then(|r| r.update_time)
                        .or(resp.commit_time),
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fields;

    fn config() -> FirestoreConfig {
        FirestoreConfig::new("night-stocker")
    }

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn config_defaults_apply_when_deserializing() {
        let cfg: FirestoreConfig = serde_json::from_value(json!({ "project_id": "p" })).unwrap();
        assert_eq!(cfg.database, "(default)");
        assert_eq!(cfg.base_url, "https://firestore.googleapis.com/v1");
        assert_eq!(cfg.poll_interval_ms, 2_000);
    }

    #[test]
    fn create_requires_absence_and_requests_server_time() {
        let id: DocumentId = "log1".parse().unwrap();
        let write = Write::create_with_id("tireLogs", id, fields(json!({ "techId": 2719 })))
            .with_server_timestamp("timestamp");
        let body = encode_write(&config(), &write);

        assert_eq!(
            body["update"]["name"],
            "projects/night-stocker/databases/(default)/documents/tireLogs/log1"
        );
        assert_eq!(body["currentDocument"], json!({ "exists": false }));
        assert_eq!(body["update"]["fields"]["techId"], json!({ "integerValue": "2719" }));
        assert_eq!(
            body["updateTransforms"],
            json!([{ "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }])
        );
    }

    #[test]
    fn update_masks_only_the_given_fields() {
        let id: DocumentId = "t1".parse().unwrap();
        let at: DateTime<Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        let write = Write::update("inventory", id, fields(json!({ "quantity": 4 })))
            .with_precondition(Precondition::UpdateTime(at));
        let body = encode_write(&config(), &write);

        assert_eq!(body["updateMask"], json!({ "fieldPaths": ["quantity"] }));
        assert_eq!(body["currentDocument"], json!({ "updateTime": "2024-05-01T10:00:00Z" }));
    }

    #[test]
    fn delete_names_the_document() {
        let write = Write::delete("inventory", "t1".parse().unwrap());
        let body = encode_write(&config(), &write);
        assert_eq!(
            body,
            json!({ "delete": "projects/night-stocker/databases/(default)/documents/inventory/t1" })
        );
    }

    #[test]
    fn error_statuses_map_to_store_errors() {
        let body = r#"{"error":{"code":400,"message":"stale","status":"FAILED_PRECONDITION"}}"#;
        assert!(matches!(classify(StatusCode::BAD_REQUEST, body), StoreError::Conflict(_)));

        let body = r#"{"error":{"code":404,"message":"gone","status":"NOT_FOUND"}}"#;
        assert!(matches!(classify(StatusCode::NOT_FOUND, body), StoreError::NotFound(_)));

        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn raw_documents_decode_ids_from_names() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/inventory/abc",
            "fields": { "quantity": { "integerValue": "2" } },
            "createTime": "2024-05-01T10:00:00Z",
            "updateTime": "2024-05-01T10:00:01Z"
        }))
        .unwrap();
        let doc = raw.into_document().unwrap();
        assert_eq!(doc.id.as_str(), "abc");
        assert_eq!(doc.fields.get("quantity"), Some(&json!(2)));
    }
}
