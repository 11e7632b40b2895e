use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use uuid::Uuid;

use super::check_status;
use crate::error::GatewayError;
use crate::models::common::{Direction, Document};
use crate::services::gateway::DocumentStore;

/// Cloud Firestore over its REST API, authenticated with the web API key.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    base_url: String,
    project_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<RawDocument>,
}

impl FirestoreClient {
    pub fn new(http: Client, base_url: &str, project_id: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn documents_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}:{}", self.base_url, self.documents_root(), action)
    }

    async fn run_query(&self, structured_query: Value) -> Result<Vec<Document>, GatewayError> {
        let url = self.endpoint("runQuery");
        log::debug!("POST {} {}", url, structured_query);

        let response = self
            .http
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&json!({ "structuredQuery": structured_query }))
            .send()
            .await?;
        let items: Vec<RunQueryItem> = check_status(response).await?.json().await?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|raw| decode_document(&raw.name, &raw.fields))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, GatewayError> {
        self.run_query(ordered_query(collection, field, direction)).await
    }

    async fn find_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Document>, GatewayError> {
        self.run_query(equality_query(collection, field, value, limit)).await
    }

    async fn insert_with_server_time(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        time_field: &str,
    ) -> Result<String, GatewayError> {
        let id = Uuid::new_v4().simple().to_string();
        let name = format!("{}/{}/{}", self.documents_root(), collection, id);
        let url = self.endpoint("commit");
        log::debug!("POST {} (insert {})", url, name);

        let response = self
            .http
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&insert_commit(&name, &fields, time_field))
            .send()
            .await?;
        check_status(response).await?;
        Ok(id)
    }
}

pub fn ordered_query(collection: &str, field: &str, direction: Direction) -> Value {
    json!({
        "from": [{ "collectionId": collection }],
        "orderBy": [{ "field": { "fieldPath": field }, "direction": direction.to_string() }]
    })
}

pub fn equality_query(collection: &str, field: &str, value: &str, limit: usize) -> Value {
    json!({
        "from": [{ "collectionId": collection }],
        "where": {
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": "EQUAL",
                "value": { "stringValue": value }
            }
        },
        "limit": limit
    })
}

/// A single-write commit that fails if the document already exists and lets the server stamp `time_field`.
pub fn insert_commit(name: &str, fields: &Map<String, Value>, time_field: &str) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();

    json!({
        "writes": [{
            "update": { "name": name, "fields": encoded },
            "updateTransforms": [{ "fieldPath": time_field, "setToServerValue": "REQUEST_TIME" }],
            "currentDocument": { "exists": false }
        }]
    })
}

fn decode_document(name: &str, fields: &Map<String, Value>) -> Result<Document, GatewayError> {
    let id = name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GatewayError::Decode(format!("document name without id: {}", name)))?;

    let mut decoded = Map::new();
    for (key, value) in fields {
        decoded.insert(key.clone(), decode_value(value)?);
    }
    Ok(Document::new(id, decoded))
}

/// Unwraps Firestore's typed value encoding (`{"integerValue": "3"}` and friends) into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value, GatewayError> {
    let (kind, raw) = value
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or_else(|| GatewayError::Decode(format!("not a typed value: {}", value)))?;

    match (kind.as_str(), raw) {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", Value::Bool(b)) => Ok(Value::Bool(*b)),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| GatewayError::Decode(format!("integerValue {}: {}", s, e))),
        ("integerValue", Value::Number(n)) => Ok(Value::Number(n.clone())),
        ("doubleValue", Value::Number(n)) => Ok(Value::Number(n.clone())),
        // NaN and the infinities arrive as strings and have no JSON number form.
        ("doubleValue", Value::String(s)) => Ok(s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        ("timestampValue", Value::String(s))
        | ("stringValue", Value::String(s))
        | ("referenceValue", Value::String(s))
        | ("bytesValue", Value::String(s)) => Ok(Value::String(s.clone())),
        ("geoPointValue", point) => Ok(point.clone()),
        ("arrayValue", array) => array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        ("mapValue", map) => {
            let mut decoded = Map::new();
            if let Some(fields) = map.get("fields").and_then(Value::as_object) {
                for (key, value) in fields {
                    decoded.insert(key.clone(), decode_value(value)?);
                }
            }
            Ok(Value::Object(decoded))
        }
        (kind, raw) => Err(GatewayError::Decode(format!("unsupported {}: {}", kind, raw))),
    }
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(fields) => {
            let encoded: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect();
            json!({ "mapValue": { "fields": encoded } })
        }
    }
}
