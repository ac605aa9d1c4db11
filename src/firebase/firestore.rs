//! Firestore REST calls for the room collection.
//!
//! Documents carry `name`, `para`, `uid`, `photoURL` and a server-assigned `createdAt`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    domain::{
        message::{Message, NewMessage},
        status::StoreFailure,
    },
    infra::{config::FirebaseConfig, secrets::redact_text},
    usecases::watch_messages::{LiveQuery, ORDER_FIELD},
};

const FIELD_NAME: &str = "name";
const FIELD_PARA: &str = "para";
const FIELD_UID: &str = "uid";
const FIELD_PHOTO_URL: &str = "photoURL";
const MAX_LOGGED_BODY_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunQueryItem {
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
    pub create_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FieldValue {
    pub string_value: Option<String>,
    pub timestamp_value: Option<String>,
}

fn database_path(config: &FirebaseConfig) -> String {
    format!("projects/{}/databases/(default)", config.project_id)
}

fn documents_url(config: &FirebaseConfig) -> String {
    format!(
        "{}/v1/{}/documents",
        config.firestore_base_url,
        database_path(config)
    )
}

/// Newest first, so the limit keeps the latest messages; `LiveQuery::arrange` flips it back.
pub(super) fn run_query_body(collection: &str, query: &LiveQuery) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": ORDER_FIELD },
                "direction": "DESCENDING",
            }],
            "limit": query.normalized_limit(),
        }
    })
}

pub(super) fn commit_body(config: &FirebaseConfig, document_id: &str, message: &NewMessage) -> Value {
    let photo = match &message.photo_url {
        Some(url) => json!({ "stringValue": url }),
        None => json!({ "nullValue": null }),
    };

    json!({
        "writes": [{
            "update": {
                "name": format!(
                    "{}/documents/{}/{}",
                    database_path(config),
                    config.collection,
                    document_id
                ),
                "fields": {
                    FIELD_NAME: { "stringValue": message.name },
                    FIELD_PARA: { "stringValue": message.para },
                    FIELD_UID: { "stringValue": message.uid },
                    FIELD_PHOTO_URL: photo,
                },
            },
            "currentDocument": { "exists": false },
            "updateTransforms": [{
                "fieldPath": ORDER_FIELD,
                "setToServerValue": "REQUEST_TIME",
            }],
        }]
    })
}

pub(super) async fn run_query(
    http: &reqwest::Client,
    config: &FirebaseConfig,
    id_token: &str,
    query: &LiveQuery,
) -> Result<Vec<Message>, StoreFailure> {
    let response = http
        .post(format!("{}:runQuery", documents_url(config)))
        .bearer_auth(id_token)
        .json(&run_query_body(&config.collection, query))
        .send()
        .await
        .map_err(|error| {
            tracing::debug!(timeout = error.is_timeout(), "runQuery transport failure");
            StoreFailure::Unavailable
        })?;

    if !response.status().is_success() {
        return Err(rejected("runQuery", response).await);
    }

    let items: Vec<RunQueryItem> = response.json().await.map_err(|error| {
        tracing::warn!(error = %error, "runQuery response could not be decoded");
        StoreFailure::InvalidData
    })?;

    Ok(query.arrange(decode_run_query(items)))
}

pub(super) async fn append(
    http: &reqwest::Client,
    config: &FirebaseConfig,
    id_token: &str,
    message: &NewMessage,
) -> Result<(), StoreFailure> {
    let document_id = uuid::Uuid::new_v4().simple().to_string();

    let response = http
        .post(format!("{}:commit", documents_url(config)))
        .bearer_auth(id_token)
        .json(&commit_body(config, &document_id, message))
        .send()
        .await
        .map_err(|error| {
            tracing::debug!(timeout = error.is_timeout(), "commit transport failure");
            StoreFailure::Unavailable
        })?;

    if !response.status().is_success() {
        return Err(rejected("commit", response).await);
    }

    tracing::info!(document_id, "message appended");
    Ok(())
}

/// Keeps the service's order. Documents missing required fields are skipped.
pub(super) fn decode_run_query(items: Vec<RunQueryItem>) -> Vec<Message> {
    items
        .into_iter()
        .filter_map(|item| item.document)
        .filter_map(|document| {
            let name = document.name.clone();
            let decoded = decode_document(document);
            if decoded.is_none() {
                tracing::warn!(document = %name, "skipping malformed message document");
            }
            decoded
        })
        .collect()
}

fn decode_document(mut document: Document) -> Option<Message> {
    let id = document.name.rsplit('/').next()?.to_owned();
    if id.is_empty() {
        return None;
    }

    let mut string_field = |field: &str| {
        document
            .fields
            .remove(field)
            .and_then(|value| value.string_value)
    };

    let uid = string_field(FIELD_UID)?;
    let para = string_field(FIELD_PARA)?;
    let name = string_field(FIELD_NAME).unwrap_or_default();
    let photo_url = string_field(FIELD_PHOTO_URL).filter(|url| !url.is_empty());

    let created_at = document
        .fields
        .get(ORDER_FIELD)
        .and_then(|value| value.timestamp_value.as_deref())
        .or(document.create_time.as_deref())
        .and_then(parse_timestamp);

    Some(Message {
        id,
        name,
        photo_url,
        uid,
        para,
        created_at,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// Logs the service's explanation (redacted) and classifies the failure.
async fn rejected(operation: &'static str, response: reqwest::Response) -> StoreFailure {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();

    tracing::warn!(
        operation,
        status = status.as_u16(),
        body = %redact_text(&excerpt),
        "firestore request rejected"
    );
    map_status(status)
}

pub(super) fn map_status(status: reqwest::StatusCode) -> StoreFailure {
    match status.as_u16() {
        401 => StoreFailure::Unauthorized,
        403 | 404 => StoreFailure::Denied,
        400 | 409 => StoreFailure::InvalidData,
        _ => StoreFailure::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            project_id: "bchat-dev".to_owned(),
            ..FirebaseConfig::default()
        }
    }

    fn items(raw: &str) -> Vec<RunQueryItem> {
        serde_json::from_str(raw).expect("fixture must decode")
    }

    #[test]
    fn run_query_asks_for_latest_window_newest_first() {
        let body = run_query_body("messages", &LiveQuery::default());
        let query = &body["structuredQuery"];

        assert_eq!(query["from"][0]["collectionId"], "messages");
        assert_eq!(query["orderBy"][0]["field"]["fieldPath"], "createdAt");
        assert_eq!(query["orderBy"][0]["direction"], "DESCENDING");
        assert_eq!(query["limit"], 25);
    }

    #[test]
    fn commit_writes_one_document_with_server_timestamp() {
        let message = NewMessage {
            name: "Ann".to_owned(),
            photo_url: Some("a.png".to_owned()),
            uid: "u1".to_owned(),
            para: "hi".to_owned(),
        };

        let body = commit_body(&config(), "doc1", &message);
        let writes = body["writes"].as_array().expect("writes array");

        assert_eq!(writes.len(), 1);
        let update = &writes[0]["update"];
        assert_eq!(
            update["name"],
            "projects/bchat-dev/databases/(default)/documents/messages/doc1"
        );
        assert_eq!(update["fields"]["name"]["stringValue"], "Ann");
        assert_eq!(update["fields"]["para"]["stringValue"], "hi");
        assert_eq!(update["fields"]["uid"]["stringValue"], "u1");
        assert_eq!(update["fields"]["photoURL"]["stringValue"], "a.png");
        assert_eq!(writes[0]["updateTransforms"][0]["fieldPath"], "createdAt");
        assert_eq!(
            writes[0]["updateTransforms"][0]["setToServerValue"],
            "REQUEST_TIME"
        );
        assert_eq!(writes[0]["currentDocument"]["exists"], false);
    }

    #[test]
    fn commit_without_avatar_writes_null() {
        let message = NewMessage {
            name: "Ann".to_owned(),
            photo_url: None,
            uid: "u1".to_owned(),
            para: "hi".to_owned(),
        };

        let body = commit_body(&config(), "doc1", &message);

        assert!(body["writes"][0]["update"]["fields"]["photoURL"]["nullValue"].is_null());
        assert!(body["writes"][0]["update"]["fields"]["photoURL"]
            .get("nullValue")
            .is_some());
    }

    #[test]
    fn decodes_run_query_documents_in_service_order() {
        let decoded = decode_run_query(items(
            r#"[
                {"document": {
                    "name": "projects/p/databases/(default)/documents/messages/m2",
                    "fields": {
                        "name": {"stringValue": "Bob"},
                        "para": {"stringValue": "second"},
                        "uid": {"stringValue": "u2"},
                        "photoURL": {"stringValue": "b.png"},
                        "createdAt": {"timestampValue": "2024-05-01T10:00:05.123456Z"}
                    }
                }, "readTime": "2024-05-01T10:00:06Z"},
                {"document": {
                    "name": "projects/p/databases/(default)/documents/messages/m1",
                    "fields": {
                        "name": {"stringValue": "Ann"},
                        "para": {"stringValue": "hi"},
                        "uid": {"stringValue": "u1"},
                        "photoURL": {"stringValue": "a.png"},
                        "createdAt": {"timestampValue": "2024-05-01T10:00:00Z"}
                    }
                }, "readTime": "2024-05-01T10:00:06Z"}
            ]"#,
        ));

        let ids: Vec<_> = decoded.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);
        assert_eq!(decoded[1].name, "Ann");
        assert_eq!(decoded[1].para, "hi");
        assert_eq!(decoded[1].uid, "u1");
        assert_eq!(decoded[1].photo_url.as_deref(), Some("a.png"));
        assert_eq!(
            decoded[1].created_at.map(|at| at.timestamp()),
            Some(1_714_557_600)
        );
    }

    #[test]
    fn empty_collection_yields_read_time_only_item() {
        let decoded = decode_run_query(items(r#"[{"readTime": "2024-05-01T10:00:06Z"}]"#));

        assert!(decoded.is_empty());
    }

    #[test]
    fn skips_documents_without_uid_or_text() {
        let decoded = decode_run_query(items(
            r#"[
                {"document": {"name": "projects/p/databases/(default)/documents/messages/bad",
                              "fields": {"name": {"stringValue": "Eve"}}}},
                {"document": {"name": "projects/p/databases/(default)/documents/messages/ok",
                              "fields": {"para": {"stringValue": "hey"}, "uid": {"stringValue": "u3"}},
                              "createTime": "2024-05-01T09:00:00Z"}}
            ]"#,
        ));

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, "ok");
        assert_eq!(decoded[0].photo_url, None);
        assert!(decoded[0].created_at.is_some());
    }

    #[test]
    fn maps_http_statuses_to_store_failures() {
        use reqwest::StatusCode;

        assert_eq!(map_status(StatusCode::UNAUTHORIZED), StoreFailure::Unauthorized);
        assert_eq!(map_status(StatusCode::FORBIDDEN), StoreFailure::Denied);
        assert_eq!(map_status(StatusCode::BAD_REQUEST), StoreFailure::InvalidData);
        assert_eq!(
            map_status(StatusCode::SERVICE_UNAVAILABLE),
            StoreFailure::Unavailable
        );
    }
}
