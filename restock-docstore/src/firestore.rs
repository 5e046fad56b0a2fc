//! [`DocumentStore`] over the Firestore REST API (v1).
//!
//! ```text
//! GET    {base}/stores/11007                         get
//! POST   {base}/stores?documentId=11007              create
//! PATCH  {base}/stores/11007                         set (replace)
//! PATCH  {base}/stores/11007?updateMask.fieldPaths=… update (merge)
//! DELETE {base}/stores/11007                         delete
//! GET    {base}/restock-reports?pageToken=…          list
//! ```

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use restock_core::{config::DocumentStoreConfig, Collection, DocPath};

use crate::auth::{ServiceAccountKey, TokenSource};
use crate::error::DocError;
use crate::fields::Fields;
use crate::store::DocumentStore;

const PRODUCTION_HOST: &str = "https://firestore.googleapis.com";
const PAGE_SIZE: u32 = 300;

#[derive(Debug)]
pub struct FirestoreClient {
    http: reqwest::Client,
    base: String,
    tokens: TokenSource,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl FirestoreClient {
    /// Build a client from config. With `emulator_host` set, talks plain HTTP
    /// to the emulator without credentials; otherwise `credentials_path` must
    /// name a service-account key.
    pub async fn from_config(config: &DocumentStoreConfig) -> Result<Self, DocError> {
        let (host, tokens) = match &config.emulator_host {
            Some(host) => (format!("http://{host}"), TokenSource::Emulator),
            None => {
                let path = config.credentials_path.as_deref().ok_or_else(|| {
                    DocError::Auth("document_store.credentials_path is not set".to_string())
                })?;
                let key = ServiceAccountKey::from_file(path).await?;
                (PRODUCTION_HOST.to_string(), TokenSource::service_account(key))
            }
        };
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| DocError::Transient(format!("cannot build HTTP client: {e}")))?;
        Ok(FirestoreClient {
            http,
            base: documents_base(&host, &config.project_id, &config.database),
            tokens,
        })
    }

    fn doc_url(&self, path: &DocPath) -> String {
        format!("{}/{}", self.base, path)
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base, collection.name())
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, DocError> {
        let token = self.tokens.token(&self.http).await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, label: &str, req: RequestBuilder) -> Result<reqwest::Response, DocError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, label, &body);
        if err.is_retryable() {
            warn!(path = label, %status, "document store call failed");
        }
        Err(err)
    }

    async fn write(&self, path: &DocPath, fields: Fields, mask: bool) -> Result<(), DocError> {
        let mut req = self
            .request(Method::PATCH, &self.doc_url(path))
            .await?;
        if mask {
            let paths: Vec<(&str, &str)> = fields
                .keys()
                .map(|k| ("updateMask.fieldPaths", k.as_str()))
                .collect();
            req = req.query(&paths);
        }
        let body = Document {
            name: String::new(),
            fields,
        };
        self.send(&path.to_string(), req.json(&body)).await?;
        Ok(())
    }
}

/// `{host}/v1/projects/{project}/databases/{database}/documents`
fn documents_base(host: &str, project: &str, database: &str) -> String {
    format!("{host}/v1/projects/{project}/databases/{database}/documents")
}

/// Map a non-success HTTP status onto the error taxonomy.
fn status_error(status: StatusCode, path: &str, body: &str) -> DocError {
    match status {
        StatusCode::NOT_FOUND => DocError::NotFound {
            path: path.to_string(),
        },
        StatusCode::CONFLICT => DocError::AlreadyExists {
            path: path.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DocError::Auth(format!("{status} for {path}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            DocError::Transient(format!("{status} for {path}"))
        }
        s if s.is_server_error() => DocError::Transient(format!("{status} for {path}: {body}")),
        s => DocError::Rejected {
            status: s.as_u16(),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get(&self, path: &DocPath) -> Result<Fields, DocError> {
        debug!(%path, "get");
        let req = self.request(Method::GET, &self.doc_url(path)).await?;
        let doc: Document = self.send(&path.to_string(), req).await?.json().await?;
        Ok(doc.fields)
    }

    async fn create(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        debug!(%path, "create");
        let req = self
            .request(Method::POST, &self.collection_url(path.collection()))
            .await?
            .query(&[("documentId", path.id())])
            .json(&Document {
                name: String::new(),
                fields,
            });
        self.send(&path.to_string(), req).await?;
        Ok(())
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        debug!(%path, "set");
        self.write(path, fields, false).await
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), DocError> {
        debug!(%path, "update");
        self.write(path, fields, true).await
    }

    async fn delete(&self, path: &DocPath) -> Result<(), DocError> {
        debug!(%path, "delete");
        let req = self.request(Method::DELETE, &self.doc_url(path)).await?;
        match self.send(&path.to_string(), req).await {
            Ok(_) | Err(DocError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(DocPath, Fields)>, DocError> {
        debug!(%collection, "list");
        let url = self.collection_url(collection);
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .request(Method::GET, &url)
                .await?
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }
            let page: ListResponse = self.send(collection.name(), req).await?.json().await?;
            out.extend(decode_page(collection, page.documents)?);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(out)
    }
}

fn decode_page(
    collection: Collection,
    documents: Vec<Document>,
) -> Result<Vec<(DocPath, Fields)>, DocError> {
    documents
        .into_iter()
        .map(|doc| match DocPath::parse(&doc.name) {
            Some(path) if path.collection() == collection => Ok((path, doc.fields)),
            _ => Err(DocError::Decode {
                path: doc.name,
                reason: format!("not a document of {collection}"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_core::{report_path, StoreId};
    use serde_json::json;

    #[test]
    fn base_url_includes_project_and_database() {
        assert_eq!(
            documents_base("http://localhost:8081", "demo", "(default)"),
            "http://localhost:8081/v1/projects/demo/databases/(default)/documents"
        );
    }

    #[test]
    fn status_mapping() {
        assert!(status_error(StatusCode::NOT_FOUND, "stores/1", "").is_not_found());
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "stores/1", ""),
            DocError::AlreadyExists { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "stores/1", ""),
            DocError::Auth(_)
        ));
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "stores/1", "").is_retryable());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "stores/1", "").is_retryable());
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "stores/1", "bad field"),
            DocError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn list_page_decodes_resource_names() {
        let raw = json!({
            "documents": [{
                "name": "projects/demo/databases/(default)/documents/restock-reports/11007",
                "fields": {"reportedAt": {"timestampValue": "2024-10-19T05:00:00Z"}},
                "createTime": "2024-10-19T05:00:00Z",
                "updateTime": "2024-10-19T05:00:00Z"
            }],
            "nextPageToken": "abc"
        });
        let page: ListResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let docs = decode_page(Collection::RestockReports, page.documents).unwrap();
        assert_eq!(docs[0].0, report_path(&StoreId::from("11007")).unwrap());
        assert!(docs[0].1.contains_key("reportedAt"));
    }

    #[test]
    fn empty_collection_has_no_documents_key() {
        let page: ListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn foreign_document_in_page_is_a_decode_error() {
        let docs = vec![Document {
            name: "projects/demo/databases/(default)/documents/stores/11007".into(),
            fields: Fields::new(),
        }];
        assert!(matches!(
            decode_page(Collection::RestockReports, docs),
            Err(DocError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn missing_credentials_without_emulator_is_auth_error() {
        let config = DocumentStoreConfig {
            project_id: "demo".into(),
            database: "(default)".into(),
            credentials_path: None,
            emulator_host: None,
        };
        let err = FirestoreClient::from_config(&config).await.unwrap_err();
        assert!(matches!(err, DocError::Auth(_)));
    }

    #[tokio::test]
    async fn emulator_config_needs_no_credentials() {
        let config = DocumentStoreConfig {
            project_id: "demo".into(),
            database: "(default)".into(),
            credentials_path: None,
            emulator_host: Some("localhost:8081".into()),
        };
        let client = FirestoreClient::from_config(&config).await.unwrap();
        assert_eq!(
            client.doc_url(&report_path(&StoreId::from("11007")).unwrap()),
            "http://localhost:8081/v1/projects/demo/databases/(default)/documents/restock-reports/11007"
        );
    }
}
