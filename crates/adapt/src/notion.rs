// crates/adapt/src/notion.rs

//! reqwest-backed implementation of the upstream port.

use async_trait::async_trait;
use domain::{block::UpstreamBlock, setting::UpstreamSettings};
use http::Method;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use serve::upstream::{Upstream, UpstreamError};
use tracing::{debug, error};

use crate::Error;

const VERSION_HEADER: &str = "Notion-Version";

/// Client for the Notion REST API.
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    version: String,
}

impl NotionClient {
    #[tracing::instrument(skip_all)]
    pub fn new(settings: &UpstreamSettings) -> Result<Self, Error> {
        let base_url = settings.base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(Error::Settings("base_url is empty".to_owned()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            api_key: settings.api_key.clone(),
            version: settings.version.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(VERSION_HEADER, &self.version)
    }

    fn children_request(&self, block_id: &str, cursor: Option<&str>) -> RequestBuilder {
        let req = self.request(Method::GET, &format!("blocks/{block_id}/children"));
        match cursor {
            Some(cursor) => req.query(&[("start_cursor", cursor)]),
            None => req,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Json, UpstreamError> {
        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if status.is_success() {
            serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
        } else {
            let err = status_error(status.as_u16(), &body);
            error!("Upstream call failed: {}", err);
            Err(err)
        }
    }
}

/// Error body the upstream sends with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn status_error(status: u16, body: &[u8]) -> UpstreamError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let (code, message) = match parsed {
        Some(ErrorBody { code, message }) => (code, message),
        None => (None, None),
    };

    let message = message.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_owned();
        if text.is_empty() {
            http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_owned()
        } else {
            text
        }
    });

    UpstreamError::Status {
        status,
        code: code.unwrap_or_else(|| "unknown".to_owned()),
        message,
    }
}

fn create_page_body(database_id: &str, properties: Json) -> Json {
    json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    })
}

fn update_page_body(properties: Json) -> Json {
    json!({ "properties": properties })
}

fn archive_body() -> Json {
    json!({ "archived": true })
}

fn append_body(children: &[UpstreamBlock]) -> Json {
    json!({ "children": children })
}

#[async_trait]
impl Upstream for NotionClient {
    #[tracing::instrument(skip_all)]
    async fn query_database(&self, database_id: &str) -> Result<Json, UpstreamError> {
        let req = self
            .request(Method::POST, &format!("databases/{database_id}/query"))
            .json(&json!({}));
        self.send(req).await
    }

    #[tracing::instrument(skip_all)]
    async fn retrieve_page(&self, page_id: &str) -> Result<Json, UpstreamError> {
        self.send(self.request(Method::GET, &format!("pages/{page_id}")))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn create_page(&self, database_id: &str, properties: Json) -> Result<Json, UpstreamError> {
        let req = self
            .request(Method::POST, "pages")
            .json(&create_page_body(database_id, properties));
        self.send(req).await
    }

    #[tracing::instrument(skip_all)]
    async fn update_page(&self, page_id: &str, properties: Json) -> Result<Json, UpstreamError> {
        let req = self
            .request(Method::PATCH, &format!("pages/{page_id}"))
            .json(&update_page_body(properties));
        self.send(req).await
    }

    #[tracing::instrument(skip_all)]
    async fn archive_page(&self, page_id: &str) -> Result<Json, UpstreamError> {
        let req = self
            .request(Method::PATCH, &format!("pages/{page_id}"))
            .json(&archive_body());
        self.send(req).await
    }

    #[tracing::instrument(skip_all)]
    async fn list_children(&self, block_id: &str) -> Result<Json, UpstreamError> {
        self.send(self.children_request(block_id, None)).await
    }

    #[tracing::instrument(skip_all)]
    async fn list_children_after(
        &self,
        block_id: &str,
        cursor: &str,
    ) -> Result<Json, UpstreamError> {
        self.send(self.children_request(block_id, Some(cursor))).await
    }

    #[tracing::instrument(skip_all)]
    async fn append_children(
        &self,
        block_id: &str,
        children: Vec<UpstreamBlock>,
    ) -> Result<Json, UpstreamError> {
        debug!("appending {} children to {}", children.len(), block_id);
        let req = self
            .request(Method::PATCH, &format!("blocks/{block_id}/children"))
            .json(&append_body(&children));
        self.send(req).await
    }

    #[tracing::instrument(skip_all)]
    async fn delete_block(&self, block_id: &str) -> Result<Json, UpstreamError> {
        self.send(self.request(Method::DELETE, &format!("blocks/{block_id}")))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn update_block(
        &self,
        block_id: &str,
        block: UpstreamBlock,
    ) -> Result<Json, UpstreamError> {
        let body = block
            .to_update_body()
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        let req = self
            .request(Method::PATCH, &format!("blocks/{block_id}"))
            .json(&body);
        self.send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::block::TextBody;
    use domain::setting::{DEFAULT_UPSTREAM_URL, DEFAULT_UPSTREAM_VERSION};

    fn settings(base_url: &str) -> UpstreamSettings {
        UpstreamSettings {
            base_url: base_url.to_owned(),
            api_key: "secret_test".to_owned(),
            database_id: None,
            version: DEFAULT_UPSTREAM_VERSION.to_owned(),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn requests_carry_auth_and_version_headers() {
        let client = NotionClient::new(&settings("https://api.notion.com/")).unwrap();
        let req = client
            .request(Method::GET, "blocks/abc/children")
            .build()
            .unwrap();

        assert_eq!(req.url().as_str(), "https://api.notion.com/v1/blocks/abc/children");
        assert_eq!(req.headers()["authorization"], "Bearer secret_test");
        assert_eq!(req.headers()[VERSION_HEADER], DEFAULT_UPSTREAM_VERSION);
    }

    #[test]
    fn cursor_is_sent_as_start_cursor() {
        let client = NotionClient::new(&settings(DEFAULT_UPSTREAM_URL)).unwrap();
        let first = client.children_request("abc", None).build().unwrap();
        let next = client.children_request("abc", Some("c2")).build().unwrap();

        assert_eq!(first.url().as_str(), "https://api.notion.com/v1/blocks/abc/children");
        assert_eq!(
            next.url().as_str(),
            "https://api.notion.com/v1/blocks/abc/children?start_cursor=c2"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            NotionClient::new(&settings("/")),
            Err(Error::Settings(_))
        ));
        assert!(NotionClient::new(&settings(DEFAULT_UPSTREAM_URL)).is_ok());
    }

    #[test]
    fn status_error_uses_upstream_code_and_message() {
        let body = br#"{"object":"error","status":401,"code":"unauthorized","message":"API token is invalid."}"#;
        match status_error(401, body) {
            UpstreamError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code, "unauthorized");
                assert_eq!(message, "API token is invalid.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_error_falls_back_to_body_or_reason() {
        assert_eq!(status_error(502, b"bad gateway html").details(), "bad gateway html");
        assert_eq!(status_error(404, b"").details(), "Not Found");
    }

    #[test]
    fn request_bodies_match_upstream_shapes() {
        assert_eq!(
            create_page_body("db1", json!({ "Name": {} })),
            json!({ "parent": { "database_id": "db1" }, "properties": { "Name": {} } })
        );
        assert_eq!(archive_body(), json!({ "archived": true }));
        assert_eq!(
            update_page_body(json!({ "Status": {} })),
            json!({ "properties": { "Status": {} } })
        );

        let children = vec![UpstreamBlock::Paragraph {
            paragraph: TextBody::plain("p"),
        }];
        assert_eq!(
            append_body(&children),
            json!({ "children": [
                { "type": "paragraph", "paragraph": { "rich_text": [{ "text": { "content": "p" } }] } }
            ] })
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        let client = NotionClient::new(&settings("http://127.0.0.1:9")).unwrap();
        let err = client.retrieve_page("p").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }
}
