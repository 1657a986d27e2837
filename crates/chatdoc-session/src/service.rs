//! Boundary to the remote document-processing service.

use async_trait::async_trait;
use chatdoc_store::CredentialOverride;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use std::path::Path;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read `path`, labelling the document with its file name.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, content })
    }
}

/// Body of a question sent to the service. Override fields that are absent
/// or empty go out as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub question: String,
    pub upload_id: String,
    #[serde(serialize_with = "expose_optional")]
    pub mistral_api_key: Option<SecretString>,
    pub zilliz_uri: Option<String>,
    #[serde(serialize_with = "expose_optional")]
    pub zilliz_token: Option<SecretString>,
    pub collection_name: Option<String>,
}

impl QueryRequest {
    pub fn new(
        question: impl Into<String>,
        upload_id: impl Into<String>,
        overrides: Option<&CredentialOverride>,
    ) -> Self {
        let secret = |value: Option<&SecretString>| {
            value
                .filter(|s| !s.expose_secret().is_empty())
                .cloned()
        };
        let plain = |value: Option<&String>| value.filter(|s| !s.is_empty()).cloned();

        Self {
            question: question.into(),
            upload_id: upload_id.into(),
            mistral_api_key: secret(overrides.and_then(|o| o.api_key.as_ref())),
            zilliz_uri: plain(overrides.and_then(|o| o.vector_store_uri.as_ref())),
            zilliz_token: secret(overrides.and_then(|o| o.vector_store_token.as_ref())),
            collection_name: plain(overrides.and_then(|o| o.collection_name.as_ref())),
        }
    }
}

fn expose_optional<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Remote upload / query / delete endpoints.
///
/// Implementations are expected to forward only the non-empty override
/// fields they are given.
#[async_trait]
pub trait DocumentService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the id the service assigned to the document.
    async fn upload(
        &self,
        document: &Document,
        overrides: Option<&CredentialOverride>,
    ) -> Result<String, Self::Error>;

    /// Returns the raw response body; see [`crate::normalize_answer`].
    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, Self::Error>;

    async fn delete(
        &self,
        upload_id: &str,
        overrides: Option<&CredentialOverride>,
    ) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdoc_store::CredentialBundle;

    #[test]
    fn test_query_request_without_overrides_sends_nulls() {
        let request = QueryRequest::new("What is the total?", "u1", None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "question": "What is the total?",
                "upload_id": "u1",
                "mistral_api_key": null,
                "zilliz_uri": null,
                "zilliz_token": null,
                "collection_name": null,
            })
        );
    }

    #[test]
    fn test_query_request_exposes_override_values() {
        let bundle = CredentialBundle::new("sk", "https://v.example", "tok", "docs");
        let overrides = CredentialOverride::from(&bundle);
        let value = serde_json::to_value(QueryRequest::new("q", "u1", Some(&overrides))).unwrap();
        assert_eq!(value["mistral_api_key"], "sk");
        assert_eq!(value["zilliz_token"], "tok");
        assert_eq!(value["collection_name"], "docs");
    }

    #[test]
    fn test_query_request_blanks_are_null() {
        let overrides = CredentialOverride {
            api_key: Some(SecretString::from("")),
            collection_name: Some(String::new()),
            ..Default::default()
        };
        let value = serde_json::to_value(QueryRequest::new("q", "u1", Some(&overrides))).unwrap();
        assert!(value["mistral_api_key"].is_null());
        assert!(value["collection_name"].is_null());
    }

    #[tokio::test]
    async fn test_document_read_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let document = Document::read(&path).await.unwrap();
        assert_eq!(document.file_name, "report.pdf");
        assert_eq!(document.content, b"%PDF-1.7");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let bundle = CredentialBundle::new("sk-very-secret", "uri", "tok-secret", "docs");
        let request = QueryRequest::new("q", "u1", Some(&CredentialOverride::from(&bundle)));
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(!rendered.contains("tok-secret"));
    }
}
