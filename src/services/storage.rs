// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage for inbox images (Firebase Storage).

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Upload target for binary objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path` and return a download URL.
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError>;
}

/// Firebase Storage REST client.
#[derive(Clone)]
pub struct FirebaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    auth_token: Option<String>,
}

impl FirebaseStorage {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.storage_base_url.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            auth_token: config.storage_auth_token.clone(),
        }
    }

    fn download_url(&self, path: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/b/{}/o/{}?alt=media",
            self.base_url,
            self.bucket,
            urlencoding::encode(path)
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    name: String,
    #[serde(rename = "downloadTokens")]
    download_tokens: Option<String>,
}

#[async_trait]
impl ObjectStore for FirebaseStorage {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        let url = format!("{}/b/{}/o", self.base_url, self.bucket);
        let size = bytes.len();

        let mut request = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload of {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Upload of {} returned {}: {}",
                path, status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid upload response: {}", e)))?;

        // Several tokens may come back comma-separated; any one works.
        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next());

        tracing::info!(path = %uploaded.name, bytes = size, "Uploaded object");
        Ok(self.download_url(&uploaded.name, token))
    }
}

/// In-memory object store for tests and local demos.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(path)
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("memory://{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_escapes_path() {
        let storage = FirebaseStorage::new(&Config::test_default());
        assert_eq!(
            storage.download_url("images/gate 1.jpg", Some("abc-123")),
            "https://firebasestorage.googleapis.com/v0/b/test-project.appspot.com/o/images%2Fgate%201.jpg?alt=media&token=abc-123"
        );
    }
}
