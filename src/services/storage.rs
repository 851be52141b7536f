// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Storage uploads for profile avatars.
//!
//! Uses the Storage REST endpoint (`/v0/b/{bucket}/o`) and returns the
//! token-bearing download URL the web SDK would hand back.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;

use crate::error::AppError;

/// Largest avatar accepted (bytes, after base64 decoding).
pub const MAX_AVATAR_BYTES: usize = 1024 * 1024;

/// Accepted avatar formats: (extension, MIME type).
const ALLOWED_IMAGE_TYPES: [(&str, &str); 3] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// An image chosen in the profile editor.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    /// Reject anything that is not a PNG/JPEG of acceptable size.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bytes.is_empty() {
            return Err(AppError::BadRequest("Avatar image is empty".to_string()));
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(AppError::BadRequest(format!(
                "Avatar image exceeds {} bytes",
                MAX_AVATAR_BYTES
            )));
        }

        let extension = self
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let allowed = ALLOWED_IMAGE_TYPES
            .iter()
            .any(|(ext, mime)| *ext == extension && *mime == self.content_type);
        if !allowed {
            return Err(AppError::BadRequest(
                "Avatar must be a .png, .jpg or .jpeg image".to_string(),
            ));
        }
        Ok(())
    }

    /// Object path: `images/{uid}/{millis}_{filename}`.
    fn object_name(&self, uid: &str, now_millis: i64) -> String {
        let safe: String = self
            .filename
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("images/{}/{}_{}", uid, now_millis, safe)
    }
}

/// Storage upload response (subset).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

#[derive(Clone)]
enum Bucket {
    Firebase { http: reqwest::Client, base_url: String },
    Memory(Arc<DashMap<String, Vec<u8>>>),
}

/// Blob storage service for avatar images.
#[derive(Clone)]
pub struct StorageService {
    bucket_name: String,
    bucket: Bucket,
}

impl StorageService {
    /// Create a service for a Firebase Storage bucket.
    ///
    /// Honours FIREBASE_STORAGE_EMULATOR_HOST for local development.
    pub fn new(bucket_name: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            Ok(host) => format!("http://{}/v0/b", host),
            Err(_) => "https://firebasestorage.googleapis.com/v0/b".to_string(),
        };
        Self {
            bucket_name: bucket_name.to_string(),
            bucket: Bucket::Firebase {
                http: reqwest::Client::new(),
                base_url,
            },
        }
    }

    /// In-memory bucket for tests and offline mode.
    pub fn new_mock(bucket_name: &str) -> Self {
        Self {
            bucket_name: bucket_name.to_string(),
            bucket: Bucket::Memory(Arc::new(DashMap::new())),
        }
    }

    /// Upload an avatar and return its download URL.
    ///
    /// `id_token` authorises the upload against the bucket's security rules.
    pub async fn upload_avatar(
        &self,
        uid: &str,
        image: &AvatarUpload,
        id_token: Option<&str>,
    ) -> Result<String, AppError> {
        image.validate()?;
        let object_name = image.object_name(uid, crate::time_utils::now_millis());

        let url = match &self.bucket {
            Bucket::Firebase { http, base_url } => {
                let upload_url = format!("{}/{}/o", base_url, self.bucket_name);
                let mut request = http
                    .post(&upload_url)
                    .query(&[("uploadType", "media"), ("name", object_name.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, image.content_type.as_str())
                    .body(image.bytes.clone());
                if let Some(token) = id_token {
                    request = request.header(
                        reqwest::header::AUTHORIZATION,
                        format!("Firebase {}", token),
                    );
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::Storage(format!("HTTP {}: {}", status, body)));
                }

                let uploaded: UploadResponse = response
                    .json()
                    .await
                    .map_err(|e| AppError::Storage(format!("JSON parse error: {}", e)))?;

                self.download_url(
                    base_url,
                    &uploaded.name,
                    uploaded.download_tokens.as_deref(),
                )
            }
            Bucket::Memory(objects) => {
                objects.insert(object_name.clone(), image.bytes.clone());
                format!("memory://{}/{}", self.bucket_name, object_name)
            }
        };

        tracing::info!(
            uid,
            object = %object_name,
            size = image.bytes.len(),
            "Avatar uploaded"
        );
        Ok(url)
    }

    fn download_url(&self, base_url: &str, object_name: &str, token: Option<&str>) -> String {
        // Multiple tokens come back comma-separated; any one of them works.
        let token = token.and_then(|t| t.split(',').next());
        let mut url = format!(
            "{}/{}/o/{}?alt=media",
            base_url,
            self.bucket_name,
            urlencoding::encode(object_name)
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }

    /// Whether an object exists (offline bucket only; always false otherwise).
    pub fn contains_object(&self, url: &str) -> bool {
        match &self.bucket {
            Bucket::Memory(objects) => {
                let prefix = format!("memory://{}/", self.bucket_name);
                url.strip_prefix(&prefix)
                    .map(|name| objects.contains_key(name))
                    .unwrap_or(false)
            }
            Bucket::Firebase { .. } => false,
        }
    }
}
