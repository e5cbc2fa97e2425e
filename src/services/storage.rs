//! Selfie object storage behind a signing gateway.
//!
//! URLs look like `<endpoint>/<bucket>/<key>?method=PUT&expires=<unix>&content_type=<mime>&signature=<hex>`
//! where the signature is HMAC-SHA256 over `method \n bucket/key \n expires \n content_type`.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use serde::Serialize;
use sha2::Sha256;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const MAX_FILE_NAME_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UrlMethod {
    Get,
    Put,
    Delete,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedUrl {
    #[schema(example = "selfies/12/1718000000-front.jpg")]
    pub key: String,
    pub url: String,
    #[schema(value_type = String, format = "date-time")]
    pub expires_at: DateTime<Utc>,
}

/// Accepts `[A-Za-z0-9._-]{1,128}` without a leading dot.
pub fn validate_file_name(file_name: &str) -> Result<&str, AppError> {
    let ok = !file_name.is_empty()
        && file_name.len() <= MAX_FILE_NAME_LEN
        && !file_name.starts_with('.')
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(file_name)
    } else {
        Err(AppError::invalid("Invalid file name"))
    }
}

/// `selfies/<employee_id>/<file_name>`
pub fn object_key(employee_id: u64, file_name: &str) -> Result<String, AppError> {
    let file_name = validate_file_name(file_name.trim())?;
    Ok(format!("selfies/{}/{}", employee_id, file_name))
}

pub struct SelfieStorage {
    client: Client,
    endpoint: String,
    bucket: String,
    secret: String,
    ttl_secs: u64,
}

impl SelfieStorage {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.storage_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.storage_endpoint.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            secret: config.storage_signing_secret.clone(),
            ttl_secs: config.presigned_url_ttl,
        })
    }

    fn signature(&self, method: UrlMethod, key: &str, expires: i64, content_type: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(AppError::internal)?;
        mac.update(method.as_ref().as_bytes());
        mac.update(b"\n");
        mac.update(self.bucket.as_bytes());
        mac.update(b"/");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(content_type.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn presign(
        &self,
        method: UrlMethod,
        key: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, AppError> {
        let expires = now.timestamp() + self.ttl_secs as i64;
        let content_type = content_type.unwrap_or_default();
        let signature = self.signature(method, key, expires, content_type)?;

        let base = format!("{}/{}/{}", self.endpoint, self.bucket, key);
        let mut url = Url::parse(&base).map_err(AppError::internal)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("method", method.as_ref());
            query.append_pair("expires", &expires.to_string());
            if !content_type.is_empty() {
                query.append_pair("content_type", content_type);
            }
            query.append_pair("signature", &signature);
        }

        let expires_at = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or_else(|| AppError::internal("presign expiry out of range"))?;

        Ok(SignedUrl {
            key: key.to_string(),
            url: url.to_string(),
            expires_at,
        })
    }

    /// Deletes an object; failures are logged and swallowed.
    pub async fn delete_best_effort(&self, key: &str) {
        let signed = match self.presign(UrlMethod::Delete, key, None, Utc::now()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key, error = %e, "Could not sign selfie delete");
                return;
            }
        };

        match self
            .client
            .delete(&signed.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(_) => tracing::debug!(key, "Superseded selfie deleted"),
            Err(e) => tracing::warn!(key, error = %e, "Failed to delete superseded selfie"),
        }
    }
}
