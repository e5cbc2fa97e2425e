//! Face comparison against the employee's registered reference selfie.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[async_trait]
pub trait FaceVerifier: Send + Sync {
    /// True when `candidate` shows the same face as `reference`. Both are
    /// selfie object keys.
    async fn matches(&self, reference: &str, candidate: &str) -> Result<bool, AppError>;
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    source_image: &'a str,
    target_image: &'a str,
    similarity_threshold: f64,
}

#[derive(Deserialize)]
struct CompareResponse {
    #[serde(default)]
    face_matches: Vec<FaceMatch>,
}

#[derive(Deserialize)]
struct FaceMatch {
    similarity: f64,
}

/// A match needs at least one candidate face at or above the threshold.
pub fn is_match(similarities: &[f64], threshold: f64) -> bool {
    similarities.iter().any(|s| *s >= threshold)
}

/// Calls a face comparison service over HTTP
pub struct HttpFaceVerifier {
    client: Client,
    url: String,
    threshold: f64,
}

impl HttpFaceVerifier {
    pub fn new(url: String, threshold: f64, timeout_secs: u64) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url, threshold })
    }
}

#[async_trait]
impl FaceVerifier for HttpFaceVerifier {
    async fn matches(&self, reference: &str, candidate: &str) -> Result<bool, AppError> {
        let res = self
            .client
            .post(&self.url)
            .json(&CompareRequest {
                source_image: reference,
                target_image: candidate,
                similarity_threshold: self.threshold,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!(error = %e, "Face comparison request failed");
                AppError::internal(e)
            })?;

        let body: CompareResponse = res.json().await.map_err(|e| {
            tracing::error!(error = %e, "Face comparison response was not understood");
            AppError::internal(e)
        })?;

        let similarities: Vec<f64> = body.face_matches.iter().map(|m| m.similarity).collect();
        let matched = is_match(&similarities, self.threshold);
        tracing::debug!(faces = similarities.len(), matched, "Face comparison finished");
        Ok(matched)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedVerifier;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn threshold_is_inclusive() {
        assert!(is_match(&[90.0], 90.0));
        assert!(is_match(&[12.0, 97.5], 90.0));
        assert!(!is_match(&[89.99], 90.0));
        assert!(!is_match(&[], 90.0));
    }

    #[test]
    fn response_without_matches_decodes_as_empty() {
        let body: CompareResponse = serde_json::from_str("{}").unwrap();
        assert!(body.face_matches.is_empty());
        let body: CompareResponse =
            serde_json::from_str(r#"{"face_matches":[{"similarity":99.1,"extra":1}]}"#).unwrap();
        assert_eq!(body.face_matches[0].similarity, 99.1);
    }

    #[actix_web::test]
    async fn verifier_is_usable_behind_a_trait_object() {
        let verifier: Arc<dyn FaceVerifier> = Arc::new(FixedVerifier(Ok(false)));
        assert!(!verifier.matches("a", "b").await.unwrap());

        let down: Arc<dyn FaceVerifier> = Arc::new(FixedVerifier(Err(())));
        assert!(matches!(down.matches("a", "b").await, Err(AppError::Internal(_))));
    }

    #[actix_web::test]
    async fn unreachable_service_is_internal() {
        let verifier = HttpFaceVerifier::new("http://127.0.0.1:9/compare".into(), 90.0, 1).unwrap();
        let result = verifier.matches("selfies/1/a.jpg", "selfies/1/b.jpg").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
