//! Inference service HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use vpe_media::{DetectionTarget, MediaError, MediaResult, Region, RegionDetector};

use crate::error::{InferenceError, InferenceResult};
use crate::types::{DetectRequest, DetectResponse, HealthResponse};

/// Configuration for the inference client.
#[derive(Debug, Clone)]
pub struct InferenceClientConfig {
    /// Base URL of the model server
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Confidence floor passed with every request
    pub min_confidence: f32,
}

impl Default for InferenceClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 2,
            min_confidence: 0.5,
        }
    }
}

impl InferenceClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("INFERENCE_SERVICE_URL")
                .unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("INFERENCE_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("INFERENCE_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            min_confidence: std::env::var("INFERENCE_MIN_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_confidence),
        }
    }
}

/// Client for the model server.
pub struct InferenceClient {
    http: Client,
    config: InferenceClientConfig,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(config: InferenceClientConfig) -> InferenceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(InferenceError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        Self::new(InferenceClientConfig::from_env())
    }

    /// Check if the model server is healthy.
    pub async fn health_check(&self) -> InferenceResult<bool> {
        let url = format!("{}/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("Inference health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Inference health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Run one detection pass over a clip.
    pub async fn detect(&self, request: &DetectRequest) -> InferenceResult<DetectResponse> {
        let url = format!("{}/detect", self.config.base_url);

        debug!("Sending {} detection request to {}", request.target, url);

        let response = self
            .with_retry(|| async {
                self.http
                    .post(&url)
                    .json(request)
                    .send()
                    .await
                    .map_err(InferenceError::Network)
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::RequestFailed(format!(
                "inference service returned {}: {}",
                status, body
            )));
        }

        let detect_response: DetectResponse = response.json().await?;
        Ok(detect_response)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> InferenceResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = InferenceResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Inference request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(InferenceError::RequestFailed("Unknown error".to_string())))
    }
}

#[async_trait]
impl RegionDetector for InferenceClient {
    async fn detect_regions(
        &self,
        clip: &Path,
        target: DetectionTarget,
    ) -> MediaResult<Vec<Region>> {
        let request = DetectRequest {
            input_path: clip.to_string_lossy().into_owned(),
            target: target.as_str().to_string(),
            min_confidence: Some(self.config.min_confidence),
        };

        let response = self
            .detect(&request)
            .await
            .map_err(|e| MediaError::detection_failed(e.to_string()))?;

        Ok(response
            .detections
            .into_iter()
            .map(|d| Region {
                x: d.x,
                y: d.y,
                width: d.width,
                height: d.height,
                confidence: d.confidence,
                label: d.label,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> InferenceClient {
        InferenceClient::new(InferenceClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(2),
            max_retries: 0,
            min_confidence: 0.5,
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = InferenceClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_detect_parses_regions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .and(body_partial_json(json!({ "target": "faces" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "detections": [
                    { "x": 10, "y": 20, "width": 40, "height": 40,
                      "confidence": 0.91, "label": "face" }
                ]
            })))
            .mount(&server)
            .await;

        let regions = client_for(&server)
            .detect_regions(Path::new("/work/clip.mp4"), DetectionTarget::Faces)
            .await
            .unwrap();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].x, 10);
        assert_eq!(regions[0].label.as_deref(), Some("face"));
        assert!((regions[0].confidence - 0.91).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_server_error_becomes_detection_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .detect_regions(Path::new("/work/clip.mp4"), DetectionTarget::Objects)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::DetectionFailed(_)));
    }

    #[tokio::test]
    async fn test_health_check_degraded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "degraded", "version": "1.2.0" })),
            )
            .mount(&server)
            .await;

        assert!(!client_for(&server).health_check().await.unwrap());
    }
}
