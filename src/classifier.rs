//! Food recognition boundary: a model scores the image, the arg-max index is
//! mapped through the bundled label list.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// One score per label, in label order.
    async fn scores(&self, image: Bytes, content_type: &str) -> Result<Vec<f32>, AppError>;
}

/// Posts the raw image to an inference server answering `{"scores": [...]}`.
pub struct RemoteClassifier {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ScoresResponse {
    scores: Vec<f32>,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build classifier http client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ImageClassifier for RemoteClassifier {
    async fn scores(&self, image: Bytes, content_type: &str) -> Result<Vec<f32>, AppError> {
        let unavailable = |e: String| {
            warn!(error = %e, url = %self.url, "classifier call failed");
            AppError::ClassificationUnavailable(e)
        };
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status())));
        }
        let body: ScoresResponse = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(body.scores)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// One label per line; `fried_rice` reads as `fried rice`.
    pub fn parse(text: &str) -> Self {
        let labels = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.replace('_', " "))
            .collect();
        Self { labels }
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read labels {}", path.display()))?;
        let set = Self::parse(&text);
        anyhow::ensure!(!set.is_empty(), "label file {} is empty", path.display());
        Ok(set)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

fn is_supported_image(ct: &str) -> bool {
    matches!(
        ct,
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/heic"
    )
}

pub struct Recognizer {
    classifier: Arc<dyn ImageClassifier>,
    labels: LabelSet,
}

impl Recognizer {
    pub fn new(classifier: Arc<dyn ImageClassifier>, labels: LabelSet) -> Self {
        Self { classifier, labels }
    }

    /// Food label for the image.
    pub async fn recognize(&self, image: Bytes, content_type: &str) -> Result<String, AppError> {
        if image.is_empty() {
            return Err(AppError::ClassificationUnavailable("image is empty".into()));
        }
        if !is_supported_image(content_type) {
            return Err(AppError::ClassificationUnavailable(format!(
                "unsupported image type {content_type}"
            )));
        }

        let scores = self.classifier.scores(image, content_type).await?;
        if scores.len() != self.labels.len() {
            return Err(AppError::ClassificationUnavailable(format!(
                "model returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }
        let idx = argmax(&scores)
            .ok_or_else(|| AppError::ClassificationUnavailable("no usable score".into()))?;
        let label = self
            .labels
            .get(idx)
            .ok_or_else(|| AppError::ClassificationUnavailable(format!("no label {idx}")))?;
        debug!(idx, %label, "image classified");
        Ok(label.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) struct FixedScores(pub Vec<f32>);

    #[async_trait]
    impl ImageClassifier for FixedScores {
        async fn scores(&self, _: Bytes, _: &str) -> Result<Vec<f32>, AppError> {
            Ok(self.0.clone())
        }
    }

    fn labels() -> LabelSet {
        LabelSet::parse("apple_pie\nfried_rice\n\nramen\n")
    }

    #[test]
    fn labels_read_underscores_as_spaces() {
        let set = labels();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1), Some("fried rice"));
        assert_eq!(set.get(3), None);
    }

    #[test]
    fn blank_label_file_is_rejected() {
        assert!(LabelSet::parse("\n   \n").is_empty());
        assert!(!labels().is_empty());

        let path = std::env::temp_dir().join(format!("labels-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "\n\n").unwrap();
        let err = LabelSet::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn argmax_ignores_nan() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.9]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn supported_image_types() {
        assert!(is_supported_image("image/jpeg"));
        assert!(is_supported_image("image/png"));
        assert!(!is_supported_image("application/octet-stream"));
    }

    #[tokio::test]
    async fn recognize_maps_best_score_to_label() {
        let r = Recognizer::new(Arc::new(FixedScores(vec![0.05, 0.9, 0.05])), labels());
        let label = r
            .recognize(Bytes::from_static(b"\xff\xd8jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(label, "fried rice");
    }

    #[tokio::test]
    async fn recognize_rejects_missing_or_invalid_input() {
        let r = Recognizer::new(Arc::new(FixedScores(vec![1.0, 0.0, 0.0])), labels());
        assert!(matches!(
            r.recognize(Bytes::new(), "image/jpeg").await,
            Err(AppError::ClassificationUnavailable(_))
        ));
        assert!(matches!(
            r.recognize(Bytes::from_static(b"text"), "text/plain").await,
            Err(AppError::ClassificationUnavailable(_))
        ));

        let short = Recognizer::new(Arc::new(FixedScores(vec![1.0])), labels());
        assert!(short
            .recognize(Bytes::from_static(b"img"), "image/png")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn remote_classifier_reads_scores() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scores": [0.2, 0.1, 0.7]})))
            .mount(&server)
            .await;

        let remote = RemoteClassifier::new(format!("{}/classify", server.uri())).unwrap();
        let scores = remote.scores(Bytes::from_static(b"png"), "image/png").await.unwrap();
        assert_eq!(scores, vec![0.2, 0.1, 0.7]);
    }

    #[tokio::test]
    async fn remote_classifier_failure_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let remote = RemoteClassifier::new(server.uri()).unwrap();
        let err = remote.scores(Bytes::from_static(b"png"), "image/png").await.unwrap_err();
        assert!(matches!(err, AppError::ClassificationUnavailable(_)));
    }
}
