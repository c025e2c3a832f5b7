use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_SLIDE_COUNT: u32 = 1;
pub const MAX_SLIDE_COUNT: u32 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    pub id: String,
    pub status: GenerationStatus,
    pub topic: String,

    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub artifact_path: Option<PathBuf>,
    pub message: Option<String>,
}

impl GenerationRecord {
    pub fn processing(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: GenerationStatus::Processing,
            topic: topic.into(),
            created_at: Utc::now(),
            finished_at: None,
            artifact_path: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub slide_count: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub presentation_style: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, slide_count: u32) -> Self {
        Self {
            topic: topic.into(),
            slide_count: Some(slide_count),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the request and returns the slide count to ask for.
    pub fn validate(&self) -> Result<u32, ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::BlankTopic);
        }
        let slide_count = self
            .slide_count
            .ok_or(ValidationError::MissingField { field: "slideCount" })?;
        if !(MIN_SLIDE_COUNT..=MAX_SLIDE_COUNT).contains(&slide_count) {
            return Err(ValidationError::SlideCountOutOfRange {
                actual: slide_count,
                min: MIN_SLIDE_COUNT,
                max: MAX_SLIDE_COUNT,
            });
        }
        Ok(slide_count)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_slide_count_bounds() {
        assert_eq!(GenerationRequest::new("Rust", 1).validate(), Ok(1));
        assert_eq!(GenerationRequest::new("Rust", 50).validate(), Ok(50));
    }

    #[test]
    fn rejects_out_of_range_slide_count() {
        for count in [0, 51] {
            let err = GenerationRequest::new("Rust", count).validate().unwrap_err();
            assert!(matches!(
                err,
                ValidationError::SlideCountOutOfRange { actual, .. } if actual == count
            ));
        }
    }

    #[test]
    fn rejects_blank_topic_and_missing_count() {
        assert_eq!(
            GenerationRequest::new("  \n", 5).validate(),
            Err(ValidationError::BlankTopic)
        );
        let request = GenerationRequest {
            topic: "Rust".to_owned(),
            ..GenerationRequest::default()
        };
        assert_eq!(
            request.validate(),
            Err(ValidationError::MissingField { field: "slideCount" })
        );
    }

    #[test]
    fn request_reads_camel_case_json() -> anyhow::Result<()> {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"topic":"AI","slideCount":8,"targetAudience":"students","language":"ko"}"#,
        )?;
        assert_eq!(request.slide_count, Some(8));
        assert_eq!(request.target_audience.as_deref(), Some("students"));
        assert_eq!(request.description, None);
        Ok(())
    }

    #[test]
    fn status_serializes_upper_case() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_string(&GenerationStatus::Processing)?,
            "\"PROCESSING\""
        );
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Processing.is_terminal());
        Ok(())
    }
}
