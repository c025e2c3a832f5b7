use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideType {
    Title,
    Agenda,
    #[default]
    Standard,
    Conclusion,
    Closing,
}

impl SlideType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Agenda => "agenda",
            Self::Standard => "standard",
            Self::Conclusion => "conclusion",
            Self::Closing => "closing",
        }
    }
}

impl std::fmt::Display for SlideType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slide of a generated outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideOutline {
    pub slide_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default)]
    pub slide_type: SlideType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SlideOutline {
    pub fn new(slide_number: u32) -> Self {
        Self {
            slide_number,
            ..Self::default()
        }
    }
}
