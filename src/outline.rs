//! Parses model output into an ordered slide outline.
//!
//! The model is asked (see [`crate::prompt`]) to answer in a delimiter format:
//!
//! ```text
//! ===== 슬라이드 1 =====
//! 제목: 소개
//! 내용:
//! - 포인트1
//! 노트: 발표자 메모
//! ```
//!
//! Model output is not schema-constrained, so parsing is permissive. When no
//! delimited slide is found the whole text is re-read as a numbered list
//! (`1. title - description`). Malformed input never fails; it yields fewer
//! slides or none.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::formats::{SlideOutline, SlideType};

pub const SLIDE_LABEL: &str = "슬라이드";
pub const DELIMITER_FENCE: &str = "=====";
pub const TITLE_MARKER: &str = "제목:";
pub const CONTENT_MARKER: &str = "내용:";
pub const NOTES_MARKER: &str = "노트:";

pub const DEFAULT_MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;

static SLIDE_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=====\s*슬라이드\s*\d+\s*=====").expect("slide delimiter regex is valid")
});
static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"제목:\s*(.+)").expect("title regex is valid"));
static NOTES_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"노트:\s*(.+)").expect("notes regex is valid"));
static BULLET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*•]\s*(.+)$").expect("bullet regex is valid"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag regex is valid"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));
static LIST_ITEM_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*\.\s*").expect("list item regex is valid"));
static LIST_ITEM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\d+\.").expect("list boundary regex is valid"));

/// Slide-type rules, evaluated in order; the first rule with a matching
/// keyword wins.
const SLIDE_TYPE_RULES: &[(&[&str], SlideType)] = &[
    (&["소개", "시작", "welcome", "introduction"], SlideType::Title),
    (&["목차", "agenda", "outline"], SlideType::Agenda),
    (&["결론", "마무리", "conclusion"], SlideType::Conclusion),
    (&["감사", "질문", "thank", "question"], SlideType::Closing),
];

#[derive(Debug, thiserror::Error)]
enum SegmentError {
    #[error("slide index {0} does not fit a slide number")]
    SlideNumberOverflow(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct OutlineParser {
    max_input_bytes: usize,
}

impl Default for OutlineParser {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl OutlineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_input_bytes(max_input_bytes: usize) -> Self {
        Self {
            max_input_bytes: max_input_bytes.max(1),
        }
    }

    pub fn max_input_bytes(&self) -> usize {
        self.max_input_bytes
    }

    pub fn parse(&self, raw: &str) -> Result<Vec<SlideOutline>, ParseError> {
        if raw.len() > self.max_input_bytes {
            return Err(ParseError::InputTooLarge {
                actual: raw.len(),
                limit: self.max_input_bytes,
            });
        }

        let slides = parse_delimited(raw);
        if !slides.is_empty() {
            tracing::debug!(slides = slides.len(), "parsed delimited slide outline");
            return Ok(slides);
        }

        let slides = parse_numbered_list(raw);
        tracing::debug!(
            slides = slides.len(),
            "no delimited slides; parsed numbered list"
        );
        Ok(slides)
    }
}

/// Parses with the default input limit.
pub fn parse(raw: &str) -> Result<Vec<SlideOutline>, ParseError> {
    OutlineParser::default().parse(raw)
}

fn parse_delimited(raw: &str) -> Vec<SlideOutline> {
    let mut segments: Vec<&str> = SLIDE_DELIMITER.split(raw).skip(1).collect();
    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }

    segments
        .into_iter()
        .enumerate()
        .map(|(idx, segment)| parse_segment(segment.trim(), idx + 1))
        .filter_map(|result| match result {
            Ok(slide) => Some(slide),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unparseable slide segment");
                None
            }
        })
        .collect()
}

fn parse_segment(segment: &str, index: usize) -> Result<SlideOutline, SegmentError> {
    let slide_number =
        u32::try_from(index).map_err(|_| SegmentError::SlideNumberOverflow(index))?;
    let mut slide = SlideOutline::new(slide_number);

    slide.title = first_capture(&TITLE_LINE, segment);
    if let Some(content) = content_block(segment) {
        slide.bullet_points = extract_bullets(&content);
        slide.content = Some(content);
    }
    slide.notes = first_capture(&NOTES_LINE, segment);
    slide.slide_type = infer_slide_type(slide.title.as_deref(), slide.content.as_deref());

    Ok(slide)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
}

/// Text after the content marker, up to the notes marker or the end.
fn content_block(segment: &str) -> Option<String> {
    let start = segment.find(CONTENT_MARKER)? + CONTENT_MARKER.len();
    let rest = segment[start..].trim_start();
    let end = rest.find(NOTES_MARKER).unwrap_or(rest.len());
    Some(rest[..end].trim().to_owned())
}

/// Reads `N. title - description` items. The description runs until the next
/// line that starts a numbered item, or the end of the text.
fn parse_numbered_list(raw: &str) -> Vec<SlideOutline> {
    let mut slides = Vec::new();
    let mut cursor = 0;

    while let Some(caps) = LIST_ITEM_START.captures_at(raw, cursor) {
        let (Some(item), Some(number)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        // The title needs at least one character before its separator dash.
        let title_start = item.end();
        let Some(first) = raw[title_start..].chars().next() else {
            break;
        };
        let dash_from = title_start + first.len_utf8();
        let dash = match raw[dash_from..].find('-') {
            Some(rel) => dash_from + rel,
            // `1. - text`: the space before the dash serves as the title.
            None if first == '-' && raw[..title_start].ends_with(char::is_whitespace) => {
                title_start
            }
            None => break,
        };

        let after_dash = dash + 1;
        let Some(first_desc) = raw[after_dash..].chars().next() else {
            break;
        };
        let skipped = raw[after_dash..].len() - raw[after_dash..].trim_start().len();
        let desc_start = if after_dash + skipped < raw.len() {
            after_dash + skipped
        } else {
            after_dash
        };
        let desc_min_end = desc_start.max(after_dash + first_desc.len_utf8());
        let desc_end = LIST_ITEM_BOUNDARY
            .find_at(raw, desc_min_end)
            .map(|m| m.start())
            .unwrap_or(raw.len());

        let slide_number = match number.as_str().parse::<u32>() {
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(number = number.as_str(), error = %err, "stopping numbered list parse");
                break;
            }
        };

        let mut slide = SlideOutline::new(slide_number);
        slide.title = Some(raw[title_start..dash].trim().to_owned());
        slide.content = Some(raw[desc_start..desc_end].trim().to_owned());
        slide.slide_type = SlideType::Standard;
        slides.push(slide);

        cursor = desc_end;
    }

    slides
}

/// Every `-`, `*` or `•` line of `content`, marker stripped, in line order.
pub fn extract_bullets(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| first_capture(&BULLET_LINE, line))
        .filter(|bullet| !bullet.is_empty())
        .collect()
}

pub fn infer_slide_type(title: Option<&str>, content: Option<&str>) -> SlideType {
    if title.is_none() && content.is_none() {
        return SlideType::Standard;
    }

    let text = [title, content]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    SLIDE_TYPE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(_, slide_type)| *slide_type)
        .unwrap_or(SlideType::Standard)
}

/// True when the slide has a non-blank title or non-blank content.
pub fn is_valid(outline: &SlideOutline) -> bool {
    let non_blank = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
    non_blank(&outline.title) || non_blank(&outline.content)
}

pub fn summarize(outlines: &[SlideOutline]) -> String {
    if outlines.is_empty() {
        return "No slide outlines.".to_owned();
    }

    let noun = if outlines.len() == 1 { "slide" } else { "slides" };
    let mut summary = format!("{} {noun}:\n\n", outlines.len());
    for outline in outlines {
        let title = outline.title.as_deref().unwrap_or("(untitled)");
        summary.push_str(&format!("{}. {title}\n", outline.slide_number));
    }
    summary
}

/// Strips `<...>` tags and collapses whitespace runs into single spaces.
pub fn sanitize(content: &str) -> String {
    let without_tags = HTML_TAG.replace_all(content, "");
    WHITESPACE_RUN
        .replace_all(&without_tags, " ")
        .trim()
        .to_owned()
}
