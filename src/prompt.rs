//! Prompt templates sent to the model.
//!
//! The slide format requested here is the grammar [`crate::outline`] reads;
//! both sides use the marker constants defined there.

use crate::outline::{CONTENT_MARKER, DELIMITER_FENCE, NOTES_MARKER, SLIDE_LABEL, TITLE_MARKER};

pub fn content_prompt(topic: &str, slide_count: u32, description: Option<&str>) -> String {
    let mut prompt = String::from("다음 조건에 맞는 프레젠테이션을 생성해주세요:\n\n");
    push_topic_fields(&mut prompt, topic, slide_count);
    push_optional(&mut prompt, "설명", description);

    prompt.push_str("\n각 슬라이드는 다음 형식으로 생성해주세요:\n");
    push_slide_format(&mut prompt, true);
    prompt.push('\n');
    prompt.push_str("전체적으로 논리적이고 체계적인 구성으로 만들어주세요.");
    prompt
}

pub fn outline_prompt(topic: &str, slide_count: u32, description: Option<&str>) -> String {
    let mut prompt = String::from("다음 조건에 맞는 프레젠테이션 아웃라인을 생성해주세요:\n\n");
    push_topic_fields(&mut prompt, topic, slide_count);
    push_optional(&mut prompt, "설명", description);

    prompt.push_str("\n각 슬라이드의 제목과 주요 내용만 간단히 나열해주세요:\n");
    prompt.push_str("1. [슬라이드 1 제목] - [간단한 설명]\n");
    prompt.push_str("2. [슬라이드 2 제목] - [간단한 설명]\n");
    prompt.push_str("...\n");
    prompt
}

pub fn improvement_prompt(original_prompt: &str, context: Option<&str>) -> String {
    let mut prompt = String::from("다음 프롬프트를 더 효과적이고 구체적으로 개선해주세요:\n\n");
    prompt.push_str(&format!("원본 프롬프트: {original_prompt}\n"));
    push_optional(&mut prompt, "맥락", context);

    prompt.push_str(
        "\n개선된 프롬프트를 제공해주세요. 더 구체적이고 명확하며 실행 가능한 형태로 만들어주세요.",
    );
    prompt
}

pub fn document_prompt(document: &str, topic: &str, slide_count: u32) -> String {
    let mut prompt = String::from("다음 문서 내용을 바탕으로 프레젠테이션을 생성해주세요:\n\n");
    prompt.push_str(&format!("문서 내용:\n{document}\n\n"));
    push_topic_fields(&mut prompt, topic, slide_count);

    prompt.push_str("\n문서의 핵심 내용을 바탕으로 논리적인 구성의 프레젠테이션을 만들어주세요.\n");
    prompt.push_str("각 슬라이드는 다음 형식으로 생성해주세요:\n");
    push_slide_format(&mut prompt, false);
    prompt
}

fn push_topic_fields(prompt: &mut String, topic: &str, slide_count: u32) {
    prompt.push_str(&format!("주제: {topic}\n"));
    prompt.push_str(&format!("슬라이드 개수: {slide_count}개\n"));
}

fn push_optional(prompt: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        prompt.push_str(&format!("{label}: {value}\n"));
    }
}

fn push_slide_format(prompt: &mut String, with_notes: bool) {
    prompt.push_str(&format!(
        "{DELIMITER_FENCE} {SLIDE_LABEL} [번호] {DELIMITER_FENCE}\n"
    ));
    prompt.push_str(&format!("{TITLE_MARKER} [슬라이드 제목]\n"));
    prompt.push_str(&format!("{CONTENT_MARKER}\n"));
    prompt.push_str("- [주요 포인트 1]\n");
    prompt.push_str("- [주요 포인트 2]\n");
    prompt.push_str("- [주요 포인트 3]\n");
    if with_notes {
        prompt.push_str(&format!("{NOTES_MARKER} [발표자 노트]\n"));
    }
}
