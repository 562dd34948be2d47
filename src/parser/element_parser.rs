use regex::Regex;
use tracing::info;

use super::patterns::{ElementPatterns, PatternLibrary};
use super::PatentElements;

/// 要素内容超过该字符数时截断
const MAX_ELEMENT_CHARS: usize = 500;

/// 过短的匹配视为噪声
const MIN_ELEMENT_CHARS: usize = 5;

pub struct ElementParser {
    patterns: ElementPatterns,
}

impl ElementParser {
    pub fn new() -> Self {
        Self {
            patterns: PatternLibrary::element_patterns(),
        }
    }

    /// 从全文中提取专利要素，各字段互不影响，未命中即缺失
    pub fn parse(&self, pages: &[String]) -> PatentElements {
        let full_text = pages.join("\n");
        let elements = PatentElements {
            title: first_match(&self.patterns.title, &full_text),
            abstract_text: first_match(&self.patterns.abstract_text, &full_text),
            claims: first_match(&self.patterns.claims, &full_text),
            inventors: first_match(&self.patterns.inventors, &full_text),
            applicant: first_match(&self.patterns.applicant, &full_text),
            description: first_match(&self.patterns.description, &full_text),
        };
        info!("专利要素提取完成: {} 个字段", elements.present_count());
        elements
    }
}

/// 按顺序尝试候选模式，取第一个有效命中
fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Some(matched) = caps.get(1) {
                let content = matched.as_str().trim();
                if content.chars().count() > MIN_ELEMENT_CHARS {
                    return Some(truncate_chars(content, MAX_ELEMENT_CHARS));
                }
            }
        }
    }
    None
}

/// 按字符数截断，不会切在多字节字符中间
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
