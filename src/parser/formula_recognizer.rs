use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};

use super::patterns::PatternLibrary;
use super::ChemicalFormula;

/// 上报的化学式数量上限
const MAX_FORMULAS: usize = 20;

/// 无下标数字时可接受的化学式最大长度
const MAX_PLAIN_LEN: usize = 6;

/// 单个下标数字的最大位数，超出视为编号而非化学式
const MAX_SUBSCRIPT_DIGITS: usize = 3;

pub struct FormulaRecognizer {
    patterns: Vec<(Regex, &'static str)>,
}

impl FormulaRecognizer {
    pub fn new() -> Self {
        Self {
            patterns: PatternLibrary::formula_patterns(),
        }
    }

    /// 从各页文本中识别化学式，按首次出现顺序去重
    pub fn recognize(&self, pages: &[String]) -> Vec<ChemicalFormula> {
        let mut formulas: Vec<ChemicalFormula> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (page_idx, text) in pages.iter().enumerate() {
            for (pattern, kind) in &self.patterns {
                for mat in pattern.find_iter(text) {
                    let raw = mat.as_str();
                    if raw.len() < 2 {
                        continue;
                    }

                    let canonical = match canonicalize(raw) {
                        Some(c) => c,
                        None => continue,
                    };
                    if seen.contains(&canonical) {
                        continue;
                    }

                    debug!("化学式匹配 [{}]: {} -> {}", kind, raw, canonical);
                    seen.insert(canonical.clone());
                    formulas.push(ChemicalFormula {
                        formula: canonical,
                        page: page_idx + 1,
                    });
                }
            }
        }

        formulas.truncate(MAX_FORMULAS);
        info!("化学式识别完成，共 {} 个", formulas.len());
        formulas
    }
}

/// 校验候选串并归一化大小写；返回 None 表示不是合理的化学式。
///
/// 规则：全部字母必须能切分为真实元素符号；至少含一个常见元素；
/// 无下标数字时要求多元素组成且原文大小写规范，抑制普通单词误判。
fn canonicalize(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut symbols: Vec<String> = Vec::new();
    let mut has_digit = false;
    let mut digit_run = 0usize;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '(' || c == ')' {
            out.push(c);
            digit_run = 0;
            i += 1;
        } else if c.is_ascii_digit() {
            has_digit = true;
            digit_run += 1;
            if digit_run > MAX_SUBSCRIPT_DIGITS {
                return None;
            }
            out.push(c);
            i += 1;
        } else if c.is_ascii_alphabetic() {
            digit_run = 0;
            // 仅当后继是小写字母时尝试双字母元素符号
            if i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase() {
                let mut pair = String::new();
                pair.push(c.to_ascii_uppercase());
                pair.push(chars[i + 1]);
                if PatternLibrary::is_element_symbol(&pair) {
                    out.push_str(&pair);
                    symbols.push(pair);
                    i += 2;
                    continue;
                }
            }
            let single = c.to_ascii_uppercase().to_string();
            if !PatternLibrary::is_element_symbol(&single) {
                return None;
            }
            out.push_str(&single);
            symbols.push(single);
            i += 1;
        } else {
            return None;
        }
    }

    if symbols.is_empty() {
        return None;
    }
    if !symbols.iter().any(|s| PatternLibrary::is_common_element(s)) {
        return None;
    }
    if !has_digit {
        // 无下标时：至少两个元素、长度适中、且原文已是规范写法
        if symbols.len() < 2 || raw.len() < 3 || raw.len() > MAX_PLAIN_LEN || raw != out {
            return None;
        }
    }
    if PatternLibrary::is_stop_word(raw) {
        return None;
    }

    Some(out)
}
