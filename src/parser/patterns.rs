use regex::Regex;

/// 全部元素符号（1-118号）
const ELEMENT_SYMBOLS: &[&str] = &[
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga",
    "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd",
    "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os",
    "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa",
    "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg",
    "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// 专利文本中的高频元素，化学式合理性过滤用
const COMMON_ELEMENTS: &[&str] = &[
    "C", "H", "O", "N", "S", "P", "Cl", "Br", "F", "I", "Na", "K", "Ca", "Mg",
];

/// 易被误判为化学式的英文常用词
const STOP_WORDS: &[&str] = &[
    "THE", "AND", "FOR", "WITH", "ARE", "CAN", "MAY", "USE", "WHO",
];

/// 识别模式集中管理，便于扩展语言和启发式而不动控制流
pub struct PatternLibrary;

impl PatternLibrary {
    /// 化学式启发式模式，按优先级排列
    pub fn formula_patterns() -> Vec<(Regex, &'static str)> {
        vec![
            // 有机化合物常见模式 (如 C6H6, C8H10O)，大小写不敏感以兼容扫描件文本
            (
                Regex::new(r"(?i)\bC\d+H\d+(?:[A-Z][a-z]?\d*)*\b").unwrap(),
                "organic",
            ),
            // 含括号的复杂化学式 (如 Ca(OH)2, Al2(SO4)3)
            (
                Regex::new(
                    r"\b[A-Z][a-z]?\d*(?:\([A-Z][a-z]?\d*(?:[A-Z][a-z]?\d*)*\)\d*)+(?:[A-Z][a-z]?\d*)*\b",
                )
                .unwrap(),
                "parenthesized",
            ),
            // 基本化学式模式 (如 H2SO4, NaCl)
            (
                Regex::new(r"\b[A-Z][a-z]?\d*(?:[A-Z][a-z]?\d*)*\b").unwrap(),
                "basic",
            ),
        ]
    }

    /// 各专利要素的候选模式，英文与中文（繁/简）并列，取第一个命中
    pub fn element_patterns() -> ElementPatterns {
        // 单行要素：取到行尾
        let line = |prefix: &str| {
            Regex::new(&format!(r"(?i){}\s*[:：]?\s*([^\n]+)", prefix)).unwrap()
        };
        // 段落要素：取到空行或文末
        let block = |prefix: &str| {
            Regex::new(&format!(r"(?is){}\s*[:：]?\s*(.+?)(?:\n\s*\n|\z)", prefix)).unwrap()
        };

        ElementPatterns {
            title: vec![
                line("Title of Invention"),
                line("發明名稱"),
                line("发明名称"),
                line("TITLE"),
                line("標題"),
                line("标题"),
            ],
            abstract_text: vec![block("Abstract"), block("摘要")],
            claims: vec![block("Claims?"), block("請求項"), block("权利要求")],
            inventors: vec![line("Inventors?"), line("發明人"), line("发明人")],
            applicant: vec![line("Applicants?"), line("申請人"), line("申请人")],
            description: vec![
                block(r"(?:Detailed\s+)?Description"),
                block("詳細說明"),
                block("详细说明"),
            ],
        }
    }

    pub fn is_element_symbol(symbol: &str) -> bool {
        ELEMENT_SYMBOLS.contains(&symbol)
    }

    pub fn is_common_element(symbol: &str) -> bool {
        COMMON_ELEMENTS.contains(&symbol)
    }

    pub fn is_stop_word(candidate: &str) -> bool {
        STOP_WORDS
            .iter()
            .any(|w| w.eq_ignore_ascii_case(candidate))
    }
}

/// 单个专利要素的候选模式列表
pub struct ElementPatterns {
    pub title: Vec<Regex>,
    pub abstract_text: Vec<Regex>,
    pub claims: Vec<Regex>,
    pub inventors: Vec<Regex>,
    pub applicant: Vec<Regex>,
    pub description: Vec<Regex>,
}
