use serde::{Deserialize, Serialize};
use tracing::info;

use crate::parser::{ChemicalFormula, PatentElements, StructureEncoding};

/// 化合物类型标签（对外取值固定）
pub const TYPE_ORGANIC: &str = "有機化合物";
pub const TYPE_INORGANIC_SALT: &str = "無機鹽類";
pub const TYPE_OTHER: &str = "其他化合物";

const NOVELTY_PENDING: &str = "需進一步評估";

/// 判定为无机盐的金属元素
const SALT_ELEMENTS: &[&str] = &["Na", "K", "Ca", "Mg"];

/// 强度策略阈值：claims 超过该字符数视为有实质权利要求
const CLAIMS_SUBSTANTIVE_CHARS: usize = 100;

/// 强度策略阈值：化合物数超过该值视为高强度
const HIGH_COMPOUND_COUNT: usize = 5;

/// 专利强度分级，对外序列化为固定标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatentStrength {
    #[serde(rename = "低")]
    Low,
    #[serde(rename = "中等")]
    Medium,
    #[serde(rename = "高")]
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_compounds: usize,
    pub total_structures: usize,
    pub pages_analyzed: usize,
    pub images_found: usize,
    pub compound_types: Vec<String>,
    pub patent_strength: PatentStrength,
    pub novelty_assessment: String,
}

/// 最终分析报告。顶层字段名是对外契约的一部分，不可变更。
/// 任务完成时创建一次，此后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub chemical_formulas: Vec<ChemicalFormula>,
    pub smiles_structures: Vec<StructureEncoding>,
    pub patent_elements: PatentElements,
    pub analysis_summary: AnalysisSummary,
    pub pages_processed: usize,
    pub images_extracted: usize,
}

pub struct ReportAssembler;

impl ReportAssembler {
    /// 汇总各阶段输出，生成确定性的最终报告
    pub fn assemble(
        &self,
        formulas: Vec<ChemicalFormula>,
        encodings: Vec<StructureEncoding>,
        elements: PatentElements,
        pages_processed: usize,
        images_extracted: usize,
    ) -> AnalysisReport {
        let compound_types = classify_compounds(&formulas);
        let patent_strength = strength_policy(formulas.len(), elements.claims.as_deref());

        let analysis_summary = AnalysisSummary {
            total_compounds: formulas.len(),
            total_structures: encodings.len(),
            pages_analyzed: pages_processed,
            images_found: images_extracted,
            compound_types,
            patent_strength,
            novelty_assessment: NOVELTY_PENDING.to_string(),
        };

        info!(
            "分析摘要: {} 个化合物, {} 个结构编码, 强度 {:?}",
            analysis_summary.total_compounds, analysis_summary.total_structures, patent_strength
        );

        AnalysisReport {
            chemical_formulas: formulas,
            smiles_structures: encodings,
            patent_elements: elements,
            analysis_summary,
            pages_processed,
            images_extracted,
        }
    }
}

/// 专利强度评估策略：默认低；claims 超过 100 字符升为中等；
/// 化合物数超过 5 个升为高。按此顺序评估，化合物规则优先。
pub fn strength_policy(compound_count: usize, claims: Option<&str>) -> PatentStrength {
    let mut strength = PatentStrength::Low;
    if claims.map_or(false, |c| c.chars().count() > CLAIMS_SUBSTANTIVE_CHARS) {
        strength = PatentStrength::Medium;
    }
    if compound_count > HIGH_COMPOUND_COUNT {
        strength = PatentStrength::High;
    }
    strength
}

/// 按元素组成对化学式集合分类，保持首次出现顺序去重
fn classify_compounds(formulas: &[ChemicalFormula]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for formula in formulas {
        let t = classify_formula(&formula.formula);
        if !types.iter().any(|existing| existing == t) {
            types.push(t.to_string());
        }
    }
    types
}

/// 单个化学式的类型：同含碳氢为有机物，含碱（土）金属为无机盐，其余归为其他
fn classify_formula(formula: &str) -> &'static str {
    if contains_symbol(formula, "C") && contains_symbol(formula, "H") {
        TYPE_ORGANIC
    } else if SALT_ELEMENTS.iter().any(|e| contains_symbol(formula, e)) {
        TYPE_INORGANIC_SALT
    } else {
        TYPE_OTHER
    }
}

/// 判断化学式中是否出现指定元素符号；符号后不能紧跟小写字母，
/// 避免 C 误中 Cl、Ca 之类的双字母符号。
fn contains_symbol(formula: &str, symbol: &str) -> bool {
    let bytes = formula.as_bytes();
    let mut start = 0;
    while let Some(pos) = formula[start..].find(symbol) {
        let idx = start + pos;
        let end = idx + symbol.len();
        let followed_by_lower = bytes.get(end).map_or(false, |b| b.is_ascii_lowercase());
        if !followed_by_lower {
            return true;
        }
        start = idx + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::EncodingSource;

    fn formula(name: &str) -> ChemicalFormula {
        ChemicalFormula {
            formula: name.to_string(),
            page: 1,
        }
    }

    fn encoding(smiles: &str) -> StructureEncoding {
        StructureEncoding {
            smiles: smiles.to_string(),
            page: 1,
            source: EncodingSource::Placeholder,
        }
    }

    #[test]
    fn test_classify_formula() {
        assert_eq!(classify_formula("C6H6"), TYPE_ORGANIC);
        assert_eq!(classify_formula("CH4"), TYPE_ORGANIC);
        assert_eq!(classify_formula("NaCl"), TYPE_INORGANIC_SALT);
        assert_eq!(classify_formula("Ca(OH)2"), TYPE_INORGANIC_SALT);
        assert_eq!(classify_formula("SO2"), TYPE_OTHER);
        // Cl 不能当作 C 处理
        assert_eq!(classify_formula("Cl2O"), TYPE_OTHER);
    }

    #[test]
    fn test_strength_policy_thresholds() {
        assert_eq!(strength_policy(0, None), PatentStrength::Low);
        assert_eq!(strength_policy(5, None), PatentStrength::Low);

        let short_claims = "a".repeat(100);
        assert_eq!(strength_policy(0, Some(&short_claims)), PatentStrength::Low);
        let long_claims = "a".repeat(101);
        assert_eq!(
            strength_policy(0, Some(&long_claims)),
            PatentStrength::Medium
        );

        // 化合物规则优先于权利要求规则
        assert_eq!(strength_policy(6, None), PatentStrength::High);
        assert_eq!(
            strength_policy(6, Some(&long_claims)),
            PatentStrength::High
        );
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let assembler = ReportAssembler;
        let build = || {
            assembler.assemble(
                vec![formula("C6H6"), formula("NaCl")],
                vec![encoding("CCO")],
                PatentElements {
                    claims: Some("权利要求内容".to_string()),
                    ..Default::default()
                },
                3,
                1,
            )
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_compound_types_ordered_dedup() {
        let assembler = ReportAssembler;
        let report = assembler.assemble(
            vec![
                formula("C6H6"),
                formula("C8H10"),
                formula("NaCl"),
                formula("SO2"),
            ],
            vec![],
            PatentElements::default(),
            1,
            0,
        );
        assert_eq!(
            report.analysis_summary.compound_types,
            vec![TYPE_ORGANIC, TYPE_INORGANIC_SALT, TYPE_OTHER]
        );
    }

    #[test]
    fn test_report_wire_field_names() {
        let assembler = ReportAssembler;
        let report = assembler.assemble(
            vec![formula("C6H6")],
            vec![encoding("c1ccccc1")],
            PatentElements::default(),
            2,
            1,
        );
        let value = serde_json::to_value(&report).unwrap();

        // 顶层字段名是对外契约
        for key in [
            "chemical_formulas",
            "smiles_structures",
            "patent_elements",
            "analysis_summary",
        ] {
            assert!(value.get(key).is_some(), "缺少字段 {}", key);
        }
        assert_eq!(
            value["analysis_summary"]["patent_strength"],
            serde_json::json!("低")
        );
        assert_eq!(
            value["smiles_structures"][0]["source"],
            serde_json::json!("placeholder")
        );
    }

    #[test]
    fn test_summary_counts() {
        let assembler = ReportAssembler;
        let report = assembler.assemble(
            vec![formula("C6H6"), formula("C2H6O")],
            vec![encoding("CCO"), encoding("*")],
            PatentElements::default(),
            7,
            2,
        );
        assert_eq!(report.analysis_summary.total_compounds, 2);
        assert_eq!(report.analysis_summary.total_structures, 2);
        assert_eq!(report.analysis_summary.pages_analyzed, 7);
        assert_eq!(report.analysis_summary.images_found, 2);
        assert_eq!(
            report.analysis_summary.novelty_assessment,
            "需進一步評估"
        );
    }
}
