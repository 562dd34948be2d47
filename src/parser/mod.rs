pub mod patterns;
pub mod text_extractor;
pub mod formula_recognizer;
pub mod structure_converter;
pub mod element_parser;

pub use text_extractor::TextExtractor;
pub use formula_recognizer::FormulaRecognizer;
pub use structure_converter::{StructureConverter, StructureRecognizer, StubStructureRecognizer};
pub use element_parser::ElementParser;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AnalyzerConfig;
use crate::report::{AnalysisReport, ReportAssembler};
use crate::utils::AnalyzeError;

/// 提取出的嵌入图片，data 为编码后的图片字节（jpeg/png 或原始流）
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub page: usize,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// 文本与图片的原始提取结果，由当次流水线独占，汇总后即丢弃
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub pages: Vec<String>,
    pub images: Vec<ExtractedImage>,
    pub warnings: Vec<String>,
}

/// 识别出的化学式，page 为首次出现的页码（1起）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalFormula {
    pub formula: String,
    pub page: usize,
}

/// 结构编码来源标记：占位结果必须与真实识别结果可区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingSource {
    Recognized,
    Placeholder,
}

/// 单张图片对应的结构编码（SMILES），与输入图片一一对应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEncoding {
    pub smiles: String,
    pub page: usize,
    pub source: EncodingSource,
}

/// 专利要素，各字段独立可缺失
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentElements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PatentElements {
    /// 已提取到的字段数量
    pub fn present_count(&self) -> usize {
        [
            &self.title,
            &self.abstract_text,
            &self.claims,
            &self.inventors,
            &self.applicant,
            &self.description,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

/// 流水线进度回调，由任务层实现并写回任务存储
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: u8, message: &str);
}

/// 不上报进度的空实现
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: u8, _message: &str) {}
}

/// 统一分析管道：文本提取 -> 化学式识别 -> 结构图转换 -> 要素提取 -> 汇总
pub struct AnalysisPipeline {
    extractor: TextExtractor,
    recognizer: FormulaRecognizer,
    converter: StructureConverter,
    element_parser: ElementParser,
    assembler: ReportAssembler,
}

impl AnalysisPipeline {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_converter(config, StructureConverter::new(config.min_structure_px))
    }

    /// 使用自定义结构识别器构建流水线，其余阶段不变
    pub fn with_converter(config: &AnalyzerConfig, converter: StructureConverter) -> Self {
        Self {
            extractor: TextExtractor::new(config.max_file_size_bytes()),
            recognizer: FormulaRecognizer::new(),
            converter,
            element_parser: ElementParser::new(),
            assembler: ReportAssembler,
        }
    }

    /// 对一份PDF字节流执行完整分析，返回最终报告
    pub fn analyze(
        &self,
        data: &[u8],
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisReport, AnalyzeError> {
        // 1. 提取文本与图片
        let extraction = self.extractor.extract(data)?;
        info!(
            "提取到 {} 页文本, {} 张图片",
            extraction.pages.len(),
            extraction.images.len()
        );
        progress.report(10, "文本提取完成");

        // 2. 化学式识别
        let formulas = self.recognizer.recognize(&extraction.pages);
        progress.report(40, "化学式识别完成");

        // 3. 结构图转换
        let encodings = self.converter.convert(&extraction.images);
        progress.report(70, "结构图转换完成");

        // 4. 专利要素提取
        let elements = self.element_parser.parse(&extraction.pages);
        progress.report(90, "生成分析报告...");

        // 5. 汇总
        let report = self.assembler.assemble(
            formulas,
            encodings,
            elements,
            extraction.pages.len(),
            extraction.images.len(),
        );
        Ok(report)
    }
}
