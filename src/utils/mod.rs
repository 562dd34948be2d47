pub mod logger;

use thiserror::Error;

/// 流水线输入类错误，在提取阶段检测并最终体现为任务失败
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("文件大小超过限制: {size} 字节 (上限 {limit} 字节)")]
    TooLarge { size: usize, limit: usize },

    #[error("PDF文档已加密，需要解密后才能分析")]
    Encrypted,

    #[error("PDF文档损坏或无法解析: {0}")]
    Corrupt(String),
}

/// 任务查询接口的类型化错误，同步返回给调用方而不写入任务状态
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("找不到指定的分析任务: {0}")]
    NotFound(String),

    #[error("分析尚未完成，无法获取报告")]
    NotReady,

    #[error("分析失败: {0}")]
    Failed(String),

    #[error("任务队列已关闭，无法提交新任务")]
    QueueClosed,
}
