use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::AnalysisReport;

/// 任务状态机：pending -> processing -> completed | failed，终态不再变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 单个分析任务的完整状态。result 与 error 互斥，仅在对应终态下有值。
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub filename: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    fn new(id: String, filename: String) -> Self {
        Self {
            id,
            filename,
            status: TaskStatus::Pending,
            progress: 0,
            message: "等待处理...".to_string(),
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// 进程内任务表。进程启动时为空，不落盘，进程退出即丢失全部任务记录。
/// 所有读写都经过内部读写锁，调用方看到的任务快照总是完整的单次转移结果。
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建 pending 任务并返回任务ID
    pub fn create(&self, filename: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let task = Task::new(id.clone(), filename.to_string());
        self.tasks.write().unwrap().insert(id.clone(), task);
        id
    }

    /// 读取任务当前快照
    pub fn snapshot(&self, id: &str) -> Option<Task> {
        self.tasks.read().unwrap().get(id).cloned()
    }

    /// pending -> processing
    pub fn begin(&self, id: &str) {
        let mut tasks = self.tasks.write().unwrap();
        if let Some(task) = tasks.get_mut(id) {
            if task.status.is_terminal() {
                return;
            }
            task.status = TaskStatus::Processing;
            task.message = "开始分析PDF文件...".to_string();
        }
    }

    /// 仅在 processing 中更新进度；进度单调不减
    pub fn set_progress(&self, id: &str, progress: u8, message: &str) {
        let mut tasks = self.tasks.write().unwrap();
        if let Some(task) = tasks.get_mut(id) {
            if task.status != TaskStatus::Processing {
                return;
            }
            task.progress = task.progress.max(progress.min(100));
            task.message = message.to_string();
        }
    }

    /// processing -> completed，写入最终报告
    pub fn complete(&self, id: &str, report: AnalysisReport) {
        let mut tasks = self.tasks.write().unwrap();
        if let Some(task) = tasks.get_mut(id) {
            if task.status.is_terminal() {
                return;
            }
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.message = "分析完成".to_string();
            task.result = Some(report);
            task.error = None;
        }
    }

    /// 任意阶段出错 -> failed，记录错误信息
    pub fn fail(&self, id: &str, error: String) {
        let mut tasks = self.tasks.write().unwrap();
        if let Some(task) = tasks.get_mut(id) {
            if task.status.is_terminal() {
                return;
            }
            task.status = TaskStatus::Failed;
            task.message = format!("分析失败: {}", error);
            task.result = None;
            task.error = Some(error);
        }
    }
}
