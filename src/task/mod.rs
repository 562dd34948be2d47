pub mod store;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::parser::{AnalysisPipeline, ProgressSink};
use crate::report::AnalysisReport;
use crate::utils::TaskError;
use store::{TaskStatus, TaskStore};

/// 投入队列的待分析任务
struct AnalysisJob {
    task_id: String,
    data: Vec<u8>,
}

/// 状态查询返回的轻量视图
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusView {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub filename: String,
}

/// 任务生命周期管理器：创建任务、驱动后台流水线、对外提供状态与结果查询。
/// 任务表仅存在于进程内存，重启后全部丢失。
pub struct TaskManager {
    store: TaskStore,
    job_tx: mpsc::UnboundedSender<AnalysisJob>,
}

impl TaskManager {
    /// 启动固定数量的后台工作者并返回管理器
    pub fn new(worker_count: usize, pipeline: Arc<AnalysisPipeline>) -> Self {
        assert!(worker_count > 0, "worker_count 必须大于 0");

        let store = TaskStore::new();
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let job_rx = Arc::new(Mutex::new(job_rx));

        for worker_id in 0..worker_count {
            tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&job_rx),
                store.clone(),
                Arc::clone(&pipeline),
            ));
        }
        info!("已启动 {} 个分析工作者", worker_count);

        Self { store, job_tx }
    }

    /// 提交文件字节流，立即返回任务ID，分析在后台执行
    pub fn submit(&self, filename: &str, data: Vec<u8>) -> Result<String, TaskError> {
        let task_id = self.store.create(filename);
        self.job_tx
            .send(AnalysisJob {
                task_id: task_id.clone(),
                data,
            })
            .map_err(|_| TaskError::QueueClosed)?;
        info!("任务已创建: {} ({})", task_id, filename);
        Ok(task_id)
    }

    /// 查询任务状态，非阻塞读
    pub fn status(&self, task_id: &str) -> Result<TaskStatusView, TaskError> {
        let task = self
            .store
            .snapshot(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        Ok(TaskStatusView {
            task_id: task.id,
            status: task.status,
            progress: task.progress,
            message: task.message,
            filename: task.filename,
        })
    }

    /// 获取最终报告；未完成或已失败时返回类型化错误
    pub fn result(&self, task_id: &str) -> Result<AnalysisReport, TaskError> {
        let task = self
            .store
            .snapshot(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        match task.status {
            TaskStatus::Completed => match task.result {
                Some(report) => Ok(report),
                None => Err(TaskError::Failed("分析结果缺失".to_string())),
            },
            TaskStatus::Failed => Err(TaskError::Failed(
                task.error.unwrap_or_else(|| "未知错误".to_string()),
            )),
            TaskStatus::Pending | TaskStatus::Processing => Err(TaskError::NotReady),
        }
    }
}

/// 把流水线进度写回任务存储
struct StoreProgress {
    store: TaskStore,
    task_id: String,
}

impl ProgressSink for StoreProgress {
    fn report(&self, progress: u8, message: &str) {
        self.store.set_progress(&self.task_id, progress, message);
    }
}

async fn run_worker(
    worker_id: usize,
    job_rx: Arc<Mutex<mpsc::UnboundedReceiver<AnalysisJob>>>,
    store: TaskStore,
    pipeline: Arc<AnalysisPipeline>,
) {
    loop {
        // 锁只覆盖取任务，不覆盖分析过程
        let job = { job_rx.lock().await.recv().await };
        let Some(job) = job else {
            info!("工作者 {} 队列已关闭，退出", worker_id);
            break;
        };

        let task_id = job.task_id;
        store.begin(&task_id);
        info!("工作者 {} 开始处理任务 {}", worker_id, task_id);

        let progress = StoreProgress {
            store: store.clone(),
            task_id: task_id.clone(),
        };
        let worker_pipeline = Arc::clone(&pipeline);
        let data = job.data;
        let outcome =
            tokio::task::spawn_blocking(move || worker_pipeline.analyze(&data, &progress)).await;

        match outcome {
            Ok(Ok(report)) => {
                store.complete(&task_id, report);
                info!("任务 {} 分析完成", task_id);
            }
            Ok(Err(e)) => {
                warn!("任务 {} 分析失败: {}", task_id, e);
                store.fail(&task_id, e.to_string());
            }
            Err(join_err) => {
                // 流水线 panic 同样收敛为任务失败，工作者继续存活
                error!("任务 {} 执行异常: {}", task_id, join_err);
                store.fail(&task_id, "分析过程中发生内部错误".to_string());
            }
        }
    }
}
