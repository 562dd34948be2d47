use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    /// 单个PDF的大小上限（MB），超过直接拒绝
    pub max_file_size_mb: u64,
    /// 小于该边长（像素）的图片不视为结构图
    pub min_structure_px: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    pub worker_count: usize,
}

impl AnalyzerConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb as usize * 1024 * 1024
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&PathBuf::from("config/settings.toml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig {
                max_file_size_mb: 50,
                min_structure_px: 50,
            },
            worker: WorkerConfig { worker_count: 4 },
        }
    }
}
