use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chempat::config::AppConfig;
use chempat::parser::AnalysisPipeline;
use chempat::task::TaskManager;
use chempat::utils::logger;

#[derive(Parser)]
#[command(name = "chempat")]
#[command(about = "化学专利PDF分析系统", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化配置文件
    Init,
    /// 分析专利PDF并输出报告
    Analyze {
        /// PDF文件路径
        file: PathBuf,
        /// 报告输出路径（缺省打印到标准输出）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("chempat 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Analyze { file, output } => {
            analyze_command(file, output).await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    tokio::fs::create_dir_all("config").await?;

    let app_config = AppConfig::default();
    app_config.save("config/settings.toml")?;
    info!("已生成配置文件: config/settings.toml");
    info!("✅ 初始化完成，运行 'chempat analyze <PDF>' 开始分析");

    Ok(())
}

async fn analyze_command(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load()?;
    let pipeline = Arc::new(AnalysisPipeline::new(&config.analyzer));
    let manager = TaskManager::new(config.worker.worker_count, pipeline);

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown.pdf".to_string());
    let data = tokio::fs::read(&file).await?;
    info!("已读取 {} ({} 字节)", filename, data.len());

    let task_id = manager.submit(&filename, data)?;

    // 轮询任务状态直到终态
    let mut last_progress = None;
    loop {
        let status = manager.status(&task_id)?;
        if last_progress != Some(status.progress) {
            info!("[{:>3}%] {}", status.progress, status.message);
            last_progress = Some(status.progress);
        }
        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    let report = manager.result(&task_id)?;
    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, &json).await?;
            info!("✅ 报告已写入: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
