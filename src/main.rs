//! Workflow Message Broker CLI
//!
//! 本地调用工具：从文件或标准输入读取一条工作流事件并路由。
//! 生产环境中事件由状态机执行器直接投递。

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use workflow_message_broker::{
    classify, BrokerConfig, MessageBroker, WorkflowEvent, DEFAULT_CLEANUP_STATE,
    DEFAULT_ERROR_HANDLER_STATE,
};

#[derive(Parser)]
#[command(name = "wmb")]
#[command(about = "Workflow Message Broker - 路由工作流状态事件")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 路由一条工作流事件（发布通知 / 写时间戳记录）
    Route {
        /// 事件 JSON 文件（缺省从标准输入读取）
        #[arg(long)]
        event: Option<PathBuf>,
        /// 只打印将要执行的副作用，不实际发送
        #[arg(long)]
        dry_run: bool,
    },
    /// 只做分类，打印事件对应的处理路径
    Classify {
        /// 事件 JSON 文件（缺省从标准输入读取）
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// 打印当前解析到的配置
    Config,
}

/// 从文件或标准输入读取事件
fn read_event(path: Option<&PathBuf>) -> Result<WorkflowEvent> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read event from stdin")?;
            buf
        }
    };
    WorkflowEvent::from_json(&raw).context("Failed to parse workflow event")
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("workflow_message_broker=info,wmb=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Route { event, dry_run } => {
            let config = BrokerConfig::from_env()?;
            let broker = MessageBroker::from_config(config)?.with_dry_run(dry_run);
            let event = read_event(event.as_ref())?;
            let outcome = broker.classify_event(&event);
            broker.route(&event).await?;
            println!("事件已处理: {}", outcome);
        }
        Commands::Classify { event } => {
            // 分类只需要两个状态名，不要求完整配置
            let error_state = std::env::var("ERROR_HANDLER_STATE")
                .unwrap_or_else(|_| DEFAULT_ERROR_HANDLER_STATE.to_string());
            let cleanup_state = std::env::var("CLEANUP_STATE")
                .unwrap_or_else(|_| DEFAULT_CLEANUP_STATE.to_string());
            let event = read_event(event.as_ref())?;
            let outcome = classify(&event.context.state.name, &error_state, &cleanup_state);
            println!("{}", outcome);
        }
        Commands::Config => {
            let mut config = BrokerConfig::from_env()?;
            config.gateway_token = "***".to_string();
            println!("{:#?}", config);
        }
    }

    Ok(())
}
