//! # Sonar CLI
//!
//! 超声波传感器分析批次的命令行工具。
//!
//! ```bash
//! # 生成示例配置
//! sonar-cli config init
//!
//! # 校验配置并打印运行计划
//! sonar-cli check
//!
//! # 执行批次（连接仿真器桥接进程）
//! sonar-cli run
//!
//! # 离线演练（内置运动学模型）
//! sonar-cli run --mock --live
//!
//! # 查看一次运行的录制统计
//! sonar-cli summary data/wall.bin
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use commands::{CheckCommand, ConfigCommand, RunCommand, SummaryCommand};

const DEFAULT_LOG_FILTER: &str = "sonar_cli=info,sonar_control=info,sonar_client=info";

/// Sonar CLI - 超声波传感器分析工具
#[derive(Parser, Debug)]
#[command(name = "sonar-cli")]
#[command(about = "Closed-loop maneuvers with synchronized ultrasonic sensor capture", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 校验配置并打印运行计划
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 执行批次
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 录制统计
    Summary {
        #[command(flatten)]
        args: SummaryCommand,
    },
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Check { args } => args.execute(),
        Commands::Run { args } => args.execute(),
        Commands::Summary { args } => args.execute(),
    }
}
