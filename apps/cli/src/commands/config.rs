//! 配置管理命令

use crate::settings;
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::fs;
use std::path::PathBuf;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写入示例配置
    Init {
        /// 配置文件路径（默认 ~/.config/sonar/batch.toml）
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },

    /// 打印生效的配置（含环境变量覆盖）
    Show {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 打印默认配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { config, force } => {
                let path = settings::resolve_path(config.as_deref())?;
                if path.exists() && !force {
                    bail!("❌ 配置文件已存在: {}（使用 --force 覆盖）", path.display());
                }
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
                }
                let text = settings::sample_config().to_toml_string()?;
                fs::write(&path, text)
                    .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
                println!("✅ 已写入示例配置: {}", path.display());
                Ok(())
            },

            ConfigCommand::Show { config } => {
                let (path, config) = settings::load(config.as_deref())?;
                println!("# {}", path.display());
                print!("{}", config.to_toml_string()?);
                Ok(())
            },

            ConfigCommand::Path => {
                let path = settings::resolve_path(None)?;
                println!("{}", path.display());
                Ok(())
            },
        }
    }
}
