//! summary 命令
//!
//! 读取一次运行的二进制录制并打印读数统计

use anyhow::Result;
use clap::Args;
use sonar_protocol::SensorId;
use sonar_tools::{SonarRecording, run_statistics};
use std::path::PathBuf;

/// 统计命令参数
#[derive(Args, Debug)]
pub struct SummaryCommand {
    /// 录制文件路径（`{label}.bin`）
    pub input: PathBuf,

    /// 以 TOML 输出（便于脚本处理）
    #[arg(long)]
    pub toml: bool,
}

impl SummaryCommand {
    pub fn execute(&self) -> Result<()> {
        let recording = SonarRecording::load(&self.input)?;
        let columns: Vec<SensorId> = recording.metadata.sensors.iter().map(SensorId::new).collect();
        let stats = run_statistics(&columns, &recording.records);

        if self.toml {
            print!("{}", toml::to_string_pretty(&stats)?);
            return Ok(());
        }

        let meta = &recording.metadata;
        println!("📁 文件: {}", self.input.display());
        println!("🏷️  标签: {}", meta.label);
        println!("🕐 录制时间: {} ({})", meta.created_at, meta.platform);
        println!();
        println!("📊 {} 个 tick:", stats.ticks);
        println!("  前进  驱动 {:>6}  刹车 {:>6}", stats.forward_actuating, stats.forward_braking);
        println!("  倒车  驱动 {:>6}  刹车 {:>6}", stats.backward_actuating, stats.backward_braking);
        println!();
        println!(
            "  {:<16} {:>7} {:>7} {:>8} {:>8} {:>8} {:>8}",
            "sensor", "valid", "rate", "min", "max", "mean", "std"
        );
        let cell = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
        for sensor in &stats.sensors {
            println!(
                "  {:<16} {:>7} {:>6.1}% {:>8} {:>8} {:>8} {:>8}",
                sensor.id,
                sensor.valid,
                sensor.valid_rate(),
                cell(sensor.min),
                cell(sensor.max),
                cell(sensor.mean),
                cell(sensor.std_dev)
            );
        }
        Ok(())
    }
}
