//! check 命令
//!
//! 校验配置并打印运行计划（不连接仿真器）

use crate::settings;
use anyhow::Result;
use clap::Args;
use sonar_control::BatchPlan;
use std::path::PathBuf;

/// 校验命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl CheckCommand {
    pub fn execute(&self) -> Result<()> {
        let (path, config) = settings::load(self.config.as_deref())?;
        let plan = BatchPlan::from_config(&config)?;

        println!("✅ 配置有效: {}", path.display());
        println!();
        println!("🔌 仿真器: {}:{}", config.simulator.host, config.simulator.port);
        println!(
            "🗺️  场景: {} / {}（{} 个障碍物）",
            config.scene.map,
            config.scene.name,
            config.scene.obstacles.len()
        );
        println!("📁 输出: {} ({:?})", config.output.dir.display(), config.output.format);
        println!("📋 失败策略: {:?}", plan.failure_policy);
        println!();
        println!("共 {} 次运行:", plan.len());

        for set in &plan.sensor_sets {
            let sensors: Vec<String> = set.sensors.iter().map(|s| s.id.to_string()).collect();
            println!("  [{}] {}", set.name, sensors.join(", "));
            for run in &plan.runs {
                let p = run.start_pose.position;
                println!(
                    "    {:<24} 起点 ({:.1}, {:.1}, {:.1})  前进 {:.2} m @ {:.2}  倒车 {:.2} m",
                    plan.label(set, run),
                    p.x,
                    p.y,
                    p.z,
                    run.forward.target_displacement(),
                    run.forward.throttle(),
                    run.backward.target_displacement()
                );
            }
        }
        Ok(())
    }
}
