//! run 命令
//!
//! 执行整个批次：每个传感器安装方案 × 每个运行，导出一份记录

use crate::settings;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use sonar_client::{ManeuverSequencer, SettleDelays};
use sonar_control::{BatchPlan, FailurePolicy, MultiRunDriver, actuation_strategy, sequencer_config};
use sonar_sim::{BridgeAdapter, BridgeConfig, MockConfig, MockSimulator, SimulatorAdapter};
use sonar_tools::{BatchConfig, DEFAULT_LIVE_CAPACITY, LiveFeed};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::warn;

/// 失败策略（覆盖配置）
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// 跳过失败的运行
    Skip,
    /// 第一次失败即终止
    Abort,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Skip => FailurePolicy::SkipRun,
            PolicyArg::Abort => FailurePolicy::AbortBatch,
        }
    }
}

/// 批次执行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 使用内置运动学模型（不连接仿真器，不等待稳定）
    #[arg(long)]
    pub mock: bool,

    /// 实时显示最近距离
    #[arg(long)]
    pub live: bool,

    /// 失败策略（覆盖配置）
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let (path, mut config) = settings::load(self.config.as_deref())?;
        if let Some(dir) = &self.output {
            config.output.dir = dir.clone();
        }

        let mut plan = BatchPlan::from_config(&config)?;
        if let Some(policy) = self.policy {
            plan = plan.with_failure_policy(policy.into());
        }
        println!("📋 {}: {} 次运行", path.display(), plan.len());

        // 🚨 Ctrl-C：当前 tick 结束后全力刹车并终止批次
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_handler = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            eprintln!();
            eprintln!("🛑 收到停止信号，正在停车...");
            cancel_for_handler.store(true, Ordering::SeqCst);
        })
        .context("注册 Ctrl-C 处理器失败")?;

        let mut seq_config = sequencer_config(&config);
        if self.mock {
            seq_config.settle = SettleDelays::none();
        }
        let sequencer = ManeuverSequencer::new(seq_config)?
            .with_strategy(actuation_strategy(&config))
            .with_cancel_flag(cancel);
        let mut driver = MultiRunDriver::new(sequencer);

        let mut adapter = self.connect(&config)?;
        driver.prepare_scenario(&mut adapter, &config.scene)?;

        let monitor = self.live.then(|| spawn_monitor(driver.subscribe(DEFAULT_LIVE_CAPACITY)));

        let mut exporter = settings::exporter(&config.output);
        let result = driver.run(&mut adapter, &plan, exporter.as_mut());

        // 关闭实时订阅（发送端随 driver 释放）
        drop(driver);
        if let Some(handle) = monitor
            && handle.join().is_err()
        {
            warn!("Live monitor thread panicked");
        }
        if let Err(e) = adapter.close() {
            warn!("Failed to close simulator connection: {}", e);
        }

        let report = result?;
        println!();
        println!("📊 批次结果:");
        println!("  成功: {}", report.completed.len());
        println!("  跳过: {}", report.skipped.len());
        println!("  记录: {} 行", report.total_rows());
        println!("  耗时: {:.2} 秒", report.elapsed.as_secs_f64());
        for run in &report.completed {
            let target = run
                .report
                .artifact
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!(
                "  ✅ {:<24} {:>6} 行  刹车距离 {:.3} m  {}",
                run.label,
                run.report.artifact.rows,
                run.report.forward.displacement - run.report.forward.braking_displacement,
                target
            );
        }
        for skipped in &report.skipped {
            println!("  ⚠️  {:<24} {}", skipped.label, skipped.reason);
        }
        Ok(())
    }

    fn connect(&self, config: &BatchConfig) -> Result<Box<dyn SimulatorAdapter>> {
        if self.mock {
            println!("🧪 Mock 模式（内置运动学模型）");
            return Ok(Box::new(MockSimulator::new(MockConfig::default())));
        }

        let sim = &config.simulator;
        println!("⏳ 连接仿真器 {}:{}...", sim.host, sim.port);
        let bridge = BridgeConfig {
            host: sim.host.clone(),
            port: sim.port,
            home: sim.home.clone(),
            user: sim.user.clone(),
            connect_timeout: sim.connect_timeout()?,
            io_timeout: sim.io_timeout()?,
        };
        let adapter = BridgeAdapter::connect(&bridge)
            .with_context(|| format!("无法连接仿真器 {}:{}", sim.host, sim.port))?;
        println!("✅ 已连接");
        Ok(Box::new(adapter))
    }
}

/// 实时显示线程（只读副本，慢消费者只会丢弃副本）
fn spawn_monitor(feed: LiveFeed) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut count: u64 = 0;
        for record in feed.receiver().iter() {
            count += 1;
            let nearest = record
                .reading
                .nearest()
                .map(|d| format!("{:.2} m", d))
                .unwrap_or_else(|| "--".to_string());
            print!(
                "\r{:>8} {:<8} {:<9} 最近距离 {:>8}",
                count, record.leg, record.phase, nearest
            );
            std::io::stdout().flush().ok();
        }
        println!();
        if feed.dropped() > 0 {
            println!("⚠️  实时显示丢弃了 {} 条记录", feed.dropped());
        }
    })
}
