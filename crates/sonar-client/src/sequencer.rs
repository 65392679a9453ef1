//! 两段机动编排
//!
//! 一次机动：传送到起点 → 检查链路 → 等待稳定 → 前进段 → 倒车段 → 导出并清空 → 等待稳定。
//! 前进段总是先于倒车段执行；一次机动的记录只会以该机动的标签导出。

use crate::control::{ActuationStrategy, ConstantThrottle, RideConfig, RideController, RideOutcome};
use crate::ControlError;
use sonar_driver::{DriverError, SensorBindings, StateSampler};
use sonar_protocol::{Leg, ManeuverProfile, Pose};
use sonar_sim::SimulatorAdapter;
use sonar_tools::{ExportArtifact, RecordExporter, RecordSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 可中断等待的检查间隔
const SETTLE_SLICE: Duration = Duration::from_millis(50);

/// 一次机动的输入
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub name: String,
    pub start_pose: Pose,
    pub forward: ManeuverProfile,
    pub backward: ManeuverProfile,
}

impl RunConfiguration {
    /// 以默认返程段（2 倍距离倒车）构造
    pub fn new(name: impl Into<String>, start_pose: Pose, forward: ManeuverProfile) -> Self {
        Self {
            name: name.into(),
            start_pose,
            backward: ManeuverProfile::return_for(&forward),
            forward,
        }
    }

    pub fn with_backward(mut self, backward: ManeuverProfile) -> Self {
        self.backward = backward;
        self
    }
}

/// 各段等待时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// 传送之后（消除瞬态物理状态）
    pub post_teleport: Duration,
    /// 前进段与倒车段之间
    pub between_legs: Duration,
    /// 机动结束后（让下一次传送从静止状态开始）
    pub post_run: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            post_teleport: Duration::from_millis(200),
            between_legs: Duration::ZERO,
            post_run: Duration::from_secs(5),
        }
    }
}

impl SettleDelays {
    /// 不等待（测试、Mock）
    pub fn none() -> Self {
        Self {
            post_teleport: Duration::ZERO,
            between_legs: Duration::ZERO,
            post_run: Duration::ZERO,
        }
    }
}

/// 编排器配置
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequencerConfig {
    pub ride: RideConfig,
    pub settle: SettleDelays,
    /// 运行失败时以 `{label}_partial` 导出已采集的记录
    pub flush_on_abort: bool,
}

/// 一次机动的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverReport {
    pub label: String,
    pub forward: RideOutcome,
    pub backward: RideOutcome,
    pub artifact: ExportArtifact,
}

impl ManeuverReport {
    pub fn ticks(&self) -> u64 {
        self.forward.ticks() + self.backward.ticks()
    }
}

/// 两段机动编排器
pub struct ManeuverSequencer {
    config: SequencerConfig,
    strategy: Arc<dyn ActuationStrategy>,
    cancel: Option<Arc<AtomicBool>>,
}

impl ManeuverSequencer {
    pub fn new(config: SequencerConfig) -> Result<Self, ControlError> {
        config.ride.validate()?;
        Ok(Self {
            config,
            strategy: Arc::new(ConstantThrottle),
            cancel: None,
        })
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ActuationStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// 是否已收到停止信号
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// 执行一次完整机动并以 `label` 导出记录
    ///
    /// 无论成功与否，返回时 `sink` 都是空的。
    pub fn run<A>(
        &self,
        adapter: &mut A,
        bindings: &SensorBindings,
        sink: &mut RecordSink,
        label: &str,
        run: &RunConfiguration,
        exporter: &mut dyn RecordExporter,
    ) -> Result<ManeuverReport, ControlError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        let started = Instant::now();
        sink.clear();
        sink.set_columns(bindings.ids());

        let (forward, backward) = match self.run_legs(adapter, bindings, sink, run) {
            Ok(legs) => legs,
            Err(e) => {
                self.discard_or_flush(sink, label, exporter);
                return Err(e);
            },
        };

        let artifact = sink
            .export_and_clear(label, exporter)
            .map_err(|source| ControlError::Export {
                label: label.to_string(),
                source,
            })?;
        info!(
            "Run '{}' exported {} rows ({} forward + {} backward ticks) in {:?}",
            label,
            artifact.rows,
            forward.ticks(),
            backward.ticks(),
            started.elapsed()
        );

        // 记录已导出：停止信号只缩短等待，由下一次运行负责终止
        if self.settle(self.config.settle.post_run).is_err() {
            info!("Post-run settle for '{}' interrupted by stop request", label);
        }

        Ok(ManeuverReport {
            label: label.to_string(),
            forward,
            backward,
            artifact,
        })
    }

    fn run_legs<A>(
        &self,
        adapter: &mut A,
        bindings: &SensorBindings,
        sink: &mut RecordSink,
        run: &RunConfiguration,
    ) -> Result<(RideOutcome, RideOutcome), ControlError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        adapter.teleport(&run.start_pose)?;
        if !adapter.is_connected() {
            return Err(DriverError::NotConnected.into());
        }
        self.settle(self.config.settle.post_teleport)?;

        let mut sampler = StateSampler::new(adapter, bindings, self.config.ride.axis);
        let forward = self.leg(Leg::Forward, run.forward).run(&mut sampler, sink)?;
        self.settle(self.config.settle.between_legs)?;
        let backward = self.leg(Leg::Backward, run.backward).run(&mut sampler, sink)?;
        Ok((forward, backward))
    }

    fn leg(&self, leg: Leg, profile: ManeuverProfile) -> RideController {
        let controller = RideController::new(leg, profile, self.config.ride.clone())
            .with_strategy(Arc::clone(&self.strategy));
        match &self.cancel {
            Some(cancel) => controller.with_cancel_flag(Arc::clone(cancel)),
            None => controller,
        }
    }

    fn discard_or_flush(&self, sink: &mut RecordSink, label: &str, exporter: &mut dyn RecordExporter) {
        if !self.config.flush_on_abort || sink.is_empty() {
            sink.clear();
            return;
        }
        let partial = format!("{}_partial", label);
        match sink.export_and_clear(&partial, exporter) {
            Ok(artifact) => warn!("Flushed {} partial rows under '{}'", artifact.rows, partial),
            Err(e) => warn!("Failed to flush partial records under '{}': {:#}", partial, e),
        }
    }

    /// 可中断的等待
    fn settle(&self, duration: Duration) -> Result<(), ControlError> {
        if duration.is_zero() {
            return Ok(());
        }
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return Err(ControlError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SETTLE_SLICE));
        }
    }
}
