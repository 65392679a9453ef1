//! 批次计划
//!
//! 由批次配置构造：传感器安装方案列表 + 运行列表 + 失败策略。

use crate::BatchError;
use sonar_client::{
    ActuationStrategy, ConstantThrottle, RideConfig, RunConfiguration, SequencerConfig,
    SettleDelays, SpeedGoverned,
};
use sonar_protocol::SensorLayout;
use sonar_tools::{BatchConfig, FailurePolicy};
use std::sync::Arc;
use std::time::Duration;

/// 批次计划
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    /// 外层循环（例如不同安装高度）
    pub sensor_sets: Vec<SensorLayout>,
    /// 内层循环
    pub runs: Vec<RunConfiguration>,
    pub failure_policy: FailurePolicy,
}

impl BatchPlan {
    pub fn new(sensor_sets: Vec<SensorLayout>, runs: Vec<RunConfiguration>) -> Self {
        Self {
            sensor_sets,
            runs,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// 由批次配置构造（先校验）
    pub fn from_config(config: &BatchConfig) -> Result<Self, BatchError> {
        config.validate().map_err(config_error)?;
        let sensor_sets = config.sensor_layouts().map_err(config_error)?;

        let mut runs = Vec::with_capacity(config.runs.len());
        for (index, run) in config.runs.iter().enumerate() {
            let forward = config.forward_profile(run).map_err(config_error)?;
            let start_pose = config
                .start_pose(index)
                .ok_or_else(|| BatchError::Config(format!("run #{} has no start pose", index)))?;
            runs.push(RunConfiguration::new(run.name.clone(), start_pose, forward));
        }

        Ok(Self {
            sensor_sets,
            runs,
            failure_policy: config.failure_policy,
        })
    }

    /// 运行总数
    pub fn len(&self) -> usize {
        self.sensor_sets.len() * self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 导出标签：只有一个安装方案时为运行名，否则为 `{方案}_{运行}`
    pub fn label(&self, set: &SensorLayout, run: &RunConfiguration) -> String {
        if self.sensor_sets.len() <= 1 {
            run.name.clone()
        } else {
            format!("{}_{}", set.name, run.name)
        }
    }
}

fn config_error(e: impl std::fmt::Display) -> BatchError {
    BatchError::Config(format!("{:#}", e))
}

/// 编排器配置
pub fn sequencer_config(config: &BatchConfig) -> SequencerConfig {
    let c = &config.controller;
    let s = &config.sequencer;
    SequencerConfig {
        ride: RideConfig {
            stop_speed_threshold: c.stop_speed,
            tick_period: c.tick_period(),
            max_ticks: c.max_ticks(),
            max_duration: c.max_duration(),
            axis: c.axis,
        },
        settle: SettleDelays {
            post_teleport: Duration::from_millis(s.post_teleport_ms),
            between_legs: Duration::from_millis(s.between_legs_ms),
            post_run: Duration::from_millis(s.post_run_ms),
        },
        flush_on_abort: s.flush_on_abort,
    }
}

/// 油门策略：配置了 `coast_above` 时限速滑行
pub fn actuation_strategy(config: &BatchConfig) -> Arc<dyn ActuationStrategy> {
    match config.controller.coast_above {
        Some(coast_above) => Arc::new(SpeedGoverned::new(coast_above)),
        None => Arc::new(ConstantThrottle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_tools::{RunSection, SensorSetSection};

    fn config() -> BatchConfig {
        BatchConfig {
            sensor_sets: vec![SensorSetSection {
                name: "h060".to_string(),
                height: Some(0.6),
                sensors: Vec::new(),
            }],
            runs: vec![RunSection::named("wall"), RunSection::named("curbstone")],
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_from_config() {
        let plan = BatchPlan::from_config(&config()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.failure_policy, FailurePolicy::SkipRun);
        assert_eq!(plan.runs[1].backward.target_displacement(), 9.0);
        // 第二个运行沿 X 轴偏移 10 m
        let dx = plan.runs[1].start_pose.position.x - plan.runs[0].start_pose.position.x;
        assert_eq!(dx, 10.0);
    }

    #[test]
    fn test_labels() {
        let mut plan = BatchPlan::from_config(&config()).unwrap();
        let run = plan.runs[0].clone();
        assert_eq!(plan.label(&plan.sensor_sets[0], &run), "wall");

        plan.sensor_sets.push(SensorLayout::front_pair(0.35));
        let set = plan.sensor_sets[0].clone();
        assert_eq!(plan.label(&set, &run), "h060_wall");
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let mut config = config();
        config.runs.clear();
        let err = BatchPlan::from_config(&config).unwrap_err();
        assert!(matches!(err, BatchError::Config(ref m) if m.contains("runs")), "{}", err);
    }

    #[test]
    fn test_sequencer_config_mapping() {
        let mut config = config();
        config.controller.tick_period_ms = Some(20);
        config.controller.max_ticks = 0;
        config.sequencer.flush_on_abort = true;
        let seq = sequencer_config(&config);
        assert_eq!(seq.ride.tick_period, Some(Duration::from_millis(20)));
        assert_eq!(seq.ride.max_ticks, None);
        assert_eq!(seq.ride.max_duration, Some(Duration::from_secs(120)));
        assert_eq!(seq.settle.post_run, Duration::from_secs(5));
        assert!(seq.flush_on_abort);

        assert_eq!(actuation_strategy(&config).name(), "constant");
        config.controller.coast_above = Some(0.7);
        assert_eq!(actuation_strategy(&config).name(), "speed_governed");
    }
}
