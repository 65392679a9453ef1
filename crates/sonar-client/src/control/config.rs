//! 控制器参数

use crate::ControlError;
use sonar_protocol::Axis;
use std::time::Duration;

/// 默认停车速度阈值（m/s）
pub const DEFAULT_STOP_SPEED: f64 = 0.2;

/// 单段控制器配置
///
/// 控制周期决定了刹车触发的空间分辨率：周期越长，刹车时刻的位移超出目标越多。
#[derive(Debug, Clone, PartialEq)]
pub struct RideConfig {
    /// 进入 Braking 后，速度不超过该值即停车（m/s）
    pub stop_speed_threshold: f64,

    /// 控制周期；`None` 表示按仿真器应答速度运行
    pub tick_period: Option<Duration>,

    /// tick 数上限
    pub max_ticks: Option<u64>,

    /// 单段时长上限
    pub max_duration: Option<Duration>,

    /// 主运动轴
    pub axis: Axis,
}

impl Default for RideConfig {
    fn default() -> Self {
        Self {
            stop_speed_threshold: DEFAULT_STOP_SPEED,
            tick_period: None,
            max_ticks: Some(100_000),
            max_duration: Some(Duration::from_secs(120)),
            axis: Axis::Y,
        }
    }
}

impl RideConfig {
    /// 校验配置
    ///
    /// 至少需要一个上限，否则一个永远达不到停车条件的控制器会无限运行。
    pub fn validate(&self) -> Result<(), ControlError> {
        if !(self.stop_speed_threshold.is_finite() && self.stop_speed_threshold >= 0.0) {
            return Err(ControlError::Config(format!(
                "stop speed threshold must be >= 0, got {}",
                self.stop_speed_threshold
            )));
        }
        if self.max_ticks.is_none() && self.max_duration.is_none() {
            return Err(ControlError::Config(
                "at least one of max_ticks / max_duration is required".to_string(),
            ));
        }
        if self.max_ticks == Some(0) {
            return Err(ControlError::Config("max_ticks must be > 0".to_string()));
        }
        if self.tick_period == Some(Duration::ZERO) {
            return Err(ControlError::Config(
                "tick period must be > 0 (use None to run unpaced)".to_string(),
            ));
        }
        Ok(())
    }
}
