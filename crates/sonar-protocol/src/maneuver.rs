//! 单向运动段描述
//!
//! 纯数据，无行为。一个运动段（leg）由一个 `RideController` 实例执行。

use crate::{Gear, ProtocolError};

/// 默认油门
pub const DEFAULT_THROTTLE: f64 = 0.2;

/// 默认前进距离（m），需要给刹车距离留出余量
pub const DEFAULT_DISTANCE: f64 = 4.5;

/// 运动段参数（构造后不可变）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawProfile"))]
pub struct ManeuverProfile {
    throttle: f64,
    target_displacement: f64,
    gear: Gear,
}

impl ManeuverProfile {
    /// 创建并校验运动段
    ///
    /// - `throttle`: (0, 1]
    /// - `target_displacement`: > 0（沿运动轴的绝对位移，m）
    pub fn new(throttle: f64, target_displacement: f64, gear: Gear) -> Result<Self, ProtocolError> {
        if !(throttle.is_finite() && throttle > 0.0 && throttle <= 1.0) {
            return Err(ProtocolError::InvalidProfile {
                reason: format!("throttle must be in (0, 1], got {}", throttle),
            });
        }
        if !(target_displacement.is_finite() && target_displacement > 0.0) {
            return Err(ProtocolError::InvalidProfile {
                reason: format!(
                    "target displacement must be > 0, got {}",
                    target_displacement
                ),
            });
        }
        Ok(Self {
            throttle,
            target_displacement,
            gear,
        })
    }

    /// 默认前进段（油门 0.2，距离 4.5 m）
    pub fn forward_default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            target_displacement: DEFAULT_DISTANCE,
            gear: Gear::Forward,
        }
    }

    /// 与前进段配对的返程段
    ///
    /// 倒车距离为前进距离的 2 倍（返回起点并修正超调）。
    pub fn return_for(forward: &ManeuverProfile) -> Self {
        Self {
            throttle: forward.throttle,
            target_displacement: forward.target_displacement * 2.0,
            gear: Gear::Reverse,
        }
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn target_displacement(&self) -> f64 {
        self.target_displacement
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }
}

/// 运动段在一次完整机动中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Leg {
    Forward,
    Backward,
}

impl Leg {
    pub fn as_str(self) -> &'static str {
        match self {
            Leg::Forward => "forward",
            Leg::Backward => "backward",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// 控制器状态
///
/// `Actuating` → `Braking` → `Stopped`，只进不退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RidePhase {
    Actuating,
    Braking,
    Stopped,
}

impl RidePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RidePhase::Actuating => "actuating",
            RidePhase::Braking => "braking",
            RidePhase::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RidePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawProfile {
    throttle: f64,
    #[serde(alias = "distance")]
    target_displacement: f64,
    gear: Gear,
}

#[cfg(feature = "serde")]
impl TryFrom<RawProfile> for ManeuverProfile {
    type Error = ProtocolError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        ManeuverProfile::new(raw.throttle, raw.target_displacement, raw.gear)
    }
}
