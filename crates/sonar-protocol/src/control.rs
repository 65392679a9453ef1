//! 执行器命令
//!
//! 仿真器的 `control` 调用是发后即忘（fire-and-forget）的：
//! 没有返回值，最后一条命令持续生效直到被下一条覆盖。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 档位选择
///
/// 数值与仿真器的整数档位约定一致（自动挡前进位为 2）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(i8)]
pub enum Gear {
    Reverse = -1,
    Neutral = 0,
    Forward = 2,
}

impl Gear {
    /// 从原始整数档位转换
    pub fn from_raw(value: i8) -> Result<Self, ProtocolError> {
        Gear::try_from(value).map_err(|_| ProtocolError::InvalidGear { value })
    }

    /// 原始整数档位
    pub fn as_raw(self) -> i8 {
        self.into()
    }

    /// 行驶方向符号（前进 +1，倒车 -1，空挡 0）
    pub fn direction(self) -> f64 {
        match self {
            Gear::Forward => 1.0,
            Gear::Reverse => -1.0,
            Gear::Neutral => 0.0,
        }
    }
}

/// 单条执行器命令
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlCommand {
    /// 油门（0.0 - 1.0）
    pub throttle: f64,

    /// 刹车（0.0 - 1.0）
    pub brake: f64,

    /// 驻车制动
    pub parking_brake: bool,

    /// 档位
    pub gear: Gear,
}

impl ControlCommand {
    /// 全力制动
    pub const FULL_BRAKE: f64 = 1.0;

    /// 驱动命令（刹车松开）
    pub fn drive(throttle: f64, gear: Gear) -> Self {
        Self {
            throttle: throttle.clamp(0.0, 1.0),
            brake: 0.0,
            parking_brake: false,
            gear,
        }
    }

    /// 滑行命令（油门归零，保持档位）
    pub fn coast(gear: Gear) -> Self {
        Self {
            throttle: 0.0,
            brake: 0.0,
            parking_brake: false,
            gear,
        }
    }

    /// 完全停车命令
    ///
    /// 无论来源运动段的档位如何，停车时档位总是 `Neutral`。
    pub fn full_stop() -> Self {
        Self {
            throttle: 0.0,
            brake: Self::FULL_BRAKE,
            parking_brake: true,
            gear: Gear::Neutral,
        }
    }

    /// 是否为完全停车命令
    pub fn is_full_stop(&self) -> bool {
        self.throttle == 0.0
            && self.brake >= Self::FULL_BRAKE
            && self.parking_brake
            && self.gear == Gear::Neutral
    }
}
