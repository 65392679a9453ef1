//! 传感器记录
//!
//! 每个控制 tick 产生一条记录。记录在 sink 中的序号即时间戳代理，创建后不再修改。

use serde::{Deserialize, Serialize};
use sonar_protocol::{Leg, RidePhase, SensorReading};

/// 单个 tick 的传感器记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// 所属运动段
    pub leg: Leg,

    /// 产生记录时的控制器状态
    pub phase: RidePhase,

    /// 全部传感器读数（挂载顺序）
    pub reading: SensorReading,
}

impl SensorRecord {
    pub fn new(leg: Leg, phase: RidePhase, reading: SensorReading) -> Self {
        Self {
            leg,
            phase,
            reading,
        }
    }
}
