//! # Sonar Protocol
//!
//! 车辆运动与测距传感器的数据模型（无仿真器依赖）
//!
//! ## 模块
//!
//! - `vehicle`: 车辆状态、位姿、运动轴
//! - `control`: 执行器命令（油门、刹车、档位）
//! - `sensor`: 传感器标识、测距读数、安装描述
//! - `maneuver`: 单向运动段描述（ManeuverProfile）、运动段与控制器状态标签
//! - `scene`: 场景描述（仅透传给仿真器适配层）
//!
//! ## 单位
//!
//! 所有距离使用米（m），速度使用米/秒（m/s），角度输入使用度（°）。

pub mod control;
mod error;
pub mod maneuver;
pub mod scene;
pub mod sensor;
pub mod vehicle;

// 重新导出常用类型
pub use control::{ControlCommand, Gear};
pub use error::ProtocolError;
pub use maneuver::{DEFAULT_DISTANCE, DEFAULT_THROTTLE, Leg, ManeuverProfile, RidePhase};
pub use scene::{SceneDescriptor, StaticObstacle};
pub use sensor::{
    DEFAULT_MAX_RANGE, Distance, SensorDescriptor, SensorId, SensorLayout, SensorReading,
};
pub use vehicle::{Axis, Pose, VehicleState};

/// 三维向量（米 / 米每秒）
pub type Vec3 = nalgebra::Vector3<f64>;
