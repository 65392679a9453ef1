//! 驱动层模块
//!
//! 本模块负责同步采样，包括：
//! - 传感器绑定管理（挂载顺序即列顺序）
//! - 状态采样（车辆状态 + 全部传感器读数）
//!
//! # 使用场景
//!
//! 控制核心（`sonar-client`）通过 [`StateSampler`] 读取车辆状态并下发命令。
//! 大多数用户应该使用 `sonar-client` / `sonar-control` 提供的更高级接口。

mod bindings;
mod error;
mod sampler;

pub use bindings::{SensorBinding, SensorBindings};
pub use error::DriverError;
pub use sampler::{AxisSample, StateSampler};
