//! 单段控制
//!
//! - `config`: 控制器参数（停车阈值、控制周期、上限）
//! - `strategy`: Actuating 状态的油门策略
//! - `ride`: 单段状态机

mod config;
mod ride;
mod strategy;

pub use config::RideConfig;
pub use ride::{RideController, RideOutcome};
pub use strategy::{ActuationStrategy, ConstantThrottle, SpeedGoverned};
