//! 控制核心模块
//!
//! 本模块把高层机动请求（“前进 N 米，再倒车 2N 米”）转换为逐 tick 的执行器命令，包括：
//! - 单段状态机（[`RideController`]：Actuating → Braking → Stopped）
//! - 油门策略（恒定油门 / 限速滑行）
//! - 两段机动编排（[`ManeuverSequencer`]：传送、等待、前进、倒车、导出）
//!
//! # 时序
//!
//! 控制循环是同步阻塞的：每个 tick 的状态轮询、命令下发、传感器轮询都是到仿真器的一次往返，
//! 下一个 tick 的决策严格依赖上一个 tick 的采样结果。每个控制决策都对应一条传感器记录。

pub mod control;
mod error;
pub mod sequencer;

pub use control::{
    ActuationStrategy, ConstantThrottle, RideConfig, RideController, RideOutcome, SpeedGoverned,
};
pub use error::ControlError;
pub use sequencer::{ManeuverReport, ManeuverSequencer, RunConfiguration, SequencerConfig, SettleDelays};
pub use sonar_protocol::{Leg, RidePhase};
