//! # 批次工作流
//!
//! 在多个传感器安装方案（外层循环）× 多个运行（内层循环）上重复执行两段机动。
//!
//! - 运行严格串行：车辆、传感器和世界是整个批次共享的单例
//! - 每次运行前挂载该方案的传感器，运行后卸载
//! - 单次运行失败按 [`FailurePolicy`] 处理；连接错误和取消总是终止批次

mod error;
mod plan;
mod runner;

pub use error::BatchError;
pub use plan::{BatchPlan, actuation_strategy, sequencer_config};
pub use runner::{BatchReport, MultiRunDriver, RunReport, SkippedRun};
pub use sonar_tools::FailurePolicy;
