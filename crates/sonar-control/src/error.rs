//! 批次错误类型定义

use sonar_client::ControlError;
use sonar_driver::DriverError;
use sonar_sim::SimError;
use thiserror::Error;

/// 批次错误
#[derive(Debug, Error)]
pub enum BatchError {
    /// 配置无效（在连接仿真器之前发现）
    #[error("Invalid batch configuration: {0}")]
    Config(String),

    /// 场景加载/启动失败
    #[error("Simulator setup failed: {0}")]
    Simulator(#[from] SimError),

    /// 传感器挂载失败且策略要求终止
    #[error("Sensor setup failed for '{label}': {source}")]
    SensorSetup {
        label: String,
        #[source]
        source: DriverError,
    },

    /// 某次运行失败且策略要求终止（或错误为致命错误）
    #[error("Batch aborted at '{label}' after {completed} completed runs: {source}")]
    Aborted {
        label: String,
        completed: usize,
        #[source]
        source: ControlError,
    },

    /// 外部请求取消
    #[error("Batch cancelled after {completed} completed runs")]
    Cancelled { completed: usize },
}

impl BatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchError::Cancelled { .. })
    }
}
