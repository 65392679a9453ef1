//! 控制层错误类型定义

use sonar_driver::DriverError;
use sonar_sim::SimError;
use thiserror::Error;

/// 控制错误
#[derive(Debug, Error)]
pub enum ControlError {
    /// 驱动层错误（采样失败、链路断开等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 超过 tick 数或时长上限仍未停车
    #[error("Timeout exceeded after {ticks} ticks ({elapsed_ms} ms)")]
    TimeoutExceeded { ticks: u64, elapsed_ms: u64 },

    /// 外部请求取消（Ctrl-C）
    #[error("Cancelled")]
    Cancelled,

    /// 导出失败
    #[error("Export of '{label}' failed: {source:#}")]
    Export {
        label: String,
        #[source]
        source: anyhow::Error,
    },

    /// 配置错误
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<SimError> for ControlError {
    fn from(e: SimError) -> Self {
        ControlError::Driver(e.into())
    }
}

impl ControlError {
    /// 是否为致命错误（仿真器整体不可用，应终止整个批次）
    pub fn is_fatal(&self) -> bool {
        matches!(self, ControlError::Driver(e) if e.is_fatal())
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, ControlError::Driver(e) if e.is_disconnect())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ControlError::TimeoutExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ControlError::Cancelled)
    }
}
