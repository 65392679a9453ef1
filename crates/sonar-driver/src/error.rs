//! 驱动层错误类型定义

use sonar_protocol::ProtocolError;
use sonar_sim::SimError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 仿真适配层错误
    #[error("Simulator error: {0}")]
    Sim(#[from] SimError),

    /// 数据模型错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 同一标识的传感器重复挂载
    #[error("Sensor '{id}' is already attached")]
    DuplicateSensor { id: String },

    /// 车辆链路已断开
    #[error("Vehicle not connected")]
    NotConnected,
}

impl DriverError {
    /// 是否为致命错误（仿真器整体不可用）
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Sim(e) if e.is_fatal())
    }

    /// 是否为链路断开
    pub fn is_disconnect(&self) -> bool {
        match self {
            DriverError::Sim(e) => e.is_disconnect(),
            DriverError::NotConnected => true,
            _ => false,
        }
    }
}
