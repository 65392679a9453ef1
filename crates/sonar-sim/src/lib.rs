//! # Sonar Simulator Adapter Layer
//!
//! 仿真器抽象层，提供统一的车辆/传感器接口抽象。
//!
//! 仿真器本身（世界加载、物理步进、渲染、传感器挂载机制）是外部协作者：
//! 核心只把它当作车辆状态与传感器读数的来源，以及控制命令的接收端。
//!
//! ## 后端
//!
//! - `bridge`（默认）：通过 TCP 与仿真器侧桥接进程通信（JSON-lines）
//! - `mock`：纯 Rust 纵向运动学模型，用于测试和离线演练

use sonar_protocol::{
    ControlCommand, Pose, ProtocolError, SceneDescriptor, SensorDescriptor, VehicleState,
};
use std::fmt;
use thiserror::Error;

#[cfg(feature = "bridge")]
pub mod bridge;

#[cfg(feature = "bridge")]
pub use bridge::{BridgeAdapter, BridgeConfig};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockConfig, MockSimulator};

/// 仿真适配层统一错误类型
#[derive(Error, Debug)]
pub enum SimError {
    /// 无法连接/启动仿真器（致命，终止整个批次）
    #[error("Connection error: {0}")]
    Connection(String),

    /// 运行中车辆/传感器链路断开
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// 场景尚未启动
    #[error("Scenario not started")]
    NotStarted,

    /// 场景加载/启动失败
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// 未知的传感器句柄
    #[error("Unknown sensor handle: {0}")]
    UnknownSensor(SensorHandle),

    /// 仿真器返回的错误
    #[error("Simulator error: {0}")]
    Remote(String),

    /// 无法解析的应答
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 数据模型错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SimError {
    /// 是否为致命错误（仿真器整体不可用）
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::Connection(_))
    }

    /// 是否为链路断开
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SimError::Disconnected(_))
    }
}

/// 已挂载传感器的句柄（由仿真器分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SensorHandle(pub u32);

impl fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 仿真器适配接口
///
/// 所有方法都是同步阻塞调用：每次调用都是一次到仿真器的往返，没有缓存，也没有隐式重试。
/// `load_scenario` + `start_scenario` 完成之前，其他调用无效。
pub trait SimulatorAdapter: Send {
    fn load_scenario(&mut self, scene: &SceneDescriptor) -> Result<(), SimError>;

    fn start_scenario(&mut self) -> Result<(), SimError>;

    /// 车辆链路是否仍然连通
    fn is_connected(&mut self) -> bool;

    /// 传送车辆（调用方需要等待一小段稳定时间后再信任速度读数）
    fn teleport(&mut self, pose: &Pose) -> Result<(), SimError>;

    /// 发送执行器命令（最后一条命令持续生效）
    fn control(&mut self, command: &ControlCommand) -> Result<(), SimError>;

    fn poll_vehicle_state(&mut self) -> Result<VehicleState, SimError>;

    fn attach_sensor(&mut self, descriptor: &SensorDescriptor) -> Result<SensorHandle, SimError>;

    fn detach_sensor(&mut self, handle: SensorHandle) -> Result<(), SimError>;

    /// 轮询单个传感器的原始距离值（可能是哨兵值）
    fn poll_sensor(&mut self, handle: SensorHandle) -> Result<f64, SimError>;

    /// 关闭连接
    fn close(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

impl<T: SimulatorAdapter + ?Sized> SimulatorAdapter for Box<T> {
    fn load_scenario(&mut self, scene: &SceneDescriptor) -> Result<(), SimError> {
        (**self).load_scenario(scene)
    }
    fn start_scenario(&mut self) -> Result<(), SimError> {
        (**self).start_scenario()
    }
    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }
    fn teleport(&mut self, pose: &Pose) -> Result<(), SimError> {
        (**self).teleport(pose)
    }
    fn control(&mut self, command: &ControlCommand) -> Result<(), SimError> {
        (**self).control(command)
    }
    fn poll_vehicle_state(&mut self) -> Result<VehicleState, SimError> {
        (**self).poll_vehicle_state()
    }
    fn attach_sensor(&mut self, descriptor: &SensorDescriptor) -> Result<SensorHandle, SimError> {
        (**self).attach_sensor(descriptor)
    }
    fn detach_sensor(&mut self, handle: SensorHandle) -> Result<(), SimError> {
        (**self).detach_sensor(handle)
    }
    fn poll_sensor(&mut self, handle: SensorHandle) -> Result<f64, SimError> {
        (**self).poll_sensor(handle)
    }
    fn close(&mut self) -> Result<(), SimError> {
        (**self).close()
    }
}
