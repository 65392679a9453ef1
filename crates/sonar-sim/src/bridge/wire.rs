//! 桥接协议报文定义
//!
//! 每条报文是一行 JSON（以 `\n` 结尾），请求与应答一一对应。
//!
//! ```text
//! -> {"type":"poll_vehicle"}
//! <- {"type":"vehicle","state":{"position":[0.0,1.5,0.3],"velocity":[0.0,0.8,0.0]}}
//! ```

use crate::SensorHandle;
use serde::{Deserialize, Serialize};
use sonar_protocol::{ControlCommand, Pose, SceneDescriptor, SensorDescriptor, VehicleState};

/// 协议版本（握手时校验）
pub const WIRE_VERSION: u8 = 1;

/// 客户端 -> 桥接进程
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// 握手（携带仿真器安装路径，供桥接进程启动仿真器）
    Hello {
        version: u8,
        home: Option<String>,
        user: Option<String>,
    },
    LoadScenario {
        scene: SceneDescriptor,
    },
    StartScenario,
    IsConnected,
    Teleport {
        pose: Pose,
    },
    Control {
        command: ControlCommand,
    },
    PollVehicle,
    AttachSensor {
        descriptor: SensorDescriptor,
    },
    DetachSensor {
        handle: SensorHandle,
    },
    PollSensor {
        handle: SensorHandle,
    },
    Close,
}

/// 桥接进程 -> 客户端
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Connected { connected: bool },
    Vehicle { state: VehicleState },
    SensorAttached { handle: SensorHandle },
    Distance { distance: f64 },
    Error { message: String },
}

impl Response {
    /// 应答类型名（用于错误信息）
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Ok => "ok",
            Response::Connected { .. } => "connected",
            Response::Vehicle { .. } => "vehicle",
            Response::SensorAttached { .. } => "sensor_attached",
            Response::Distance { .. } => "distance",
            Response::Error { .. } => "error",
        }
    }
}
