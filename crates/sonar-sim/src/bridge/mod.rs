//! 桥接后端
//!
//! 通过 TCP 连接仿真器侧的桥接进程（由它驱动真实仿真器的脚本接口）。
//! 协议为 JSON-lines，见 [`wire`]。
//!
//! # 错误映射
//!
//! - 连接/握手阶段的 IO 错误 → `SimError::Connection`
//! - 握手成功后的 IO 错误、EOF → `SimError::Disconnected`

pub mod wire;

use crate::{SensorHandle, SimError, SimulatorAdapter};
use sonar_protocol::{ControlCommand, Pose, SceneDescriptor, SensorDescriptor, VehicleState};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};
use wire::{Request, Response, WIRE_VERSION};

/// 桥接连接配置
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    /// 仿真器安装目录
    pub home: Option<String>,
    /// 仿真器用户目录
    pub user: Option<String>,
    pub connect_timeout: Duration,
    /// 单次往返的读超时
    pub io_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50977,
            home: None,
            user: None,
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
        }
    }
}

/// 桥接适配器
pub struct BridgeAdapter {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer: String,
    started: bool,
    line: String,
}

impl BridgeAdapter {
    /// 连接桥接进程并完成握手
    pub fn connect(config: &BridgeConfig) -> Result<Self, SimError> {
        let peer = format!("{}:{}", config.host, config.port);
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| SimError::Connection(format!("cannot resolve {}: {}", peer, e)))?
            .next()
            .ok_or_else(|| SimError::Connection(format!("no address for {}", peer)))?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)
            .map_err(|e| SimError::Connection(format!("cannot reach {}: {}", peer, e)))?;
        stream
            .set_read_timeout(Some(config.io_timeout))
            .and_then(|_| stream.set_nodelay(true))
            .map_err(|e| SimError::Connection(format!("socket setup failed: {}", e)))?;
        let read_half = stream
            .try_clone()
            .map_err(|e| SimError::Connection(format!("socket clone failed: {}", e)))?;

        let mut adapter = Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            peer,
            started: false,
            line: String::new(),
        };

        let hello = Request::Hello {
            version: WIRE_VERSION,
            home: config.home.clone(),
            user: config.user.clone(),
        };
        match adapter.call(&hello) {
            Ok(Response::Ok) => {},
            Ok(other) => {
                return Err(SimError::Connection(format!(
                    "unexpected handshake response: {}",
                    other.kind()
                )));
            },
            Err(SimError::Disconnected(msg)) | Err(SimError::Remote(msg)) => {
                return Err(SimError::Connection(format!("handshake failed: {}", msg)));
            },
            Err(e) => return Err(e),
        }

        info!("Connected to simulator bridge at {}", adapter.peer);
        Ok(adapter)
    }

    /// 一次请求-应答往返
    fn call(&mut self, request: &Request) -> Result<Response, SimError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| SimError::InvalidResponse(format!("cannot encode request: {}", e)))?;

        self.writer
            .write_all(payload.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(|e| SimError::Disconnected(format!("write to {} failed: {}", self.peer, e)))?;

        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| SimError::Disconnected(format!("read from {} failed: {}", self.peer, e)))?;
        if n == 0 {
            return Err(SimError::Disconnected(format!(
                "bridge {} closed the connection",
                self.peer
            )));
        }

        let response: Response = serde_json::from_str(self.line.trim_end())
            .map_err(|e| SimError::InvalidResponse(format!("{}: {}", e, self.line.trim_end())))?;
        debug!("bridge {:?} -> {}", request_kind(request), response.kind());

        match response {
            Response::Error { message } => Err(SimError::Remote(message)),
            other => Ok(other),
        }
    }

    fn expect_ok(&mut self, request: &Request) -> Result<(), SimError> {
        match self.call(request)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn ensure_started(&self) -> Result<(), SimError> {
        if self.started {
            Ok(())
        } else {
            Err(SimError::NotStarted)
        }
    }
}

fn unexpected(response: Response) -> SimError {
    SimError::InvalidResponse(format!("unexpected response type '{}'", response.kind()))
}

fn request_kind(request: &Request) -> &'static str {
    match request {
        Request::Hello { .. } => "hello",
        Request::LoadScenario { .. } => "load_scenario",
        Request::StartScenario => "start_scenario",
        Request::IsConnected => "is_connected",
        Request::Teleport { .. } => "teleport",
        Request::Control { .. } => "control",
        Request::PollVehicle => "poll_vehicle",
        Request::AttachSensor { .. } => "attach_sensor",
        Request::DetachSensor { .. } => "detach_sensor",
        Request::PollSensor { .. } => "poll_sensor",
        Request::Close => "close",
    }
}

impl SimulatorAdapter for BridgeAdapter {
    fn load_scenario(&mut self, scene: &SceneDescriptor) -> Result<(), SimError> {
        self.expect_ok(&Request::LoadScenario {
            scene: scene.clone(),
        })
        .map_err(|e| match e {
            SimError::Remote(msg) => SimError::Scenario(msg),
            other => other,
        })
    }

    fn start_scenario(&mut self) -> Result<(), SimError> {
        self.expect_ok(&Request::StartScenario).map_err(|e| match e {
            SimError::Remote(msg) => SimError::Scenario(msg),
            other => other,
        })?;
        self.started = true;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        match self.call(&Request::IsConnected) {
            Ok(Response::Connected { connected }) => connected,
            Ok(other) => {
                warn!("Unexpected is_connected response: {}", other.kind());
                false
            },
            Err(_) => false,
        }
    }

    fn teleport(&mut self, pose: &Pose) -> Result<(), SimError> {
        self.ensure_started()?;
        self.expect_ok(&Request::Teleport { pose: *pose })
    }

    fn control(&mut self, command: &ControlCommand) -> Result<(), SimError> {
        self.ensure_started()?;
        self.expect_ok(&Request::Control { command: *command })
    }

    fn poll_vehicle_state(&mut self) -> Result<VehicleState, SimError> {
        self.ensure_started()?;
        match self.call(&Request::PollVehicle)? {
            Response::Vehicle { state } => Ok(state),
            other => Err(unexpected(other)),
        }
    }

    fn attach_sensor(&mut self, descriptor: &SensorDescriptor) -> Result<SensorHandle, SimError> {
        self.ensure_started()?;
        match self.call(&Request::AttachSensor {
            descriptor: descriptor.clone(),
        })? {
            Response::SensorAttached { handle } => Ok(handle),
            other => Err(unexpected(other)),
        }
    }

    fn detach_sensor(&mut self, handle: SensorHandle) -> Result<(), SimError> {
        self.expect_ok(&Request::DetachSensor { handle })
    }

    fn poll_sensor(&mut self, handle: SensorHandle) -> Result<f64, SimError> {
        self.ensure_started()?;
        match self.call(&Request::PollSensor { handle })? {
            Response::Distance { distance } => Ok(distance),
            other => Err(unexpected(other)),
        }
    }

    fn close(&mut self) -> Result<(), SimError> {
        self.started = false;
        self.expect_ok(&Request::Close)
    }
}
