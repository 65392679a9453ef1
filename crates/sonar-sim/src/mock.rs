//! Mock 仿真器
//!
//! 纵向运动学模型，用于测试和离线演练。
//!
//! # 模型
//!
//! - 每次 `control()` 调用推进一个物理步长 `dt`（确定性步进）
//! - 车头方向为车辆坐标系 -Y，经位姿四元数旋转到世界坐标
//! - 障碍物视为轴对齐包围盒（忽略旋转），半尺寸为 `scale * 0.5`
//! - 超声波读数为传感器射线与最近包围盒的交点距离；量程内无目标时返回 `no_echo`

use crate::{SensorHandle, SimError, SimulatorAdapter};
use nalgebra::{Quaternion, UnitQuaternion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sonar_protocol::{
    ControlCommand, Pose, SceneDescriptor, SensorDescriptor, Vec3, VehicleState,
};
use std::collections::HashMap;
use tracing::debug;

/// Mock 模型参数
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 物理步长（s），默认 1/60
    pub dt: f64,
    /// 满油门加速度（m/s²）
    pub accel_per_throttle: f64,
    /// 满刹车减速度（m/s²）
    pub brake_decel: f64,
    /// 滚动阻力减速度（m/s²）
    pub rolling_drag: f64,
    /// 无回波时的哨兵值
    pub no_echo: f64,
    /// 读数均匀噪声幅值（m）
    pub noise: f64,
    pub seed: u64,
    /// 在第 N 次车辆轮询时模拟链路断开（用于测试）
    pub disconnect_after_polls: Option<u64>,
    /// 保留全部控制命令（仅测试使用，长批次会持续占用内存）
    pub record_commands: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            accel_per_throttle: 4.0,
            brake_decel: 8.0,
            rolling_drag: 0.15,
            no_echo: 9999.0,
            noise: 0.0,
            seed: 42,
            disconnect_after_polls: None,
            record_commands: false,
        }
    }
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn around(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// 射线求交（slab 方法），返回沿射线的距离
    fn ray_hit(&self, origin: &Vec3, dir: &Vec3) -> Option<f64> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for i in 0..3 {
            if dir[i].abs() < 1e-12 {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[i];
            let mut t0 = (self.min[i] - origin[i]) * inv;
            let mut t1 = (self.max[i] - origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

/// Mock 仿真器
pub struct MockSimulator {
    config: MockConfig,
    loaded: bool,
    started: bool,
    connected: bool,
    pose: Pose,
    /// 沿车头方向的带符号速度（m/s）
    speed: f64,
    last_command: Option<ControlCommand>,
    obstacles: Vec<Aabb>,
    sensors: HashMap<SensorHandle, SensorDescriptor>,
    next_handle: u32,
    vehicle_polls: u64,
    commands: Vec<ControlCommand>,
    rng: StdRng,
}

impl MockSimulator {
    pub fn new(config: MockConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            loaded: false,
            started: false,
            connected: true,
            pose: Pose::default(),
            speed: 0.0,
            last_command: None,
            obstacles: Vec::new(),
            sensors: HashMap::new(),
            next_handle: 1,
            vehicle_polls: 0,
            commands: Vec::new(),
            rng,
        }
    }

    /// 已加载并启动场景的 Mock
    pub fn started(scene: &SceneDescriptor, config: MockConfig) -> Self {
        let mut sim = Self::new(config);
        // 加载本地场景不会失败
        let _ = sim.load_scenario(scene);
        let _ = sim.start_scenario();
        sim
    }

    /// 已接收的全部控制命令（按顺序，需开启 `record_commands`）
    pub fn commands(&self) -> &[ControlCommand] {
        &self.commands
    }

    /// 最近一次控制命令
    pub fn last_command(&self) -> Option<&ControlCommand> {
        self.last_command.as_ref()
    }

    /// 当前挂载的传感器数量
    pub fn attached_sensors(&self) -> usize {
        self.sensors.len()
    }

    /// 车辆状态（不计入轮询次数）
    pub fn peek_state(&self) -> VehicleState {
        VehicleState::new(self.pose.position, self.forward_world() * self.speed)
    }

    /// 手动断开链路
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        let [x, y, z, w] = self.pose.rot_quat;
        UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z))
    }

    /// 车头方向（世界坐标）
    fn forward_world(&self) -> Vec3 {
        self.rotation() * Vec3::new(0.0, -1.0, 0.0)
    }

    fn check_link(&self) -> Result<(), SimError> {
        if !self.connected {
            return Err(SimError::Disconnected("mock link dropped".to_string()));
        }
        if !self.started {
            return Err(SimError::NotStarted);
        }
        Ok(())
    }

    /// 推进一个物理步长
    fn step(&mut self, command: &ControlCommand) {
        let dt = self.config.dt;
        let drive = command.throttle * self.config.accel_per_throttle * command.gear.direction();
        let mut brake = command.brake * self.config.brake_decel;
        if command.parking_brake {
            brake = brake.max(self.config.brake_decel);
        }
        let resist = brake + self.config.rolling_drag;

        let mut speed = self.speed + drive * dt;
        // 阻力只减小速度，不反向
        let decel = resist * dt;
        if speed.abs() <= decel {
            speed = 0.0;
        } else {
            speed -= decel * speed.signum();
        }
        self.speed = speed;

        let forward = self.forward_world();
        self.pose.position += forward * (self.speed * dt);
    }
}

impl SimulatorAdapter for MockSimulator {
    fn load_scenario(&mut self, scene: &SceneDescriptor) -> Result<(), SimError> {
        self.obstacles = scene
            .obstacles
            .iter()
            .map(|o| Aabb::around(o.pose.position, o.scale * 0.5))
            .collect();
        self.pose = scene.spawn;
        self.speed = 0.0;
        self.loaded = true;
        self.started = false;
        debug!(
            "Mock scenario '{}' loaded with {} obstacles",
            scene.name,
            self.obstacles.len()
        );
        Ok(())
    }

    fn start_scenario(&mut self) -> Result<(), SimError> {
        if !self.loaded {
            return Err(SimError::Scenario("no scenario loaded".to_string()));
        }
        self.started = true;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn teleport(&mut self, pose: &Pose) -> Result<(), SimError> {
        self.check_link()?;
        self.pose = *pose;
        self.speed = 0.0;
        Ok(())
    }

    fn control(&mut self, command: &ControlCommand) -> Result<(), SimError> {
        self.check_link()?;
        if self.config.record_commands {
            self.commands.push(*command);
        }
        self.last_command = Some(*command);
        self.step(command);
        Ok(())
    }

    fn poll_vehicle_state(&mut self) -> Result<VehicleState, SimError> {
        self.check_link()?;
        self.vehicle_polls += 1;
        if let Some(limit) = self.config.disconnect_after_polls
            && self.vehicle_polls > limit
        {
            self.connected = false;
            return Err(SimError::Disconnected(format!(
                "mock link dropped after {} polls",
                limit
            )));
        }
        Ok(self.peek_state())
    }

    fn attach_sensor(&mut self, descriptor: &SensorDescriptor) -> Result<SensorHandle, SimError> {
        self.check_link()?;
        let handle = SensorHandle(self.next_handle);
        self.next_handle += 1;
        self.sensors.insert(handle, descriptor.clone());
        Ok(handle)
    }

    fn detach_sensor(&mut self, handle: SensorHandle) -> Result<(), SimError> {
        self.sensors
            .remove(&handle)
            .map(|_| ())
            .ok_or(SimError::UnknownSensor(handle))
    }

    fn poll_sensor(&mut self, handle: SensorHandle) -> Result<f64, SimError> {
        self.check_link()?;
        let descriptor = self.sensors.get(&handle).ok_or(SimError::UnknownSensor(handle))?;
        let rotation = self.rotation();
        let origin = self.pose.position + rotation * descriptor.mount;
        let dir = (rotation * descriptor.direction).normalize();
        let max_range = descriptor.max_range;

        let hit = self
            .obstacles
            .iter()
            .filter_map(|b| b.ray_hit(&origin, &dir))
            .filter(|d| *d <= max_range)
            .reduce(f64::min);

        Ok(match hit {
            Some(d) if self.config.noise > 0.0 => {
                let n = self.config.noise;
                (d + self.rng.gen_range(-n..=n)).max(0.0)
            },
            Some(d) => d,
            None => self.config.no_echo,
        })
    }

    fn close(&mut self) -> Result<(), SimError> {
        self.started = false;
        Ok(())
    }
}
