//! 脚本化直线轨道仿真器
//!
//! - 每条驱动命令（油门 > 0，不刹车）沿档位方向前进 `advance_per_drive`，速度为 `cruise_speed`
//! - 每条刹车命令把速度乘以 `brake_factor`，位置不变
//! - 每条滑行命令按当前速度推进半个单位时间，速度乘以 `coast_decay`
//! - 传感器读数为 `wall - position`（超出量程时返回哨兵值 9999）

#![allow(dead_code)]

use sonar_protocol::{ControlCommand, Pose, SceneDescriptor, SensorDescriptor, Vec3, VehicleState};
use sonar_sim::{SensorHandle, SimError, SimulatorAdapter};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub advance_per_drive: f64,
    pub cruise_speed: f64,
    pub brake_factor: f64,
    pub coast_decay: f64,
    /// 沿 Y 轴的墙面位置
    pub wall: f64,
    /// 第 N 次车辆轮询起失败（断开）
    pub fail_vehicle_poll_after: Option<usize>,
    /// 第 N 次传感器轮询起失败（断开）
    pub fail_sensor_poll_after: Option<usize>,
    /// `is_connected` 的返回值
    pub connected: bool,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            advance_per_drive: 0.5,
            cruise_speed: 1.0,
            brake_factor: 0.5,
            coast_decay: 0.9,
            wall: 8.0,
            fail_vehicle_poll_after: None,
            fail_sensor_poll_after: None,
            connected: true,
        }
    }
}

pub struct LinearTrack {
    pub config: TrackConfig,
    pub position: Vec3,
    pub speed: f64,
    pub commands: Vec<ControlCommand>,
    pub teleports: Vec<Pose>,
    pub vehicle_polls: usize,
    pub sensor_polls: usize,
    sensors: HashMap<SensorHandle, SensorDescriptor>,
    next_handle: u32,
}

impl LinearTrack {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            position: Vec3::zeros(),
            speed: 0.0,
            commands: Vec::new(),
            teleports: Vec::new(),
            vehicle_polls: 0,
            sensor_polls: 0,
            sensors: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn attached(&self) -> usize {
        self.sensors.len()
    }
}

impl Default for LinearTrack {
    fn default() -> Self {
        Self::new(TrackConfig::default())
    }
}

impl SimulatorAdapter for LinearTrack {
    fn load_scenario(&mut self, _scene: &SceneDescriptor) -> Result<(), SimError> {
        Ok(())
    }

    fn start_scenario(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.config.connected
    }

    fn teleport(&mut self, pose: &Pose) -> Result<(), SimError> {
        self.teleports.push(*pose);
        self.position = pose.position;
        self.speed = 0.0;
        Ok(())
    }

    fn control(&mut self, command: &ControlCommand) -> Result<(), SimError> {
        self.commands.push(*command);
        let direction = command.gear.direction();
        if command.brake > 0.0 {
            self.speed *= self.config.brake_factor;
        } else if command.throttle > 0.0 && direction != 0.0 {
            self.position.y += direction * self.config.advance_per_drive;
            self.speed = direction * self.config.cruise_speed;
        } else {
            self.position.y += self.speed * 0.5;
            self.speed *= self.config.coast_decay;
        }
        Ok(())
    }

    fn poll_vehicle_state(&mut self) -> Result<VehicleState, SimError> {
        self.vehicle_polls += 1;
        if let Some(limit) = self.config.fail_vehicle_poll_after
            && self.vehicle_polls > limit
        {
            return Err(SimError::Disconnected("vehicle link dropped".to_string()));
        }
        Ok(VehicleState::new(self.position, Vec3::new(0.0, self.speed, 0.0)))
    }

    fn attach_sensor(&mut self, descriptor: &SensorDescriptor) -> Result<SensorHandle, SimError> {
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
        self.sensor_polls += 1;
        if let Some(limit) = self.config.fail_sensor_poll_after
            && self.sensor_polls > limit
        {
            return Err(SimError::Disconnected("sensor link dropped".to_string()));
        }
        let descriptor = self.sensors.get(&handle).ok_or(SimError::UnknownSensor(handle))?;
        let distance = self.config.wall - self.position.y;
        Ok(if distance <= descriptor.max_range { distance } else { 9999.0 })
    }
}
