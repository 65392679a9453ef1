//! 状态采样
//!
//! 每次调用都是一次到仿真器的新往返：没有缓存，没有重试。

use crate::{DriverError, SensorBindings};
use sonar_protocol::{Axis, ControlCommand, SensorReading, VehicleState};
use sonar_sim::SimulatorAdapter;

/// 单次车辆状态快照（含主运动轴分量）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub state: VehicleState,
    /// 主运动轴位置（m）
    pub position: f64,
    /// 主运动轴速度（m/s，带符号）
    pub velocity: f64,
}

impl AxisSample {
    pub fn speed(&self) -> f64 {
        self.velocity.abs()
    }
}

/// 状态采样器
///
/// 借用适配器和传感器绑定，在一个运动段执行期间作为车辆的唯一访问入口。
pub struct StateSampler<'a, A: SimulatorAdapter + ?Sized> {
    adapter: &'a mut A,
    bindings: &'a SensorBindings,
    axis: Axis,
}

impl<'a, A: SimulatorAdapter + ?Sized> StateSampler<'a, A> {
    pub fn new(adapter: &'a mut A, bindings: &'a SensorBindings, axis: Axis) -> Self {
        Self {
            adapter,
            bindings,
            axis,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn bindings(&self) -> &SensorBindings {
        self.bindings
    }

    /// 读取车辆状态
    pub fn poll(&mut self) -> Result<AxisSample, DriverError> {
        let state = self.adapter.poll_vehicle_state()?;
        Ok(AxisSample {
            state,
            position: state.position_along(self.axis),
            velocity: state.velocity_along(self.axis),
        })
    }

    /// 依次读取全部已挂载传感器（挂载顺序）
    ///
    /// 原始值按各自描述符分类，哨兵值保留为 `Distance::Invalid`。
    pub fn poll_sensors(&mut self) -> Result<SensorReading, DriverError> {
        let mut reading = SensorReading::with_capacity(self.bindings.len());
        for binding in self.bindings.iter() {
            let raw = self.adapter.poll_sensor(binding.handle)?;
            reading.push(binding.id().clone(), binding.descriptor.classify(raw));
        }
        Ok(reading)
    }

    /// 下发执行器命令
    pub fn actuate(&mut self, command: &ControlCommand) -> Result<(), DriverError> {
        self.adapter.control(command)?;
        Ok(())
    }

    pub fn is_connected(&mut self) -> bool {
        self.adapter.is_connected()
    }
}
