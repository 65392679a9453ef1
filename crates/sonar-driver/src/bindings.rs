//! 传感器绑定
//!
//! 挂载顺序在绑定时确定一次，之后的读数迭代顺序和导出列顺序都以此为准。

use crate::DriverError;
use sonar_protocol::{SensorDescriptor, SensorId, SensorLayout};
use sonar_sim::{SensorHandle, SimulatorAdapter};
use tracing::{debug, warn};

/// 单个已挂载传感器
#[derive(Debug, Clone)]
pub struct SensorBinding {
    pub descriptor: SensorDescriptor,
    pub handle: SensorHandle,
}

impl SensorBinding {
    pub fn id(&self) -> &SensorId {
        &self.descriptor.id
    }
}

/// 已挂载传感器集合（按挂载顺序）
#[derive(Debug, Default)]
pub struct SensorBindings {
    entries: Vec<SensorBinding>,
}

impl SensorBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按布局顺序挂载全部传感器
    ///
    /// 任一传感器挂载失败时，已挂载的部分会被回滚（尽力而为）。
    pub fn attach_all<A>(adapter: &mut A, layout: &SensorLayout) -> Result<Self, DriverError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        layout.validate()?;
        let mut bindings = Self::new();
        for descriptor in &layout.sensors {
            if let Err(e) = bindings.attach(adapter, descriptor) {
                if let Err(rollback) = bindings.detach_all(adapter) {
                    warn!("Rollback after failed attach also failed: {}", rollback);
                }
                return Err(e);
            }
        }
        debug!(
            "Attached {} sensors from layout '{}'",
            bindings.len(),
            layout.name
        );
        Ok(bindings)
    }

    /// 挂载单个传感器
    pub fn attach<A>(&mut self, adapter: &mut A, descriptor: &SensorDescriptor) -> Result<(), DriverError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        if self.get(&descriptor.id).is_some() {
            return Err(DriverError::DuplicateSensor {
                id: descriptor.id.to_string(),
            });
        }
        descriptor.validate()?;
        let handle = adapter.attach_sensor(descriptor)?;
        self.entries.push(SensorBinding {
            descriptor: descriptor.clone(),
            handle,
        });
        Ok(())
    }

    /// 卸载全部传感器，返回卸载数量
    ///
    /// 即使中途失败也会尝试卸载剩余传感器，返回遇到的第一个错误。
    pub fn detach_all<A>(&mut self, adapter: &mut A) -> Result<usize, DriverError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        let mut first_err = None;
        let mut detached = 0;
        for binding in self.entries.drain(..) {
            match adapter.detach_sensor(binding.handle) {
                Ok(()) => detached += 1,
                Err(e) => {
                    warn!("Failed to detach sensor '{}': {}", binding.descriptor.id, e);
                    first_err.get_or_insert(e);
                },
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(detached),
        }
    }

    pub fn get(&self, id: &SensorId) -> Option<&SensorBinding> {
        self.entries.iter().find(|b| b.id() == id)
    }

    /// 传感器标识（挂载顺序）
    pub fn ids(&self) -> Vec<SensorId> {
        self.entries.iter().map(|b| b.id().clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorBinding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
