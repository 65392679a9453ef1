//! 测距传感器数据模型
//!
//! 每个 tick 为每个已挂载的传感器产生一个读数。读数顺序即挂载顺序，
//! 在挂载时一次性确定，之后不会因为导出或重新挂载而改变。

use crate::{ProtocolError, Vec3};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// 超声波传感器默认最大量程（m）
pub const DEFAULT_MAX_RANGE: f64 = 5.5;

/// 传感器标识
///
/// 内部使用 `Arc<str>`，clone 只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct SensorId(Arc<str>);

impl SensorId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SensorId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<SensorId> for String {
    fn from(value: SensorId) -> Self {
        value.0.to_string()
    }
}

/// 单个测距值
///
/// 波束在量程内没有找到目标时，仿真器会返回哨兵值或越界值。
/// 这类值被标记为 `Invalid` 并保留原始值，绝不会被当作 0 处理。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Distance {
    /// 有效距离（m）
    Valid(f64),

    /// 无效读数（保留原始值）
    Invalid { raw: f64 },
}

impl Distance {
    /// 按量程对原始读数分类
    ///
    /// 非有限值、负值、超出 `max_range` 的值均为无效读数。
    pub fn classify(raw: f64, max_range: f64) -> Self {
        if raw.is_finite() && raw >= 0.0 && raw <= max_range {
            Distance::Valid(raw)
        } else {
            Distance::Invalid { raw }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Distance::Valid(_))
    }

    /// 有效距离；无效读数返回 `None`
    pub fn meters(&self) -> Option<f64> {
        match *self {
            Distance::Valid(m) => Some(m),
            Distance::Invalid { .. } => None,
        }
    }

    /// 仿真器返回的原始值
    pub fn raw(&self) -> f64 {
        match *self {
            Distance::Valid(m) => m,
            Distance::Invalid { raw } => raw,
        }
    }
}

/// 一次传感器轮询的全部读数（按挂载顺序）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReading {
    values: SmallVec<[(SensorId, Distance); 4]>,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: SmallVec::with_capacity(capacity),
        }
    }

    /// 追加一个读数（保持插入顺序）
    pub fn push(&mut self, id: SensorId, distance: Distance) {
        self.values.push((id, distance));
    }

    /// 按标识查找
    pub fn get(&self, id: &SensorId) -> Option<Distance> {
        self.values.iter().find(|(k, _)| k == id).map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SensorId, &Distance)> {
        self.values.iter().map(|(k, d)| (k, d))
    }

    /// 读数中的传感器标识（按挂载顺序）
    pub fn ids(&self) -> impl Iterator<Item = &SensorId> {
        self.values.iter().map(|(k, _)| k)
    }

    /// 所有有效读数中的最近距离
    pub fn nearest(&self) -> Option<f64> {
        self.values.iter().filter_map(|(_, d)| d.meters()).reduce(f64::min)
    }
}

impl FromIterator<(SensorId, Distance)> for SensorReading {
    fn from_iter<T: IntoIterator<Item = (SensorId, Distance)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// 传感器安装描述（车辆坐标系）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorDescriptor {
    /// 传感器标识（导出时作为列名）
    pub id: SensorId,

    /// 安装位置（车辆坐标系，m）
    pub mount: Vec3,

    /// 波束方向（车辆坐标系）
    pub direction: Vec3,

    /// 最大量程（m）
    #[cfg_attr(feature = "serde", serde(default = "default_max_range"))]
    pub max_range: f64,
}

#[cfg(feature = "serde")]
fn default_max_range() -> f64 {
    DEFAULT_MAX_RANGE
}

impl SensorDescriptor {
    pub fn new(id: impl Into<SensorId>, mount: Vec3, direction: Vec3) -> Self {
        Self {
            id: id.into(),
            mount,
            direction,
            max_range: DEFAULT_MAX_RANGE,
        }
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self
    }

    /// 对原始读数分类
    pub fn classify(&self, raw: f64) -> Distance {
        Distance::classify(raw, self.max_range)
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.id.as_str().is_empty() {
            return Err(ProtocolError::InvalidSensor {
                id: String::new(),
                reason: "identifier must not be empty".to_string(),
            });
        }
        if !(self.max_range.is_finite() && self.max_range > 0.0) {
            return Err(ProtocolError::InvalidSensor {
                id: self.id.to_string(),
                reason: format!("max_range must be > 0 (got {})", self.max_range),
            });
        }
        if self.direction.norm() < f64::EPSILON {
            return Err(ProtocolError::InvalidSensor {
                id: self.id.to_string(),
                reason: "direction must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// 一组传感器的安装方案（例如某个安装高度）
///
/// 顺序即挂载顺序，也是导出列顺序。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorLayout {
    /// 方案名称
    pub name: String,

    /// 传感器列表
    pub sensors: Vec<SensorDescriptor>,
}

impl SensorLayout {
    /// 创建并校验安装方案
    pub fn new(
        name: impl Into<String>,
        sensors: Vec<SensorDescriptor>,
    ) -> Result<Self, ProtocolError> {
        let layout = Self {
            name: name.into(),
            sensors,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// 校验：标识不重复，每个描述合法
    pub fn validate(&self) -> Result<(), ProtocolError> {
        for (i, sensor) in self.sensors.iter().enumerate() {
            sensor.validate()?;
            if self.sensors[..i].iter().any(|s| s.id == sensor.id) {
                return Err(ProtocolError::DuplicateSensor {
                    id: sensor.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 列名（按挂载顺序）
    pub fn ids(&self) -> Vec<SensorId> {
        self.sensors.iter().map(|s| s.id.clone()).collect()
    }

    /// 前保险杠左右两个超声波传感器
    ///
    /// 安装位置为 (±0.6, -2.2, height)，朝向 -Y（车头方向）。
    pub fn front_pair(height: f64) -> Self {
        Self {
            name: format!("front_{:.2}m", height),
            sensors: vec![
                SensorDescriptor::new(
                    "front left",
                    Vec3::new(0.6, -2.2, height),
                    Vec3::new(0.0, -1.0, 0.0),
                ),
                SensorDescriptor::new(
                    "front right",
                    Vec3::new(-0.6, -2.2, height),
                    Vec3::new(0.0, -1.0, 0.0),
                ),
            ],
        }
    }
}
