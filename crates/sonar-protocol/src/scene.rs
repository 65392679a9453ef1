//! 场景描述
//!
//! 场景构建由仿真器负责，这里只定义透传给适配层的数据。

use crate::{Pose, Vec3};

/// 静态障碍物
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticObstacle {
    pub name: String,
    pub pose: Pose,
    pub scale: Vec3,
    /// 网格资源路径（如 `/art/shapes/objects/s_drywall.dae`）
    pub shape: String,
}

/// 场景描述
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneDescriptor {
    /// 地图名（如 `smallgrid`）
    pub map: String,

    /// 场景名
    pub name: String,

    pub description: String,

    /// 车辆标识
    pub vehicle_id: String,

    /// 车辆型号（如 `pickup`）
    pub vehicle_model: String,

    /// 车辆出生位姿
    pub spawn: Pose,

    pub obstacles: Vec<StaticObstacle>,
}

impl SceneDescriptor {
    /// 按名称查找障碍物
    pub fn obstacle(&self, name: &str) -> Option<&StaticObstacle> {
        self.obstacles.iter().find(|o| o.name == name)
    }
}

impl Default for SceneDescriptor {
    fn default() -> Self {
        Self {
            map: "smallgrid".to_string(),
            name: "ultrasonic_analysis".to_string(),
            description: String::new(),
            vehicle_id: "vehicle1".to_string(),
            vehicle_model: "pickup".to_string(),
            spawn: Pose::new(Vec3::new(0.0, 0.0, 0.3), [0.0, 0.0, 1.0, 0.0]),
            obstacles: Vec::new(),
        }
    }
}
