//! 车辆状态与位姿
//!
//! `VehicleState` 是每次轮询得到的瞬时快照，不跨 tick 保留
//! （运动段起点位置除外，由控制器自行保存）。

use crate::Vec3;
use nalgebra::UnitQuaternion;

/// 运动轴
///
/// 控制器只消费主运动轴上的分量，另外两个轴被忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    /// 默认运动轴（车辆沿世界坐标 Y 轴前后行驶）
    #[default]
    Y,
    Z,
}

impl Axis {
    /// 分量索引
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// 取向量在该轴上的分量
    #[inline]
    pub fn component(self, v: &Vec3) -> f64 {
        v[self.index()]
    }
}

/// 车辆瞬时状态
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleState {
    /// 世界坐标位置（m）
    pub position: Vec3,

    /// 世界坐标速度（m/s）
    pub velocity: Vec3,
}

impl VehicleState {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity }
    }

    /// 在给定位置静止
    pub fn at_rest(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::zeros(),
        }
    }

    /// 主运动轴上的位置
    #[inline]
    pub fn position_along(&self, axis: Axis) -> f64 {
        axis.component(&self.position)
    }

    /// 主运动轴上的速度（带符号）
    #[inline]
    pub fn velocity_along(&self, axis: Axis) -> f64 {
        axis.component(&self.velocity)
    }

    /// 主运动轴上的速率（绝对值）
    #[inline]
    pub fn speed_along(&self, axis: Axis) -> f64 {
        self.velocity_along(axis).abs()
    }
}

/// 车辆位姿（位置 + 朝向四元数）
///
/// 四元数分量顺序为 `[x, y, z, w]`，与仿真器的 `rot_quat` 约定一致。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Vec3,
    pub rot_quat: [f64; 4],
}

impl Pose {
    pub fn new(position: Vec3, rot_quat: [f64; 4]) -> Self {
        Self { position, rot_quat }
    }

    /// 由欧拉角（度）构造朝向
    ///
    /// 角度顺序为 (roll, pitch, yaw)。
    pub fn from_euler_degrees(position: Vec3, angles: (f64, f64, f64)) -> Self {
        let (roll, pitch, yaw) = angles;
        let q = UnitQuaternion::from_euler_angles(
            roll.to_radians(),
            pitch.to_radians(),
            yaw.to_radians(),
        );
        let c = q.coords;
        Self {
            position,
            rot_quat: [c[0], c[1], c[2], c[3]],
        }
    }

    /// 沿某个轴平移后的位姿（朝向不变）
    pub fn offset_along(&self, axis: Axis, delta: f64) -> Self {
        let mut position = self.position;
        position[axis.index()] += delta;
        Self {
            position,
            rot_quat: self.rot_quat,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rot_quat: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_component() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        assert_eq!(Axis::X.component(&v), 1.0);
        assert_eq!(Axis::Y.component(&v), -2.0);
        assert_eq!(Axis::Z.component(&v), 3.0);
        assert_eq!(Axis::default(), Axis::Y);
    }

    #[test]
    fn test_vehicle_state_along_axis() {
        let state = VehicleState::new(Vec3::new(0.0, 4.5, 0.3), Vec3::new(0.1, -0.8, 0.0));
        assert_eq!(state.position_along(Axis::Y), 4.5);
        assert_eq!(state.velocity_along(Axis::Y), -0.8);
        assert_eq!(state.speed_along(Axis::Y), 0.8);
    }

    #[test]
    fn test_pose_from_euler_identity() {
        let pose = Pose::from_euler_degrees(Vec3::zeros(), (0.0, 0.0, 0.0));
        assert!((pose.rot_quat[3] - 1.0).abs() < 1e-12);
        assert!(pose.rot_quat[..3].iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn test_pose_from_euler_yaw_180() {
        let pose = Pose::from_euler_degrees(Vec3::zeros(), (0.0, 0.0, 180.0));
        // 绕 Z 轴 180°：z 分量为 ±1
        assert!((pose.rot_quat[2].abs() - 1.0).abs() < 1e-9);
        assert!(pose.rot_quat[3].abs() < 1e-9);
    }

    #[test]
    fn test_pose_offset_along() {
        let pose = Pose::new(Vec3::new(0.0, 0.0, 0.3), [0.0, 0.0, -1.0, 0.0]);
        let moved = pose.offset_along(Axis::X, 10.0);
        assert_eq!(moved.position, Vec3::new(10.0, 0.0, 0.3));
        assert_eq!(moved.rot_quat, pose.rot_quat);
    }
}
