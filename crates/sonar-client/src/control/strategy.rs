//! Actuating 状态的油门策略

use sonar_driver::AxisSample;
use sonar_protocol::{ControlCommand, ManeuverProfile};

/// 油门策略
///
/// 只决定 Actuating 状态下的命令；Braking 状态的命令固定为全力刹车。
pub trait ActuationStrategy: Send + Sync {
    fn command(&self, profile: &ManeuverProfile, sample: &AxisSample) -> ControlCommand;

    fn name(&self) -> &'static str;
}

/// 恒定油门（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantThrottle;

impl ActuationStrategy for ConstantThrottle {
    fn command(&self, profile: &ManeuverProfile, _sample: &AxisSample) -> ControlCommand {
        ControlCommand::drive(profile.throttle(), profile.gear())
    }

    fn name(&self) -> &'static str {
        "constant"
    }
}

/// 限速滑行
///
/// 速度超过 `coast_above` 时松开油门滑行，避免距离触发之前过冲。
#[derive(Debug, Clone, Copy)]
pub struct SpeedGoverned {
    pub coast_above: f64,
}

impl SpeedGoverned {
    pub fn new(coast_above: f64) -> Self {
        Self { coast_above }
    }
}

impl ActuationStrategy for SpeedGoverned {
    fn command(&self, profile: &ManeuverProfile, sample: &AxisSample) -> ControlCommand {
        if sample.speed() > self.coast_above {
            ControlCommand::coast(profile.gear())
        } else {
            ControlCommand::drive(profile.throttle(), profile.gear())
        }
    }

    fn name(&self) -> &'static str {
        "speed_governed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_protocol::{Gear, Vec3, VehicleState};

    fn sample(velocity: f64) -> AxisSample {
        AxisSample {
            state: VehicleState::new(Vec3::zeros(), Vec3::new(0.0, velocity, 0.0)),
            position: 0.0,
            velocity,
        }
    }

    #[test]
    fn test_constant_throttle() {
        let profile = ManeuverProfile::new(0.4, 3.0, Gear::Reverse).unwrap();
        let cmd = ConstantThrottle.command(&profile, &sample(-2.0));
        assert_eq!(cmd, ControlCommand::drive(0.4, Gear::Reverse));
        assert_eq!(cmd.brake, 0.0);
    }

    #[test]
    fn test_governor_coasts_above_threshold() {
        let profile = ManeuverProfile::forward_default();
        let governor = SpeedGoverned::new(0.7);

        let cmd = governor.command(&profile, &sample(0.5));
        assert_eq!(cmd.throttle, 0.2);

        let cmd = governor.command(&profile, &sample(0.9));
        assert_eq!(cmd.throttle, 0.0);
        assert_eq!(cmd.gear, Gear::Forward);
        assert!(!cmd.parking_brake);

        // 倒车时按速度绝对值判断
        let reverse = ManeuverProfile::return_for(&profile);
        let cmd = governor.command(&reverse, &sample(-0.9));
        assert_eq!(cmd, ControlCommand::coast(Gear::Reverse));
    }
}
