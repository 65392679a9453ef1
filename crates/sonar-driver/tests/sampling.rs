//! 采样与绑定集成测试（Mock 仿真器）

use sonar_driver::{DriverError, SensorBindings, StateSampler};
use sonar_protocol::{
    Axis, ControlCommand, Distance, Gear, Pose, SceneDescriptor, SensorDescriptor, SensorId,
    SensorLayout, StaticObstacle, Vec3,
};
use sonar_sim::{MockConfig, MockSimulator, SimulatorAdapter};

fn wall_scene() -> SceneDescriptor {
    SceneDescriptor {
        obstacles: vec![StaticObstacle {
            name: "wall".to_string(),
            pose: Pose::new(Vec3::new(0.0, 7.0, 0.0), [0.0, 0.0, 0.0, 1.0]),
            scale: Vec3::new(4.0, 1.0, 3.0),
            shape: "/art/shapes/objects/s_drywall.dae".to_string(),
        }],
        ..Default::default()
    }
}

#[test]
fn test_readings_follow_attachment_order() {
    let mut sim = MockSimulator::started(&wall_scene(), MockConfig::default());
    let layout = SensorLayout::front_pair(0.6);
    let bindings = SensorBindings::attach_all(&mut sim, &layout).unwrap();
    assert_eq!(sim.attached_sensors(), 2);

    let mut sampler = StateSampler::new(&mut sim, &bindings, Axis::Y);
    let reading = sampler.poll_sensors().unwrap();
    let ids: Vec<&str> = reading.ids().map(SensorId::as_str).collect();
    assert_eq!(ids, vec!["front left", "front right"]);

    // 墙面 y = 6.5，传感器 y = 2.2
    let d = reading.get(&SensorId::from("front left")).unwrap();
    assert!((d.meters().unwrap() - 4.3).abs() < 1e-9);
}

#[test]
fn test_sentinel_is_flagged_not_zero() {
    let mut sim = MockSimulator::started(&SceneDescriptor::default(), MockConfig::default());
    let layout = SensorLayout::front_pair(0.6);
    let bindings = SensorBindings::attach_all(&mut sim, &layout).unwrap();

    let mut sampler = StateSampler::new(&mut sim, &bindings, Axis::Y);
    let reading = sampler.poll_sensors().unwrap();
    for (_, distance) in reading.iter() {
        assert_eq!(*distance, Distance::Invalid { raw: 9999.0 });
        assert_eq!(distance.meters(), None);
    }
}

#[test]
fn test_poll_projects_travel_axis() {
    let mut sim = MockSimulator::started(&wall_scene(), MockConfig::default());
    let bindings = SensorBindings::new();
    let mut sampler = StateSampler::new(&mut sim, &bindings, Axis::Y);

    let start = sampler.poll().unwrap();
    assert_eq!(start.position, 0.0);
    for _ in 0..30 {
        sampler.actuate(&ControlCommand::drive(0.5, Gear::Forward)).unwrap();
    }
    let moved = sampler.poll().unwrap();
    assert!(moved.position > start.position);
    assert!(moved.velocity > 0.0);
    assert_eq!(moved.speed(), moved.velocity);
}

#[test]
fn test_duplicate_attach_rejected() {
    let mut sim = MockSimulator::started(&wall_scene(), MockConfig::default());
    let descriptor = SensorDescriptor::new("rear", Vec3::new(0.0, 2.3, 0.6), Vec3::new(0.0, 1.0, 0.0));
    let mut bindings = SensorBindings::new();
    bindings.attach(&mut sim, &descriptor).unwrap();
    let err = bindings.attach(&mut sim, &descriptor).unwrap_err();
    assert!(matches!(err, DriverError::DuplicateSensor { ref id } if id == "rear"));
    assert_eq!(sim.attached_sensors(), 1);

    assert_eq!(bindings.detach_all(&mut sim).unwrap(), 1);
    assert!(bindings.is_empty());
    assert_eq!(sim.attached_sensors(), 0);
}

#[test]
fn test_attach_before_start_fails_cleanly() {
    let mut sim = MockSimulator::new(MockConfig::default());
    let err = SensorBindings::attach_all(&mut sim, &SensorLayout::front_pair(0.6)).unwrap_err();
    assert!(matches!(err, DriverError::Sim(_)));
    assert_eq!(sim.attached_sensors(), 0);
}

#[test]
fn test_disconnect_surfaces_from_poll() {
    let config = MockConfig {
        disconnect_after_polls: Some(1),
        ..Default::default()
    };
    let mut sim = MockSimulator::started(&wall_scene(), config);
    let bindings = SensorBindings::new();
    let mut sampler = StateSampler::new(&mut sim, &bindings, Axis::Y);

    assert!(sampler.poll().is_ok());
    let err = sampler.poll().unwrap_err();
    assert!(err.is_disconnect());
    assert!(!sampler.is_connected());
}

#[test]
fn test_adapter_trait_object_sampling() {
    let mut sim: Box<dyn SimulatorAdapter> =
        Box::new(MockSimulator::started(&wall_scene(), MockConfig::default()));
    let bindings = SensorBindings::attach_all(&mut sim, &SensorLayout::front_pair(0.35)).unwrap();
    let mut sampler = StateSampler::new(&mut sim, &bindings, Axis::Y);
    assert_eq!(sampler.poll_sensors().unwrap().len(), 2);
}
