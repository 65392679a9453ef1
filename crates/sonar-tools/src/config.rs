//! # 批次配置
//!
//! 一个 TOML 文件描述整个批次：仿真器连接、场景、控制器参数、各段等待时间、
//! 输出、传感器安装方案（外层循环）和运行列表（内层循环）。
//!
//! 配置文件路径：
//! - Linux/macOS: `~/.config/sonar/batch.toml`
//! - Windows: `%APPDATA%\sonar\batch.toml`
//!
//! 环境变量覆盖：`SONAR_SIM_HOST`、`SONAR_SIM_PORT`、`SONAR_SIM_HOME`、`SONAR_SIM_USER`。
//!
//! ```toml
//! failure_policy = "skip_run"
//!
//! [simulator]
//! port = 50977
//!
//! [controller]
//! throttle = 0.2
//! distance = 4.5
//!
//! [[sensor_sets]]
//! name = "h060"
//! height = 0.6
//!
//! [[runs]]
//! name = "wall"
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sonar_protocol::{
    Axis, Gear, ManeuverProfile, Pose, SceneDescriptor, SensorDescriptor, SensorLayout,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 单次运行失败后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 任何运行失败都终止整个批次
    AbortBatch,
    /// 记录并跳过失败的运行（连接错误和取消仍会终止批次）
    #[default]
    SkipRun,
}

/// 批次配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_policy: FailurePolicy,
    pub simulator: SimulatorSection,
    pub scene: SceneDescriptor,
    pub controller: ControllerSection,
    pub sequencer: SequencerSection,
    pub output: OutputSection,
    pub sensor_sets: Vec<SensorSetSection>,
    pub runs: Vec<RunSection>,
}

/// 仿真器连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSection {
    pub host: String,
    pub port: u16,
    /// 仿真器安装目录
    pub home: Option<String>,
    /// 仿真器用户目录
    pub user: Option<String>,
    pub connect_timeout_s: f64,
    pub io_timeout_s: f64,
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50977,
            home: None,
            user: None,
            connect_timeout_s: 10.0,
            io_timeout_s: 30.0,
        }
    }
}

impl SimulatorSection {
    pub fn connect_timeout(&self) -> Result<Duration> {
        positive_seconds("simulator.connect_timeout_s", self.connect_timeout_s)
    }

    pub fn io_timeout(&self) -> Result<Duration> {
        positive_seconds("simulator.io_timeout_s", self.io_timeout_s)
    }
}

/// 秒数转 `Duration`（必须有限且 > 0）
fn positive_seconds(field: &str, secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        bail!("{} must be > 0, got {}", field, secs);
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{} is out of range: {}", field, secs))
}

/// 控制器参数
///
/// `max_ticks = 0` 或 `max_duration_s = 0` 表示不启用该上限（但至少要保留一个）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    pub throttle: f64,
    /// 前进距离（m），返程距离为其 2 倍
    pub distance: f64,
    pub stop_speed: f64,
    /// 控制周期（毫秒），不设置时按仿真器应答速度运行
    pub tick_period_ms: Option<u64>,
    pub max_ticks: u64,
    pub max_duration_s: f64,
    /// 超过该速度时滑行（不踩油门）
    pub coast_above: Option<f64>,
    pub axis: Axis,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            throttle: sonar_protocol::DEFAULT_THROTTLE,
            distance: sonar_protocol::DEFAULT_DISTANCE,
            stop_speed: 0.2,
            tick_period_ms: None,
            max_ticks: 100_000,
            max_duration_s: 120.0,
            coast_above: None,
            axis: Axis::Y,
        }
    }
}

impl ControllerSection {
    pub fn tick_period(&self) -> Option<Duration> {
        self.tick_period_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    pub fn max_ticks(&self) -> Option<u64> {
        (self.max_ticks > 0).then_some(self.max_ticks)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration_s > 0.0)
            .then(|| Duration::try_from_secs_f64(self.max_duration_s).ok())
            .flatten()
    }
}

/// 各段等待时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSection {
    pub post_teleport_ms: u64,
    pub between_legs_ms: u64,
    pub post_run_ms: u64,
    /// 运行失败时是否导出已采集的部分记录
    pub flush_on_abort: bool,
    /// 未指定起点的运行沿 X 轴的间距（m）
    pub run_spacing: f64,
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            post_teleport_ms: 200,
            between_legs_ms: 0,
            post_run_ms: 5000,
            flush_on_abort: false,
            run_spacing: 10.0,
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Recording,
    Both,
}

/// 输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    pub format: OutputFormat,
    pub prefix: String,
    /// CSV 中额外输出 `leg`、`phase` 列
    pub include_tags: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            format: OutputFormat::Csv,
            prefix: "sensor_data_".to_string(),
            include_tags: false,
        }
    }
}

/// 传感器安装方案
///
/// `height` 是前保险杠左右两个传感器的简写；也可以用 `sensors` 逐个列出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSetSection {
    pub name: String,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub sensors: Vec<SensorDescriptor>,
}

impl SensorSetSection {
    pub fn layout(&self) -> Result<SensorLayout> {
        match (self.height, self.sensors.is_empty()) {
            (Some(_), false) => {
                bail!("sensor set '{}': use either `height` or `sensors`, not both", self.name)
            },
            (None, true) => bail!("sensor set '{}' has no sensors", self.name),
            (Some(height), true) => {
                if !height.is_finite() {
                    bail!("sensor set '{}': height must be finite", self.name);
                }
                let mut layout = SensorLayout::front_pair(height);
                layout.name = self.name.clone();
                Ok(layout)
            },
            (None, false) => SensorLayout::new(self.name.clone(), self.sensors.clone())
                .with_context(|| format!("sensor set '{}'", self.name)),
        }
    }
}

/// 单次运行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub name: String,
    /// 起点位姿；缺省时为出生点沿 X 轴偏移 `index × run_spacing`
    #[serde(default)]
    pub pose: Option<Pose>,
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
}

impl RunSection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pose: None,
            throttle: None,
            distance: None,
        }
    }
}

impl BatchConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sonar").join("batch.toml"))
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("解析批次配置失败")
    }

    /// 从文件加载（不应用环境变量，不校验）
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("配置文件: {}", path.display()))?;
        debug!(
            "Loaded batch config from {}: {} sensor sets, {} runs",
            path.display(),
            config.sensor_sets.len(),
            config.runs.len()
        );
        Ok(config)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化批次配置失败")
    }

    /// 应用进程环境变量覆盖
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// 应用环境变量覆盖（可注入查找函数）
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SONAR_SIM_HOST") {
            self.simulator.host = host;
        }
        if let Some(port) = lookup("SONAR_SIM_PORT") {
            self.simulator.port = port
                .trim()
                .parse()
                .with_context(|| format!("SONAR_SIM_PORT is not a valid port: '{}'", port))?;
        }
        if let Some(home) = lookup("SONAR_SIM_HOME") {
            self.simulator.home = Some(home);
        }
        if let Some(user) = lookup("SONAR_SIM_USER") {
            self.simulator.user = Some(user);
        }
        Ok(())
    }

    /// 校验（在连接仿真器之前）
    pub fn validate(&self) -> Result<()> {
        let c = &self.controller;
        if !(c.stop_speed.is_finite() && c.stop_speed >= 0.0) {
            bail!("controller.stop_speed must be >= 0, got {}", c.stop_speed);
        }
        if c.max_duration_s != 0.0 {
            positive_seconds("controller.max_duration_s", c.max_duration_s)?;
        }
        if c.max_ticks().is_none() && c.max_duration().is_none() {
            bail!("controller needs at least one of max_ticks / max_duration_s");
        }
        if let Some(v) = c.coast_above
            && !(v.is_finite() && v > 0.0)
        {
            bail!("controller.coast_above must be > 0, got {}", v);
        }
        if !(self.sequencer.run_spacing.is_finite()) {
            bail!("sequencer.run_spacing must be finite");
        }
        self.simulator.connect_timeout()?;
        self.simulator.io_timeout()?;

        if self.sensor_sets.is_empty() {
            bail!("at least one [[sensor_sets]] entry is required");
        }
        let mut names = HashSet::new();
        for set in &self.sensor_sets {
            check_label("sensor set", &set.name)?;
            set.layout()?;
            if !names.insert(set.name.as_str()) {
                bail!("duplicate sensor set name '{}'", set.name);
            }
        }

        if self.runs.is_empty() {
            bail!("at least one [[runs]] entry is required");
        }
        let mut names = HashSet::new();
        for run in &self.runs {
            check_label("run", &run.name)?;
            if !names.insert(run.name.as_str()) {
                bail!("duplicate run name '{}'", run.name);
            }
            self.forward_profile(run)?;
        }
        Ok(())
    }

    /// 全部传感器安装方案
    pub fn sensor_layouts(&self) -> Result<Vec<SensorLayout>> {
        self.sensor_sets.iter().map(SensorSetSection::layout).collect()
    }

    /// 运行的前进段
    pub fn forward_profile(&self, run: &RunSection) -> Result<ManeuverProfile> {
        let throttle = run.throttle.unwrap_or(self.controller.throttle);
        let distance = run.distance.unwrap_or(self.controller.distance);
        ManeuverProfile::new(throttle, distance, Gear::Forward)
            .with_context(|| format!("run '{}'", run.name))
    }

    /// 第 `index` 个运行的起点
    pub fn start_pose(&self, index: usize) -> Option<Pose> {
        let run = self.runs.get(index)?;
        Some(run.pose.unwrap_or_else(|| {
            self.scene
                .spawn
                .offset_along(Axis::X, index as f64 * self.sequencer.run_spacing)
        }))
    }
}

/// 名称会成为输出文件名的一部分，不允许越出输出目录
fn check_label(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("{} names must not be empty", kind);
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        bail!("{} name '{}' must not contain path separators or '..'", kind, name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
failure_policy = "abort_batch"

[simulator]
host = "sim-host"
port = 6000

[controller]
throttle = 0.3
distance = 4.0
tick_period_ms = 50
coast_above = 0.7

[sequencer]
post_run_ms = 100
flush_on_abort = true

[output]
dir = "out"
format = "both"

[[sensor_sets]]
name = "h060"
height = 0.6

[[sensor_sets]]
name = "three"
sensors = [
    { id = "left", mount = [0.6, -2.2, 0.5], direction = [0.0, -1.0, 0.0] },
    { id = "center", mount = [0.0, -2.3, 0.5], direction = [0.0, -1.0, 0.0], max_range = 4.0 },
    { id = "right", mount = [-0.6, -2.2, 0.5], direction = [0.0, -1.0, 0.0] },
]

[[runs]]
name = "wall"

[[runs]]
name = "curbstone"
distance = 3.0
pose = { position = [5.0, 1.0, 0.3], rot_quat = [0.0, 0.0, 1.0, 0.0] }
"#;

    #[test]
    fn test_parse_sample() {
        let config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.failure_policy, FailurePolicy::AbortBatch);
        assert_eq!(config.simulator.host, "sim-host");
        assert_eq!(config.controller.tick_period(), Some(Duration::from_millis(50)));
        assert_eq!(config.controller.max_ticks(), Some(100_000));
        assert_eq!(config.sequencer.post_teleport_ms, 200);
        assert!(config.sequencer.flush_on_abort);
        assert_eq!(config.output.format, OutputFormat::Both);
        // 未写出的 [scene] 使用默认场景
        assert_eq!(config.scene.map, "smallgrid");

        let layouts = config.sensor_layouts().unwrap();
        assert_eq!(layouts[0].name, "h060");
        assert_eq!(layouts[0].sensors.len(), 2);
        assert_eq!(layouts[1].sensors[1].max_range, 4.0);
        assert_eq!(layouts[1].sensors[0].max_range, sonar_protocol::DEFAULT_MAX_RANGE);
    }

    #[test]
    fn test_profiles_and_start_poses() {
        let config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        let wall = config.forward_profile(&config.runs[0]).unwrap();
        assert_eq!(wall.throttle(), 0.3);
        assert_eq!(wall.target_displacement(), 4.0);
        let curb = config.forward_profile(&config.runs[1]).unwrap();
        assert_eq!(curb.target_displacement(), 3.0);

        let first = config.start_pose(0).unwrap();
        assert_eq!(first.position, config.scene.spawn.position);
        let second = config.start_pose(1).unwrap();
        assert_eq!(second.position.x, 5.0);
        assert!(config.start_pose(2).is_none());
    }

    #[test]
    fn test_spacing_applies_to_runs_without_pose() {
        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.runs[1].pose = None;
        let second = config.start_pose(1).unwrap();
        assert_eq!(second.position.x, config.scene.spawn.position.x + 10.0);
        assert_eq!(second.rot_quat, config.scene.spawn.rot_quat);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("SONAR_SIM_PORT", "7001"),
            ("SONAR_SIM_HOME", "/opt/sim"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.simulator.port, 7001);
        assert_eq!(config.simulator.home.as_deref(), Some("/opt/sim"));
        assert_eq!(config.simulator.host, "sim-host");

        let err = config
            .apply_env_from(|key| (key == "SONAR_SIM_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SONAR_SIM_PORT"));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.runs.push(RunSection::named("wall"));
        assert!(config.validate().unwrap_err().to_string().contains("duplicate run"));

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.controller.max_ticks = 0;
        config.controller.max_duration_s = 0.0;
        assert!(config.validate().is_err());

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.runs[0].distance = Some(0.0);
        assert!(config.validate().is_err());

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.sensor_sets[0].sensors = config.sensor_sets[1].sensors.clone();
        assert!(config.validate().unwrap_err().to_string().contains("not both"));

        let config = BatchConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_durations_rejected() {
        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.controller.max_duration_s = f64::INFINITY;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_duration_s"), "{:#}", err);
        assert_eq!(config.controller.max_duration(), None);

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.controller.max_duration_s = -1.0;
        assert!(config.validate().is_err());

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.simulator.io_timeout_s = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("io_timeout_s"), "{:#}", err);

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.simulator.connect_timeout_s = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("connect_timeout_s"), "{:#}", err);

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.simulator.connect_timeout_s = 1e300;
        assert!(config.simulator.connect_timeout().is_err());
        assert!(config.validate().is_err());

        let config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.simulator.io_timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_names_must_stay_inside_output_dir() {
        for name in ["../x", "a/b", "a\\b", ".."] {
            let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
            config.runs[0].name = name.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("path separators"), "{}: {:#}", name, err);

            let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
            config.sensor_sets[0].name = name.to_string();
            assert!(config.validate().is_err(), "{}", name);
        }

        let mut config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        config.runs[0].name = "wall.v2".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_round_trip_keeps_runs() {
        let config = BatchConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        let parsed = BatchConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(&path, SAMPLE).unwrap();
        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.runs.len(), 2);

        let err = BatchConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.toml"));
    }
}
