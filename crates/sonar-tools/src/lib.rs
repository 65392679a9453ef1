//! # Sonar Tools - 记录、导出与配置
//!
//! **依赖原则**: 只依赖 `sonar-protocol`，避免依赖 `sonar-client`
//!
//! ## 包含模块
//!
//! - `record` - 每个 tick 的传感器记录
//! - `sink` - 记录缓冲（RecordSink）与实时订阅
//! - `export` - 导出器（CSV、二进制录制、内存）
//! - `recording` - 二进制录制格式定义
//! - `config` - 批次配置文件（TOML）
//! - `statistics` - 读数统计（可选）
//!
//! ## Feature Flags
//!
//! - `default` - 无默认 features
//! - `full` - 启用所有功能（包含 statistics）
//! - `statistics` - 启用统计模块

pub mod config;
pub mod export;
pub mod record;
pub mod recording;
pub mod sink;

#[cfg(feature = "statistics")]
pub mod statistics;

// 重新导出常用类型
pub use config::{
    BatchConfig, ControllerSection, FailurePolicy, OutputFormat, OutputSection, RunSection,
    SensorSetSection, SequencerSection, SimulatorSection,
};
pub use export::{
    CsvExporter, ExportArtifact, FanoutExporter, MemoryArtifact, MemoryExporter, RecordExporter,
    RecordingExporter,
};
pub use record::SensorRecord;
pub use recording::{RecordingMetadata, SonarRecording};
pub use sink::{DEFAULT_LIVE_CAPACITY, LiveFeed, RecordSink};

#[cfg(feature = "statistics")]
pub use statistics::{RunStatistics, SensorStatistics, run_statistics, sensor_statistics};
