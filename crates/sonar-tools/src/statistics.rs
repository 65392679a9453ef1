//! # 读数统计
//!
//! 每个传感器的有效/无效样本数和距离分布（可选模块）
//!
//! 需要启用 `statistics` feature：
//! ```toml
//! sonar-tools = { workspace = true, features = ["statistics"] }
//! ```

use crate::record::SensorRecord;
use serde::{Deserialize, Serialize};
use sonar_protocol::{Distance, Leg, RidePhase, SensorId};
use statrs::statistics::Statistics;

/// 单个传感器的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStatistics {
    pub id: String,
    pub valid: usize,
    pub invalid: usize,
    /// 以下字段在没有有效样本时为 `None`
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// 样本标准差（少于 2 个样本时为 `None`）
    pub std_dev: Option<f64>,
}

impl SensorStatistics {
    /// 有效样本比例（%）
    pub fn valid_rate(&self) -> f64 {
        let total = self.valid + self.invalid;
        if total == 0 {
            return 0.0;
        }
        self.valid as f64 / total as f64 * 100.0
    }
}

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub ticks: usize,
    pub forward_actuating: usize,
    pub forward_braking: usize,
    pub backward_actuating: usize,
    pub backward_braking: usize,
    pub sensors: Vec<SensorStatistics>,
}

/// 按列顺序计算每个传感器的统计
pub fn sensor_statistics(columns: &[SensorId], records: &[SensorRecord]) -> Vec<SensorStatistics> {
    columns
        .iter()
        .map(|id| {
            let mut values = Vec::with_capacity(records.len());
            let mut invalid = 0;
            for record in records {
                match record.reading.get(id) {
                    Some(Distance::Valid(m)) => values.push(m),
                    Some(Distance::Invalid { .. }) => invalid += 1,
                    None => {},
                }
            }
            let valid = values.len();
            let (min, max, mean) = if valid == 0 {
                (None, None, None)
            } else {
                (
                    Some(Statistics::min(values.iter())),
                    Some(Statistics::max(values.iter())),
                    Some(values.iter().mean()),
                )
            };
            let std_dev = (valid >= 2).then(|| values.iter().std_dev());
            SensorStatistics {
                id: id.to_string(),
                valid,
                invalid,
                min,
                max,
                mean,
                std_dev,
            }
        })
        .collect()
}

/// 整次运行的统计
pub fn run_statistics(columns: &[SensorId], records: &[SensorRecord]) -> RunStatistics {
    let count = |leg: Leg, phase: RidePhase| {
        records.iter().filter(|r| r.leg == leg && r.phase == phase).count()
    };
    RunStatistics {
        ticks: records.len(),
        forward_actuating: count(Leg::Forward, RidePhase::Actuating),
        forward_braking: count(Leg::Forward, RidePhase::Braking),
        backward_actuating: count(Leg::Backward, RidePhase::Actuating),
        backward_braking: count(Leg::Backward, RidePhase::Braking),
        sensors: sensor_statistics(columns, records),
    }
}
