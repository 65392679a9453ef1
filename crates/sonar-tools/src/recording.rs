//! # 录制格式定义
//!
//! 一次机动的全部记录，供离线分析和 `sonar-cli summary` 使用。

use crate::record::SensorRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sonar_protocol::{Leg, RidePhase};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 文件魔数
pub const MAGIC: &[u8; 8] = b"SONARV1\0";

/// 当前格式版本
pub const FORMAT_VERSION: u8 = 1;

/// Sonar 录制文件 v1
///
/// 格式：
///
/// ```text
/// [MAGIC: 8 bytes]
/// [Version: 1 byte]
/// [Data: bincode serialized SonarRecording]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonarRecording {
    pub version: u8,
    pub metadata: RecordingMetadata,
    /// 按 tick 顺序排列的记录
    pub records: Vec<SensorRecord>,
}

impl SonarRecording {
    pub fn new(metadata: RecordingMetadata, records: Vec<SensorRecord>) -> Self {
        Self {
            version: FORMAT_VERSION,
            metadata,
            records,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// 指定运动段、指定状态下的记录数
    pub fn count(&self, leg: Leg, phase: RidePhase) -> usize {
        self.records.iter().filter(|r| r.leg == leg && r.phase == phase).count()
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("创建录制文件失败: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC).context("写入魔数失败")?;
        writer.write_all(&[self.version]).context("写入版本失败")?;

        let data = bincode::serialize(self).context("序列化录制失败")?;
        writer.write_all(&data).context("写入录制数据失败")?;
        writer.flush().context("刷新缓冲区失败")?;

        Ok(())
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("打开录制文件失败: {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).context("读取魔数失败")?;
        if &magic != MAGIC {
            anyhow::bail!("无效的录制文件格式（魔数不匹配）");
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version).context("读取版本失败")?;
        if version[0] != FORMAT_VERSION {
            anyhow::bail!("不支持的录制文件版本: {}", version[0]);
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).context("读取录制数据失败")?;
        let recording: SonarRecording =
            bincode::deserialize(&data).context("反序列化录制失败")?;

        Ok(recording)
    }
}

/// 录制元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// 运行标签
    pub label: String,

    /// 录制时间（Unix 时间戳，秒）
    pub created_at: u64,

    /// 列名（传感器标识，挂载顺序）
    pub sensors: Vec<String>,

    /// 平台信息
    pub platform: String,

    /// 备注
    pub notes: String,
}

impl RecordingMetadata {
    pub fn new(label: impl Into<String>, sensors: Vec<String>) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        Self {
            label: label.into(),
            created_at: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
            sensors,
            platform: std::env::consts::OS.to_string(),
            notes: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_protocol::{Distance, SensorId, SensorReading};
    use tempfile::NamedTempFile;

    fn sample() -> SonarRecording {
        let mut reading = SensorReading::new();
        reading.push(SensorId::from("front left"), Distance::Valid(2.5));
        reading.push(SensorId::from("front right"), Distance::Invalid { raw: 9999.0 });
        let records = vec![
            SensorRecord::new(Leg::Forward, RidePhase::Actuating, reading.clone()),
            SensorRecord::new(Leg::Forward, RidePhase::Braking, reading.clone()),
            SensorRecord::new(Leg::Backward, RidePhase::Actuating, reading),
        ];
        SonarRecording::new(
            RecordingMetadata::new("wall", vec!["front left".into(), "front right".into()]),
            records,
        )
    }

    #[test]
    fn test_save_and_load() {
        let recording = sample();
        let file = NamedTempFile::new().unwrap();
        recording.save(file.path()).unwrap();

        let loaded = SonarRecording::load(file.path()).unwrap();
        assert_eq!(loaded, recording);
        assert_eq!(loaded.count(Leg::Forward, RidePhase::Braking), 1);
        // 无效读数保留原始值
        let raw = loaded.records[0].reading.get(&SensorId::from("front right")).unwrap();
        assert_eq!(raw, Distance::Invalid { raw: 9999.0 });
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"NOTSONAR\x01rest").unwrap();
        let err = SonarRecording::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("魔数"), "{}", err);
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let file = NamedTempFile::new().unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.push(9);
        std::fs::write(file.path(), bytes).unwrap();
        let err = SonarRecording::load(file.path()).unwrap_err();
        assert!(err.to_string().contains('9'), "{}", err);
    }
}
