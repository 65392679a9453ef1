//! 记录导出器
//!
//! 导出结果以运行标签为键：同一组记录重复导出得到相同的结果。
//! 零条记录也会产生一个结果（CSV 只有表头）。

use crate::record::SensorRecord;
use crate::recording::{RecordingMetadata, SonarRecording};
use anyhow::{Context, Result};
use sonar_protocol::{Distance, SensorId};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 一次导出的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub label: String,
    pub rows: usize,
    /// 写入的文件（内存导出为 `None`）
    pub path: Option<PathBuf>,
}

/// 导出器接口
pub trait RecordExporter {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact>;
}

impl<T: RecordExporter + ?Sized> RecordExporter for Box<T> {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact> {
        (**self).export(label, columns, records)
    }
}

/// CSV 导出器
///
/// 文件名为 `{dir}/{prefix}{label}.csv`。每行一个 tick，每列一个传感器；
/// 无效读数写为空单元格。
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
    prefix: String,
    include_tags: bool,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "sensor_data_".to_string(),
            include_tags: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// 在传感器列之前增加 `leg`、`phase` 两列
    pub fn with_tags(mut self, include_tags: bool) -> Self {
        self.include_tags = include_tags;
        self
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}{}.csv", self.prefix, label))
    }

    /// 写入任意 `Write`（文件导出和测试共用）
    pub fn write_csv<W: Write>(
        &self,
        out: &mut W,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> std::io::Result<()> {
        let mut header: Vec<String> = Vec::with_capacity(columns.len() + 2);
        if self.include_tags {
            header.push("leg".to_string());
            header.push("phase".to_string());
        }
        header.extend(columns.iter().map(|c| escape(c.as_str())));
        writeln!(out, "{}", header.join(","))?;

        let mut row: Vec<String> = Vec::with_capacity(header.len());
        for record in records {
            row.clear();
            if self.include_tags {
                row.push(record.leg.to_string());
                row.push(record.phase.to_string());
            }
            for column in columns {
                row.push(match record.reading.get(column) {
                    Some(Distance::Valid(m)) => m.to_string(),
                    Some(Distance::Invalid { .. }) | None => String::new(),
                });
            }
            writeln!(out, "{}", row.join(","))?;
        }
        Ok(())
    }
}

impl RecordExporter for CsvExporter {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("创建输出目录失败: {}", self.dir.display()))?;
        let path = self.path_for(label);
        let file =
            File::create(&path).with_context(|| format!("创建 CSV 文件失败: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer, columns, records)
            .and_then(|_| writer.flush())
            .with_context(|| format!("写入 CSV 文件失败: {}", path.display()))?;

        Ok(ExportArtifact {
            label: label.to_string(),
            rows: records.len(),
            path: Some(path),
        })
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// 二进制录制导出器（`{dir}/{label}.bin`）
#[derive(Debug, Clone)]
pub struct RecordingExporter {
    dir: PathBuf,
}

impl RecordingExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", label))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordExporter for RecordingExporter {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("创建输出目录失败: {}", self.dir.display()))?;
        let metadata = RecordingMetadata::new(label, columns.iter().map(|c| c.to_string()).collect());
        let recording = SonarRecording::new(metadata, records.to_vec());
        let path = self.path_for(label);
        recording.save(&path)?;

        Ok(ExportArtifact {
            label: label.to_string(),
            rows: records.len(),
            path: Some(path),
        })
    }
}

/// 内存中的导出结果
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryArtifact {
    pub label: String,
    pub columns: Vec<SensorId>,
    pub records: Vec<SensorRecord>,
}

/// 内存导出器（测试、演练）
#[derive(Debug, Clone, Default)]
pub struct MemoryExporter {
    artifacts: Vec<MemoryArtifact>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按导出顺序排列的全部结果
    pub fn artifacts(&self) -> &[MemoryArtifact] {
        &self.artifacts
    }

    /// 最近一次以 `label` 导出的结果
    pub fn artifact(&self, label: &str) -> Option<&MemoryArtifact> {
        self.artifacts.iter().rev().find(|a| a.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.label.as_str()).collect()
    }
}

impl RecordExporter for MemoryExporter {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact> {
        self.artifacts.push(MemoryArtifact {
            label: label.to_string(),
            columns: columns.to_vec(),
            records: records.to_vec(),
        });
        Ok(ExportArtifact {
            label: label.to_string(),
            rows: records.len(),
            path: None,
        })
    }
}

/// 同时写入多个导出器（例如 CSV + 二进制录制）
///
/// 返回第一个导出器的结果。
pub struct FanoutExporter {
    exporters: Vec<Box<dyn RecordExporter + Send>>,
}

impl FanoutExporter {
    pub fn new(exporters: Vec<Box<dyn RecordExporter + Send>>) -> Self {
        Self { exporters }
    }
}

impl RecordExporter for FanoutExporter {
    fn export(
        &mut self,
        label: &str,
        columns: &[SensorId],
        records: &[SensorRecord],
    ) -> Result<ExportArtifact> {
        let mut first = None;
        for exporter in &mut self.exporters {
            let artifact = exporter.export(label, columns, records)?;
            first.get_or_insert(artifact);
        }
        first.ok_or_else(|| anyhow::anyhow!("no exporter configured for '{}'", label))
    }
}
