//! 配置加载与输出构造

use anyhow::{Context, Result};
use sonar_protocol::{Pose, StaticObstacle, Vec3};
use sonar_tools::{
    BatchConfig, CsvExporter, FanoutExporter, OutputFormat, OutputSection, RecordExporter,
    RecordingExporter, RunSection, SensorSetSection,
};
use std::path::{Path, PathBuf};

/// 解析配置文件路径（命令行参数优先）
pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => BatchConfig::default_path().context("无法确定配置目录，请使用 --config 指定配置文件"),
    }
}

/// 加载配置、应用环境变量覆盖并校验
pub fn load(path: Option<&Path>) -> Result<(PathBuf, BatchConfig)> {
    let path = resolve_path(path)?;
    let mut config = BatchConfig::load(&path)?;
    config.apply_env()?;
    config
        .validate()
        .with_context(|| format!("配置无效: {}", path.display()))?;
    Ok((path, config))
}

/// 按输出格式构造导出器
pub fn exporter(output: &OutputSection) -> Box<dyn RecordExporter + Send> {
    let csv = || {
        CsvExporter::new(&output.dir)
            .with_prefix(output.prefix.clone())
            .with_tags(output.include_tags)
    };
    match output.format {
        OutputFormat::Csv => Box::new(csv()),
        OutputFormat::Recording => Box::new(RecordingExporter::new(&output.dir)),
        OutputFormat::Both => Box::new(FanoutExporter::new(vec![
            Box::new(csv()),
            Box::new(RecordingExporter::new(&output.dir)),
        ])),
    }
}

fn drywall(name: &str, x: f64, z: f64, height: f64) -> StaticObstacle {
    StaticObstacle {
        name: name.to_string(),
        pose: Pose::new(Vec3::new(x, 8.0, z), [0.0, 0.0, 0.0, 1.0]),
        scale: Vec3::new(3.0, 1.0, height),
        shape: "/art/shapes/objects/s_drywall.dae".to_string(),
    }
}

/// 示例配置：墙 + 路缘石，两个安装高度
pub fn sample_config() -> BatchConfig {
    let mut config = BatchConfig::default();
    config.scene.description = "Wall and curbstone at two mounting heights".to_string();
    config.scene.obstacles = vec![drywall("wall", 0.0, 0.5, 1.0), drywall("curbstone", 10.0, 0.1, 0.2)];
    config.sensor_sets = vec![
        SensorSetSection {
            name: "h060".to_string(),
            height: Some(0.6),
            sensors: Vec::new(),
        },
        SensorSetSection {
            name: "h000".to_string(),
            height: Some(-0.2),
            sensors: Vec::new(),
        },
    ];
    config.runs = vec![RunSection::named("wall"), RunSection::named("curbstone")];
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sample_config_is_valid() {
        let config = sample_config();
        config.validate().unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(BatchConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(&path, sample_config().to_toml_string().unwrap()).unwrap();

        let (resolved, config) = load(Some(&path)).unwrap();
        assert_eq!(resolved, path);
        assert_eq!(config.runs.len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("empty.toml"), "{:#}", err);
    }

    #[test]
    fn test_exporter_writes_configured_formats() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputSection {
            dir: dir.path().to_path_buf(),
            format: OutputFormat::Both,
            ..Default::default()
        };
        let mut exporter = exporter(&output);
        let artifact = exporter.export("wall", &[], &[]).unwrap();
        assert_eq!(artifact.rows, 0);
        assert!(dir.path().join("sensor_data_wall.csv").exists());
        assert!(dir.path().join("wall.bin").exists());
    }
}
