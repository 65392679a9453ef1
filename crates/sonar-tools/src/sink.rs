//! 记录缓冲（RecordSink）
//!
//! 一个 sink 的作用域是一次机动（两个运动段）。`export_and_clear` 之后 sink 为空，
//! 下一次导出与上一次互不污染。
//!
//! # 实时订阅
//!
//! 绘图/监视类消费者通过 [`RecordSink::subscribe`] 获得只读的记录副本：
//! - 有界队列，`try_send` 非阻塞，队列满时丢弃并计数
//! - 订阅端断开后自动移除
//! - 订阅端只读取副本，绝不影响控制循环

use crate::export::{ExportArtifact, RecordExporter};
use crate::record::SensorRecord;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use sonar_protocol::SensorId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// 实时订阅默认队列容量
pub const DEFAULT_LIVE_CAPACITY: usize = 4096;

struct Subscriber {
    tx: Sender<SensorRecord>,
    dropped: Arc<AtomicU64>,
}

/// 实时订阅端
pub struct LiveFeed {
    rx: Receiver<SensorRecord>,
    dropped: Arc<AtomicU64>,
}

impl LiveFeed {
    pub fn receiver(&self) -> &Receiver<SensorRecord> {
        &self.rx
    }

    /// 因队列满而丢弃的记录数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// 取出当前已到达的全部记录（不阻塞）
    pub fn drain(&self) -> Vec<SensorRecord> {
        self.rx.try_iter().collect()
    }
}

/// 记录缓冲
pub struct RecordSink {
    columns: Vec<SensorId>,
    records: Vec<SensorRecord>,
    subscribers: Vec<Subscriber>,
}

impl RecordSink {
    /// 以传感器标识集合（挂载顺序）作为导出列
    pub fn new(columns: Vec<SensorId>) -> Self {
        Self {
            columns,
            records: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// 替换导出列（传感器重新挂载后）
    pub fn set_columns(&mut self, columns: Vec<SensorId>) {
        self.columns = columns;
    }

    pub fn columns(&self) -> &[SensorId] {
        &self.columns
    }

    /// 追加记录（O(1) 均摊，保持顺序）
    pub fn append(&mut self, record: SensorRecord) {
        if !self.subscribers.is_empty() {
            self.subscribers.retain(|sub| match sub.tx.try_send(record.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    let dropped = sub.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped.is_power_of_two() {
                        warn!("Live subscriber queue full, {} records dropped so far", dropped);
                    }
                    true
                },
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
        self.records.push(record);
    }

    /// 订阅后续追加的记录
    pub fn subscribe(&mut self, capacity: usize) -> LiveFeed {
        let (tx, rx) = bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        self.subscribers.push(Subscriber {
            tx,
            dropped: Arc::clone(&dropped),
        });
        LiveFeed { rx, dropped }
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 丢弃全部记录（不导出）
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// 导出并清空
    ///
    /// 无论导出成功与否，sink 都会被清空；零条记录时导出只含表头的结果。
    pub fn export_and_clear(
        &mut self,
        label: &str,
        exporter: &mut dyn RecordExporter,
    ) -> anyhow::Result<ExportArtifact> {
        let result = exporter.export(label, &self.columns, &self.records);
        let rows = self.records.len();
        self.records.clear();
        match &result {
            Ok(artifact) => debug!("Exported {} rows under '{}' ({:?})", rows, label, artifact.path),
            Err(e) => warn!("Export of {} rows under '{}' failed: {:#}", rows, label, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemoryExporter;
    use sonar_protocol::{Distance, Leg, RidePhase, SensorReading};

    fn record(d: f64) -> SensorRecord {
        let mut reading = SensorReading::new();
        reading.push(SensorId::from("front left"), Distance::Valid(d));
        SensorRecord::new(Leg::Forward, RidePhase::Actuating, reading)
    }

    #[test]
    fn test_export_and_clear_is_idempotent() {
        let mut sink = RecordSink::new(vec![SensorId::from("front left")]);
        let mut exporter = MemoryExporter::new();

        sink.append(record(1.0));
        sink.append(record(2.0));
        let first = sink.export_and_clear("a", &mut exporter).unwrap();
        assert_eq!(first.rows, 2);
        assert!(sink.is_empty());

        sink.append(record(3.0));
        let second = sink.export_and_clear("b", &mut exporter).unwrap();
        assert_eq!(second.rows, 1);

        let a = exporter.artifact("a").unwrap();
        let b = exporter.artifact("b").unwrap();
        assert_eq!(a.records.len(), 2);
        assert_eq!(b.records, vec![record(3.0)]);
    }

    #[test]
    fn test_empty_export() {
        let mut sink = RecordSink::new(vec![SensorId::from("front left")]);
        let mut exporter = MemoryExporter::new();
        let artifact = sink.export_and_clear("empty", &mut exporter).unwrap();
        assert_eq!(artifact.rows, 0);
        assert_eq!(exporter.artifact("empty").unwrap().columns.len(), 1);
    }

    #[test]
    fn test_live_feed_drops_when_full() {
        let mut sink = RecordSink::new(vec![SensorId::from("front left")]);
        let feed = sink.subscribe(2);
        for i in 0..5 {
            sink.append(record(i as f64));
        }
        assert_eq!(sink.len(), 5);
        assert_eq!(feed.dropped(), 3);
        assert_eq!(feed.drain(), vec![record(0.0), record(1.0)]);
    }

    #[test]
    fn test_disconnected_subscriber_removed() {
        let mut sink = RecordSink::new(Vec::new());
        let feed = sink.subscribe(8);
        drop(feed);
        sink.append(record(1.0));
        assert!(sink.subscribers.is_empty());
    }
}
