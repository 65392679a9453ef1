//! 批次执行

use crate::{BatchError, BatchPlan};
use sonar_client::{ManeuverReport, ManeuverSequencer};
use sonar_driver::{DriverError, SensorBindings};
use sonar_protocol::{SceneDescriptor, SensorLayout};
use sonar_sim::SimulatorAdapter;
use sonar_tools::{FailurePolicy, LiveFeed, RecordExporter, RecordSink};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 一次成功的运行
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub set: String,
    pub run: String,
    pub label: String,
    pub report: ManeuverReport,
}

/// 一次被跳过的运行
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRun {
    pub set: String,
    pub run: String,
    pub label: String,
    pub reason: String,
}

/// 批次结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub completed: Vec<RunReport>,
    pub skipped: Vec<SkippedRun>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn labels(&self) -> Vec<&str> {
        self.completed.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn total_rows(&self) -> usize {
        self.completed.iter().map(|r| r.report.artifact.rows).sum()
    }
}

/// 多次运行驱动器
///
/// 持有整个批次共用的记录缓冲；每次运行的导出都会把它清空，运行之间不共享记录。
pub struct MultiRunDriver {
    sequencer: ManeuverSequencer,
    sink: RecordSink,
}

impl MultiRunDriver {
    pub fn new(sequencer: ManeuverSequencer) -> Self {
        Self {
            sequencer,
            sink: RecordSink::new(Vec::new()),
        }
    }

    /// 订阅整个批次的实时记录（只读副本）
    pub fn subscribe(&mut self, capacity: usize) -> LiveFeed {
        self.sink.subscribe(capacity)
    }

    /// 加载并启动场景
    pub fn prepare_scenario<A>(&self, adapter: &mut A, scene: &SceneDescriptor) -> Result<(), BatchError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        adapter.load_scenario(scene)?;
        adapter.start_scenario()?;
        info!(
            "Scenario '{}' started on map '{}' with {} obstacles",
            scene.name,
            scene.map,
            scene.obstacles.len()
        );
        Ok(())
    }

    /// 依次执行计划中的全部运行
    pub fn run<A>(
        &mut self,
        adapter: &mut A,
        plan: &BatchPlan,
        exporter: &mut dyn RecordExporter,
    ) -> Result<BatchReport, BatchError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        let started = Instant::now();
        let mut report = BatchReport::default();
        info!(
            "Starting batch: {} sensor sets x {} runs, policy {:?}",
            plan.sensor_sets.len(),
            plan.runs.len(),
            plan.failure_policy
        );

        for set in &plan.sensor_sets {
            for run in &plan.runs {
                if self.sequencer.is_cancelled() {
                    return Err(BatchError::Cancelled {
                        completed: report.completed.len(),
                    });
                }
                let label = plan.label(set, run);
                info!("Run '{}' ({}/{})", label, report.completed.len() + report.skipped.len() + 1, plan.len());

                let bindings = match SensorBindings::attach_all(adapter, set) {
                    Ok(bindings) => bindings,
                    Err(e) => {
                        self.handle_setup_failure(plan, set, &run.name, &label, e, &mut report)?;
                        continue;
                    },
                };

                let result = self
                    .sequencer
                    .run(adapter, &bindings, &mut self.sink, &label, run, exporter);
                Self::detach(adapter, bindings, &label);

                match result {
                    Ok(maneuver) => report.completed.push(RunReport {
                        set: set.name.clone(),
                        run: run.name.clone(),
                        label,
                        report: maneuver,
                    }),
                    Err(e) if e.is_cancelled() => {
                        return Err(BatchError::Cancelled {
                            completed: report.completed.len(),
                        });
                    },
                    Err(e) if e.is_fatal() || plan.failure_policy == FailurePolicy::AbortBatch => {
                        return Err(BatchError::Aborted {
                            label,
                            completed: report.completed.len(),
                            source: e,
                        });
                    },
                    Err(e) => {
                        warn!("Skipping run '{}': {}", label, e);
                        report.skipped.push(SkippedRun {
                            set: set.name.clone(),
                            run: run.name.clone(),
                            label,
                            reason: e.to_string(),
                        });
                    },
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Batch finished: {} completed, {} skipped, {} rows in {:?}",
            report.completed.len(),
            report.skipped.len(),
            report.total_rows(),
            report.elapsed
        );
        Ok(report)
    }

    fn handle_setup_failure(
        &self,
        plan: &BatchPlan,
        set: &SensorLayout,
        run: &str,
        label: &str,
        error: DriverError,
        report: &mut BatchReport,
    ) -> Result<(), BatchError> {
        if error.is_fatal() || plan.failure_policy == FailurePolicy::AbortBatch {
            return Err(BatchError::SensorSetup {
                label: label.to_string(),
                source: error,
            });
        }
        warn!("Skipping run '{}': sensor setup failed: {}", label, error);
        report.skipped.push(SkippedRun {
            set: set.name.clone(),
            run: run.to_string(),
            label: label.to_string(),
            reason: error.to_string(),
        });
        Ok(())
    }

    fn detach<A>(adapter: &mut A, mut bindings: SensorBindings, label: &str)
    where
        A: SimulatorAdapter + ?Sized,
    {
        if let Err(e) = bindings.detach_all(adapter) {
            warn!("Failed to detach sensors after '{}': {}", label, e);
        }
    }
}
