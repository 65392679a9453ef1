//! 单段状态机
//!
//! `Actuating`（初始）→ `Braking` → `Stopped`（终止）。
//!
//! # 单个 tick
//!
//! 1. 轮询一次车辆状态
//! 2. Actuating 且位移达到目标 → Braking
//! 3. Braking 且速度不超过停车阈值 → Stopped（不下发命令、不产生记录，不算一个 tick）
//! 4. 按当前状态下发恰好一条命令
//! 5. 轮询一次全部传感器
//! 6. 追加一条记录
//! 7. 配置了控制周期时睡眠到下一个锚点
//!
//! 停车条件要求已经进入过 Braking：从静止起步时速度同样很低，不能因此提前终止。
//!
//! # 失败
//!
//! 采样失败、超时或取消都会终止本段。返回错误之前尽力下发一次全力刹车命令。

use super::{ActuationStrategy, ConstantThrottle, RideConfig};
use crate::ControlError;
use sonar_driver::{AxisSample, StateSampler};
use sonar_protocol::{ControlCommand, Leg, ManeuverProfile, RidePhase};
use sonar_sim::SimulatorAdapter;
use sonar_tools::{RecordSink, SensorRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 单段执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct RideOutcome {
    pub leg: Leg,
    /// 进入 Actuating 时的主轴位置
    pub start_position: f64,
    /// 停车时的主轴位置
    pub final_position: f64,
    /// 停车时的位移（绝对值）
    pub displacement: f64,
    /// Actuating → Braking 时的位移
    pub braking_displacement: f64,
    pub actuating_ticks: u64,
    pub braking_ticks: u64,
    pub elapsed: Duration,
}

impl RideOutcome {
    /// 执行的 tick 总数（= 产生的记录数）
    pub fn ticks(&self) -> u64 {
        self.actuating_ticks + self.braking_ticks
    }

    /// 位移超出目标的部分（刹车距离 + 触发分辨率）
    pub fn overshoot(&self, profile: &ManeuverProfile) -> f64 {
        self.displacement - profile.target_displacement()
    }
}

/// 单段状态机
///
/// 一个实例只执行一个运动段，`run` 消耗实例，段与段之间不共享状态。
pub struct RideController {
    leg: Leg,
    profile: ManeuverProfile,
    config: RideConfig,
    strategy: Arc<dyn ActuationStrategy>,
    cancel: Option<Arc<AtomicBool>>,

    phase: RidePhase,
    start_position: Option<f64>,
    braking_displacement: Option<f64>,
    actuating_ticks: u64,
    braking_ticks: u64,
}

impl RideController {
    pub fn new(leg: Leg, profile: ManeuverProfile, config: RideConfig) -> Self {
        Self {
            leg,
            profile,
            config,
            strategy: Arc::new(ConstantThrottle),
            cancel: None,
            phase: RidePhase::Actuating,
            start_position: None,
            braking_displacement: None,
            actuating_ticks: 0,
            braking_ticks: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ActuationStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// 取消标志（置位后在下一个 tick 开始前终止）
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn phase(&self) -> RidePhase {
        self.phase
    }

    pub fn profile(&self) -> &ManeuverProfile {
        &self.profile
    }

    /// 执行本段直到停车
    pub fn run<A>(
        mut self,
        sampler: &mut StateSampler<'_, A>,
        sink: &mut RecordSink,
    ) -> Result<RideOutcome, ControlError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        self.config.validate()?;
        debug!(
            "{} leg: throttle {:.2}, target {:.2} m, gear {:?}, strategy {}",
            self.leg,
            self.profile.throttle(),
            self.profile.target_displacement(),
            self.profile.gear(),
            self.strategy.name()
        );

        let started = Instant::now();
        match self.drive(sampler, sink, started) {
            Ok(outcome) => {
                info!(
                    "{} leg stopped: displacement {:.3} m (braking at {:.3} m), {} + {} ticks in {:?}",
                    outcome.leg,
                    outcome.displacement,
                    outcome.braking_displacement,
                    outcome.actuating_ticks,
                    outcome.braking_ticks,
                    outcome.elapsed
                );
                Ok(outcome)
            },
            Err(e) => {
                warn!(
                    "{} leg aborted in {} after {} ticks: {}",
                    self.leg,
                    self.phase,
                    self.ticks(),
                    e
                );
                self.force_stop(sampler);
                Err(e)
            },
        }
    }

    fn drive<A>(
        &mut self,
        sampler: &mut StateSampler<'_, A>,
        sink: &mut RecordSink,
        started: Instant,
    ) -> Result<RideOutcome, ControlError>
    where
        A: SimulatorAdapter + ?Sized,
    {
        let target = self.profile.target_displacement();
        let stop_speed = self.config.stop_speed_threshold;
        let mut next_tick = Instant::now();

        loop {
            self.check_cancel()?;
            self.check_ceilings(started)?;

            let sample = sampler.poll()?;
            let start = *self.start_position.get_or_insert(sample.position);
            let displacement = (sample.position - start).abs();

            if self.phase == RidePhase::Actuating && displacement >= target {
                self.phase = RidePhase::Braking;
                self.braking_displacement = Some(displacement);
                debug!(
                    "{} leg braking at displacement {:.3} m (target {:.3} m) after {} ticks",
                    self.leg, displacement, target, self.actuating_ticks
                );
            }

            if self.phase == RidePhase::Braking && sample.speed() <= stop_speed {
                self.phase = RidePhase::Stopped;
                return Ok(self.outcome(start, &sample, displacement, started));
            }

            let command = match self.phase {
                RidePhase::Braking => ControlCommand::full_stop(),
                _ => self.strategy.command(&self.profile, &sample),
            };
            sampler.actuate(&command)?;

            let reading = sampler.poll_sensors()?;
            sink.append(SensorRecord::new(self.leg, self.phase, reading));

            match self.phase {
                RidePhase::Braking => self.braking_ticks += 1,
                _ => self.actuating_ticks += 1,
            }
            trace!(
                "tick {}: {} pos {:.3} vel {:.3} disp {:.3} throttle {:.2} brake {:.2}",
                self.ticks(),
                self.phase,
                sample.position,
                sample.velocity,
                displacement,
                command.throttle,
                command.brake
            );

            if let Some(period) = self.config.tick_period {
                // 绝对时间锚点，消除累积漂移
                next_tick += period;
                let now = Instant::now();
                if next_tick > now {
                    spin_sleep::sleep(next_tick - now);
                } else {
                    warn!(
                        "Control tick overrun: tick took {:?} longer than period {:?}",
                        now - next_tick,
                        period
                    );
                    next_tick = now;
                }
            }
        }
    }

    fn ticks(&self) -> u64 {
        self.actuating_ticks + self.braking_ticks
    }

    fn check_cancel(&self) -> Result<(), ControlError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ControlError::Cancelled),
            _ => Ok(()),
        }
    }

    fn check_ceilings(&self, started: Instant) -> Result<(), ControlError> {
        let ticks = self.ticks();
        let elapsed = started.elapsed();
        let over_ticks = self.config.max_ticks.is_some_and(|max| ticks >= max);
        let over_time = self.config.max_duration.is_some_and(|max| elapsed >= max);
        if over_ticks || over_time {
            return Err(ControlError::TimeoutExceeded {
                ticks,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// 尽力而为的停车命令（失败只记录日志）
    fn force_stop<A>(&self, sampler: &mut StateSampler<'_, A>)
    where
        A: SimulatorAdapter + ?Sized,
    {
        if let Err(e) = sampler.actuate(&ControlCommand::full_stop()) {
            warn!("Failed to send stop command after abort: {}. Continuing anyway.", e);
        }
    }

    fn outcome(
        &self,
        start: f64,
        last: &AxisSample,
        displacement: f64,
        started: Instant,
    ) -> RideOutcome {
        RideOutcome {
            leg: self.leg,
            start_position: start,
            final_position: last.position,
            displacement,
            braking_displacement: self.braking_displacement.unwrap_or(displacement),
            actuating_ticks: self.actuating_ticks,
            braking_ticks: self.braking_ticks,
            elapsed: started.elapsed(),
        }
    }
}
