//! Timer lifecycle for the two polling cadences.
//!
//! Each cadence runs in its own task and awaits its cycle before waiting for
//! the next tick, so cycles of one cadence never overlap. Timers sit behind
//! [`Ticker`] so tests can drive cycles by hand.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SECTION_REFRESH_INTERVAL;

/// Source of cycle triggers.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next trigger. `false` means no more triggers will come.
    async fn tick(&mut self) -> bool;
}

/// Tokio interval ticker. Late ticks are delayed, never bunched.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// First tick fires immediately.
    pub fn immediate(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    /// First tick fires after one full period.
    pub fn delayed(period: Duration) -> Self {
        Self::starting_at(Instant::now() + period, period)
    }

    fn starting_at(start: Instant, period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticker fired explicitly through its [`ManualTrigger`].
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct ManualTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, ManualTrigger) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTrigger { tx })
    }
}

impl ManualTrigger {
    /// Queue one tick. Returns `false` once the ticker is gone.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Work driven by the scheduler.
#[async_trait]
pub trait PollCycle: Send + Sync + 'static {
    /// Fast cadence: refresh unread counts.
    async fn poll(&self);
    /// Slow cadence: refresh sidebar sections.
    async fn refresh_sections(&self);
}

#[derive(Debug, Clone, Copy)]
enum Cadence {
    Poll,
    Sections,
}

impl Cadence {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Sections => "sections",
        }
    }
}

struct Running {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Owns the poll and section tasks.
#[derive(Default)]
pub struct PollScheduler {
    running: Mutex<Option<Running>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with interval tickers: polls fire now and every `poll_interval`,
    /// section refreshes every five minutes after one period.
    pub fn start(&self, target: Arc<dyn PollCycle>, poll_interval: Duration) {
        info!(
            poll_interval_secs = poll_interval.as_secs(),
            "Starting poll scheduler"
        );
        self.start_with_tickers(
            target,
            Box::new(IntervalTicker::immediate(poll_interval)),
            Box::new(IntervalTicker::delayed(SECTION_REFRESH_INTERVAL)),
        );
    }

    /// Start with caller-supplied tickers. A running schedule is stopped first.
    pub fn start_with_tickers(
        &self,
        target: Arc<dyn PollCycle>,
        poll_ticker: Box<dyn Ticker>,
        section_ticker: Box<dyn Ticker>,
    ) {
        self.stop();

        let cancel = CancellationToken::new();
        let handles = vec![
            tokio::spawn(run_cadence(
                Cadence::Poll,
                poll_ticker,
                target.clone(),
                cancel.clone(),
            )),
            tokio::spawn(run_cadence(
                Cadence::Sections,
                section_ticker,
                target,
                cancel.clone(),
            )),
        ];

        *self.running.lock() = Some(Running { cancel, handles });
    }

    /// Cancel both cadences. Cycles already in flight run to completion.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.cancel.cancel();
            debug!("Poll scheduler stopped");
        }
    }

    /// Stop and wait for both tasks to exit.
    pub async fn shutdown(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.cancel.cancel();
            for handle in running.handles {
                let _ = handle.await;
            }
            debug!("Poll scheduler shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_cadence(
    cadence: Cadence,
    mut ticker: Box<dyn Ticker>,
    target: Arc<dyn PollCycle>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            more = ticker.tick() => {
                if !more {
                    break;
                }
            }
        }

        match cadence {
            Cadence::Poll => target.poll().await,
            Cadence::Sections => target.refresh_sections().await,
        }
    }
    debug!(cadence = cadence.as_str(), "Cadence loop exited");
}
