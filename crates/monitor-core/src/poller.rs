//! Periodic polling loop.
//!
//! A [`Poller`] runs one cycle immediately on [`start`](Poller::start), then
//! one cycle per interval until [`stop`](Poller::stop). Each cycle fans the
//! configured calls out as independent tasks, waits for all of them to settle,
//! appends the records to the window, recomputes the metrics snapshot and
//! publishes it to the sink.
//!
//! ```text
//!  start()          tick            tick
//!    │               │               │
//!    ▼               ▼               ▼
//!  [cycle]──Idle──[cycle]──Idle──[cycle]── ... stop() ──► Stopped
//! ```

use arc_swap::ArcSwap;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    metrics::{compute, RpcMetrics},
    rpc::RpcClient,
    sink::MetricsSink,
    store::{CallRecordStore, DEFAULT_WINDOW_CAPACITY},
    types::DEFAULT_POLLED_METHODS,
};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One call issued on every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub method: String,
    pub params: Value,
}

impl RpcCall {
    /// A call with empty params.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: Value::Array(Vec::new()) }
    }
}

/// Configuration for [`Poller`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Delay between the end of one cycle's scheduling slot and the next
    pub interval: Duration,
    /// Number of call records kept in the window
    pub window_capacity: usize,
    /// Calls issued concurrently on every cycle
    pub calls: Vec<RpcCall>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5_000),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            calls: DEFAULT_POLLED_METHODS.iter().map(|method| RpcCall::new(*method)).collect(),
        }
    }
}

/// Observable poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Not in a cycle; a timer may or may not be armed.
    Idle,
    /// A cycle is in flight.
    Running,
    /// Stopped for good. No further cycles will start.
    Stopped,
}

enum Lifecycle {
    NotStarted,
    Started { shutdown_tx: broadcast::Sender<()>, handle: JoinHandle<()> },
    Stopped { handle: Option<JoinHandle<()>> },
}

/// State shared between the [`Poller`] handle and its timer task.
struct Shared {
    client: Arc<RpcClient>,
    store: CallRecordStore,
    latest: ArcSwap<RpcMetrics>,
    sink: Arc<dyn MetricsSink>,
    calls: Vec<RpcCall>,
    cycles: AtomicU64,
    in_cycle: AtomicBool,
    /// Serializes cycles so snapshots are published in cycle order.
    cycle_guard: tokio::sync::Mutex<()>,
}

impl Shared {
    async fn run_cycle(&self) -> Arc<RpcMetrics> {
        let _guard = self.cycle_guard.lock().await;
        self.in_cycle.store(true, Ordering::Release);
        let started = Instant::now();

        let tasks: Vec<_> = self
            .calls
            .iter()
            .map(|call| {
                let client = self.client.clone();
                let RpcCall { method, params } = call.clone();
                tokio::spawn(async move { client.call(&method, params).await })
            })
            .collect();

        for (call, outcome) in self.calls.iter().zip(join_all(tasks).await) {
            match outcome {
                Ok(record) => {
                    self.store.append(record);
                }
                Err(e) => error!(method = %call.method, error = %e, "rpc call task failed"),
            }
        }

        let previous = self.latest.load_full();
        let snapshot = Arc::new(compute(&self.store.records(), &previous));
        self.latest.store(snapshot.clone());

        let cycle = self.cycles.fetch_add(1, Ordering::AcqRel) + 1;
        self.in_cycle.store(false, Ordering::Release);

        debug!(
            cycle,
            total = snapshot.total_requests,
            failed = snapshot.failed_requests,
            success_rate = snapshot.success_rate,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "poll cycle completed"
        );

        self.sink.publish(snapshot.clone());
        snapshot
    }
}

/// Drives periodic polling of an RPC endpoint.
///
/// Dropping the poller also ends its timer task.
pub struct Poller {
    shared: Arc<Shared>,
    interval: Duration,
    lifecycle: Mutex<Lifecycle>,
}

impl Poller {
    #[must_use]
    pub fn new(client: Arc<RpcClient>, sink: Arc<dyn MetricsSink>, config: PollerConfig) -> Self {
        let shared = Shared {
            client,
            store: CallRecordStore::new(config.window_capacity),
            latest: ArcSwap::from_pointee(RpcMetrics::default()),
            sink,
            calls: config.calls,
            cycles: AtomicU64::new(0),
            in_cycle: AtomicBool::new(false),
            cycle_guard: tokio::sync::Mutex::new(()),
        };

        Self {
            shared: Arc::new(shared),
            interval: config.interval,
            lifecycle: Mutex::new(Lifecycle::NotStarted),
        }
    }

    /// Runs one cycle now and arms the interval timer once it completes.
    ///
    /// Calling `start` on a running or stopped poller logs a warning and does
    /// nothing. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Started { .. } => {
                warn!("poller is already running");
                return;
            }
            Lifecycle::Stopped { .. } => {
                warn!("poller has been stopped and cannot be restarted");
                return;
            }
            Lifecycle::NotStarted => {}
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(Self::run(self.shared.clone(), self.interval, shutdown_rx));
        *lifecycle = Lifecycle::Started { shutdown_tx, handle };

        info!(
            endpoint = self.shared.client.endpoint(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            calls = self.shared.calls.len(),
            "poller started"
        );
    }

    /// Cancels the timer. A cycle already in flight runs to completion.
    ///
    /// Logs a warning and does nothing if the poller is not running.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        match std::mem::replace(&mut *lifecycle, Lifecycle::NotStarted) {
            Lifecycle::Started { shutdown_tx, handle } => {
                // Err only means the task already exited.
                let _ = shutdown_tx.send(());
                *lifecycle = Lifecycle::Stopped { handle: Some(handle) };
                info!(cycles = self.cycles_completed(), "poller stopped");
            }
            previous @ Lifecycle::NotStarted => {
                warn!("poller is not running");
                *lifecycle = previous;
            }
            previous @ Lifecycle::Stopped { .. } => {
                warn!("poller is already stopped");
                *lifecycle = previous;
            }
        }
    }

    /// Stops the poller if it is running and waits for an in-flight cycle to
    /// finish.
    pub async fn shutdown(&self) {
        if self.is_running() {
            self.stop();
        }
        let handle = {
            let mut lifecycle = self.lifecycle.lock();
            match &mut *lifecycle {
                Lifecycle::Stopped { handle } => handle.take(),
                _ => None,
            }
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "poller task failed");
            }
        }
    }

    /// Runs a single cycle without touching the timer.
    pub async fn poll_once(&self) -> Arc<RpcMetrics> {
        self.shared.run_cycle().await
    }

    /// The most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<RpcMetrics> {
        self.shared.latest.load_full()
    }

    #[must_use]
    pub fn state(&self) -> PollerState {
        if matches!(*self.lifecycle.lock(), Lifecycle::Stopped { .. }) {
            PollerState::Stopped
        } else if self.shared.in_cycle.load(Ordering::Acquire) {
            PollerState::Running
        } else {
            PollerState::Idle
        }
    }

    /// Returns `true` while the interval timer is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Started { .. })
    }

    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn store(&self) -> &CallRecordStore {
        &self.shared.store
    }

    /// Clears the window and the latest snapshot.
    pub fn reset(&self) {
        self.shared.store.clear();
        self.shared.latest.store(Arc::new(RpcMetrics::default()));
        info!("poller state reset");
    }

    async fn run(shared: Arc<Shared>, period: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
        if shutdown_rx.try_recv().is_ok() {
            return;
        }
        shared.run_cycle().await;

        let period = period.max(MIN_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("poller timer cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    shared.run_cycle().await;
                }
            }
        }
    }
}
