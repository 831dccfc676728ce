// Refresh orchestrator - One cancellable polling loop per dashboard panel
use crate::application::notification::{Notification, NotificationThrottle, Notifier, Outcome};
use crate::domain::dashboard::PanelSnapshot;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch, transform and render one panel
#[async_trait]
pub trait RefreshJob: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<PanelSnapshot>;

    /// Message shown (throttled) after a successful refresh, if any
    fn success_message(&self) -> Option<String> {
        None
    }
}

/// Receives the snapshots of successful refreshes
pub trait PanelSink: Send + Sync {
    fn publish(&self, snapshot: PanelSnapshot);
}

/// Decides whether a timer tick for a panel may fetch right now
pub trait ViewGate: Send + Sync {
    fn allows(&self, task: &str) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    Started,
    InFlight,
    UnknownTask,
    Stopped,
}

struct TaskRunner {
    spec: TaskSpec,
    job: Arc<dyn RefreshJob>,
    in_flight: Arc<AtomicBool>,
}

/// Holds a task's in-flight flag; dropping it releases the flag whatever the
/// outcome of the refresh was.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Shared {
    sink: Arc<dyn PanelSink>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<dyn ViewGate>,
    throttle: Mutex<NotificationThrottle>,
    shutdown: watch::Receiver<bool>,
}

impl Shared {
    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn notify_throttled(&self, task: &str, outcome: Outcome, message: String) {
        let allowed = self
            .throttle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .should_notify(task, outcome, Instant::now());

        if allowed {
            self.notifier.notify(Notification::new(task, outcome, message));
        } else {
            tracing::debug!(task, ?outcome, "notification suppressed by cooldown");
        }
    }
}

pub struct Orchestrator {
    shared: Arc<Shared>,
    tasks: BTreeMap<String, Arc<TaskRunner>>,
    shutdown_tx: watch::Sender<bool>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        sink: Arc<dyn PanelSink>,
        notifier: Arc<dyn Notifier>,
        gate: Arc<dyn ViewGate>,
        notification_cooldown: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                sink,
                notifier,
                gate,
                throttle: Mutex::new(NotificationThrottle::new(notification_cooldown)),
                shutdown: shutdown_rx,
            }),
            tasks: BTreeMap::new(),
            shutdown_tx,
            loops: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, spec: TaskSpec, job: Arc<dyn RefreshJob>) {
        let name = spec.name.clone();
        let runner = TaskRunner {
            spec,
            job,
            in_flight: Arc::new(AtomicBool::new(false)),
        };
        if self.tasks.insert(name.clone(), Arc::new(runner)).is_some() {
            tracing::warn!(task = %name, "replaced previously registered refresh task");
        }
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Spawn one polling loop per registered task. The first tick fires immediately.
    pub fn start(&self) {
        let mut loops = self.loops.lock().unwrap_or_else(|e| e.into_inner());
        for task in self.tasks.values() {
            let task = task.clone();
            let shared = self.shared.clone();
            let shutdown = self.shutdown_tx.subscribe();
            loops.push(tokio::spawn(run_loop(task, shared, shutdown)));
        }
        tracing::info!(tasks = self.tasks.len(), "refresh orchestrator started");
    }

    /// Refresh a panel now, outside its schedule. Dropped if a refresh is in flight.
    pub fn trigger(&self, name: &str) -> TriggerResult {
        if self.shared.is_shut_down() {
            return TriggerResult::Stopped;
        }
        let Some(task) = self.tasks.get(name) else {
            return TriggerResult::UnknownTask;
        };

        if spawn_cycle(task, &self.shared) {
            TriggerResult::Started
        } else {
            TriggerResult::InFlight
        }
    }

    pub fn is_fetching(&self, name: &str) -> Option<bool> {
        self.tasks
            .get(name)
            .map(|t| t.in_flight.load(Ordering::Acquire))
    }

    /// Cancel every timer and wait for the loops to exit. Refreshes already in
    /// flight run to completion but their results are discarded.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let loops = std::mem::take(&mut *self.loops.lock().unwrap_or_else(|e| e.into_inner()));
        for result in futures::future::join_all(loops).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "refresh loop ended abnormally");
            }
        }
        tracing::info!("refresh orchestrator stopped");
    }
}

async fn run_loop(task: Arc<TaskRunner>, shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let name = task.spec.name.as_str();
    let mut ticker = interval(task.spec.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        task = name,
        interval_ms = task.spec.interval.as_millis() as u64,
        "refresh loop started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        if *shutdown.borrow() {
            break;
        }

        if !shared.gate.allows(name) {
            tracing::trace!(task = name, "view paused, tick skipped");
            continue;
        }

        spawn_cycle(&task, &shared);
    }

    tracing::debug!(task = name, "refresh loop stopped");
}

/// Returns false when the task already has a refresh in flight
fn spawn_cycle(task: &Arc<TaskRunner>, shared: &Arc<Shared>) -> bool {
    let Some(guard) = InFlightGuard::try_acquire(&task.in_flight) else {
        tracing::debug!(task = %task.spec.name, "refresh in flight, tick dropped");
        return false;
    };

    tokio::spawn(run_cycle(task.clone(), shared.clone(), guard));
    true
}

async fn run_cycle(task: Arc<TaskRunner>, shared: Arc<Shared>, _guard: InFlightGuard) {
    let name = task.spec.name.as_str();
    let started = Instant::now();

    let result = match tokio::time::timeout(task.spec.timeout, task.job.refresh()).await {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(e)) => Err(RefreshError::Failed(e)),
        Err(_) => Err(RefreshError::TimedOut(task.spec.timeout)),
    };

    if shared.is_shut_down() {
        tracing::debug!(task = name, "orchestrator stopped, discarding refresh result");
        return;
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(snapshot) => {
            tracing::debug!(task = name, elapsed_ms, charts = snapshot.charts.len(), "panel refreshed");
            shared.sink.publish(snapshot);
            if let Some(message) = task.job.success_message() {
                shared.notify_throttled(name, Outcome::Success, message);
            }
        }
        Err(e) => {
            tracing::warn!(task = name, elapsed_ms, error = %e, "panel refresh failed");
            shared.notify_throttled(name, Outcome::Failure, e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Hang,
        Fail,
        Succeed,
        SlowSucceed(Duration),
    }

    struct CountingJob {
        calls: AtomicUsize,
        behaviour: Behaviour,
        success_message: Option<String>,
    }

    impl CountingJob {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                behaviour,
                success_message: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefreshJob for CountingJob {
        async fn refresh(&self) -> anyhow::Result<PanelSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Hang => futures::future::pending().await,
                Behaviour::Fail => anyhow::bail!("backend unavailable"),
                Behaviour::Succeed => Ok(PanelSnapshot::new("test", serde_json::Value::Null, Vec::new())),
                Behaviour::SlowSucceed(delay) => {
                    sleep(delay).await;
                    Ok(PanelSnapshot::new("test", serde_json::Value::Null, Vec::new()))
                }
            }
        }

        fn success_message(&self) -> Option<String> {
            self.success_message.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<PanelSnapshot>>);

    impl PanelSink for RecordingSink {
        fn publish(&self, snapshot: PanelSnapshot) {
            self.0.lock().unwrap().push(snapshot);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notification>>);

    impl RecordingNotifier {
        fn count(&self, outcome: Outcome) -> usize {
            self.0.lock().unwrap().iter().filter(|n| n.outcome == outcome).count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    struct SwitchGate(AtomicBool);

    impl ViewGate for SwitchGate {
        fn allows(&self, _task: &str) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        sink: Arc<RecordingSink>,
        notifier: Arc<RecordingNotifier>,
        gate: Arc<SwitchGate>,
    }

    fn harness(spec: TaskSpec, job: Arc<CountingJob>) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let gate = Arc::new(SwitchGate(AtomicBool::new(true)));
        let mut orchestrator = Orchestrator::new(
            sink.clone(),
            notifier.clone(),
            gate.clone(),
            Duration::from_secs(60),
        );
        orchestrator.register(spec, job);
        Harness {
            orchestrator,
            sink,
            notifier,
            gate,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_blocks_further_ticks() {
        let job = CountingJob::new(Behaviour::Hang);
        let spec = TaskSpec::new("charts", Duration::from_secs(1)).with_timeout(Duration::from_secs(60));
        let h = harness(spec, job.clone());
        h.orchestrator.start();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(job.calls(), 1);
        assert_eq!(h.orchestrator.is_fetching("charts"), Some(true));
        assert_eq!(h.orchestrator.trigger("charts"), TriggerResult::InFlight);

        // The timeout releases the flag and the next tick fetches again
        sleep(Duration::from_secs(58)).await;
        assert!(job.calls() >= 2);
        assert_eq!(h.notifier.count(Outcome::Failure), 1);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_task_does_not_stall_other_tasks() {
        let slow = CountingJob::new(Behaviour::Hang);
        let fast = CountingJob::new(Behaviour::Succeed);
        let spec = TaskSpec::new("charts", Duration::from_secs(10)).with_timeout(Duration::from_secs(60));
        let mut h = harness(spec, slow.clone());
        h.orchestrator
            .register(TaskSpec::new("realtime", Duration::from_secs(5)), fast.clone());
        h.orchestrator.start();

        // realtime ticks at 0s, 5s, 10s, 15s and 20s
        sleep(Duration::from_millis(20_500)).await;
        assert_eq!(slow.calls(), 1);
        assert_eq!(h.orchestrator.is_fetching("charts"), Some(true));
        assert_eq!(fast.calls(), 5);
        assert_eq!(h.orchestrator.is_fetching("realtime"), Some(false));
        assert_eq!(h.sink.0.lock().unwrap().len(), 5);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_throttled_per_minute() {
        let job = CountingJob::new(Behaviour::Fail);
        let h = harness(TaskSpec::new("forecast", Duration::from_secs(5)), job.clone());
        h.orchestrator.start();

        // ticks at 0s, 5s and 10s
        sleep(Duration::from_millis(10_500)).await;
        assert_eq!(job.calls(), 3);
        assert_eq!(h.notifier.count(Outcome::Failure), 1);
        assert_eq!(h.orchestrator.is_fetching("forecast"), Some(false));

        // the tick at 65s is past the cooldown
        sleep(Duration::from_secs(55)).await;
        assert_eq!(h.notifier.count(Outcome::Failure), 2);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_view_skips_ticks() {
        let job = CountingJob::new(Behaviour::Succeed);
        let h = harness(TaskSpec::new("realtime", Duration::from_secs(5)), job.clone());
        h.gate.0.store(false, Ordering::SeqCst);
        h.orchestrator.start();

        sleep(Duration::from_millis(12_000)).await;
        assert_eq!(job.calls(), 0);

        h.gate.0.store(true, Ordering::SeqCst);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(job.calls(), 1);
        assert_eq!(h.sink.0.lock().unwrap().len(), 1);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_message_is_throttled() {
        let job = Arc::new(CountingJob {
            calls: AtomicUsize::new(0),
            behaviour: Behaviour::Succeed,
            success_message: Some("forecast updated".to_string()),
        });
        let h = harness(TaskSpec::new("forecast", Duration::from_secs(30)), job.clone());
        h.orchestrator.start();

        // ticks at 0s, 30s and 60s
        sleep(Duration::from_millis(60_500)).await;
        assert_eq!(job.calls(), 3);
        assert_eq!(h.sink.0.lock().unwrap().len(), 3);
        assert_eq!(h.notifier.count(Outcome::Success), 1);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timers_and_discards_late_results() {
        let job = CountingJob::new(Behaviour::SlowSucceed(Duration::from_secs(2)));
        let h = harness(TaskSpec::new("history", Duration::from_secs(15)), job.clone());
        h.orchestrator.start();

        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.orchestrator.is_fetching("history"), Some(true));
        h.orchestrator.shutdown().await;

        sleep(Duration::from_secs(60)).await;
        assert_eq!(job.calls(), 1);
        assert!(h.sink.0.lock().unwrap().is_empty());
        assert_eq!(h.orchestrator.trigger("history"), TriggerResult::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_trigger() {
        let job = CountingJob::new(Behaviour::Succeed);
        let h = harness(TaskSpec::new("charts", Duration::from_secs(10)), job.clone());

        assert_eq!(h.orchestrator.trigger("missing"), TriggerResult::UnknownTask);
        assert_eq!(h.orchestrator.trigger("charts"), TriggerResult::Started);

        sleep(Duration::from_millis(10)).await;
        assert_eq!(job.calls(), 1);
        assert_eq!(h.sink.0.lock().unwrap().len(), 1);
    }
}
