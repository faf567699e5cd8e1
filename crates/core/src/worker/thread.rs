//! Dedicated-thread hosting for workers.

use async_trait::async_trait;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use super::types::{PipelineId, StopSignal, WorkerEvent, WorkerId, WorkerKind, WorkerMessage};
use crate::metrics;

/// Default time a worker gets to react to a stop request before it is
/// told to terminate, and again before its thread is given up on.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(3000);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A unit of background work hosted on a [`WorkerThread`].
#[async_trait]
pub trait Worker: Send + 'static {
    fn kind(&self) -> WorkerKind;

    /// Performs the work, reporting through `ctx`.
    ///
    /// Failures are reported as [`WorkerEvent::Error`]; the hosting thread
    /// sends [`WorkerEvent::Finished`] once this returns.
    async fn run(self: Box<Self>, ctx: &WorkerContext);
}

/// A worker's view of its pipeline: an outgoing event channel and an
/// incoming stop signal.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pipeline: PipelineId,
    worker: WorkerId,
    kind: WorkerKind,
    events: mpsc::UnboundedSender<WorkerMessage>,
    stop: watch::Receiver<StopSignal>,
}

impl WorkerContext {
    pub fn new(
        pipeline: PipelineId,
        worker: WorkerId,
        kind: WorkerKind,
        events: mpsc::UnboundedSender<WorkerMessage>,
        stop: watch::Receiver<StopSignal>,
    ) -> Self {
        Self {
            pipeline,
            worker,
            kind,
            events,
            stop,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker
    }

    pub fn pipeline_id(&self) -> PipelineId {
        self.pipeline
    }

    /// Sends an event to the pipeline. Events sent after the pipeline has
    /// gone away are dropped.
    pub fn emit(&self, event: WorkerEvent) {
        let _ = self.events.send(WorkerMessage {
            pipeline: self.pipeline,
            worker: self.worker,
            kind: self.kind,
            event,
        });
    }

    pub fn progress(&self, track: usize, percent: u8) {
        self.emit(WorkerEvent::Progress {
            track,
            percent: percent.min(100),
        });
    }

    pub fn error(&self, track: usize, message: impl Into<String>) {
        self.emit(WorkerEvent::Error {
            track,
            message: message.into(),
        });
    }

    /// The current stop signal.
    pub fn stop_signal(&self) -> StopSignal {
        *self.stop.borrow()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_signal() != StopSignal::Run
    }

    /// A receiver that can be awaited for stop requests.
    pub fn stop_receiver(&self) -> watch::Receiver<StopSignal> {
        self.stop.clone()
    }
}

/// A worker running on its own OS thread.
///
/// The thread builds a single-threaded tokio runtime and drives the worker
/// to completion on it. Dropping or shutting down a `WorkerThread` never
/// blocks: teardown escalates on a background reaper thread.
pub struct WorkerThread {
    id: WorkerId,
    kind: WorkerKind,
    stop_tx: watch::Sender<StopSignal>,
    handle: Option<JoinHandle<()>>,
    grace: Duration,
}

impl WorkerThread {
    /// Moves `worker` onto a new thread and starts it.
    pub fn spawn(
        worker: Box<dyn Worker>,
        pipeline: PipelineId,
        id: WorkerId,
        events: mpsc::UnboundedSender<WorkerMessage>,
        grace: Duration,
    ) -> std::io::Result<Self> {
        let kind = worker.kind();
        let (stop_tx, stop_rx) = watch::channel(StopSignal::Run);
        let ctx = WorkerContext::new(pipeline, id, kind, events, stop_rx);

        let handle = thread::Builder::new()
            .name(format!("{}-{}-{}", kind.as_str(), pipeline.short(), id))
            .spawn(move || Self::thread_main(worker, ctx))?;

        metrics::WORKERS_STARTED
            .with_label_values(&[kind.as_str()])
            .inc();
        debug!(pipeline = %pipeline, worker = %id, kind = kind.as_str(), "Worker thread started");

        Ok(Self {
            id,
            kind,
            stop_tx,
            handle: Some(handle),
            grace,
        })
    }

    fn thread_main(worker: Box<dyn Worker>, ctx: WorkerContext) {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(worker.run(&ctx)),
            Err(e) => {
                error!(worker = %ctx.worker_id(), error = %e, "Failed to build worker runtime");
                ctx.error(0, format!("failed to start worker runtime: {}", e));
            }
        }
        ctx.emit(WorkerEvent::Finished);
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Asks the worker to stop cooperatively.
    pub fn request_stop(&self) {
        self.stop_tx.send_if_modified(|signal| {
            if *signal == StopSignal::Run {
                *signal = StopSignal::Stop;
                true
            } else {
                false
            }
        });
    }

    /// Stops the worker and releases the thread without blocking.
    ///
    /// A finished thread is joined on the spot. Otherwise a reaper thread
    /// waits one grace period, sends [`StopSignal::Terminate`], waits a
    /// second grace period and finally detaches the thread with a warning.
    pub fn shutdown(mut self) {
        self.request_stop();
        let Some(handle) = self.handle.take() else {
            return;
        };

        if handle.is_finished() {
            join_reporting_panic(self.id, handle);
            return;
        }

        let id = self.id;
        let grace = self.grace;
        let stop_tx = self.stop_tx.clone();
        let reaper = thread::Builder::new()
            .name(format!("reaper-{}", id))
            .spawn(move || reap(id, handle, stop_tx, grace));

        if let Err(e) = reaper {
            warn!(worker = %id, error = %e, "Could not start reaper, detaching worker thread");
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let replacement = WorkerThread {
                id: self.id,
                kind: self.kind,
                stop_tx: self.stop_tx.clone(),
                handle: Some(handle),
                grace: self.grace,
            };
            replacement.shutdown();
        }
    }
}

fn reap(id: WorkerId, handle: JoinHandle<()>, stop_tx: watch::Sender<StopSignal>, grace: Duration) {
    if wait_finished(&handle, grace) {
        join_reporting_panic(id, handle);
        return;
    }

    warn!(worker = %id, grace_ms = grace.as_millis() as u64, "Worker ignored stop request, terminating");
    let _ = stop_tx.send(StopSignal::Terminate);

    if wait_finished(&handle, grace) {
        join_reporting_panic(id, handle);
        return;
    }

    metrics::WORKER_TEARDOWN_TIMEOUTS.inc();
    warn!(worker = %id, "Worker thread did not terminate, detaching");
}

fn wait_finished(handle: &JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if handle.is_finished() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn join_reporting_panic(id: WorkerId, handle: JoinHandle<()>) {
    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        error!(worker = %id, panic = msg, "Worker thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SleepyWorker {
        reacts_to: StopSignal,
        observed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Worker for SleepyWorker {
        fn kind(&self) -> WorkerKind {
            WorkerKind::Encode
        }

        async fn run(self: Box<Self>, ctx: &WorkerContext) {
            ctx.progress(0, 10);
            let mut stop = ctx.stop_receiver();
            loop {
                let current = *stop.borrow_and_update();
                if current == self.reacts_to || stop.changed().await.is_err() {
                    break;
                }
            }
            self.observed.store(true, Ordering::SeqCst);
        }
    }

    struct ReadyWorker;

    #[async_trait]
    impl Worker for ReadyWorker {
        fn kind(&self) -> WorkerKind {
            WorkerKind::Split
        }

        async fn run(self: Box<Self>, ctx: &WorkerContext) {
            ctx.emit(WorkerEvent::SplitReady {
                track: 0,
                file: "/tmp/01.wav".into(),
            });
        }
    }

    fn wait_for(flag: &AtomicBool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if flag.load(Ordering::SeqCst) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_finished_is_last_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = PipelineId::new();
        let thread =
            WorkerThread::spawn(Box::new(ReadyWorker), pipeline, WorkerId(1), tx, DEFAULT_STOP_GRACE)
                .unwrap();

        let first = rx.blocking_recv().unwrap();
        assert!(matches!(first.event, WorkerEvent::SplitReady { track: 0, .. }));
        assert_eq!(first.kind, WorkerKind::Split);
        assert_eq!(first.pipeline, pipeline);

        let last = rx.blocking_recv().unwrap();
        assert_eq!(last.event, WorkerEvent::Finished);
        thread.shutdown();
    }

    #[test]
    fn test_shutdown_delivers_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observed = Arc::new(AtomicBool::new(false));
        let worker = SleepyWorker {
            reacts_to: StopSignal::Stop,
            observed: observed.clone(),
        };
        let thread =
            WorkerThread::spawn(Box::new(worker), PipelineId::new(), WorkerId(2), tx, DEFAULT_STOP_GRACE)
                .unwrap();

        let progress = rx.blocking_recv().unwrap();
        assert_eq!(progress.event, WorkerEvent::Progress { track: 0, percent: 10 });

        thread.shutdown();
        assert!(wait_for(&observed));
    }

    #[test]
    fn test_shutdown_escalates_to_terminate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observed = Arc::new(AtomicBool::new(false));
        let worker = SleepyWorker {
            reacts_to: StopSignal::Terminate,
            observed: observed.clone(),
        };
        let thread = WorkerThread::spawn(
            Box::new(worker),
            PipelineId::new(),
            WorkerId(3),
            tx,
            Duration::from_millis(50),
        )
        .unwrap();
        let _ = rx.blocking_recv();

        thread.shutdown();
        assert!(wait_for(&observed));
    }
}
