//! The orchestrator that ties state reading, switching and polling
//! together.
//!
//! [`DesktopStateTracker`] owns the last known [`DesktopSnapshot`], refreshes
//! it from a [`StateSource`] on a fixed interval, and pushes
//! [`TrackerEvent`]s to subscribers whenever the active desktop or the
//! desktop count changes.  Switch requests go through a [`StrategyChain`]
//! on a background thread and are observed like any other change: through
//! a refresh after the settle delay.

use crate::command::{Command, Direction, SwitchRequest};
use crate::config::TrackerConfig;
use crate::snapshot::{DesktopSnapshot, SnapshotChange};
use crate::strategy::StrategyChain;
use crate::traits::{StateSource, TrackerEvent};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared with the polling thread and in-flight switch threads.
struct Shared<S> {
    source: S,
    chain: StrategyChain,
    settle_delay: Duration,
    /// Stamp handed to each read when it starts.
    reads_started: AtomicU64,
    snapshot: Mutex<Held>,
    subscribers: Mutex<Vec<mpsc::Sender<TrackerEvent>>>,
}

/// The held snapshot and the stamp of the read that produced it.
struct Held {
    stamp: u64,
    snapshot: DesktopSnapshot,
}

/// A running polling thread.
struct Monitor {
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: StateSource> Shared<S> {
    fn held(&self) -> DesktopSnapshot {
        lock(&self.snapshot).snapshot.clone()
    }

    /// Read a fresh snapshot and compare-and-swap it in.
    ///
    /// The read happens outside the lock.  The compare, the swap and the
    /// event emission happen under it, so concurrent refreshes never
    /// interleave.  A read that started before the one already applied is
    /// stale and gets dropped; the held snapshot is returned instead.
    fn refresh(&self) -> DesktopSnapshot {
        let stamp = self.reads_started.fetch_add(1, Ordering::SeqCst) + 1;
        let next = self.source.read_snapshot();
        let mut held = lock(&self.snapshot);
        if stamp < held.stamp {
            debug!("dropping stale read #{} (have #{})", stamp, held.stamp);
            return held.snapshot.clone();
        }
        let change = SnapshotChange::between(&held.snapshot, &next);
        held.stamp = stamp;
        held.snapshot = next.clone();
        if !change.is_empty() {
            self.emit(change, &next);
        }
        next
    }

    fn emit(&self, change: SnapshotChange, snapshot: &DesktopSnapshot) {
        let mut events = Vec::with_capacity(2);
        if let Some(index) = change.desktop {
            info!("desktop changed to {}", index);
            events.push(TrackerEvent::DesktopChanged {
                index,
                name: snapshot.current_name(),
            });
        }
        if let Some(count) = change.count {
            info!("desktop count changed to {}", count);
            events.push(TrackerEvent::DesktopCountChanged { count });
        }
        // Drop subscribers whose receiver is gone.
        lock(&self.subscribers)
            .retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
    }
}

/// Tracks the active virtual desktop and switches between desktops.
///
/// The tracker is generic over any [`StateSource`], making it independent
/// of the Windows registry; tests drive it with in-memory sources.
///
/// # Typical usage
///
/// ```ignore
/// let tracker = DesktopStateTracker::new(source, chain, TrackerConfig::default());
/// let events = tracker.subscribe();
/// tracker.start_monitoring();
/// tracker.switch_to_next_desktop();
/// ```
///
/// All methods take `&self`; the tracker can be shared between threads
/// behind an [`Arc`].
pub struct DesktopStateTracker<S: StateSource + 'static> {
    shared: Arc<Shared<S>>,
    poll_interval: Duration,
    monitor: Mutex<Option<Monitor>>,
}

impl<S: StateSource + 'static> DesktopStateTracker<S> {
    /// Create a tracker and take an initial snapshot.
    ///
    /// Monitoring is not started; call
    /// [`start_monitoring`](Self::start_monitoring).
    pub fn new(source: S, chain: StrategyChain, config: TrackerConfig) -> Self {
        let initial = source.read_snapshot();
        debug!(
            "initial snapshot: desktop {} of {}",
            initial.current(),
            initial.count()
        );
        Self {
            shared: Arc::new(Shared {
                source,
                chain,
                settle_delay: config.settle_delay(),
                reads_started: AtomicU64::new(0),
                snapshot: Mutex::new(Held {
                    stamp: 0,
                    snapshot: initial,
                }),
                subscribers: Mutex::new(Vec::new()),
            }),
            poll_interval: config.poll_interval(),
            monitor: Mutex::new(None),
        }
    }

    /// Register a new listener for change events.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::Receiver<TrackerEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    /// The last snapshot taken, without reading the OS state.
    pub fn snapshot(&self) -> DesktopSnapshot {
        self.shared.held()
    }

    /// Read the OS state now, firing change events as needed.
    pub fn refresh(&self) -> DesktopSnapshot {
        self.shared.refresh()
    }

    /// 1-based index of the active desktop (fresh read).
    pub fn current_desktop_number(&self) -> u32 {
        self.refresh().current()
    }

    /// Number of desktops (fresh read).
    pub fn desktop_count(&self) -> u32 {
        self.refresh().count()
    }

    /// Name of desktop `index`; `"Desktop {index}"` for anything unknown.
    pub fn desktop_name(&self, index: i64) -> String {
        lock(&self.shared.snapshot).snapshot.name(index)
    }

    /// Switch to desktop `index` (1-based).
    ///
    /// Indices outside `1..=count` are ignored.  The result is only
    /// observable through events.
    pub fn switch_to_desktop(&self, index: i64) {
        self.request_switch(SwitchRequest::Index(index));
    }

    pub fn switch_to_next_desktop(&self) {
        self.request_switch(SwitchRequest::Step(Direction::Next));
    }

    pub fn switch_to_previous_desktop(&self) {
        self.request_switch(SwitchRequest::Step(Direction::Previous));
    }

    /// Process a single [`Command`].
    pub fn handle(&self, cmd: Command) {
        match cmd.switch_request() {
            Some(request) => {
                self.request_switch(request);
            }
            None => {
                debug!("refresh requested");
                self.refresh();
            }
        }
    }

    /// Validate `request` and hand it to a background thread that runs the
    /// strategy chain, waits the settle delay and refreshes once.
    ///
    /// Returns the thread handle, or `None` if the request was rejected.
    pub(crate) fn request_switch(&self, request: SwitchRequest) -> Option<JoinHandle<()>> {
        if let SwitchRequest::Index(index) = request {
            let count = self.shared.held().count();
            if index < 1 || index > i64::from(count) {
                debug!("ignoring switch to desktop {} (have {})", index, count);
                return None;
            }
        }

        info!("switch to {}", request);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("vd-switch".into())
            .spawn(move || {
                shared.chain.dispatch(request);
                thread::sleep(shared.settle_delay);
                shared.refresh();
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("failed to spawn switch thread: {}", e);
                None
            }
        }
    }

    //  Polling

    /// Start polling.  Does nothing if already started.
    pub fn start_monitoring(&self) {
        let mut monitor = lock(&self.monitor);
        if monitor.is_some() {
            debug!("monitoring already running");
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;
        let spawned = thread::Builder::new()
            .name("vd-poll".into())
            .spawn(move || poll_loop(&shared, interval, &stop_rx));
        match spawned {
            Ok(thread) => {
                info!("monitoring started ({:?} interval)", interval);
                *monitor = Some(Monitor { stop_tx, thread });
            }
            Err(e) => warn!("failed to spawn polling thread: {}", e),
        }
    }

    /// Stop polling.  Does nothing if not started.
    ///
    /// In-flight switch threads are not cancelled; they may still refresh
    /// the snapshot after this returns.
    pub fn stop_monitoring(&self) {
        let Some(Monitor { stop_tx, thread }) = lock(&self.monitor).take() else {
            return;
        };
        let _ = stop_tx.send(());
        if thread.join().is_err() {
            warn!("polling thread panicked");
        }
        info!("monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.monitor).is_some()
    }
}

impl<S: StateSource + 'static> Drop for DesktopStateTracker<S> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn poll_loop<S: StateSource>(shared: &Shared<S>, interval: Duration, stop_rx: &mpsc::Receiver<()>) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                shared.refresh();
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{SwitchOutcome, SwitchStrategy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    //  Scripted state source

    /// A source whose next snapshot is set by the test; counts reads.
    #[derive(Default)]
    struct ScriptedSource {
        next: Mutex<DesktopSnapshot>,
        reads: AtomicUsize,
    }

    impl ScriptedSource {
        fn at(current: u32, count: u32) -> Self {
            let source = Self::default();
            source.set(current, count);
            source
        }

        fn set(&self, current: u32, count: u32) {
            *self.next.lock().unwrap() = DesktopSnapshot::new(current, count, Vec::new());
        }

        fn set_named(&self, current: u32, names: &[&str]) {
            *self.next.lock().unwrap() = DesktopSnapshot::new(
                current,
                names.len() as u32,
                names.iter().map(|n| n.to_string()).collect(),
            );
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl StateSource for ScriptedSource {
        fn read_snapshot(&self) -> DesktopSnapshot {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.next.lock().unwrap().clone()
        }
    }

    /// `Arc` wrapper so tests keep a handle on the source the tracker owns.
    struct SharedSource(Arc<ScriptedSource>);

    impl StateSource for SharedSource {
        fn read_snapshot(&self) -> DesktopSnapshot {
            self.0.read_snapshot()
        }
    }

    //  Recording strategy

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<SwitchRequest>>>);

    impl Recorder {
        fn requests(&self) -> Vec<SwitchRequest> {
            self.0.lock().unwrap().clone()
        }
    }

    impl SwitchStrategy for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn switch(&self, request: SwitchRequest) -> SwitchOutcome {
            self.0.lock().unwrap().push(request);
            SwitchOutcome::Success
        }
    }

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            poll_interval_ms: 5,
            settle_delay_ms: 10,
            verify_shell_switch: false,
        }
    }

    fn make_tracker(
        current: u32,
        count: u32,
    ) -> (
        DesktopStateTracker<SharedSource>,
        Arc<ScriptedSource>,
        Recorder,
    ) {
        let source = Arc::new(ScriptedSource::at(current, count));
        let recorder = Recorder::default();
        let chain = StrategyChain::new().with(recorder.clone());
        let tracker =
            DesktopStateTracker::new(SharedSource(Arc::clone(&source)), chain, fast_config());
        (tracker, source, recorder)
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    //  Reads and events

    #[test]
    fn construction_takes_initial_snapshot() {
        let (tracker, source, _) = make_tracker(2, 3);
        assert_eq!(source.reads(), 1);
        assert_eq!((tracker.snapshot().current(), tracker.snapshot().count()), (2, 3));
    }

    #[test]
    fn getters_force_fresh_reads() {
        let (tracker, source, _) = make_tracker(1, 2);
        source.set(2, 4);
        assert_eq!(tracker.current_desktop_number(), 2);
        assert_eq!(tracker.desktop_count(), 4);
        assert_eq!(source.reads(), 3);
    }

    #[test]
    fn refresh_emits_only_changed_fields() {
        let (tracker, source, _) = make_tracker(1, 3);
        let rx = tracker.subscribe();

        tracker.refresh();
        assert!(rx.try_recv().is_err(), "no change, no event");

        source.set(2, 3);
        tracker.refresh();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![TrackerEvent::DesktopChanged {
                index: 2,
                name: "Desktop 2".into()
            }]
        );

        source.set(2, 5);
        tracker.refresh();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![TrackerEvent::DesktopCountChanged { count: 5 }]);
    }

    #[test]
    fn both_changes_emit_desktop_then_count() {
        let (tracker, source, _) = make_tracker(1, 1);
        let rx = tracker.subscribe();
        source.set_named(3, &["A", "B", "C"]);
        tracker.refresh();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                TrackerEvent::DesktopChanged {
                    index: 3,
                    name: "C".into()
                },
                TrackerEvent::DesktopCountChanged { count: 3 },
            ]
        );
    }

    #[test]
    fn every_subscriber_gets_events_and_dropped_ones_are_pruned() {
        let (tracker, source, _) = make_tracker(1, 2);
        let rx1 = tracker.subscribe();
        let rx2 = tracker.subscribe();
        drop(rx2);
        source.set(2, 2);
        tracker.refresh();
        assert_eq!(rx1.try_iter().count(), 1);
        assert_eq!(lock(&tracker.shared.subscribers).len(), 1);
    }

    #[test]
    fn desktop_name_uses_snapshot_or_default() {
        let (tracker, source, _) = make_tracker(1, 1);
        source.set_named(1, &["Desktop 1", "Music", "Desktop 3"]);
        tracker.refresh();
        assert_eq!(tracker.desktop_name(2), "Music");
        assert_eq!(tracker.desktop_name(3), "Desktop 3");
        assert_eq!(tracker.desktop_name(0), "Desktop 0");
        assert_eq!(tracker.desktop_name(-1), "Desktop -1");
        assert_eq!(tracker.desktop_name(4), "Desktop 4");
    }

    //  Switching

    #[test]
    fn out_of_range_switch_is_rejected_without_dispatch() {
        let (tracker, source, recorder) = make_tracker(2, 3);
        let before = tracker.snapshot();
        for index in [0, -5, 4] {
            assert!(tracker.request_switch(SwitchRequest::Index(index)).is_none());
        }
        thread::sleep(Duration::from_millis(30));
        assert!(recorder.requests().is_empty());
        assert_eq!(tracker.snapshot(), before);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn switch_dispatches_then_refreshes_once() {
        let (tracker, source, recorder) = make_tracker(1, 3);
        let rx = tracker.subscribe();
        source.set(3, 3);

        let handle = tracker
            .request_switch(SwitchRequest::Index(3))
            .expect("valid switch");
        handle.join().unwrap();

        assert_eq!(recorder.requests(), vec![SwitchRequest::Index(3)]);
        assert_eq!(source.reads(), 2);
        assert_eq!(tracker.snapshot().current(), 3);
        assert!(matches!(
            rx.try_recv(),
            Ok(TrackerEvent::DesktopChanged { index: 3, .. })
        ));
    }

    #[test]
    fn next_desktop_reads_exactly_once_after_settle() {
        let (tracker, source, recorder) = make_tracker(1, 3);
        let start = Instant::now();
        let handle = tracker
            .request_switch(SwitchRequest::Step(Direction::Next))
            .expect("directional switch is never rejected");
        handle.join().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(
            recorder.requests(),
            vec![SwitchRequest::Step(Direction::Next)]
        );
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn directional_switch_skips_index_validation() {
        // Single desktop: stepping is still handed to the strategies.
        let (tracker, _, recorder) = make_tracker(1, 1);
        tracker
            .request_switch(SwitchRequest::Step(Direction::Previous))
            .expect("not rejected")
            .join()
            .unwrap();
        assert_eq!(
            recorder.requests(),
            vec![SwitchRequest::Step(Direction::Previous)]
        );
    }

    #[test]
    fn handle_routes_commands() {
        let (tracker, source, recorder) = make_tracker(1, 2);
        tracker.handle(Command::Refresh);
        assert_eq!(source.reads(), 2);

        tracker.handle(Command::SwitchTo(2));
        tracker.handle(Command::Previous);
        assert!(wait_for(|| recorder.requests().len() == 2));
        let requests = recorder.requests();
        assert!(requests.contains(&SwitchRequest::Index(2)));
        assert!(requests.contains(&SwitchRequest::Step(Direction::Previous)));
    }

    #[test]
    fn public_switch_rejects_out_of_range_without_dispatch() {
        let (tracker, source, recorder) = make_tracker(2, 3);
        tracker.switch_to_desktop(0);
        tracker.switch_to_desktop(-5);
        tracker.switch_to_desktop(4);
        thread::sleep(Duration::from_millis(40));
        assert!(recorder.requests().is_empty());
        assert_eq!(source.reads(), 1);
        assert_eq!(tracker.snapshot().current(), 2);
    }

    #[test]
    fn public_switch_methods_dispatch() {
        let (tracker, source, recorder) = make_tracker(1, 3);
        tracker.switch_to_desktop(3);
        tracker.switch_to_next_desktop();
        tracker.switch_to_previous_desktop();
        assert!(wait_for(|| recorder.requests().len() == 3));
        let requests = recorder.requests();
        assert!(requests.contains(&SwitchRequest::Index(3)));
        assert!(requests.contains(&SwitchRequest::Step(Direction::Next)));
        assert!(requests.contains(&SwitchRequest::Step(Direction::Previous)));
        // One refresh per switch after the settle delay.
        assert!(wait_for(|| source.reads() == 4));
    }

    //  Concurrent refreshes

    /// Source whose second read (the first after construction) blocks
    /// until released, returning the state it saw when it started.
    struct SlowSecondRead {
        next: Mutex<DesktopSnapshot>,
        reads: AtomicUsize,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl StateSource for SlowSecondRead {
        fn read_snapshot(&self) -> DesktopSnapshot {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            let seen = self.next.lock().unwrap().clone();
            if n == 1 {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            seen
        }
    }

    #[test]
    fn stale_read_finishing_last_is_dropped() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = SlowSecondRead {
            next: Mutex::new(DesktopSnapshot::new(1, 2, Vec::new())),
            reads: AtomicUsize::new(0),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let tracker = DesktopStateTracker::new(source, StrategyChain::new(), fast_config());
        let rx = tracker.subscribe();

        thread::scope(|s| {
            // Starts first, sees desktop 1, finishes last.
            let slow = s.spawn(|| tracker.refresh());
            entered_rx.recv().unwrap();

            *tracker.shared.source.next.lock().unwrap() = DesktopSnapshot::new(2, 2, Vec::new());
            assert_eq!(tracker.refresh().current(), 2);

            release_tx.send(()).unwrap();
            assert_eq!(slow.join().unwrap().current(), 2);
        });

        assert_eq!(tracker.snapshot().current(), 2);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![TrackerEvent::DesktopChanged {
                index: 2,
                name: "Desktop 2".into()
            }]
        );
    }

    #[test]
    fn concurrent_refreshes_agree_on_final_state() {
        let (tracker, source, _) = make_tracker(1, 4);
        let rx = tracker.subscribe();
        source.set(3, 4);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    tracker.refresh();
                });
            }
        });
        assert_eq!(tracker.snapshot().current(), 3);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![TrackerEvent::DesktopChanged {
                index: 3,
                name: "Desktop 3".into()
            }]
        );
    }

    //  Monitoring

    #[test]
    fn start_and_stop_are_idempotent() {
        let (tracker, _, _) = make_tracker(1, 1);
        tracker.stop_monitoring();
        assert!(!tracker.is_monitoring());

        tracker.start_monitoring();
        tracker.start_monitoring();
        assert!(tracker.is_monitoring());

        tracker.stop_monitoring();
        tracker.stop_monitoring();
        assert!(!tracker.is_monitoring());
    }

    #[test]
    fn second_start_does_not_add_a_poller() {
        let (tracker, source, _) = make_tracker(1, 1);
        tracker.start_monitoring();
        let first = lock(&tracker.monitor)
            .as_ref()
            .map(|m| m.thread.thread().id());
        tracker.start_monitoring();
        let second = lock(&tracker.monitor)
            .as_ref()
            .map(|m| m.thread.thread().id());
        assert_eq!(first, second);
        tracker.stop_monitoring();

        let after_stop = source.reads();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(source.reads(), after_stop, "no polling after stop");
    }

    #[test]
    fn monitoring_detects_external_change() {
        let (tracker, source, _) = make_tracker(1, 2);
        let rx = tracker.subscribe();
        tracker.start_monitoring();
        source.set(2, 2);
        let event = rx.recv_timeout(Duration::from_secs(2)).expect("change event");
        assert_eq!(
            event,
            TrackerEvent::DesktopChanged {
                index: 2,
                name: "Desktop 2".into()
            }
        );
        tracker.stop_monitoring();
    }

    #[test]
    fn in_flight_switch_completes_after_stop() {
        let (tracker, source, recorder) = make_tracker(1, 2);
        tracker.start_monitoring();
        source.set(2, 2);
        let handle = tracker.request_switch(SwitchRequest::Index(2)).unwrap();
        tracker.stop_monitoring();
        handle.join().unwrap();
        assert_eq!(recorder.requests(), vec![SwitchRequest::Index(2)]);
        assert_eq!(tracker.snapshot().current(), 2);
    }
}
