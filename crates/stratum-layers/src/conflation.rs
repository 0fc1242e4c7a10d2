#![forbid(unsafe_code)]

//! Background event conflation.
//!
//! High-frequency sources (data feeds, tickers) would swamp a repaint loop
//! if every change were applied as it arrives. A [`ConflaterChain`] owns a
//! scheduler thread that wakes at a fixed interval and asks each registered
//! [`EventConflater`] to flush: the conflater drains its queue, collapses
//! it per its own policy, and hands the resulting work to the apply channel
//! the caller drains on its one mutating thread. Layer state itself is
//! never touched from the scheduler thread; only the queues cross threads.
//!
//! There is no backpressure: a producer that outruns the flush interval
//! grows the queue until the next flush empties it.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Work marshalled onto the apply thread by a flush.
pub type ApplyTask = Box<dyn FnOnce() + Send>;

/// A queue of pending change notifications with a conflation policy.
pub trait EventConflater<T>: Send {
    /// Queue one notification. Called from any thread via the chain.
    fn add_event(&mut self, event: T);

    fn queued_count(&self) -> usize;

    fn clear_queue(&mut self);

    /// Drain the queue and push the collapsed work onto `apply`.
    ///
    /// Called from the scheduler thread; must leave the queue empty.
    fn flush(&mut self, apply: &mpsc::Sender<ApplyTask>);
}

enum ControlMsg {
    Shutdown,
}

type SharedConflaters<T> = Arc<Mutex<Vec<Box<dyn EventConflater<T>>>>>;

fn lock_conflaters<T>(shared: &SharedConflaters<T>) -> MutexGuard<'_, Vec<Box<dyn EventConflater<T>>>> {
    shared
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cloneable producer-side handle onto a chain's conflaters.
pub struct ConflaterHandle<T> {
    conflaters: SharedConflaters<T>,
}

impl<T> Clone for ConflaterHandle<T> {
    fn clone(&self) -> Self {
        Self {
            conflaters: Arc::clone(&self.conflaters),
        }
    }
}

impl<T: Clone> ConflaterHandle<T> {
    /// Queue `event` on every conflater in the chain.
    pub fn add_event(&self, event: T) {
        let mut conflaters = lock_conflaters(&self.conflaters);
        for conflater in conflaters.iter_mut() {
            conflater.add_event(event.clone());
        }
    }

    pub fn queued_count(&self) -> usize {
        lock_conflaters(&self.conflaters)
            .iter()
            .map(|c| c.queued_count())
            .sum()
    }
}

/// A set of conflaters flushed together on one scheduler thread.
pub struct ConflaterChain<T> {
    conflaters: SharedConflaters<T>,
    interval: Duration,
    control: Option<(mpsc::Sender<ControlMsg>, JoinHandle<()>)>,
}

impl<T: 'static> ConflaterChain<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            conflaters: Arc::new(Mutex::new(Vec::new())),
            interval,
            control: None,
        }
    }

    pub fn add_conflater(&self, conflater: Box<dyn EventConflater<T>>) {
        lock_conflaters(&self.conflaters).push(conflater);
    }

    /// Producer-side handle for queueing events.
    pub fn handle(&self) -> ConflaterHandle<T> {
        ConflaterHandle {
            conflaters: Arc::clone(&self.conflaters),
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.is_some()
    }

    /// Start the scheduler thread, flushing into `apply` every interval.
    ///
    /// Idempotent: starting a running chain does nothing.
    pub fn start(&mut self, apply: mpsc::Sender<ApplyTask>) -> std::io::Result<()> {
        if self.control.is_some() {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel::<ControlMsg>();
        let conflaters = Arc::clone(&self.conflaters);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name("stratum-conflater".into())
            .spawn(move || {
                conflater_loop(&conflaters, &rx, interval, &apply);
            })?;
        self.control = Some((tx, handle));
        Ok(())
    }

    /// Stop the scheduler thread and join it.
    ///
    /// Idempotent. Events queued after the last flush stay queued and are
    /// picked up if the chain is started again.
    pub fn stop(&mut self) {
        if let Some((tx, handle)) = self.control.take() {
            let _ = tx.send(ControlMsg::Shutdown);
            let _ = handle.join();
        }
    }
}

impl<T> Drop for ConflaterChain<T> {
    fn drop(&mut self) {
        if let Some((tx, handle)) = self.control.take() {
            let _ = tx.send(ControlMsg::Shutdown);
            let _ = handle.join();
        }
    }
}

fn conflater_loop<T>(
    conflaters: &SharedConflaters<T>,
    rx: &mpsc::Receiver<ControlMsg>,
    interval: Duration,
    apply: &mpsc::Sender<ApplyTask>,
) {
    loop {
        match rx.recv_timeout(interval) {
            Ok(ControlMsg::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let mut conflaters = lock_conflaters(conflaters);
                for conflater in conflaters.iter_mut() {
                    conflater.flush(apply);
                }
            }
        }
    }
}

/// A request to repaint some part of a grid region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualChangeNotice {
    pub region: String,
}

impl VisualChangeNotice {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

/// Conflates any number of queued repaint requests into one apply task.
pub struct VisualChangeConflater {
    queue: Vec<VisualChangeNotice>,
    on_refresh: Arc<dyn Fn(Vec<VisualChangeNotice>) + Send + Sync>,
}

impl VisualChangeConflater {
    pub fn new(on_refresh: Arc<dyn Fn(Vec<VisualChangeNotice>) + Send + Sync>) -> Self {
        Self {
            queue: Vec::new(),
            on_refresh,
        }
    }
}

impl EventConflater<VisualChangeNotice> for VisualChangeConflater {
    fn add_event(&mut self, event: VisualChangeNotice) {
        self.queue.push(event);
    }

    fn queued_count(&self) -> usize {
        self.queue.len()
    }

    fn clear_queue(&mut self) {
        self.queue.clear();
    }

    fn flush(&mut self, apply: &mpsc::Sender<ApplyTask>) {
        if self.queue.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.queue);
        tracing::trace!(count = batch.len(), "conflater flush");
        let on_refresh = Arc::clone(&self.on_refresh);
        let task: ApplyTask = Box::new(move || on_refresh(batch));
        if apply.send(task).is_err() {
            tracing::debug!("apply channel closed; flushed batch discarded");
        }
    }
}

/// Bridges a layer's event stream into a conflater chain.
///
/// Every event a layer fires becomes one repaint notice for the named
/// region; the conflater collapses the burst on the next flush.
pub struct RegionRepaintListener {
    region: String,
    handle: ConflaterHandle<VisualChangeNotice>,
}

impl RegionRepaintListener {
    pub fn new(region: impl Into<String>, handle: ConflaterHandle<VisualChangeNotice>) -> Self {
        Self {
            region: region.into(),
            handle,
        }
    }
}

impl crate::layer::LayerListener for RegionRepaintListener {
    fn handle_layer_event(&mut self, _event: &dyn crate::event::LayerEvent) {
        self.handle.add_event(VisualChangeNotice::new(self.region.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApplyTask, ConflaterChain, EventConflater, RegionRepaintListener, VisualChangeConflater,
        VisualChangeNotice,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, mpsc};
    use std::time::Duration;

    fn counting_conflater(counter: Arc<AtomicUsize>) -> Box<VisualChangeConflater> {
        Box::new(VisualChangeConflater::new(Arc::new(move |batch| {
            counter.fetch_add(batch.len(), Ordering::SeqCst);
        })))
    }

    #[test]
    fn flush_collapses_the_queue_into_one_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut conflater = counting_conflater(Arc::clone(&counter));
        conflater.add_event(VisualChangeNotice::new("body"));
        conflater.add_event(VisualChangeNotice::new("body"));
        conflater.add_event(VisualChangeNotice::new("header"));
        assert_eq!(conflater.queued_count(), 3);

        let (tx, rx) = mpsc::channel::<ApplyTask>();
        conflater.flush(&tx);
        assert_eq!(conflater.queued_count(), 0);

        let tasks: Vec<ApplyTask> = rx.try_iter().collect();
        assert_eq!(tasks.len(), 1);
        for task in tasks {
            task();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_queue_flushes_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut conflater = counting_conflater(counter);
        let (tx, rx) = mpsc::channel::<ApplyTask>();
        conflater.flush(&tx);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn scheduler_thread_flushes_periodically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut chain = ConflaterChain::new(Duration::from_millis(10));
        chain.add_conflater(counting_conflater(Arc::clone(&counter)));

        let handle = chain.handle();
        let (tx, rx) = mpsc::channel::<ApplyTask>();
        chain.start(tx).expect("spawn scheduler thread");
        assert!(chain.is_running());

        handle.add_event(VisualChangeNotice::new("body"));
        handle.add_event(VisualChangeNotice::new("body"));

        let task = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("a flush within the interval");
        task();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        chain.stop();
        assert!(!chain.is_running());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut chain: ConflaterChain<VisualChangeNotice> =
            ConflaterChain::new(Duration::from_millis(10));
        let (tx, _rx) = mpsc::channel::<ApplyTask>();
        chain.start(tx.clone()).expect("first start");
        chain.start(tx).expect("second start is a no-op");
        chain.stop();
        chain.stop();
        assert!(!chain.is_running());
    }

    #[test]
    fn stop_leaves_unflushed_events_queued() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut chain = ConflaterChain::new(Duration::from_secs(3600));
        chain.add_conflater(counting_conflater(counter));

        let handle = chain.handle();
        let (tx, _rx) = mpsc::channel::<ApplyTask>();
        chain.start(tx).expect("spawn scheduler thread");
        handle.add_event(VisualChangeNotice::new("body"));
        chain.stop();

        // Nothing flushed; the event is still waiting for a future start.
        assert_eq!(handle.queued_count(), 1);
    }

    #[test]
    fn listener_feeds_layer_events_into_the_chain() {
        use crate::data::{DataLayer, VecDataProvider};
        use crate::layer::Layer;
        use std::cell::RefCell;
        use std::rc::Rc;

        let chain: ConflaterChain<VisualChangeNotice> =
            ConflaterChain::new(Duration::from_millis(10));
        chain.add_conflater(counting_conflater(Arc::new(AtomicUsize::new(0))));

        let mut layer = DataLayer::new(VecDataProvider::<u32>::new(3, 3));
        let listener = RegionRepaintListener::new("body", chain.handle());
        layer.add_layer_listener(Rc::new(RefCell::new(listener)));

        layer.set_column_width_by_position(0, 50);
        layer.set_column_width_by_position(1, 60);
        assert_eq!(chain.handle().queued_count(), 2);
    }

    #[test]
    fn drop_joins_the_scheduler_thread() {
        let mut chain: ConflaterChain<VisualChangeNotice> =
            ConflaterChain::new(Duration::from_millis(10));
        let (tx, _rx) = mpsc::channel::<ApplyTask>();
        chain.start(tx).expect("spawn scheduler thread");
        drop(chain);
    }
}
