//! Debounced, live view of the tagged element set.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::RwLock;

use crate::infra::document::{Document, ObserveOptions, ObserverId};

/// Trailing-edge debounce timer. Every recorded event pushes the deadline out; the timer
/// fires once after a quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per quiet period, when `now` has reached the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

enum Signal {
    Changed,
    Stop,
}

/// Handle given to a [`ChangeSource`] to report that the tree changed.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: Sender<Signal>,
}

impl ChangeNotifier {
    pub fn notify(&self) {
        // The watcher may already be gone; nothing left to tell.
        let _ = self.tx.send(Signal::Changed);
    }
}

/// Anything that can report "the content tree changed".
pub trait ChangeSource {
    fn subscribe(&mut self, notifier: ChangeNotifier) -> Result<()>;
    /// Release every observation resource. Must be idempotent.
    fn unsubscribe(&mut self);
}

/// Observes structural and marker-attribute mutations of a shared [`Document`].
pub struct DocumentSource {
    document: Arc<RwLock<Document>>,
    observer: Option<ObserverId>,
}

impl DocumentSource {
    pub fn new(document: Arc<RwLock<Document>>) -> Self {
        Self {
            document,
            observer: None,
        }
    }
}

impl ChangeSource for DocumentSource {
    fn subscribe(&mut self, notifier: ChangeNotifier) -> Result<()> {
        self.unsubscribe();
        let id = self.document.write().observe(
            ObserveOptions::copy_markers(),
            Box::new(move |_| notifier.notify()),
        );
        self.observer = Some(id);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.observer.take() {
            self.document.write().disconnect(id);
        }
    }
}

pub type PublishListener<T> = Box<dyn FnMut(&[T]) + Send>;

#[derive(Debug)]
struct Published<T> {
    elements: Vec<T>,
    generation: u64,
}

/// Keeps a freshly scanned element set while active.
///
/// Activation runs one scan immediately; every debounced batch of changes re-runs it and
/// republishes the whole set. Dropping the watcher deactivates it.
pub struct ChangeWatcher<T> {
    published: Arc<RwLock<Published<T>>>,
    source: Box<dyn ChangeSource>,
    control: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> ChangeWatcher<T> {
    /// Start observing `source`. `refresh` produces the element set and runs on the watcher
    /// thread after each quiet period; `listener` sees every republished set.
    pub fn start<S, F>(
        source: S,
        debounce: Duration,
        mut refresh: F,
        listener: Option<PublishListener<T>>,
    ) -> Result<Self>
    where
        S: ChangeSource + 'static,
        F: FnMut() -> Vec<T> + Send + 'static,
    {
        let mut source: Box<dyn ChangeSource> = Box::new(source);
        let (tx, rx) = mpsc::channel();

        let published = Arc::new(RwLock::new(Published {
            elements: refresh(),
            generation: 0,
        }));

        source
            .subscribe(ChangeNotifier { tx: tx.clone() })
            .context("failed to subscribe to content changes")?;

        let shared = published.clone();
        let worker = thread::Builder::new()
            .name("copymark-watch".into())
            .spawn(move || run_worker(rx, debounce, refresh, listener, shared));
        let worker = match worker {
            Ok(worker) => worker,
            Err(err) => {
                source.unsubscribe();
                return Err(err).context("failed to spawn watcher thread");
            }
        };

        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "change watcher started");
        Ok(Self {
            published,
            source,
            control: tx,
            worker: Some(worker),
        })
    }

    /// Snapshot of the current element set.
    pub fn elements(&self) -> Vec<T> {
        self.published.read().elements.clone()
    }

    /// Number of republishes since activation.
    pub fn generation(&self) -> u64 {
        self.published.read().generation
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop observing and release the worker. Safe to call more than once.
    pub fn stop(&mut self) {
        self.source.unsubscribe();
        if let Some(worker) = self.worker.take() {
            let _ = self.control.send(Signal::Stop);
            if worker.join().is_err() {
                tracing::warn!("change watcher thread panicked");
            }
            tracing::debug!("change watcher stopped");
        }
    }
}

impl<T> Drop for ChangeWatcher<T> {
    fn drop(&mut self) {
        self.source.unsubscribe();
        if let Some(worker) = self.worker.take() {
            let _ = self.control.send(Signal::Stop);
            let _ = worker.join();
        }
    }
}

fn run_worker<T, F>(
    rx: Receiver<Signal>,
    debounce: Duration,
    mut refresh: F,
    mut listener: Option<PublishListener<T>>,
    published: Arc<RwLock<Published<T>>>,
) where
    T: Clone,
    F: FnMut() -> Vec<T>,
{
    let mut debouncer = Debouncer::new(debounce);
    loop {
        let signal = match debouncer.deadline() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match signal {
            Ok(Signal::Changed) => debouncer.record(Instant::now()),
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if debouncer.fire(Instant::now()) {
            let elements = refresh();
            let snapshot = {
                let mut guard = published.write();
                guard.elements = elements;
                guard.generation += 1;
                tracing::debug!(
                    count = guard.elements.len(),
                    generation = guard.generation,
                    "republished copy targets"
                );
                guard.elements.clone()
            };
            if let Some(listener) = listener.as_mut() {
                listener(&snapshot);
            }
        }
    }
}
