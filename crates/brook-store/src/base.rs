//! Observable store cells.
//!
//! [`StoreBase`] is the primitive every store in this crate builds on: a
//! cell that always holds a value, is synchronously readable, and feeds
//! replay-one, distinct-until-changed streams to subscribers. Completion
//! is terminal: it finishes every live stream and cancels every attached
//! effect pipeline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};

/// Per-subscriber buffer of state values; lagged subscribers skip.
const SUBSCRIBER_BUFFER: usize = 64;

/// Bound on state values: cheaply observable, comparably distinct, and
/// shareable across tasks. Blanket-implemented; never implement by hand.
pub trait State: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> State for T {}

/// An always-valued observable cell.
///
/// Cloning shares the cell: all clones read and write the same value and
/// feed the same subscribers.
pub struct StoreBase<T: State> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    value: RwLock<T>,
    emit: broadcast::Sender<T>,
    done: watch::Sender<bool>,
}

impl<T: State> StoreBase<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        let (emit, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(initial),
                emit,
                done,
            }),
        }
    }

    /// Clone of the current value.
    pub fn snapshot(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set the current value and broadcast it, unconditionally.
    ///
    /// After [`StoreBase::complete`] this is a warned no-op.
    pub fn next(&self, value: T) {
        if self.is_complete() {
            tracing::warn!("value pushed after store completion");
            return;
        }
        *self.inner.value.write() = value.clone();
        // No live subscribers is not an error.
        let _ = self.inner.emit.send(value);
    }

    /// Set the current value only when it differs from the snapshot.
    /// Returns whether a push happened.
    pub(crate) fn next_if_changed(&self, value: T) -> bool {
        if value == self.snapshot() {
            return false;
        }
        self.next(value);
        true
    }

    /// Whether [`StoreBase::complete`] has been called.
    pub fn is_complete(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Subscribe: the stream first yields the snapshot at subscription
    /// time, then every subsequent distinct value.
    ///
    /// A stream taken after completion finishes immediately, yielding
    /// nothing.
    pub fn state(&self) -> StateStream<T> {
        // Subscribe before reading the snapshot so no newer value can
        // fall between the two; the duplicate this may produce is
        // coalesced by the distinct gate.
        let rx = self.inner.emit.subscribe();
        let done = self.inner.done.subscribe();
        let finished = *done.borrow();
        let pending = (!finished).then(|| self.snapshot());

        StateStream {
            pending,
            last: None,
            rx,
            done,
            finished,
        }
    }

    /// Derived stream: project each state value, then apply an
    /// independent distinct gate on the projection.
    pub fn select<U, F>(&self, project: F) -> Selected<T, U>
    where
        U: State,
        F: Fn(&T) -> U + Send + 'static,
    {
        Selected {
            source: self.state(),
            project: Box::new(project),
            last: None,
        }
    }

    /// A callable that folds an input into the current snapshot and
    /// pushes the result only when it actually differs.
    pub fn updater<V, F>(&self, fold: F) -> impl Fn(V) + Send + Sync
    where
        V: Send,
        F: Fn(&T, V) -> T + Send + Sync,
    {
        let cell = self.clone();
        move |value| {
            let current = cell.snapshot();
            let next = fold(&current, value);
            if next != current {
                cell.next(next);
            }
        }
    }

    /// Attach an input-driven pipeline tied to this cell's lifetime.
    ///
    /// `build` turns the input channel into the pipeline future, which is
    /// spawned immediately and cancelled when the cell completes. The
    /// returned handle feeds the input channel; there is no per-call
    /// cancellation.
    pub fn effect<V, F, Fut>(&self, build: F) -> Effect<V>
    where
        V: Send + 'static,
        F: FnOnce(mpsc::UnboundedReceiver<V>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (input, rx) = mpsc::unbounded_channel();
        let pipeline = build(rx);

        let mut done = self.inner.done.subscribe();
        if *done.borrow() {
            tracing::warn!("effect attached after store completion");
        } else {
            tokio::spawn(async move {
                tokio::select! {
                    _ = done.changed() => {}
                    () = pipeline => {}
                }
            });
        }

        Effect { input }
    }

    /// Terminate the cell. Idempotent. Live streams drain buffered
    /// values and finish; attached effect pipelines are cancelled;
    /// further pushes are warned no-ops.
    pub fn complete(&self) {
        if !self.inner.done.send_replace(true) {
            tracing::debug!("store completed");
        }
    }
}

impl<T: State> Clone for StoreBase<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: State + std::fmt::Debug> std::fmt::Debug for StoreBase<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBase")
            .field("value", &*self.inner.value.read())
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Replay-one, distinct-until-changed subscription to a [`StoreBase`].
#[derive(Debug)]
pub struct StateStream<T> {
    pending: Option<T>,
    last: Option<T>,
    rx: broadcast::Receiver<T>,
    done: watch::Receiver<bool>,
    finished: bool,
}

impl<T: State> StateStream<T> {
    /// Receive the next distinct value, or `None` once the store has
    /// completed and buffered values are drained.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(first) = self.pending.take() {
            self.last = Some(first.clone());
            return Some(first);
        }

        loop {
            if self.finished {
                return self.drain();
            }
            tokio::select! {
                biased;
                value = self.rx.recv() => match value {
                    Ok(value) => {
                        if self.is_distinct(&value) {
                            self.last = Some(value.clone());
                            return Some(value);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "state subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.finished = true;
                    }
                },
                // Completion, or the store itself was dropped.
                _ = self.done.changed() => {
                    self.finished = true;
                }
            }
        }
    }

    // Values broadcast before completion are still owed to subscribers.
    fn drain(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => {
                    if self.is_distinct(&value) {
                        self.last = Some(value.clone());
                        return Some(value);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "state subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    fn is_distinct(&self, value: &T) -> bool {
        self.last.as_ref() != Some(value)
    }
}

/// A projected, independently distinct view over a [`StateStream`].
pub struct Selected<T, U> {
    source: StateStream<T>,
    project: Box<dyn Fn(&T) -> U + Send>,
    last: Option<U>,
}

impl<T: State, U: State> Selected<T, U> {
    /// Receive the next distinct projected value, or `None` once the
    /// underlying store has completed.
    pub async fn recv(&mut self) -> Option<U> {
        while let Some(state) = self.source.recv().await {
            let value = (self.project)(&state);
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
        None
    }
}

/// Handle to an input-driven pipeline attached to a store cell.
///
/// Cloneable; all clones feed the same pipeline.
pub struct Effect<V> {
    input: mpsc::UnboundedSender<V>,
}

impl<V> Effect<V> {
    /// Feed one input into the pipeline. After the pipeline ended (store
    /// completion or the pipeline future finishing) this is a warned
    /// no-op.
    pub fn call(&self, value: V) {
        if self.input.send(value).is_err() {
            tracing::warn!("effect invoked after its pipeline ended");
        }
    }
}

impl<V> Clone for Effect<V> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
        }
    }
}
