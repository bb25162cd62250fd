//! The action bus: synchronous dispatch fan-out plus a deferred queue.
//!
//! A [`ActionBus`] carries every action in the system. Dispatch is
//! synchronous: all registered sinks run to completion, in subscription
//! order, before `dispatch` returns. Asynchronous observers (effects
//! pipelines) watch a broadcast side-channel instead and never delay a
//! dispatch.
//!
//! Actions produced *by* effects must not be re-dispatched on the stack
//! of the dispatch that triggered them. [`ActionBus::post`] is the
//! explicit deferral point: posted actions land on an internal queue and
//! are dispatched by a background pump task on a later scheduler tick.

use std::sync::{Arc, Weak};

use brook_core::AnyAction;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};

/// Buffered actions per async observer before lagged ones skip ahead.
const OBSERVER_BUFFER: usize = 64;

type Sink = Arc<dyn Fn(&AnyAction) + Send + Sync>;

/// Shared action conduit. Cheap to clone; all clones address the same
/// sinks, observers, and deferral queue.
///
/// Must be created inside a tokio runtime: construction spawns the pump
/// task that drains the deferral queue.
#[derive(Clone)]
pub struct ActionBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    sinks: RwLock<Vec<Sink>>,
    observers: broadcast::Sender<AnyAction>,
    queue: mpsc::UnboundedSender<AnyAction>,
    shutdown: watch::Sender<bool>,
}

impl ActionBus {
    /// Create a bus and spawn its pump task.
    pub fn new() -> Self {
        let (observers, _) = broadcast::channel(OBSERVER_BUFFER);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let inner = Arc::new(BusInner {
            sinks: RwLock::new(Vec::new()),
            observers,
            queue: queue_tx,
            shutdown,
        });

        let shutdown_rx = inner.shutdown.subscribe();
        tokio::spawn(pump(Arc::downgrade(&inner), queue_rx, shutdown_rx));

        Self { inner }
    }

    /// Dispatch an action: run every sink synchronously in subscription
    /// order, then hand the action to async observers.
    pub fn dispatch(&self, action: AnyAction) {
        self.inner.dispatch(&action);
    }

    /// Register a synchronous sink. Sinks registered after a dispatch do
    /// not see it; there is no buffering toward future sinks.
    pub fn subscribe_sink(&self, sink: impl Fn(&AnyAction) + Send + Sync + 'static) {
        self.inner.sinks.write().push(Arc::new(sink));
    }

    /// An async observer over all actions dispatched from now on.
    pub fn actions(&self) -> ActionsStream {
        ActionsStream {
            rx: self.inner.observers.subscribe(),
        }
    }

    /// Enqueue an action for deferred dispatch by the pump task.
    ///
    /// The action reaches sinks on a later scheduler tick, never on the
    /// caller's stack. After [`ActionBus::shutdown`] this is a warned
    /// no-op.
    pub fn post(&self, action: AnyAction) {
        if let Err(lost) = self.inner.queue.send(action) {
            tracing::warn!(action = lost.0.name(), "action posted after bus shutdown");
        }
    }

    /// Stop the pump task. Idempotent; direct `dispatch` keeps working,
    /// posted actions are dropped with a warning.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown.send(true);
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusInner {
    fn dispatch(&self, action: &AnyAction) {
        // Snapshot the sink list so a sink may register further sinks or
        // re-dispatch without deadlocking on the list lock.
        let sinks: Vec<Sink> = self.sinks.read().clone();
        tracing::debug!(action = action.name(), sinks = sinks.len(), "dispatching");

        for sink in &sinks {
            sink(action);
        }
        // No async observers is not an error.
        let _ = self.observers.send(Arc::clone(action));
    }
}

async fn pump(
    bus: Weak<BusInner>,
    mut queue: mpsc::UnboundedReceiver<AnyAction>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            action = queue.recv() => {
                let Some(action) = action else { break };
                // The pump holds only a weak handle so a dropped bus does
                // not stay alive through its own queue.
                let Some(bus) = bus.upgrade() else { break };
                bus.dispatch(&action);
            }
        }
    }
}

/// Async observer handle over dispatched actions.
///
/// Backed by a broadcast channel: observers that fall more than the
/// buffer behind skip the overwritten actions and continue from the
/// oldest retained one.
pub struct ActionsStream {
    rx: broadcast::Receiver<AnyAction>,
}

impl ActionsStream {
    /// Receive the next action, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<AnyAction> {
        loop {
            match self.rx.recv().await {
                Ok(action) => return Some(action),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "action observer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt this observer into a [`futures::Stream`] of actions, for
    /// composing effects pipelines with stream combinators.
    pub fn into_stream(
        self,
    ) -> std::pin::Pin<Box<dyn futures::Stream<Item = AnyAction> + Send>> {
        Box::pin(futures::stream::unfold(self, |mut actions| async move {
            actions.recv().await.map(|action| (action, actions))
        }))
    }
}
