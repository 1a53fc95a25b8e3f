pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod navigators;
pub mod reconciler;
pub mod result;
pub mod scheduler;

pub use channel::{ChannelHandle, ChannelState, FleetChannel};
pub use engine::{ClickEvent, DrawingEngine, LogEngine, NavigatorId, TrackRender};
pub use events::{EventBus, Subscription, Topic, UiEvent};
pub use navigators::NavigatorPool;
pub use reconciler::{PathReconciler, ReconciledSet, ReconciledTrack};
pub use scheduler::RenderScheduler;

use futures::FutureExt;
use log::info;
use shared::FleetSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// The assembled playback pipeline: snapshots in, bounded-rate navigator
/// updates out, clicks back onto the event bus.
///
/// Everything runs as short handlers on one select loop, so snapshots are
/// reconciled strictly in arrival order and the drawing layer only ever sees
/// a rate-limited subset of cycles, never an out-of-order one.
pub struct Client<E: DrawingEngine> {
    reconciler: PathReconciler,
    scheduler: RenderScheduler,
    pool: NavigatorPool<E>,
}

impl<E: DrawingEngine> Client<E> {
    pub fn new(engine: E, bus: Arc<EventBus>, render_window: Duration) -> Self {
        Self {
            reconciler: PathReconciler::new(),
            scheduler: RenderScheduler::new(render_window),
            pool: NavigatorPool::new(engine, bus),
        }
    }

    pub fn from_config(config: &config::Config, engine: E, bus: Arc<EventBus>) -> Self {
        Self::new(engine, bus, config.render_window())
    }

    pub async fn run(
        mut self,
        mut snapshots: mpsc::Receiver<FleetSnapshot>,
        mut clicks: mpsc::Receiver<ClickEvent>,
        destroyer: oneshot::Receiver<()>,
    ) {
        let mut destroyer = destroyer.fuse();
        'main: loop {
            let deadline = self
                .scheduler
                .next_deadline()
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(|| tokio::time::Instant::now() + self.scheduler.window());
            tokio::select! {
                snapshot = snapshots.recv() => match snapshot {
                    Some(snapshot) => self.on_snapshot(&snapshot),
                    // channel task is gone; nothing more will arrive
                    None => break 'main,
                },
                click = clicks.recv() => {
                    if let Some(click) = click {
                        self.pool.handle_click(&click);
                    }
                },
                _ = tokio::time::sleep_until(deadline), if self.scheduler.has_pending() => {
                    if let Some(set) = self.scheduler.take_due(Instant::now()) {
                        self.pool.apply(&set);
                    }
                },
                _ = &mut destroyer => {
                    info!("client shutdown requested. Shutting down");
                    break 'main;
                },
            }
        }
        self.pool.clear();
    }

    fn on_snapshot(&mut self, snapshot: &FleetSnapshot) {
        let set = self.reconciler.reconcile(snapshot);
        if let Some(set) = self.scheduler.offer(set, Instant::now()) {
            self.pool.apply(&set);
        }
    }
}
