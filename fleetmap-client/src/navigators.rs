use crate::engine::{ClickEvent, DrawingEngine, NavigatorId, TrackRender};
use crate::events::{EventBus, UiEvent};
use crate::reconciler::{ReconciledSet, ReconciledTrack};
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

struct NavigatorSlot {
    vehicle_id: String,
    handle: NavigatorId,
    path_len: usize,
}

/// Explicit arena mapping each active track index to exactly one animated
/// marker in the drawing engine.
///
/// Markers are created lazily on the first non-empty path, advanced on
/// extension, destroyed and recreated on a route reset (so the marker
/// restarts from the new origin instead of visually rewinding), and destroyed
/// promptly when their track index retires. A failed creation is logged and
/// retried naturally on the next cycle.
pub struct NavigatorPool<E: DrawingEngine> {
    engine: E,
    bus: Arc<EventBus>,
    slots: HashMap<usize, NavigatorSlot>,
}

impl<E: DrawingEngine> NavigatorPool<E> {
    pub fn new(engine: E, bus: Arc<EventBus>) -> Self {
        Self {
            engine,
            bus,
            slots: HashMap::with_capacity(16),
        }
    }

    pub fn apply(&mut self, set: &ReconciledSet) {
        let renders: Vec<TrackRender> = set
            .tracks
            .iter()
            .map(|track| TrackRender {
                track_index: track.track_index,
                vehicle_id: track.vehicle_id.clone(),
                path: track.path.clone(),
                hover_label: hover_label(track),
            })
            .collect();
        if let Err(e) = self.engine.set_tracks(&renders) {
            warn!("engine rejected track list: {}", e);
        }

        for track in &set.tracks {
            self.sync_navigator(track);
        }

        let retired: Vec<usize> = self
            .slots
            .keys()
            .filter(|index| !set.tracks.iter().any(|t| t.track_index == **index))
            .copied()
            .collect();
        for index in retired {
            self.destroy_slot(index);
        }
    }

    fn sync_navigator(&mut self, track: &ReconciledTrack) {
        let recreate = match self.slots.get(&track.track_index) {
            Some(slot) => track.reset || slot.vehicle_id != track.vehicle_id,
            None => false,
        };
        if recreate {
            self.destroy_slot(track.track_index);
        }

        match self.slots.get_mut(&track.track_index) {
            Some(slot) => {
                if track.path.len() > slot.path_len {
                    match self.engine.advance_navigator(slot.handle, &track.path) {
                        Ok(()) => slot.path_len = track.path.len(),
                        Err(e) => warn!(
                            "could not advance navigator for {}: {}",
                            track.vehicle_id, e
                        ),
                    }
                }
            }
            None => {
                if track.path.is_empty() {
                    return;
                }
                match self.engine.create_navigator(
                    track.track_index,
                    &track.path,
                    &hover_label(track),
                ) {
                    Ok(handle) => {
                        self.slots.insert(
                            track.track_index,
                            NavigatorSlot {
                                vehicle_id: track.vehicle_id.clone(),
                                handle,
                                path_len: track.path.len(),
                            },
                        );
                    }
                    // non-fatal: the vehicle is simply not shown this cycle
                    Err(e) => warn!(
                        "could not create navigator for {}: {}",
                        track.vehicle_id, e
                    ),
                }
            }
        }
    }

    /// Re-publishes an engine click as a UI selection carrying the vehicle
    /// id, which stays correct across track index reassignment. Background
    /// clicks clear the selection.
    pub fn handle_click(&self, click: &ClickEvent) {
        match click {
            ClickEvent::Track { vehicle_id, .. } => {
                self.bus.publish(&UiEvent::VehicleSelected(vehicle_id.clone()));
            }
            ClickEvent::Background => self.bus.publish(&UiEvent::SelectionCleared),
        }
    }

    /// Destroys every marker. Called on teardown so the engine never leaks
    /// handles.
    pub fn clear(&mut self) {
        let indices: Vec<usize> = self.slots.keys().copied().collect();
        for index in indices {
            self.destroy_slot(index);
        }
    }

    fn destroy_slot(&mut self, index: usize) {
        if let Some(slot) = self.slots.remove(&index) {
            if let Err(e) = self.engine.destroy_navigator(slot.handle) {
                warn!("could not destroy navigator {}: {}", slot.handle, e);
            }
        }
    }

    #[cfg(test)]
    fn engine(&self) -> &E {
        &self.engine
    }
}

fn hover_label(track: &ReconciledTrack) -> String {
    format!(
        "{} [{}] {} point(s)",
        track.vehicle_id,
        track.status.as_str(),
        track.path.len()
    )
}
