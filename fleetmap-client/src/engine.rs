use crate::result::EngineResult;
use log::info;
use shared::GeoPoint;
use tokio::sync::mpsc;

pub type NavigatorId = u64;

/// One entry of the full track list handed to the drawing engine each render
/// cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRender {
    pub track_index: usize,
    pub vehicle_id: String,
    pub path: Vec<GeoPoint>,
    pub hover_label: String,
}

/// Click callback payload coming back from the drawing engine. A click on
/// empty canvas clears the current selection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickEvent {
    Track {
        vehicle_id: String,
        point_index: Option<usize>,
    },
    Background,
}

/// Interface of the external map drawing engine. The engine owns the actual
/// canvas markers; this core only ever talks to it through these calls and
/// receives clicks back through an `mpsc` channel wired at construction.
pub trait DrawingEngine {
    /// Replaces the engine's path set wholesale.
    fn set_tracks(&mut self, tracks: &[TrackRender]) -> EngineResult<()>;

    /// Creates an animated marker bound to `track_index`, starting at the
    /// path's origin.
    fn create_navigator(
        &mut self,
        track_index: usize,
        path: &[GeoPoint],
        hover_label: &str,
    ) -> EngineResult<NavigatorId>;

    /// Extends a marker's path; the marker keeps moving from where it is.
    fn advance_navigator(&mut self, id: NavigatorId, path: &[GeoPoint]) -> EngineResult<()>;

    /// Destroys a marker and releases its engine resources.
    fn destroy_navigator(&mut self, id: NavigatorId) -> EngineResult<()>;
}

/// Log-only engine stand-in used by the binary when no real map widget is
/// attached. Click events can be injected for manual testing via the sender
/// returned from `new`.
pub struct LogEngine {
    next_id: NavigatorId,
    _clicks: mpsc::Sender<ClickEvent>,
}

impl LogEngine {
    pub fn new(clicks: mpsc::Sender<ClickEvent>) -> Self {
        Self {
            next_id: 0,
            _clicks: clicks,
        }
    }
}

impl DrawingEngine for LogEngine {
    fn set_tracks(&mut self, tracks: &[TrackRender]) -> EngineResult<()> {
        info!("render: {} track(s)", tracks.len());
        Ok(())
    }

    fn create_navigator(
        &mut self,
        track_index: usize,
        path: &[GeoPoint],
        hover_label: &str,
    ) -> EngineResult<NavigatorId> {
        self.next_id += 1;
        info!(
            "navigator {} created on track {} ({}, {} point(s))",
            self.next_id,
            track_index,
            hover_label,
            path.len()
        );
        Ok(self.next_id)
    }

    fn advance_navigator(&mut self, id: NavigatorId, path: &[GeoPoint]) -> EngineResult<()> {
        info!("navigator {} advanced to {} point(s)", id, path.len());
        Ok(())
    }

    fn destroy_navigator(&mut self, id: NavigatorId) -> EngineResult<()> {
        info!("navigator {} destroyed", id);
        Ok(())
    }
}
