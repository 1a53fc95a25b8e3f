use log::debug;
use shared::{decode_clean, FleetSnapshot, GeoPoint, VehicleStatus};
use std::collections::HashMap;

/// One vehicle's reconciled render state for a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTrack {
    pub vehicle_id: String,
    pub track_index: usize,
    pub path: Vec<GeoPoint>,
    pub status: VehicleStatus,
    /// The stored buffer shrank, meaning the server reset the vehicle's
    /// route. The navigator must be recreated, not advanced.
    pub reset: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledSet {
    pub tracks: Vec<ReconciledTrack>,
}

/// Turns full-fleet snapshots into stable per-vehicle path buffers and dense
/// track indices.
///
/// Buffers survive a vehicle's absence (a reappearing id picks its old buffer
/// back up under a fresh track index); track indices are recomputed from the
/// active id set every cycle as a plain set difference, never patched
/// incrementally.
#[derive(Default)]
pub struct PathReconciler {
    buffers: HashMap<String, Vec<GeoPoint>>,
    tracks: HashMap<String, usize>,
}

impl PathReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(&mut self, snapshot: &FleetSnapshot) -> ReconciledSet {
        // Duplicate identities collapse, later entry wins, first position kept.
        let mut order: Vec<String> = Vec::with_capacity(snapshot.vehicles.len());
        let mut latest: HashMap<String, &shared::VehicleSnapshot> = HashMap::new();
        for vehicle in &snapshot.vehicles {
            let id = match vehicle.identity() {
                Some(id) => id,
                None => continue,
            };
            if latest.insert(id.clone(), vehicle).is_none() {
                order.push(id);
            }
        }

        let mut resets: Vec<String> = Vec::new();
        for id in &order {
            let vehicle = latest[id];
            let decoded = decode_clean(vehicle.traveled_polyline.as_deref().unwrap_or(""));
            match self.buffers.get(id) {
                // Empty decode: keep whatever we had, never a reset.
                Some(_) if decoded.is_empty() => {}
                Some(stored) if decoded.len() < stored.len() => {
                    debug!(
                        "vehicle {} path shrank {} -> {}, treating as route reset",
                        id,
                        stored.len(),
                        decoded.len()
                    );
                    resets.push(id.clone());
                    self.buffers.insert(id.clone(), decoded);
                }
                _ => {
                    self.buffers.insert(id.clone(), decoded);
                }
            }
        }

        self.assign_tracks(&order);

        let tracks = order
            .iter()
            .map(|id| ReconciledTrack {
                vehicle_id: id.clone(),
                track_index: self.tracks[id],
                path: self.buffers.get(id).cloned().unwrap_or_default(),
                status: latest[id].status,
                reset: resets.contains(id),
            })
            .collect();
        ReconciledSet { tracks }
    }

    /// Dense reindex over the active ids. Surviving ids keep their index when
    /// it still fits the dense range; newcomers take the vacated indices in
    /// sorted order.
    fn assign_tracks(&mut self, active: &[String]) {
        let n = active.len();
        let mut next: HashMap<String, usize> = HashMap::with_capacity(n);
        let mut used = vec![false; n];
        for id in active {
            if let Some(&index) = self.tracks.get(id) {
                if index < n && !used[index] {
                    used[index] = true;
                    next.insert(id.clone(), index);
                }
            }
        }
        let mut newcomers: Vec<&String> =
            active.iter().filter(|id| !next.contains_key(*id)).collect();
        newcomers.sort();
        let mut vacated = used
            .iter()
            .enumerate()
            .filter(|(_, taken)| !**taken)
            .map(|(index, _)| index);
        for id in newcomers {
            if let Some(index) = vacated.next() {
                next.insert(id.clone(), index);
            }
        }
        self.tracks = next;
    }

    pub fn buffer_len(&self, vehicle_id: &str) -> Option<usize> {
        self.buffers.get(vehicle_id).map(Vec::len)
    }

    pub fn track_index(&self, vehicle_id: &str) -> Option<usize> {
        self.tracks.get(vehicle_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::VehicleSnapshot;

    fn vehicle(plate: &str, polyline: &str) -> VehicleSnapshot {
        VehicleSnapshot {
            plate_number: Some(plate.to_string()),
            traveled_polyline: if polyline.is_empty() {
                None
            } else {
                Some(polyline.to_string())
            },
            ..VehicleSnapshot::default()
        }
    }

    fn fleet(vehicles: Vec<VehicleSnapshot>) -> FleetSnapshot {
        FleetSnapshot { vehicles }
    }

    #[test]
    fn buffer_length_is_non_decreasing_under_prefix_extension() {
        let mut reconciler = PathReconciler::new();
        let mut last = 0;
        for polyline in &["1,2", "1,2;3,4", "1,2;3,4;5,6"] {
            reconciler.reconcile(&fleet(vec![vehicle("A", polyline)]));
            let len = reconciler.buffer_len("A").unwrap();
            assert!(len >= last);
            last = len;
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn shorter_decode_flags_a_reset() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4;5,6")]));
        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "9,9")]));
        assert!(set.tracks[0].reset);
        assert_eq!(set.tracks[0].path.len(), 1);
        assert_eq!(reconciler.buffer_len("A"), Some(1));
    }

    #[test]
    fn equal_length_update_is_not_a_reset() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4")]));
        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4")]));
        assert!(!set.tracks[0].reset);
    }

    #[test]
    fn track_indices_stay_dense() {
        let mut reconciler = PathReconciler::new();
        let set = reconciler.reconcile(&fleet(vec![
            vehicle("A", "1,1"),
            vehicle("B", "2,2"),
            vehicle("C", "3,3"),
        ]));
        let mut indices: Vec<usize> = set.tracks.iter().map(|t| t.track_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);

        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "1,1"), vehicle("C", "3,3")]));
        let mut indices: Vec<usize> = set.tracks.iter().map(|t| t.track_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn departure_retires_track_and_newcomer_takes_vacated_index() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,1"), vehicle("B", "2,2")]));
        let b_index = reconciler.track_index("B").unwrap();

        let set = reconciler.reconcile(&fleet(vec![vehicle("B", "2,2"), vehicle("C", "3,3")]));
        assert_eq!(reconciler.track_index("A"), None);
        assert_eq!(reconciler.track_index("B"), Some(b_index));
        let a_old = if b_index == 0 { 1 } else { 0 };
        assert_eq!(reconciler.track_index("C"), Some(a_old));
        assert_eq!(set.tracks.len(), 2);
    }

    #[test]
    fn absent_vehicle_keeps_its_buffer_for_reappearance() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4")]));
        reconciler.reconcile(&fleet(vec![vehicle("B", "2,2")]));
        assert_eq!(reconciler.track_index("A"), None);
        assert_eq!(reconciler.buffer_len("A"), Some(2));

        // Reappearance: old buffer picked back up, no reset even though the
        // id was gone for a cycle.
        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4;5,6")]));
        assert_eq!(set.tracks[0].path.len(), 3);
        assert!(!set.tracks[0].reset);
    }

    #[test]
    fn empty_decode_retains_previous_buffer() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4")]));
        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "")]));
        assert_eq!(set.tracks[0].path.len(), 2);
        assert!(!set.tracks[0].reset);
    }

    #[test]
    fn all_nan_decode_never_stalls_other_vehicles() {
        let mut reconciler = PathReconciler::new();
        reconciler.reconcile(&fleet(vec![vehicle("A", "1,2;3,4")]));
        let set = reconciler.reconcile(&fleet(vec![
            vehicle("A", "x,y;z,w"),
            vehicle("B", "5,6"),
        ]));
        assert_eq!(set.tracks.len(), 2);
        assert_eq!(reconciler.buffer_len("A"), Some(2));
        assert_eq!(reconciler.buffer_len("B"), Some(1));
    }

    #[test]
    fn fresh_vehicle_with_no_path_is_active_but_empty() {
        let mut reconciler = PathReconciler::new();
        let set = reconciler.reconcile(&fleet(vec![vehicle("A", "")]));
        assert_eq!(set.tracks.len(), 1);
        assert!(set.tracks[0].path.is_empty());
        assert_eq!(set.tracks[0].track_index, 0);
    }
}
