//! LayerSync - renderable line geometries and the visible group
//!
//! Each track owns exactly one [`TrackGeometry`], built once from its coordinates. Style edits
//! restyle the geometry in place and visibility edits only move it in or out of the visible
//! group, so the (potentially large) coordinate buffer is never rebuilt after creation.

use crate::track::{StrokeWeight, TrackColor, TrackId, TrackPatch};
use crate::{Result, TrackError};
use geo::{BoundingRect, Coord, LineString, Rect};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Identity of one built geometry; never shared by two builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

/// Stroke style of a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: TrackColor,
    pub weight: StrokeWeight,
}

/// Renderable line for one track
#[derive(Debug)]
pub struct TrackGeometry {
    id: GeometryId,
    /// Coordinates (x = lon, y = lat), shared with renderers
    line: Arc<LineString<f64>>,
    style: LineStyle,
    /// Computed once at build time; `None` for an empty line
    bounds: Option<Rect<f64>>,
}

impl TrackGeometry {
    #[inline]
    pub fn id(&self) -> GeometryId {
        self.id
    }

    #[inline]
    pub fn line(&self) -> &Arc<LineString<f64>> {
        &self.line
    }

    #[inline]
    pub fn style(&self) -> LineStyle {
        self.style
    }

    #[inline]
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }
}

/// Owner of all track geometries and of the visible group
#[derive(Debug, Default)]
pub struct LayerSync {
    geometries: HashMap<TrackId, TrackGeometry>,
    /// Visible tracks keyed by attach sequence, i.e. in draw order
    visible: BTreeMap<u64, TrackId>,
    /// Attach sequence of each visible track
    attached: HashMap<TrackId, u64>,
    next_geometry: u64,
    next_attach: u64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LayerSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the geometry for a new track and attach it to the visible group
    pub fn create_geometry(
        &mut self,
        id: TrackId,
        coordinates: Vec<Coord<f64>>,
        color: TrackColor,
        weight: StrokeWeight,
    ) -> Result<GeometryId> {
        if self.geometries.contains_key(&id) {
            return Err(TrackError::DuplicateGeometry(id));
        }

        let line = LineString::new(coordinates);
        let bounds = line.bounding_rect();
        let geometry_id = GeometryId(self.next_geometry);
        self.next_geometry += 1;

        tracing::trace!(
            "Built geometry {:?} for track {id} ({} points)",
            geometry_id,
            line.0.len()
        );

        self.attach(&id);
        self.geometries.insert(
            id,
            TrackGeometry {
                id: geometry_id,
                line: Arc::new(line),
                style: LineStyle { color, weight },
                bounds,
            },
        );

        Ok(geometry_id)
    }

    /// Reflect a track patch on its geometry, one independent action per present field
    pub fn apply_update(&mut self, id: &TrackId, patch: &TrackPatch) -> Result<()> {
        let geometry = self
            .geometries
            .get_mut(id)
            .ok_or_else(|| TrackError::NotFound(id.clone()))?;

        if let Some(color) = patch.color {
            geometry.style.color = color;
        }
        if let Some(weight) = patch.weight {
            geometry.style.weight = weight;
        }
        match patch.visible {
            Some(true) => self.attach(id),
            Some(false) => self.detach(id),
            None => {}
        }

        Ok(())
    }

    /// Detach and drop the geometry of `id` for good
    pub fn remove_geometry(&mut self, id: &TrackId) -> Result<TrackGeometry> {
        let geometry = self
            .geometries
            .remove(id)
            .ok_or_else(|| TrackError::NotFound(id.clone()))?;
        self.detach(id);
        Ok(geometry)
    }

    pub fn geometry_of(&self, id: &TrackId) -> Result<&TrackGeometry> {
        self.geometries
            .get(id)
            .ok_or_else(|| TrackError::NotFound(id.clone()))
    }

    #[inline]
    pub fn is_visible(&self, id: &TrackId) -> bool {
        self.attached.contains_key(id)
    }

    /// Geometries currently attached to the map, in draw order
    pub fn visible_geometries(&self) -> impl Iterator<Item = (&TrackId, &TrackGeometry)> + '_ {
        self.visible
            .values()
            .filter_map(|id| self.geometries.get(id).map(|geometry| (id, geometry)))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn clear(&mut self) {
        self.geometries.clear();
        self.visible.clear();
        self.attached.clear();
    }

    fn attach(&mut self, id: &TrackId) {
        if self.attached.contains_key(id) {
            return;
        }
        let sequence = self.next_attach;
        self.next_attach += 1;
        self.attached.insert(id.clone(), sequence);
        self.visible.insert(sequence, id.clone());
    }

    fn detach(&mut self, id: &TrackId) {
        if let Some(sequence) = self.attached.remove(id) {
            self.visible.remove(&sequence);
        }
    }
}
