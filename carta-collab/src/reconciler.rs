//! Client-side reconciliation between the relay and the rendered map.
//!
//! Echo avoidance is structural, not a flag check: the two directions enter
//! through disjoint methods. `local_*` methods register an action taken with
//! the drawing tools and hand back the protocol event(s) to send; they are
//! the only methods that produce events. `apply_remote` applies an inbound
//! event to the local collection and never produces one, so an externally
//! applied change cannot re-trigger the local handlers.
//!
//! The collection itself is an explicit side table from feature id to the
//! renderer's native handle; nothing is ever tagged onto renderer-owned
//! objects.

use std::collections::HashMap;

use crate::feature::{Feature, FeatureId};
use crate::geometry::{Geometry, Position};
use crate::protocol::FeatureEvent;

/// Drawing-surface boundary.
///
/// The reconciler never inspects renderer state; it only instructs the
/// surface through this trait, addressing features by the handles it keeps
/// in its side table.
pub trait RenderSurface {
    /// Renderer-native handle for a drawn feature.
    type Handle;

    /// Draw a feature, returning its handle.
    fn materialize(&mut self, feature: &Feature) -> Self::Handle;

    /// Move a single-position feature.
    fn move_point(&mut self, handle: &mut Self::Handle, position: Position);

    /// Re-shape a path-like feature (lines, polygons, multi variants).
    fn reshape(&mut self, handle: &mut Self::Handle, geometry: &Geometry);

    /// Erase a feature.
    fn withdraw(&mut self, handle: Self::Handle);
}

struct LocalFeature<H> {
    feature: Feature,
    handle: H,
}

/// The client-local feature collection.
///
/// A disposable cache of the server store: cleared on disconnect and
/// rebuilt from the bootstrap replay after reconnecting.
pub struct Reconciler<S: RenderSurface> {
    surface: S,
    features: HashMap<FeatureId, LocalFeature<S::Handle>>,
}

impl<S: RenderSurface> Reconciler<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            features: HashMap::new(),
        }
    }

    // ── local actions: register, render, hand back the event to emit ──

    /// A feature was drawn locally.
    ///
    /// Assigns its identity, renders it, and returns the `created` event to
    /// send along with the new id.
    pub fn local_create(&mut self, geometry: Geometry) -> (FeatureId, FeatureEvent) {
        let id = FeatureId::generate();
        let feature = Feature::new(id.clone(), geometry.clone());
        let handle = self.surface.materialize(&feature);
        self.features.insert(id.clone(), LocalFeature { feature, handle });
        (id.clone(), FeatureEvent::created(id, geometry))
    }

    /// Features were deleted locally, possibly several at once (a
    /// multi-select deletion). Returns one `deleted` event per feature that
    /// was actually present.
    pub fn local_delete(
        &mut self,
        ids: impl IntoIterator<Item = FeatureId>,
    ) -> Vec<FeatureEvent> {
        let mut events = Vec::new();
        for id in ids {
            if let Some(local) = self.features.remove(&id) {
                self.surface.withdraw(local.handle);
                events.push(FeatureEvent::deleted(id));
            }
        }
        events
    }

    /// Features were edited locally, possibly several at once. Records the
    /// new geometry and returns one `edited` event per known feature; the
    /// surface already shows the edit, so it is not re-instructed.
    pub fn local_edit(
        &mut self,
        edits: impl IntoIterator<Item = (FeatureId, Geometry)>,
    ) -> Vec<FeatureEvent> {
        let mut events = Vec::new();
        for (id, geometry) in edits {
            if let Some(local) = self.features.get_mut(&id) {
                local.feature.geometry = geometry.clone();
                events.push(FeatureEvent::edited(id, geometry));
            }
        }
        events
    }

    // ── remote events: apply silently, never emit ──

    /// Apply an inbound protocol event to the local collection.
    ///
    /// Presence is checked by id before acting, so duplicate delivery and
    /// the relay echoing our own `created` back are both harmless.
    pub fn apply_remote(&mut self, event: FeatureEvent) {
        match event {
            FeatureEvent::Created { id, geometry } => {
                if self.features.contains_key(&id) {
                    // Our own echo, or a duplicate delivery.
                    return;
                }
                let feature = Feature::new(id.clone(), geometry);
                let handle = self.surface.materialize(&feature);
                self.features.insert(id, LocalFeature { feature, handle });
            }
            FeatureEvent::Deleted { id } => {
                if let Some(local) = self.features.remove(&id) {
                    self.surface.withdraw(local.handle);
                }
            }
            FeatureEvent::Edited { id, geometry } => {
                let Some(local) = self.features.get_mut(&id) else {
                    // Late edit for a feature deleted in the meantime.
                    return;
                };
                log::trace!("remote edit of {id} ({:?})", geometry.kind());
                match geometry {
                    Geometry::Point { coordinates } => {
                        self.surface.move_point(&mut local.handle, coordinates);
                        local.feature.geometry = Geometry::Point { coordinates };
                    }
                    path => {
                        self.surface.reshape(&mut local.handle, &path);
                        local.feature.geometry = path;
                    }
                }
            }
        }
    }

    // ── queries over the local collection ──

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id).map(|local| &local.feature)
    }

    /// Iterate the current records, in no particular order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values().map(|local| &local.feature)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Drop every local feature and erase it from the surface.
    ///
    /// Called on disconnect; the next bootstrap replay rebuilds the
    /// collection from scratch.
    pub fn clear(&mut self) {
        for (_, local) in self.features.drain() {
            self.surface.withdraw(local.handle);
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
