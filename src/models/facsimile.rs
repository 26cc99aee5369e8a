//! Facsimile zones and the surface that owns them
//!
//! A `Zone` anchors an element to an axis-aligned rectangle of the source
//! image. Zones are owned by the page-level `Surface` and referenced from
//! elements by key; the element side of the relation is non-owning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key of a zone within its surface.
pub type ZoneId = String;

/// An axis-aligned rectangle in source-image coordinates.
///
/// `ulx`/`uly` is the upper-left corner, `lrx`/`lry` the lower-right; the
/// image y axis grows downward.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Zone {
    pub ulx: i32,
    pub uly: i32,
    pub lrx: i32,
    pub lry: i32,
}

impl Zone {
    pub fn new(ulx: i32, uly: i32, lrx: i32, lry: i32) -> Self {
        Self { ulx, uly, lrx, lry }
    }

    /// Shift the rectangle by a display-space delta: positive `dy` moves the
    /// zone up on the page, which decreases the image-space y values.
    pub fn shift_by_xy(&mut self, dx: i32, dy: i32) {
        self.ulx += dx;
        self.lrx += dx;
        self.uly -= dy;
        self.lry -= dy;
    }

    /// Replace all four bounds at once.
    pub fn set_bounds(&mut self, ulx: i32, uly: i32, lrx: i32, lry: i32) {
        self.ulx = ulx;
        self.uly = uly;
        self.lrx = lrx;
        self.lry = lry;
    }

    pub fn width(&self) -> i32 {
        self.lrx - self.ulx
    }

    pub fn height(&self) -> i32 {
        self.lry - self.uly
    }

    /// Center point, used for nearest-staff resolution.
    pub fn center(&self) -> (i32, i32) {
        ((self.ulx + self.lrx) / 2, (self.uly + self.lry) / 2)
    }
}

/// Owner of all zones on a page.
///
/// Elements reference zones by `ZoneId`. Removing an element's facsimile
/// association is a two-step affair: the element-side key is cleared
/// ("detach"), and the zone itself is deleted here when nothing should keep
/// it alive. The two are distinct because some call sites hand the orphaned
/// zone to another element instead of deleting it.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Surface {
    zones: HashMap<ZoneId, Zone>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone and return its freshly generated key.
    pub fn add(&mut self, zone: Zone) -> ZoneId {
        let id = format!("zone-{}", Uuid::new_v4());
        self.zones.insert(id.clone(), zone);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Zone> {
        self.zones.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.zones.contains_key(id)
    }

    /// Delete a zone outright. Referencing keys must be cleared by the caller.
    pub fn delete(&mut self, id: &str) -> bool {
        self.zones.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
