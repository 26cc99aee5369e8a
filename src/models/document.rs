//! The document/identity substrate
//!
//! An arena of elements keyed by id, rooted at a single page, together with
//! the page surface that owns all facsimile zones. Provides the navigation
//! primitives the editing engine is built on: lookup by id, parent/child
//! walks, pre-order traversal, previous/next-of-class search, capability
//! scans between two boundaries, subtree move/clone/delete, and restoration
//! of the horizontal-order invariant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::element::{Element, ElementId, ElementKind, StaffMetrics};
use super::facsimile::{Surface, ZoneId};

/// The single mutable document a page editor operates on.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Document {
    elements: HashMap<ElementId, Element>,
    page: ElementId,
    pub surface: Surface,
}

impl Document {
    /// Create an empty document holding just the page root and its surface.
    pub fn new() -> Self {
        let page_id = format!("page-{}", Uuid::new_v4());
        let mut elements = HashMap::new();
        elements.insert(page_id.clone(), Element::new(page_id.clone(), ElementKind::Page));
        Self {
            elements,
            page: page_id,
            surface: Surface::new(),
        }
    }

    pub fn page(&self) -> &ElementId {
        &self.page
    }

    // ------------------------------------------------------------------
    // Lookup and navigation
    // ------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<ElementKind> {
        self.elements.get(id).map(|el| el.kind)
    }

    pub fn parent_of(&self, id: &str) -> Option<ElementId> {
        self.elements.get(id).and_then(|el| el.parent.clone())
    }

    pub fn children_of(&self, id: &str) -> Vec<ElementId> {
        self.elements
            .get(id)
            .map(|el| el.children.clone())
            .unwrap_or_default()
    }

    /// Nearest ancestor of the given class, excluding the element itself.
    pub fn first_ancestor_of_kind(&self, id: &str, kind: ElementKind) -> Option<ElementId> {
        let mut current = self.parent_of(id);
        while let Some(candidate) = current {
            if self.kind_of(&candidate) == Some(kind) {
                return Some(candidate);
            }
            current = self.parent_of(&candidate);
        }
        None
    }

    /// The layer an element sits in (itself, if it is one).
    pub fn layer_of(&self, id: &str) -> Option<ElementId> {
        if self.kind_of(id) == Some(ElementKind::Layer) {
            return Some(id.to_string());
        }
        self.first_ancestor_of_kind(id, ElementKind::Layer)
    }

    /// The staff an element sits in (itself, if it is one).
    pub fn staff_of(&self, id: &str) -> Option<ElementId> {
        if self.kind_of(id) == Some(ElementKind::Staff) {
            return Some(id.to_string());
        }
        self.first_ancestor_of_kind(id, ElementKind::Staff)
    }

    pub fn staff_metrics(&self, staff_id: &str) -> Option<StaffMetrics> {
        self.elements.get(staff_id).and_then(|el| el.staff)
    }

    /// First direct child of the given class.
    pub fn find_child_of_kind(&self, id: &str, kind: ElementKind) -> Option<ElementId> {
        self.elements.get(id)?.children.iter().find_map(|child| {
            if self.kind_of(child) == Some(kind) {
                Some(child.clone())
            } else {
                None
            }
        })
    }

    /// First descendant of the given class in pre-order, excluding the root.
    pub fn find_descendant_of_kind(&self, id: &str, kind: ElementKind) -> Option<ElementId> {
        for child in self.children_of(id) {
            if self.kind_of(&child) == Some(kind) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant_of_kind(&child, kind) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants of the given class in pre-order, excluding the root.
    pub fn descendants_of_kind(&self, id: &str, kind: ElementKind) -> Vec<ElementId> {
        let mut result = Vec::new();
        self.collect_descendants_of_kind(id, kind, &mut result);
        result
    }

    fn collect_descendants_of_kind(&self, id: &str, kind: ElementKind, out: &mut Vec<ElementId>) {
        for child in self.children_of(id) {
            if self.kind_of(&child) == Some(kind) {
                out.push(child.clone());
            }
            self.collect_descendants_of_kind(&child, kind, out);
        }
    }

    pub fn count_children_of_kind(&self, id: &str, kind: ElementKind) -> usize {
        self.children_of(id)
            .iter()
            .filter(|child| self.kind_of(child) == Some(kind))
            .count()
    }

    // ------------------------------------------------------------------
    // Document-order traversal
    // ------------------------------------------------------------------

    /// Pre-order traversal of the whole page, page root excluded.
    pub fn preorder(&self) -> Vec<ElementId> {
        let mut result = Vec::new();
        self.collect_preorder(&self.page.clone(), &mut result);
        result
    }

    fn collect_preorder(&self, id: &str, out: &mut Vec<ElementId>) {
        for child in self.children_of(id) {
            out.push(child.clone());
            self.collect_preorder(&child, out);
        }
    }

    /// Pre-order traversal with one layer's children replaced by their
    /// x-sorted order, without mutating the document. Used to answer "which
    /// clef would govern this element once the order invariant is restored".
    pub fn preorder_with_layer_sorted(&self, layer: &str) -> Vec<ElementId> {
        let mut result = Vec::new();
        self.collect_preorder_sorted(&self.page.clone(), layer, &mut result);
        result
    }

    fn collect_preorder_sorted(&self, id: &str, layer: &str, out: &mut Vec<ElementId>) {
        let children = if id == layer {
            self.sorted_by_anchor_x(&self.children_of(id))
        } else {
            self.children_of(id)
        };
        for child in children {
            out.push(child.clone());
            self.collect_preorder_sorted(&child, layer, out);
        }
    }

    /// Nearest preceding element of the given class in document order.
    pub fn find_prev_of_kind(&self, reference: &str, kind: ElementKind) -> Option<ElementId> {
        let order = self.preorder();
        let position = order.iter().position(|id| id == reference)?;
        order[..position]
            .iter()
            .rev()
            .find(|id| self.kind_of(id) == Some(kind))
            .cloned()
    }

    /// Nearest following element of the given class in document order.
    pub fn find_next_of_kind(&self, reference: &str, kind: ElementKind) -> Option<ElementId> {
        let order = self.preorder();
        let position = order.iter().position(|id| id == reference)?;
        order[position + 1..]
            .iter()
            .find(|id| self.kind_of(id) == Some(kind))
            .cloned()
    }

    /// All pitch-bearing elements strictly between two boundaries in document
    /// order. `start == None` scans from the beginning of the page; `end ==
    /// None` scans through the end.
    pub fn pitched_between(&self, start: Option<&str>, end: Option<&str>) -> Vec<ElementId> {
        let order = self.preorder();
        let from = match start {
            Some(start_id) => match order.iter().position(|id| id == start_id) {
                Some(position) => position + 1,
                None => return Vec::new(),
            },
            None => 0,
        };
        let to = match end {
            Some(end_id) => order.iter().position(|id| id == end_id).unwrap_or(order.len()),
            None => order.len(),
        };
        if from >= to {
            return Vec::new();
        }
        order[from..to]
            .iter()
            .filter(|id| self.get(id).map(Element::has_pitch).unwrap_or(false))
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Create a new element of the given kind, attached at the end of the
    /// parent's children when a parent is given.
    pub fn create(&mut self, kind: ElementKind, parent: Option<&str>) -> ElementId {
        let id = format!("{}-{}", kind.prefix(), Uuid::new_v4());
        self.elements.insert(id.clone(), Element::new(id.clone(), kind));
        if let Some(parent_id) = parent {
            self.attach_child(parent_id, &id);
        }
        id
    }

    /// Append a parentless element to a parent's children.
    pub fn attach_child(&mut self, parent: &str, child: &str) {
        self.detach_from_parent(child);
        if let Some(parent_el) = self.elements.get_mut(parent) {
            parent_el.children.push(child.to_string());
        }
        if let Some(child_el) = self.elements.get_mut(child) {
            child_el.parent = Some(parent.to_string());
        }
    }

    /// Insert an element into a parent's children at a specific index.
    pub fn insert_child_at(&mut self, parent: &str, child: &str, index: usize) {
        self.detach_from_parent(child);
        if let Some(parent_el) = self.elements.get_mut(parent) {
            let index = index.min(parent_el.children.len());
            parent_el.children.insert(index, child.to_string());
        }
        if let Some(child_el) = self.elements.get_mut(child) {
            child_el.parent = Some(parent.to_string());
        }
    }

    /// Move a subtree under a new parent, appended at the end.
    pub fn move_to(&mut self, id: &str, new_parent: &str) {
        self.attach_child(new_parent, id);
    }

    fn detach_from_parent(&mut self, id: &str) {
        if let Some(old_parent) = self.parent_of(id) {
            if let Some(parent_el) = self.elements.get_mut(&old_parent) {
                parent_el.children.retain(|child| child != id);
            }
        }
        if let Some(el) = self.elements.get_mut(id) {
            el.parent = None;
        }
    }

    /// Structure-only clone: same class and scalar attributes, fresh id, no
    /// children, no parent, and no facsimile association (zone back-references
    /// must stay unique).
    pub fn clone_structure_only(&mut self, id: &str) -> Option<ElementId> {
        let source = self.elements.get(id)?.clone();
        let new_id = format!("{}-{}", source.kind.prefix(), Uuid::new_v4());
        let mut clone = Element::new(new_id.clone(), source.kind);
        clone.pitch = source.pitch;
        clone.clef = source.clef;
        clone.staff = source.staff;
        clone.text = source.text;
        clone.tilt = source.tilt;
        self.elements.insert(new_id.clone(), clone);
        Some(new_id)
    }

    /// Delete a subtree from the arena, detaching it from its parent first.
    /// Facsimile zones referenced from the subtree are not touched; callers
    /// decide between detach and delete before calling this.
    pub fn delete_subtree(&mut self, id: &str) {
        self.detach_from_parent(id);
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: &str) {
        for child in self.children_of(id) {
            self.drop_subtree(&child);
        }
        self.elements.remove(id);
    }

    /// Zone keys referenced anywhere in a subtree, root included, deduplicated
    /// (note components in a ligature share one zone).
    pub fn zones_in_subtree(&self, id: &str) -> Vec<ZoneId> {
        let mut result = Vec::new();
        self.collect_zones(id, &mut result);
        result
    }

    fn collect_zones(&self, id: &str, out: &mut Vec<ZoneId>) {
        if let Some(el) = self.elements.get(id) {
            if let Some(zone) = &el.zone {
                if !out.contains(zone) {
                    out.push(zone.clone());
                }
            }
            for child in el.children.clone() {
                self.collect_zones(&child, out);
            }
        }
    }

    /// Clear an element's facsimile association, leaving the zone itself on
    /// the surface. Returns the detached key so the caller can hand it to
    /// another element or delete it once nothing references it.
    pub fn detach_zone(&mut self, id: &str) -> Option<ZoneId> {
        self.elements.get_mut(id).and_then(|el| el.zone.take())
    }

    /// How many elements currently reference a zone. Shared ligature zones
    /// have two referents; a count of zero means the zone is orphaned.
    pub fn zone_reference_count(&self, zone: &str) -> usize {
        self.elements
            .values()
            .filter(|el| el.zone.as_deref() == Some(zone))
            .count()
    }

    // ------------------------------------------------------------------
    // Horizontal ordering
    // ------------------------------------------------------------------

    /// Horizontal anchor of an element: its own zone's left edge, or the
    /// leftmost zone among its descendants.
    pub fn anchor_x(&self, id: &str) -> Option<i32> {
        let el = self.elements.get(id)?;
        if let Some(zone_id) = &el.zone {
            if let Some(zone) = self.surface.get(zone_id) {
                return Some(zone.ulx);
            }
        }
        el.children
            .iter()
            .filter_map(|child| self.anchor_x(child))
            .min()
    }

    fn sorted_by_anchor_x(&self, children: &[ElementId]) -> Vec<ElementId> {
        let mut keyed: Vec<(i32, ElementId)> = Vec::with_capacity(children.len());
        let mut last = i32::MIN;
        for id in children {
            // Elements without any zone keep their position relative to the
            // previous anchored element.
            let x = self.anchor_x(id).unwrap_or(last);
            last = x;
            keyed.push((x, id.clone()));
        }
        keyed.sort_by_key(|(x, _)| *x);
        keyed.into_iter().map(|(_, id)| id).collect()
    }

    /// Restore the sequence-order invariant for one parent: children sorted
    /// by horizontal anchor. This order is the musical order persisted on
    /// save.
    pub fn reorder_children_by_x(&mut self, parent: &str) {
        let sorted = self.sorted_by_anchor_x(&self.children_of(parent));
        if let Some(parent_el) = self.elements.get_mut(parent) {
            parent_el.children = sorted;
        }
    }

    /// Staff ordering: top-to-bottom, left-to-right. Two staves overlapping
    /// vertically are ordered by their left edge.
    pub fn staff_precedes(&self, a: &str, b: &str) -> bool {
        let zone_a = self
            .get(a)
            .and_then(|el| el.zone.as_ref())
            .and_then(|z| self.surface.get(z));
        let zone_b = self
            .get(b)
            .and_then(|el| el.zone.as_ref())
            .and_then(|z| self.surface.get(z));
        match (zone_a, zone_b) {
            (Some(za), Some(zb)) => {
                let vertically_disjoint = za.lry < zb.uly || zb.lry < za.uly;
                if vertically_disjoint {
                    za.uly < zb.uly
                } else {
                    za.ulx < zb.ulx
                }
            }
            _ => false,
        }
    }

    /// Restore the staff order of the page after a staff moved.
    pub fn reorder_staves(&mut self) {
        let mut staves = self.children_of(&self.page.clone());
        staves.sort_by(|a, b| {
            if self.staff_precedes(a, b) {
                std::cmp::Ordering::Less
            } else if self.staff_precedes(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        let page = self.page.clone();
        if let Some(page_el) = self.elements.get_mut(&page) {
            page_el.children = staves;
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
