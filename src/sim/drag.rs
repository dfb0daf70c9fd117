use std::collections::HashSet;

use eframe::egui::vec2;
use tracing::debug;

use super::Simulation;
use crate::error::DragError;

/// Alpha target held while at least one node is being dragged.
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

/// Nodes with a gesture in progress. Alpha target is shared by every drag,
/// so the simulation only cools once the last one ends.
#[derive(Clone, Debug, Default)]
pub(crate) struct DragTracker {
    active: HashSet<usize>,
}

impl DragTracker {
    pub(crate) fn begin(&mut self, index: usize) -> bool {
        self.active.insert(index)
    }

    pub(crate) fn end(&mut self, index: usize) -> bool {
        self.active.remove(&index)
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.active.contains(&index)
    }
}

fn check_pointer(x: f32, y: f32) -> Result<(), DragError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(DragError::NonFinitePointer { x, y })
    }
}

impl Simulation {
    fn node_index(&self, id: &str) -> Result<usize, DragError> {
        self.graph
            .index_of(id)
            .ok_or_else(|| DragError::UnknownNode(id.to_owned()))
    }

    /// Pins the node where it currently is. The first active drag raises the
    /// alpha target and resumes a stopped or converged simulation.
    pub fn drag_start(&mut self, id: &str, x: f32, y: f32) -> Result<(), DragError> {
        check_pointer(x, y)?;
        let index = self.node_index(id)?;

        if self.drag.is_idle() {
            self.heat(DRAG_ALPHA_TARGET);
        }
        self.drag.begin(index);

        let node = &mut self.graph.nodes_mut()[index];
        node.fixed = Some(node.position);
        debug!(node = id, pointer_x = x, pointer_y = y, active = self.drag.len(), "Drag started");
        Ok(())
    }

    /// Moves the node's pin, and the node with it, to the pointer.
    pub fn drag(&mut self, id: &str, x: f32, y: f32) -> Result<(), DragError> {
        check_pointer(x, y)?;
        let index = self.node_index(id)?;
        self.pin(index, x, y);
        Ok(())
    }

    /// Releases the node; the last active drag to end cools the simulation.
    pub fn drag_end(&mut self, id: &str, x: f32, y: f32) -> Result<(), DragError> {
        let index = self.node_index(id)?;
        self.graph.nodes_mut()[index].fixed = None;

        if self.drag.end(index) && self.drag.is_idle() {
            self.cool();
        }
        debug!(node = id, pointer_x = x, pointer_y = y, active = self.drag.len(), "Drag ended");
        Ok(())
    }

    pub fn is_dragging(&self, id: &str) -> bool {
        self.graph
            .index_of(id)
            .is_some_and(|index| self.drag.contains(index))
    }

    pub fn active_drags(&self) -> usize {
        self.drag.len()
    }

    /// Pins a node at `(x, y)` until [`Simulation::release_node`].
    pub fn fix_node(&mut self, id: &str, x: f32, y: f32) -> Result<(), DragError> {
        check_pointer(x, y)?;
        let index = self.node_index(id)?;
        self.pin(index, x, y);
        Ok(())
    }

    pub fn release_node(&mut self, id: &str) -> Result<(), DragError> {
        let index = self.node_index(id)?;
        self.graph.nodes_mut()[index].fixed = None;
        Ok(())
    }

    fn pin(&mut self, index: usize, x: f32, y: f32) {
        let node = &mut self.graph.nodes_mut()[index];
        node.fixed = Some(vec2(x, y));
        node.position = vec2(x, y);
    }
}
