use eframe::egui::{self, Pos2, Rect, Ui};
use tracing::warn;

use super::ForceGraphApp;
use super::render_utils::screen_to_world;

impl ForceGraphApp {
    pub(super) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 8.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    /// Secondary or middle drags always pan; a primary drag pans only when it
    /// did not grab a node.
    pub(super) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let background_drag =
            self.dragging.is_none() && response.dragged_by(egui::PointerButton::Primary);
        if background_drag
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Feeds primary-button drags on a node into the simulation's drag
    /// controller, in world coordinates.
    pub(super) fn handle_node_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        hovered: Option<usize>,
    ) {
        let pointer = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|input| input.pointer.latest_pos()));
        let world = pointer.map(|pointer| screen_to_world(rect, self.pan, self.zoom, pointer));

        if self.dragging.is_none()
            && response.drag_started_by(egui::PointerButton::Primary)
            && let (Some(index), Some(world)) = (hovered, world)
        {
            let id = self.simulation.nodes()[index].id().to_owned();
            match self.simulation.drag_start(&id, world.x, world.y) {
                Ok(()) => self.dragging = Some(id),
                Err(error) => warn!(%error, "Drag start rejected"),
            }
            return;
        }

        let Some(id) = self.dragging.clone() else {
            return;
        };

        if response.drag_stopped() || !response.dragged() {
            let release = world
                .or_else(|| self.simulation.node(&id).map(|node| node.position()))
                .unwrap_or_default();
            if let Err(error) = self.simulation.drag_end(&id, release.x, release.y) {
                warn!(%error, "Drag end rejected");
            }
            self.dragging = None;
        } else if let Some(world) = world
            && let Err(error) = self.simulation.drag(&id, world.x, world.y)
        {
            warn!(%error, "Drag update rejected");
        }
    }

    pub(super) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}
