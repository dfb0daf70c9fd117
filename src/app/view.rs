use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Shape, Stroke, Ui, vec2};

use crate::util::{node_color, truncate_label};

use super::ForceGraphApp;
use super::render_utils::{
    circle_visible, draw_background, node_radius, segment_visible, world_to_screen,
};

const LABEL_MAX_CHARS: usize = 24;

impl ForceGraphApp {
    fn draw_quadtree_overlay(&self, painter: &egui::Painter, rect: egui::Rect) {
        for cell in self.simulation.quadtree_cells() {
            let extent = vec2(cell.half_extent, cell.half_extent);
            let min = cell.center - extent;
            let max = cell.center + extent;
            let corners = [
                vec2(min.x, min.y),
                vec2(max.x, min.y),
                vec2(max.x, max.y),
                vec2(min.x, max.y),
            ]
            .map(|corner| world_to_screen(rect, self.pan, self.zoom, corner));

            let alpha = if cell.is_leaf { 110 } else { 50 };
            let width = (1.4 - cell.depth as f32 * 0.09).clamp(0.45, 1.4);
            painter.add(Shape::closed_line(
                corners.to_vec(),
                Stroke::new(width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
            ));
        }
    }

    pub(super) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);
        self.handle_graph_zoom(ui, rect, &response);

        let graph = self.simulation.graph();
        let screen_positions = graph
            .nodes()
            .iter()
            .map(|node| world_to_screen(rect, self.pan, self.zoom, node.position()))
            .collect::<Vec<Pos2>>();
        let screen_radii = (0..graph.node_count())
            .map(|index| node_radius(graph.degree(index), self.zoom))
            .collect::<Vec<f32>>();
        let visible_indices = (0..screen_positions.len())
            .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index]))
            .collect::<Vec<_>>();

        let hovered =
            Self::hovered_index(ui, &visible_indices, &screen_positions, &screen_radii);
        self.handle_node_drag(ui, rect, &response, hovered);
        self.handle_graph_pan(&response);

        if hovered.is_some() || self.dragging.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grab);
        }

        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter, rect);
        }

        // Positions may have moved under the drag above; redraw from the graph.
        let graph = self.simulation.graph();
        let screen_positions = graph
            .nodes()
            .iter()
            .map(|node| world_to_screen(rect, self.pan, self.zoom, node.position()))
            .collect::<Vec<Pos2>>();

        let line_width = (1.2 * self.zoom.sqrt()).clamp(0.6, 3.0);
        let link_stroke = Stroke::new(line_width, Color32::from_rgba_unmultiplied(150, 150, 150, 150));
        for link in graph.links() {
            let start = screen_positions[link.source];
            let end = screen_positions[link.target];
            if segment_visible(rect, start, end, line_width) {
                painter.line_segment([start, end], link_stroke);
            }
        }

        for &index in &visible_indices {
            let node = &graph.nodes()[index];
            let position = screen_positions[index];
            let radius = screen_radii[index];
            let is_hovered = hovered == Some(index);
            let is_pinned = node.fixed().is_some();

            let fill = if is_hovered {
                Color32::from_rgb(255, 164, 101)
            } else {
                node_color(node.id())
            };
            painter.circle_filled(position, radius, fill);
            let outline = if is_pinned {
                Stroke::new(2.0, Color32::from_rgb(245, 206, 93))
            } else {
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
            };
            painter.circle_stroke(position, radius, outline);

            if self.show_all_labels || is_hovered || self.zoom > 1.6 {
                let label = node.label().unwrap_or(node.id());
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    truncate_label(label, LABEL_MAX_CHARS),
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if let Some(index) = hovered {
            let node = &graph.nodes()[index];
            let position = node.position();
            let tooltip = format!(
                "{}  |  id {}  |  degree {}  |  ({:.1}, {:.1})",
                node.label().unwrap_or("unnamed"),
                node.id(),
                graph.degree(index),
                position.x,
                position.y
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                tooltip,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }
}
