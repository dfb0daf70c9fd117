use std::ops::RangeInclusive;

use eframe::egui::{self, RichText, Ui};
use nation_graph::ConfigPatch;
use nation_graph::sim::DRAG_ALPHA_TARGET;
use tracing::warn;

use super::ForceGraphApp;

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hover)
    .changed()
}

impl ForceGraphApp {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Simulation");
        ui.separator();

        ui.label(self.status_text());
        ui.label(format!("alpha target: {:.3}", self.simulation.alpha_target()));
        ui.label(format!("active drags: {}", self.simulation.active_drags()));
        ui.add_space(4.0);

        ui.horizontal_wrapped(|ui| {
            if ui.button("Start").on_hover_text("Resume ticking.").clicked() {
                self.simulation.start();
            }
            if ui.button("Stop").on_hover_text("Pause without changing alpha.").clicked() {
                self.simulation.stop();
            }
            if ui
                .button("Restart")
                .on_hover_text("Run again from full energy.")
                .clicked()
            {
                self.simulation.restart();
            }
        });

        ui.horizontal(|ui| {
            ui.add(egui::Slider::new(&mut self.reheat_target, 0.0..=1.0).text("target"));
            if ui.button("Reheat").clicked()
                && let Err(error) = self.simulation.reheat(self.reheat_target)
            {
                warn!(%error, "Reheat rejected");
            }
            if ui.button("Cool").clicked() {
                self.simulation.cool();
            }
        });

        ui.separator();
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay");
        ui.checkbox(&mut self.show_all_labels, "Show all labels");
        if ui.button("Reset view").clicked() {
            self.pan = egui::Vec2::ZERO;
            self.zoom = 1.0;
        }

        ui.separator();
        egui::CollapsingHeader::new("Forces")
            .default_open(true)
            .show(ui, |ui| self.draw_force_tuning(ui));

        ui.separator();
        self.draw_event_log(ui);
    }

    fn draw_force_tuning(&mut self, ui: &mut Ui) {
        let mut changed = false;
        let tuning = &mut self.tuning;

        changed |= tuning_slider(
            ui,
            &mut tuning.repulsion_strength,
            -400.0..=0.0,
            "Repulsion",
            "Many-body strength; negative values push nodes apart.",
        );
        changed |= tuning_slider(
            ui,
            &mut tuning.link_distance,
            5.0..=200.0,
            "Link distance",
            "Rest length of every link without its own distance.",
        );
        changed |= tuning_slider(
            ui,
            &mut tuning.link_strength,
            0.0..=1.0,
            "Link stiffness",
            "Fraction of a link's length error corrected per tick.",
        );
        changed |= tuning_slider(
            ui,
            &mut tuning.center_strength,
            0.0..=1.0,
            "Centering",
            "Pull of every node toward the center target.",
        );
        changed |= tuning_slider(
            ui,
            &mut tuning.velocity_decay,
            0.0..=1.0,
            "Velocity decay",
            "Share of velocity kept after each tick.",
        );
        changed |= tuning_slider(
            ui,
            &mut tuning.theta,
            0.0..=1.0,
            "Theta",
            "Barnes–Hut accuracy; 0 computes every pair exactly.",
        );

        if changed {
            self.apply_tuning();
        }

        if let Some(error) = &self.config_error {
            ui.label(RichText::new(error).color(egui::Color32::from_rgb(240, 120, 100)));
        }
    }

    fn apply_tuning(&mut self) {
        let patch = ConfigPatch {
            repulsion_strength: Some(self.tuning.repulsion_strength),
            link_distance: Some(self.tuning.link_distance),
            link_strength: Some(self.tuning.link_strength),
            center_strength: Some(self.tuning.center_strength),
            velocity_decay: Some(self.tuning.velocity_decay),
            theta: Some(self.tuning.theta),
            ..Default::default()
        };

        match self.simulation.configure(&patch) {
            Ok(()) => {
                self.config_error = None;
                let alpha = self.simulation.alpha().max(DRAG_ALPHA_TARGET);
                if let Err(error) = self.simulation.set_alpha(alpha) {
                    warn!(%error, "Could not re-energize after tuning");
                }
                self.simulation.start();
            }
            Err(error) => {
                self.config_error = Some(error.to_string());
                self.tuning = *self.simulation.config();
            }
        }
    }

    fn draw_event_log(&self, ui: &mut Ui) {
        let events = self.events.borrow();
        ui.label(format!(
            "last observed tick {} at alpha {:.4}",
            events.last_tick, events.last_alpha
        ));
        match events.converged_at {
            Some(tick) => ui.label(format!("converged at tick {tick}")),
            None => ui.label("not converged"),
        };

        ui.label(format!("numeric warnings: {}", self.simulation.warning_count()));
        egui::ScrollArea::vertical()
            .max_height(160.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for warning in events.recent_warnings.iter().rev() {
                    ui.label(format!(
                        "node {}: non-finite {:?}, update discarded",
                        warning.node_id, warning.quantity
                    ));
                }
            });
    }
}
