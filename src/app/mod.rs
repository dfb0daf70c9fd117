use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use nation_graph::sim::config::SimulationConfig;
use nation_graph::{NumericWarning, Simulation, SimulationState};

mod controls;
mod interaction;
mod render_utils;
mod view;

const RECENT_WARNING_LIMIT: usize = 32;

pub struct ForceGraphApp {
    title: String,
    simulation: Simulation,
    events: Rc<RefCell<SimulationEvents>>,
    tuning: SimulationConfig,
    reheat_target: f32,
    config_error: Option<String>,
    pan: Vec2,
    zoom: f32,
    show_quadtree_overlay: bool,
    show_all_labels: bool,
    dragging: Option<String>,
}

/// What the tick and end observers have reported since the app started.
#[derive(Default)]
struct SimulationEvents {
    last_tick: u64,
    last_alpha: f32,
    recent_warnings: VecDeque<NumericWarning>,
    converged_at: Option<u64>,
}

impl SimulationEvents {
    fn record_tick(&mut self, tick: u64, alpha: f32, warnings: &[NumericWarning]) {
        self.last_tick = tick;
        self.last_alpha = alpha;
        self.recent_warnings.extend(warnings.iter().cloned());
        while self.recent_warnings.len() > RECENT_WARNING_LIMIT {
            self.recent_warnings.pop_front();
        }
    }
}

impl ForceGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, title: String, mut simulation: Simulation) -> Self {
        let events = Rc::new(RefCell::new(SimulationEvents::default()));

        let on_tick = Rc::clone(&events);
        simulation.on_tick(move |snapshot| {
            let mut events = on_tick.borrow_mut();
            events.record_tick(snapshot.tick, snapshot.alpha, &snapshot.warnings);
            if snapshot.state == SimulationState::Running {
                events.converged_at = None;
            }
        });
        let on_end = Rc::clone(&events);
        simulation.on_end(move |snapshot| {
            on_end.borrow_mut().converged_at = Some(snapshot.tick);
        });

        let tuning = *simulation.config();
        simulation.start();

        Self {
            title,
            simulation,
            events,
            tuning,
            reheat_target: 0.3,
            config_error: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_quadtree_overlay: false,
            show_all_labels: false,
            dragging: None,
        }
    }

    fn status_text(&self) -> String {
        let state = match self.simulation.state() {
            SimulationState::Idle => "idle",
            SimulationState::Running => "running",
            SimulationState::Converged => "converged",
        };
        format!(
            "{state}  |  alpha {:.4}  |  tick {}",
            self.simulation.alpha(),
            self.simulation.tick_count()
        )
    }
}

impl eframe::App for ForceGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let state = self.simulation.tick();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(self.title.as_str());
                    ui.separator();
                    ui.label(format!("nodes: {}", self.simulation.graph().node_count()));
                    ui.label(format!("links: {}", self.simulation.graph().link_count()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.status_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui));

        if state == SimulationState::Running || self.dragging.is_some() {
            ctx.request_repaint();
        }
    }
}
