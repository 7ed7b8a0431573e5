mod automation;
mod error;
mod guard;
mod settings;
mod vision;

use anyhow::Context;
use automation::{EnigoEmitter, TriggerKey};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::egui;
use guard::{DecisionEngine, GuardEvent, Phase, RunEnd, Severity, VisionProbe};
use settings::GuardSettings;
use std::path::PathBuf;
use std::sync::Arc;
use vision::capture::ScreenCapturer;
use vision::template::{GaugeKind, TemplateSet, asset_search_dirs};

type Engine = DecisionEngine<VisionProbe<ScreenCapturer>, EnigoEmitter, Sender<GuardEvent>>;

/// Activity lines kept in the window.
const MAX_LOG_LINES: usize = 200;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings_path = GuardSettings::default_path();
    let settings = GuardSettings::load(&settings_path);

    let dirs = asset_search_dirs(settings.assets_dir.as_deref());
    let templates = match TemplateSet::load(&dirs) {
        Ok(templates) => Arc::new(templates),
        Err(e) => {
            log::error!("{}", e);
            return Err(e).context("cannot start monitoring without both orb templates");
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([320.0, 300.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Orb Guard",
        native_options,
        Box::new(move |_cc| Ok(Box::new(GuardApp::new(settings, settings_path, templates)))),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated: {e}"))
}

struct GuardApp {
    engine: Engine,
    events: Receiver<GuardEvent>,
    settings: GuardSettings,
    settings_path: PathBuf,
    /// Raw threshold entry, parsed on start.
    threshold_text: String,
    status: String,
    severity: Severity,
    logs: Vec<String>,
}

impl GuardApp {
    fn new(settings: GuardSettings, settings_path: PathBuf, templates: Arc<TemplateSet>) -> Self {
        let (tx, rx) = unbounded();
        let probe = VisionProbe::new(ScreenCapturer::new(), templates);
        let engine = DecisionEngine::new(probe, EnigoEmitter::new(), tx, settings.config());

        Self {
            engine,
            events: rx,
            threshold_text: settings.threshold_percent.to_string(),
            settings,
            settings_path,
            status: guard::session::STATUS_STOPPED.to_string(),
            severity: Severity::Neutral,
            logs: Vec::new(),
        }
    }

    fn log(&mut self, line: String) {
        self.logs
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), line));
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            log::warn!("Could not save settings to {:?}: {}", self.settings_path, e);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                GuardEvent::Status { message, severity } => {
                    if message != self.status {
                        self.log(message.clone());
                    }
                    self.status = message;
                    self.severity = severity;
                }
                GuardEvent::RunEnded(RunEnd::Halted) => {
                    self.log(format!("Trigger sent ({})", self.settings.trigger_key));
                }
                GuardEvent::RunEnded(RunEnd::Faulted(reason)) => {
                    self.log(format!("Run aborted: {}", reason));
                }
            }
        }
    }

    fn toggle(&mut self) {
        if self.engine.is_running() {
            if let Err(e) = self.engine.stop() {
                self.show_error(e.to_string());
            }
            return;
        }

        let parsed = settings::parse_threshold(&self.threshold_text);
        if parsed.corrected {
            self.log(format!(
                "Threshold '{}' replaced by {}",
                self.threshold_text.trim(),
                parsed.percent
            ));
            self.threshold_text = parsed.percent.to_string();
        }
        self.settings.threshold_percent = parsed.percent;
        self.save_settings();

        match self.engine.start(self.settings.config()) {
            Ok(_) => self.log(format!(
                "Monitoring {} below {}% -> {}",
                self.settings.gauge, parsed.percent, self.settings.trigger_key
            )),
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn show_error(&mut self, message: String) {
        log::error!("{}", message);
        self.log(message.clone());
        self.status = message;
        self.severity = Severity::Danger;
    }
}

fn severity_color(severity: Severity, ui: &egui::Ui) -> egui::Color32 {
    match severity {
        Severity::Info => egui::Color32::from_rgb(90, 150, 255),
        Severity::Safe => egui::Color32::from_rgb(60, 200, 90),
        Severity::Danger => egui::Color32::RED,
        Severity::Neutral => ui.visuals().text_color(),
    }
}

impl eframe::App for GuardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        if self.engine.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let mut gauge = self.settings.gauge;
            for kind in GaugeKind::ALL {
                let label = match kind {
                    GaugeKind::Mana => "Monitor Mana",
                    GaugeKind::Life => "Monitor Life",
                };
                ui.radio_value(&mut gauge, kind, label);
            }
            if gauge != self.settings.gauge {
                self.settings.gauge = gauge;
                self.engine.set_gauge(gauge);
                self.save_settings();
            }

            ui.add_space(4.0);
            ui.label("Minimum threshold (%) for trigger:");
            ui.add(egui::TextEdit::singleline(&mut self.threshold_text).desired_width(60.0));

            ui.add_space(4.0);
            let mut key = self.settings.trigger_key;
            ui.horizontal(|ui| {
                ui.label("Select Trigger Key:");
                for option in TriggerKey::ALL {
                    ui.radio_value(&mut key, option, option.to_string());
                }
            });
            if key != self.settings.trigger_key {
                // Applies from the next start.
                self.settings.trigger_key = key;
                self.save_settings();
            }

            ui.add_space(8.0);
            let text = if self.engine.phase() == Phase::Sampling { "Stop" } else { "Start" };
            if ui.add(egui::Button::new(text).min_size(egui::vec2(80.0, 0.0))).clicked() {
                self.toggle();
            }

            ui.add_space(8.0);
            let color = severity_color(self.severity, ui);
            ui.label(egui::RichText::new(&self.status).color(color).size(16.0));
            if self.engine.is_latched() {
                ui.small("Trigger sent. Press Start to re-arm.");
            }

            ui.separator();
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &self.logs {
                        ui.small(line);
                    }
                });
        });
    }
}
