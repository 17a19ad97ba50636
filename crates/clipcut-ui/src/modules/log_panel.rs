// crates/clipcut-ui/src/modules/log_panel.rs
use egui::{RichText, Ui};

use super::PanelModule;
use crate::commands::AppCommand;
use crate::orchestrator::Orchestrator;
use crate::theme::{DARK_TEXT_DIM, RED};

pub struct LogPanel;

impl PanelModule for LogPanel {
    fn name(&self) -> &str { "Log" }

    fn ui(&mut self, ui: &mut Ui, orch: &Orchestrator, _cmd: &mut Vec<AppCommand>) {
        ui.label(RichText::new("📜 Log").size(12.0).strong());
        ui.separator();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in orch.log_lines() {
                    let color = if line.starts_with('❌') { RED } else { DARK_TEXT_DIM };
                    ui.label(RichText::new(line).size(10.5).monospace().color(color));
                }
            });
    }
}
