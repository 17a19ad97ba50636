// crates/clipcut-ui/src/modules/export_module.rs
//
// ExportModule: output format, the Extract button, job progress and the
// download button.
//
// States, all read from the Orchestrator:
//
//   Idle        → Extract enabled once a file with a known duration is loaded
//   Converting  → Extract disabled, bar fills in the neutral tone
//   Done        → bar full and green, Download shown
//   Failed      → bar red; the alert modal carries the reason

use egui::{Color32, Margin, RichText, Stroke, Ui};

use clipcut_core::helpers::time::format_file_size;
use clipcut_core::AudioFormat;

use super::PanelModule;
use crate::commands::AppCommand;
use crate::orchestrator::{Orchestrator, ProgressTone};
use crate::theme::{tone_color, ACCENT, DARK_BG_2, DARK_BG_3, DARK_TEXT_DIM, GREEN, TRACK_BG};

pub struct ExportModule;

impl PanelModule for ExportModule {
    fn name(&self) -> &str { "Export" }

    fn ui(&mut self, ui: &mut Ui, orch: &Orchestrator, cmd: &mut Vec<AppCommand>) {
        let busy = orch.is_converting();

        egui::Frame::new()
            .fill(DARK_BG_2)
            .inner_margin(Margin { left: 8, right: 8, top: 6, bottom: 6 })
            .show(ui, |ui| {
                ui.label(RichText::new("🎵 Audio output").size(12.0).strong());
            });
        ui.add_space(8.0);

        // ── Format ──────────────────────────────────────────────────────────
        ui.add_enabled_ui(!busy, |ui| {
            let mut selected = orch.format();
            egui::ComboBox::from_id_salt("output_format")
                .selected_text(selected.label())
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for f in AudioFormat::ALL {
                        ui.selectable_value(&mut selected, f, f.label());
                    }
                });
            if selected != orch.format() {
                cmd.push(AppCommand::SetFormat(selected));
            }
        });
        ui.label(
            RichText::new(format!("{} @ {}, 44.1 kHz", orch.format().codec(), orch.format().default_bitrate()))
                .size(10.0)
                .monospace()
                .color(DARK_TEXT_DIM),
        );

        ui.add_space(12.0);

        // ── Extract ─────────────────────────────────────────────────────────
        let enabled = orch.can_convert();
        let label   = if busy { "Extracting…" } else { "⚡ Extract audio" };
        let button  = egui::Button::new(
            RichText::new(label)
                .size(13.0)
                .strong()
                .color(if enabled { Color32::BLACK } else { Color32::DARK_GRAY }),
        )
        .fill(if enabled { ACCENT } else { DARK_BG_3 })
        .stroke(Stroke::NONE)
        .min_size(egui::vec2(ui.available_width(), 34.0));

        let response = ui.add_enabled(enabled, button);
        if response.clicked() {
            cmd.push(AppCommand::StartConversion);
        }
        if orch.media().is_none() {
            response.on_disabled_hover_text("Choose a video first");
        }

        ui.add_space(10.0);

        // ── Progress ────────────────────────────────────────────────────────
        let fraction = orch.progress().clamp(0.0, 1.0) as f32;
        let (bar, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), 8.0), egui::Sense::hover());
        let p = ui.painter();
        p.rect_filled(bar, 4.0, TRACK_BG);
        if fraction > 0.0 {
            let mut fill = bar;
            fill.max.x = bar.min.x + bar.width() * fraction;
            p.rect_filled(fill, 4.0, tone_color(orch.tone()));
        }
        if busy || fraction > 0.0 {
            ui.label(
                RichText::new(format!("{}%", (fraction * 100.0) as u32))
                    .size(10.0)
                    .color(tone_color(orch.tone())),
            );
        }

        // ── Result ──────────────────────────────────────────────────────────
        if let (Some(result), ProgressTone::Succeeded) = (orch.result(), orch.tone()) {
            ui.add_space(10.0);
            egui::Frame::new()
                .fill(Color32::from_rgb(30, 60, 40))
                .stroke(Stroke::new(1.0, GREEN))
                .corner_radius(egui::CornerRadius::same(4))
                .inner_margin(Margin::same(8))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    let name = orch.download_name().unwrap_or_default();
                    ui.label(RichText::new(format!("✔ {name}")).size(11.0).color(GREEN));
                    ui.label(
                        RichText::new(format!("{} · {}", result.format.mime_type(), format_file_size(result.bytes.len() as u64)))
                            .size(10.0)
                            .color(DARK_TEXT_DIM),
                    );
                });
            ui.add_space(6.0);
            let download = egui::Button::new(RichText::new("⬇ Download").size(12.0).strong())
                .min_size(egui::vec2(ui.available_width(), 28.0));
            if ui.add(download).clicked() {
                cmd.push(AppCommand::Download);
            }
        }
    }
}
