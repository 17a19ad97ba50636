// crates/clipcut-ui/src/modules/file_panel.rs
//
// Left panel: choose or drop a video, see what was loaded, play/pause the
// preview clock.

use egui::{Align, Layout, Margin, RichText, Stroke, Ui};
use rfd::FileDialog;

use clipcut_core::helpers::time::{format_file_size, format_time};
use clipcut_core::playback::{MediaElement, PlayState};
use clipcut_media::EnginePhase;

use super::PanelModule;
use crate::commands::AppCommand;
use crate::orchestrator::Orchestrator;
use crate::theme::{ACCENT, DARK_BG_2, DARK_BG_3, DARK_BORDER, DARK_TEXT_DIM};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mkv", "webm", "avi", "wmv", "flv", "mpeg", "mpg", "3gp", "ogv", "ts"];

pub struct FilePanel;

impl PanelModule for FilePanel {
    fn name(&self) -> &str { "Source" }

    fn ui(&mut self, ui: &mut Ui, orch: &Orchestrator, cmd: &mut Vec<AppCommand>) {
        egui::Frame::new()
            .fill(DARK_BG_2)
            .inner_margin(Margin { left: 8, right: 8, top: 6, bottom: 6 })
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("🎬 Source video").size(12.0).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let ready = orch.phase() == EnginePhase::Ready && !orch.is_converting();
                        let open  = ui.add_enabled(ready, egui::Button::new(RichText::new("＋ Choose…").size(11.0)));
                        if open.clicked() {
                            if let Some(path) = FileDialog::new()
                                .add_filter("Video", VIDEO_EXTENSIONS)
                                .pick_file()
                            {
                                cmd.push(AppCommand::ImportFile(path));
                            }
                        }
                        if !ready {
                            open.on_disabled_hover_text("Waiting for FFmpeg to finish loading");
                        }
                    });
                });
            });

        ui.add_space(8.0);

        let Some(media) = orch.media() else {
            ui.add_space(30.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("🎞").size(32.0));
                ui.add_space(6.0);
                ui.label(RichText::new("Drop a video here\nor use Choose…").size(11.0).color(DARK_TEXT_DIM));
            });
            return;
        };

        egui::Frame::new()
            .fill(DARK_BG_3)
            .stroke(Stroke::new(1.0, DARK_BORDER))
            .corner_radius(egui::CornerRadius::same(4))
            .inner_margin(Margin::same(8))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(&media.source.name).size(12.0).strong());
                ui.label(RichText::new(format!("Size:      {}", format_file_size(media.source.size()))).size(11.0).monospace());
                ui.label(RichText::new(format!("Type:      {}", media.source.mime)).size(11.0).monospace());
                let duration = media.duration.map(format_time).unwrap_or_else(|| "probing…".into());
                ui.label(RichText::new(format!("Duration:  {duration}")).size(11.0).monospace());
                if let Some(handle) = &media.preview {
                    ui.label(RichText::new(handle.to_string()).size(9.0).color(DARK_TEXT_DIM))
                        .on_hover_text("Preview handle");
                }
            });

        ui.add_space(8.0);

        // ── Transport ───────────────────────────────────────────────────────
        let player = &orch.player;
        ui.horizontal(|ui| {
            let label = match player.state() {
                PlayState::Playing => "⏸ Pause",
                _                  => "▶ Play",
            };
            if ui.add_enabled(player.is_loaded(), egui::Button::new(RichText::new(label).size(12.0))).clicked() {
                cmd.push(AppCommand::TogglePlayback);
            }
            ui.label(
                RichText::new(format!("{} / {}", format_time(player.current_time()), format_time(player.duration())))
                    .size(11.0)
                    .monospace()
                    .color(if player.state() == PlayState::Playing { ACCENT } else { DARK_TEXT_DIM }),
            );
        });
    }
}
