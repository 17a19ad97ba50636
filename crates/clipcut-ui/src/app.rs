// crates/clipcut-ui/src/app.rs
use std::time::Duration;

use eframe::egui;
use egui::{Align, Layout, RichText};
use tracing::info;

use clipcut_media::{EngineLibrary, EnginePhase};

use crate::commands::{AppCommand, RangeEdit};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::modules::{
    alert,
    export_module::ExportModule,
    file_panel::FilePanel,
    log_panel::LogPanel,
    range_module::RangeModule,
    PanelModule,
};
use crate::orchestrator::Orchestrator;
use crate::theme::{configure_style, ACCENT, AMBER, DARK_TEXT_DIM, GREEN, RED};

/// Worker results arrive on channels egui cannot wake on, so while something
/// is pending the UI polls at this rate.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ── App ───────────────────────────────────────────────────────────────────────

pub struct ClipCutApp {
    context:      AppContext,
    file_panel:   FilePanel,
    range:        RangeModule,
    export:       ExportModule,
    log:          LogPanel,
    /// Commands emitted by panels each frame, processed after the UI pass
    pending_cmds: Vec<AppCommand>,
}

impl ClipCutApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        configure_style(&cc.egui_ctx);
        cc.egui_ctx.options_mut(|o| {
            o.theme_preference = egui::ThemePreference::Dark;
        });

        let mut context = AppContext::new(EngineLibrary::cli(), config);
        context.init_engine();

        Self {
            context,
            file_panel:   FilePanel,
            range:        RangeModule::default(),
            export:       ExportModule,
            log:          LogPanel,
            pending_cmds: Vec::new(),
        }
    }

    fn process_command(&mut self, cmd: AppCommand) {
        let orch = &mut self.context.orch;
        match cmd {
            // ── Engine ───────────────────────────────────────────────────────
            AppCommand::RetryEngineInit => {
                if matches!(orch.phase(), EnginePhase::Failed | EnginePhase::Uninitialized) {
                    info!("retrying engine initialization");
                    self.context.init_engine();
                }
            }

            // ── Source ───────────────────────────────────────────────────────
            AppCommand::ImportFile(path) => self.context.import(&path),
            AppCommand::TogglePlayback   => orch.toggle_playback(),
            AppCommand::Range(edit)      => apply_range_edit(orch, edit),

            // ── Export ───────────────────────────────────────────────────────
            AppCommand::SetFormat(format) => orch.set_format(format),
            AppCommand::StartConversion   => self.context.start_conversion(),
            AppCommand::Download          => self.context.download(),

            // ── App ──────────────────────────────────────────────────────────
            AppCommand::DismissAlert => orch.dismiss_alert(),
            AppCommand::ResetAll     => orch.reset(),
        }
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context) {
        // One source at a time: only the first dropped file counts.
        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.pending_cmds.push(AppCommand::ImportFile(path));
        }
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        let orch = &self.context.orch;
        ui.horizontal_centered(|ui| {
            ui.label(RichText::new("🎧 ClipCut").strong().size(15.0).color(ACCENT));
            ui.separator();

            match orch.phase() {
                EnginePhase::Loading => {
                    let secs = orch.init_elapsed().map(|d| d.as_secs()).unwrap_or(0);
                    ui.spinner();
                    ui.label(RichText::new(format!("Loading FFmpeg… {secs}s")).size(12.0).color(AMBER));
                }
                EnginePhase::Ready => {
                    ui.label(RichText::new("● FFmpeg ready").size(12.0).color(GREEN));
                }
                EnginePhase::Busy => {
                    ui.spinner();
                    ui.label(RichText::new("Extracting audio…").size(12.0).color(ACCENT));
                }
                EnginePhase::Failed => {
                    ui.label(RichText::new("● FFmpeg failed to load").size(12.0).color(RED))
                        .on_hover_text(orch.engine_error().unwrap_or_default());
                    if ui.button(RichText::new("⟳ Retry").size(11.0)).clicked() {
                        self.pending_cmds.push(AppCommand::RetryEngineInit);
                    }
                }
                phase => {
                    ui.label(RichText::new(format!("FFmpeg {}", phase.label())).size(12.0).color(DARK_TEXT_DIM));
                }
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let busy = orch.is_converting();
                if ui.add_enabled(!busy, egui::Button::new(RichText::new("Reset").size(11.0))).clicked() {
                    self.pending_cmds.push(AppCommand::ResetAll);
                }
                ui.label(RichText::new("Drop a video file to start").size(11.0).weak());
            });
        });
    }

    fn needs_polling(&self) -> bool {
        let orch = &self.context.orch;
        matches!(orch.phase(), EnginePhase::Loading | EnginePhase::Busy)
            || orch.media().is_some_and(|m| m.duration.is_none())
            || self.context.is_saving()
    }
}

/// Apply one range edit against the orchestrator's selector and player.
fn apply_range_edit(orch: &mut Orchestrator, edit: RangeEdit) {
    let Orchestrator { selector, player, .. } = orch;
    match edit {
        RangeEdit::BeginDrag(handle)       => selector.begin_drag(handle, player),
        RangeEdit::DragTo(t)               => selector.drag_to(t, player),
        RangeEdit::EndDrag                 => selector.end_drag(),
        RangeEdit::ClickTrack(t)           => selector.click_track(t, player),
        RangeEdit::StartField { start, end } => selector.apply_start_field(&start, &end, player),
        RangeEdit::EndField { start, end }   => selector.apply_end_field(&start, &end, player),
        RangeEdit::Reset                   => selector.reset(player),
    }
}

// ── eframe::App ───────────────────────────────────────────────────────────────

impl eframe::App for ClipCutApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.context.shutdown();
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drag_and_drop(ctx);
        if self.context.ingest() {
            ctx.request_repaint();
        }
        self.context.orch.maybe_sweep();

        if ctx.input(|i| i.key_pressed(egui::Key::Space)) && !ctx.wants_keyboard_input() {
            self.pending_cmds.push(AppCommand::TogglePlayback);
        }

        egui::TopBottomPanel::top("top_panel")
            .exact_height(36.0)
            .show(ctx, |ui| self.header(ui));

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .min_height(90.0)
            .default_height(160.0)
            .show(ctx, |ui| {
                self.log.ui(ui, &self.context.orch, &mut self.pending_cmds);
            });

        egui::SidePanel::left("source_panel")
            .resizable(true)
            .default_width(260.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                self.file_panel.ui(ui, &self.context.orch, &mut self.pending_cmds);
            });

        egui::SidePanel::right("export_panel")
            .resizable(true)
            .default_width(240.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                self.export.ui(ui, &self.context.orch, &mut self.pending_cmds);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(12.0);
            self.range.ui(ui, &self.context.orch, &mut self.pending_cmds);
        });

        alert::show(ctx, self.context.orch.alert(), &mut self.pending_cmds);

        // ── Process commands emitted by panels this frame ─────────────────────
        let cmds: Vec<AppCommand> = self.pending_cmds.drain(..).collect();
        for cmd in cmds {
            self.process_command(cmd);
        }

        let dt = ctx.input(|i| i.stable_dt as f64);
        if self.context.orch.tick_playback(dt) {
            ctx.request_repaint();
        } else if self.needs_polling() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}
