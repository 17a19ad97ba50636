#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod commands;
mod config;
mod context;
mod helpers;
mod modules;
mod orchestrator;
mod theme;

use tracing::info;

fn main() -> eframe::Result {
    // Held for the life of the process so the file log keeps flushing.
    let _log_guard = helpers::log::init();

    let config = config::AppConfig::load();
    info!(core = %config.engine.core_path, "ClipCut starting");

    let native_options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_title("🎧 ClipCut")
            .with_inner_size([1100.0, 680.0])
            .with_min_inner_size([820.0, 520.0])
            .with_drag_and_drop(true)
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "ClipCut",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::ClipCutApp::new(cc, config)))),
    )
}
