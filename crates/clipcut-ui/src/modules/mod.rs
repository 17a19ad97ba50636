// crates/clipcut-ui/src/modules/mod.rs
//
// Panel registry. To add a new panel:
//   1. Create modules/mypanel.rs implementing PanelModule
//   2. Add `pub mod mypanel;` below
//   3. Give ClipCutApp a field for it and place it in update()

pub mod alert;
pub mod export_module;
pub mod file_panel;
pub mod log_panel;
pub mod range_module;

use egui::Ui;

use crate::commands::AppCommand;
use crate::orchestrator::Orchestrator;

/// Every panel implements this trait.
/// Panels read the orchestrator and emit commands; they never mutate it.
pub trait PanelModule {
    fn name(&self) -> &str;
    fn ui(&mut self, ui: &mut Ui, orch: &Orchestrator, cmd: &mut Vec<AppCommand>);
}
