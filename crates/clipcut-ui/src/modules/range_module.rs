// crates/clipcut-ui/src/modules/range_module.rs
//
// RangeModule: the two-handle trim track plus its HH:MM:SS fields.
//
// Layout (top to bottom):
//   track    : background, selected span, start/end handles, playhead
//   ticks    : minor marks, major marks with time labels
//   fields   : start / end text boxes, Reset
//
// Pointer gestures become RangeEdit commands; the selector itself only
// changes when app.rs applies them.

use egui::{pos2, vec2, Align2, Color32, FontId, Rect, RichText, Sense, Stroke, Ui};

use clipcut_core::helpers::time::format_time;
use clipcut_core::range::{minor_ticks, tick_labels, RangeHandle, RangeSelector};

use super::PanelModule;
use crate::commands::{AppCommand, RangeEdit};
use crate::orchestrator::Orchestrator;
use crate::theme::{ACCENT, DARK_BORDER, DARK_TEXT_DIM, HANDLE, PLAYHEAD, RANGE_FILL, TRACK_BG};

const TRACK_H:     f32 = 14.0;
const HANDLE_W:    f32 = 8.0;
const HANDLE_H:    f32 = 24.0;
/// Pointer distance (px) within which a press grabs a handle.
const HANDLE_GRAB: f32 = 10.0;
const TICK_AREA_H: f32 = 26.0;

#[derive(Default)]
pub struct RangeModule {
    start_text: String,
    end_text:   String,
}

impl PanelModule for RangeModule {
    fn name(&self) -> &str { "Range" }

    fn ui(&mut self, ui: &mut Ui, orch: &Orchestrator, cmd: &mut Vec<AppCommand>) {
        let sel = &orch.selector;

        ui.horizontal(|ui| {
            ui.label(RichText::new("✂ Extraction range").size(12.0).strong());
            if sel.is_active() {
                let summary = if sel.is_full_range() {
                    format!("full video ({})", format_time(sel.duration()))
                } else {
                    format!("{} – {}  ({})", format_time(sel.start()), format_time(sel.end()), format_time(sel.span()))
                };
                ui.label(RichText::new(summary).size(11.0).color(DARK_TEXT_DIM));
            }
        });
        ui.add_space(6.0);

        self.track(ui, sel, cmd);
        ui.add_space(6.0);
        self.fields(ui, sel, cmd);
    }
}

impl RangeModule {
    fn track(&mut self, ui: &mut Ui, sel: &RangeSelector, cmd: &mut Vec<AppCommand>) {
        let width = ui.available_width();
        let (outer, response) = ui.allocate_exact_size(vec2(width, HANDLE_H + TICK_AREA_H), Sense::click_and_drag());
        let track = Rect::from_min_size(
            pos2(outer.min.x + HANDLE_W, outer.min.y + (HANDLE_H - TRACK_H) / 2.0),
            vec2(outer.width() - 2.0 * HANDLE_W, TRACK_H),
        );
        let p = ui.painter_at(outer);
        p.rect_filled(track, 3.0, TRACK_BG);

        if !sel.is_active() {
            p.text(track.center(), Align2::CENTER_CENTER, "no video loaded", FontId::proportional(10.0), DARK_TEXT_DIM);
            return;
        }

        let duration = sel.duration();
        let x_of = |t: f64| track.min.x + (t / duration) as f32 * track.width();
        let t_of = |x: f32| (((x - track.min.x) / track.width()).clamp(0.0, 1.0) as f64) * duration;

        // ── Selected span ───────────────────────────────────────────────────
        let (xs, xe) = (x_of(sel.start()), x_of(sel.end()));
        p.rect_filled(Rect::from_x_y_ranges(xs..=xe, track.y_range()), 3.0, RANGE_FILL);

        // ── Playhead ────────────────────────────────────────────────────────
        let xp = x_of(sel.playback_position());
        p.line_segment([pos2(xp, outer.min.y), pos2(xp, outer.min.y + HANDLE_H)], Stroke::new(2.0, PLAYHEAD));

        // ── Handles ─────────────────────────────────────────────────────────
        for (x, which) in [(xs, RangeHandle::Start), (xe, RangeHandle::End)] {
            let r = Rect::from_center_size(pos2(x, outer.min.y + HANDLE_H / 2.0), vec2(HANDLE_W, HANDLE_H));
            let active = sel.dragging() == Some(which);
            p.rect(
                r,
                egui::CornerRadius::same(2),
                if active { ACCENT } else { HANDLE },
                Stroke::new(1.0, DARK_BORDER),
                egui::StrokeKind::Inside,
            );
        }

        // ── Ticks ───────────────────────────────────────────────────────────
        let tick_top = outer.min.y + HANDLE_H + 2.0;
        for f in minor_ticks(duration) {
            let x = track.min.x + f as f32 * track.width();
            p.line_segment([pos2(x, tick_top), pos2(x, tick_top + 4.0)], Stroke::new(1.0, DARK_BORDER));
        }
        for label in tick_labels(duration) {
            let x = track.min.x + label.fraction as f32 * track.width();
            p.line_segment([pos2(x, tick_top), pos2(x, tick_top + 8.0)], Stroke::new(1.0, DARK_TEXT_DIM));
            let anchor = match label.fraction {
                f if f <= 0.0 => Align2::LEFT_TOP,
                f if f >= 1.0 => Align2::RIGHT_TOP,
                _             => Align2::CENTER_TOP,
            };
            p.text(pos2(x, tick_top + 10.0), anchor, &label.text, FontId::monospace(9.0), DARK_TEXT_DIM);
        }

        // ── Gestures ────────────────────────────────────────────────────────
        let pointer = response.interact_pointer_pos();
        if response.drag_started() {
            if let Some(handle) = pointer.and_then(|pos| handle_at(xs, xe, pos.x)) {
                cmd.push(AppCommand::Range(RangeEdit::BeginDrag(handle)));
            }
        }
        if response.dragged() && sel.dragging().is_some() {
            if let Some(pos) = pointer {
                cmd.push(AppCommand::Range(RangeEdit::DragTo(t_of(pos.x))));
            }
        }
        if response.drag_stopped() {
            cmd.push(AppCommand::Range(RangeEdit::EndDrag));
        }
        if response.clicked() {
            if let Some(pos) = pointer {
                cmd.push(AppCommand::Range(RangeEdit::ClickTrack(t_of(pos.x))));
            }
        }
        if let Some(pos) = response.hover_pos() {
            if handle_at(xs, xe, pos.x).is_some() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
            }
        }
    }

    fn fields(&mut self, ui: &mut Ui, sel: &RangeSelector, cmd: &mut Vec<AppCommand>) {
        let start_id = ui.id().with("range_start_field");
        let end_id   = ui.id().with("range_end_field");
        let editing  = ui.memory(|m| m.has_focus(start_id) || m.has_focus(end_id));
        if !editing {
            self.start_text = sel.start_field();
            self.end_text   = sel.end_field();
        }

        ui.add_enabled_ui(sel.is_active(), |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Start").size(11.0));
                let start = ui.add(
                    egui::TextEdit::singleline(&mut self.start_text)
                        .id(start_id)
                        .desired_width(70.0)
                        .font(egui::TextStyle::Monospace),
                );
                if start.lost_focus() {
                    cmd.push(AppCommand::Range(RangeEdit::StartField {
                        start: self.start_text.clone(),
                        end:   self.end_text.clone(),
                    }));
                }

                ui.add_space(8.0);
                ui.label(RichText::new("End").size(11.0));
                let end = ui.add(
                    egui::TextEdit::singleline(&mut self.end_text)
                        .id(end_id)
                        .desired_width(70.0)
                        .font(egui::TextStyle::Monospace),
                );
                if end.lost_focus() {
                    cmd.push(AppCommand::Range(RangeEdit::EndField {
                        start: self.start_text.clone(),
                        end:   self.end_text.clone(),
                    }));
                }

                ui.add_space(8.0);
                let reset = egui::Button::new(RichText::new("↺ Reset").size(11.0).color(DARK_TEXT_DIM))
                    .fill(Color32::TRANSPARENT);
                if ui.add_enabled(!sel.is_full_range(), reset).clicked() {
                    cmd.push(AppCommand::Range(RangeEdit::Reset));
                }
            });
        });
    }
}

/// Which handle a press at `x` grabs, if any. When both are in reach the
/// nearer one wins; an exact tie goes to the start handle.
fn handle_at(x_start: f32, x_end: f32, x: f32) -> Option<RangeHandle> {
    let ds = (x - x_start).abs();
    let de = (x - x_end).abs();
    match (ds <= HANDLE_GRAB, de <= HANDLE_GRAB) {
        (true, true)   => Some(if ds <= de { RangeHandle::Start } else { RangeHandle::End }),
        (true, false)  => Some(RangeHandle::Start),
        (false, true)  => Some(RangeHandle::End),
        (false, false) => None,
    }
}
