// crates/clipcut-ui/src/modules/alert.rs
//
// Modal alert: a scrim over the whole window and a centred card with the
// orchestrator's pending Alert. Painted after every panel so it sits on top;
// the only way out is the OK button.

use egui::{Color32, RichText, Stroke};

use crate::commands::AppCommand;
use crate::orchestrator::Alert;
use crate::theme::{DARK_BG_2, DARK_BORDER, DARK_TEXT, DARK_TEXT_DIM, RED};

const CARD_W: f32 = 420.0;
const CARD_H: f32 = 220.0;
const PAD:    f32 = 24.0;

pub fn show(ctx: &egui::Context, alert: Option<&Alert>, cmd: &mut Vec<AppCommand>) {
    let Some(alert) = alert else { return };

    let screen = ctx.screen_rect();
    let scrim  = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, egui::Id::new("alert_scrim")));
    scrim.rect_filled(screen, 0.0, Color32::from_black_alpha(160));

    let card  = egui::Rect::from_center_size(screen.center(), egui::vec2(CARD_W, CARD_H));
    let inner = card.shrink(PAD);

    egui::Area::new(egui::Id::new("alert_card"))
        .order(egui::Order::Tooltip)
        .fixed_pos(card.min)
        .show(ctx, |ui| {
            ui.set_min_size(card.size());
            ui.set_max_size(card.size());
            ui.painter().rect(
                card,
                egui::CornerRadius::same(6),
                DARK_BG_2,
                Stroke::new(1.5, RED),
                egui::StrokeKind::Inside,
            );

            let mut child = ui.new_child(egui::UiBuilder::new().max_rect(inner));
            child.label(RichText::new(&alert.title).size(14.0).strong().color(RED));
            child.add_space(10.0);
            egui::ScrollArea::vertical().max_height(inner.height() - 70.0).show(&mut child, |ui| {
                ui.label(RichText::new(&alert.message).size(11.5).color(DARK_TEXT));
            });
            child.add_space(12.0);
            let ok = egui::Button::new(RichText::new("OK").size(11.0).color(DARK_TEXT_DIM))
                .stroke(Stroke::new(1.0, DARK_BORDER))
                .min_size(egui::vec2(child.available_width(), 28.0));
            if child.add(ok).clicked() || child.input(|i| i.key_pressed(egui::Key::Enter)) {
                cmd.push(AppCommand::DismissAlert);
            }
        });
}
