//! Warning dialog - small floating window with a hidden acknowledgment target

use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, Sense, ViewportCommand};
use std::io::{self, Write};
use tracing::{debug, error, info};

use crate::acknowledge;
use crate::constants::dialog::*;
use crate::types::{centered_origin, Region, Size};

/// Lifecycle of the dialog; the only transition is hidden-region activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Shown,
    Terminated,
}

pub struct WarningDialog {
    state: DialogState,
    /// Set once the window has been centered on real monitor metrics
    placed: bool,
    focused: bool,
}

impl Default for WarningDialog {
    fn default() -> Self {
        Self {
            state: DialogState::Shown,
            placed: false,
            focused: false,
        }
    }
}

impl WarningDialog {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        Self::default()
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    /// Emit the token and move to `Terminated`. Writes at most once.
    /// Returns true if this call performed the transition.
    pub fn activate<W: Write>(&mut self, out: &mut W) -> io::Result<bool> {
        if self.state == DialogState::Terminated {
            return Ok(false);
        }
        self.state = DialogState::Terminated;
        acknowledge::write_token(out)?;
        Ok(true)
    }

    fn place(&mut self, ctx: &egui::Context) {
        if !self.focused {
            ctx.send_viewport_cmd(ViewportCommand::Focus);
            self.focused = true;
        }
        if self.placed {
            return;
        }
        if let Some(monitor) = ctx.input(|i| i.viewport().monitor_size).map(Size::from) {
            let origin = centered_origin(Some(monitor), WINDOW, FALLBACK_SCREEN);
            debug!(?monitor, ?origin, "centering warning on monitor");
            ctx.send_viewport_cmd(ViewportCommand::OuterPosition(origin.into()));
            self.placed = true;
        }
    }

    fn on_hidden_region_activated<W: Write>(&mut self, ctx: &egui::Context, out: &mut W) {
        match self.activate(out) {
            Ok(true) => info!("hidden region activated"),
            Ok(false) => return,
            Err(e) => error!(error = %e, "failed to write acknowledgment"),
        }
        ctx.send_viewport_cmd(ViewportCommand::Close);
    }

    /// One frame of the dialog; the token goes to `out` on activation
    fn show<W: Write>(&mut self, ctx: &egui::Context, out: &mut W) {
        self.place(ctx);

        // Only the hidden region may close the window
        if ctx.input(|i| i.viewport().close_requested()) && self.state() == DialogState::Shown {
            debug!("ignoring close request");
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
        }

        let mut hidden_clicked = false;
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::WHITE))
            .show(ctx, |ui| {
                let full = ui.max_rect();

                let background = ui.interact(full, ui.id().with("background"), Sense::drag());

                let label_rect = full.shrink2(egui::vec2(LABEL_INSET, 0.0));
                ui.put(
                    label_rect,
                    egui::Label::new(RichText::new(MESSAGE).size(FONT_SIZE).color(Color32::BLACK))
                        .selectable(false)
                        .wrap(),
                );

                // Senses drag as well so a press here never becomes a window drag
                let hidden: egui::Rect = Region::bottom_left(Size::from(full.size()), HIDDEN_SIDE).into();
                let hidden = hidden.translate(full.min.to_vec2());
                let target = ui.interact(hidden, ui.id().with("hidden"), Sense::click_and_drag());

                if background.drag_started()
                    && !background.interact_pointer_pos().is_some_and(|pos| hidden.contains(pos))
                {
                    ctx.send_viewport_cmd(ViewportCommand::StartDrag);
                }
                hidden_clicked = target.clicked();
            });

        if hidden_clicked {
            self.on_hidden_region_activated(ctx, out);
        }
    }
}

impl eframe::App for WarningDialog {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::WHITE.to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx, &mut io::stdout());
    }
}

/// Show the dialog and block in the event loop until it closes
pub fn run_warning() -> Result<()> {
    let origin = centered_origin(None, WINDOW, FALLBACK_SCREEN);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(WINDOW.as_array())
            .with_position(origin)
            .with_title(TITLE)
            .with_resizable(false)
            .with_close_button(false)
            .with_minimize_button(false)
            .with_maximize_button(false)
            .with_always_on_top()
            .with_active(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_ID,
        options,
        Box::new(|cc| Ok(Box::new(WarningDialog::new(cc)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run warning dialog: {}", e))?;

    Ok(())
}
