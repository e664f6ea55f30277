use std::path::PathBuf;

use arboard::{Clipboard, ImageData};
use client_core::{AppState, ImageHandle, Notice, SlotContent, TransformKind};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{
    domain::{Action, SlotId},
    protocol::ACCEPTED_EXTENSIONS,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::reducer::{
    fan_out_command, modal_command, reduce, settle_unsent, transform_command,
};
use crate::ui::textures::TextureCache;

const APP_TITLE: &str = "Background Removal Lab";
const TILE_SIZE: f32 = 220.0;
const PREVIEW_MAX: f32 = 360.0;
const MODAL_IMAGE_MAX: f32 = 560.0;
const MODAL_ACTION: Action = Action::MeasureYolo;

enum ModalIntent {
    Measure,
    Save,
    Copy,
    Close,
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    state: AppState,
    textures: TextureCache,
}

impl DesktopGuiApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            state: AppState::new(),
            textures: TextureCache::default(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            reduce(&mut self.state, event);
        }
        self.textures.prune(&self.state.live_handles());
    }

    fn queue(&mut self, cmd: BackendCommand) {
        if let Err(failure) = dispatch_backend_command(&self.cmd_tx, cmd) {
            settle_unsent(&mut self.state, failure);
        }
    }

    fn queue_load(&mut self, path: PathBuf) {
        self.state
            .set_notice(Notice::Info(format!("Loading {}...", path.display())));
        self.queue(BackendCommand::LoadFile { path });
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        // one file per upload
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = file.path {
            self.queue_load(path);
        } else if let Some(bytes) = file.bytes {
            match ImageHandle::from_upload(&file.name, bytes.to_vec()) {
                Ok(image) => self.state.load_source(image),
                Err(err) => self.state.set_notice(Notice::Error(format!("Upload failed: {err}"))),
            }
        }
    }

    fn show_header(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading(APP_TITLE);
            match self.state.notice() {
                Some(notice) if notice.is_error() => {
                    ui.colored_label(ui.visuals().error_fg_color, notice.message());
                }
                Some(notice) => {
                    ui.label(notice.message());
                }
                None => {
                    ui.weak("Upload an image to get started.");
                }
            }
            ui.add_space(6.0);
        });
    }

    fn show_source_panel(&mut self, ctx: &egui::Context) {
        let hovering = ctx.input(|input| !input.raw.hovered_files.is_empty());
        egui::SidePanel::left("source_panel")
            .resizable(true)
            .default_width(PREVIEW_MAX + 24.0)
            .show(ctx, |ui| {
                let mut pick_file = false;
                let stroke = if hovering {
                    ui.visuals().selection.stroke
                } else {
                    ui.visuals().widgets.noninteractive.bg_stroke
                };
                egui::Frame::group(ui.style())
                    .stroke(stroke)
                    .inner_margin(egui::Margin::same(16))
                    .show(ui, |ui| {
                        ui.set_min_width(ui.available_width());
                        ui.vertical_centered(|ui| {
                            ui.label(if hovering {
                                "Release to upload"
                            } else {
                                "Drop a JPEG, PNG or WebP image here"
                            });
                            pick_file = ui.button("Choose file...").clicked();
                        });
                    });
                if pick_file {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &ACCEPTED_EXTENSIONS)
                        .pick_file()
                    {
                        self.queue_load(path);
                    }
                }

                ui.add_space(12.0);
                let idle = self.state.current().is_some()
                    && self.state.transform_in_flight().is_none();
                let mut clicked = None;
                ui.horizontal(|ui| {
                    let bw_label = if self.state.is_monochrome() {
                        "Back to color"
                    } else {
                        TransformKind::Grayscale.label()
                    };
                    if ui.add_enabled(idle, egui::Button::new(bw_label)).clicked() {
                        clicked = Some(TransformKind::Grayscale);
                    }
                    if ui
                        .add_enabled(idle, egui::Button::new(TransformKind::Rotate.label()))
                        .clicked()
                    {
                        clicked = Some(TransformKind::Rotate);
                    }
                    if let Some(kind) = self.state.transform_in_flight() {
                        ui.spinner();
                        ui.weak(format!("{}...", kind.label()));
                    }
                });
                if let Some(kind) = clicked {
                    if let Some(cmd) = transform_command(&mut self.state, kind) {
                        self.queue(cmd);
                    }
                }

                ui.add_space(12.0);
                match self.state.current().cloned() {
                    Some(current) => {
                        ui.label(current.name());
                        match self.textures.get_or_load(ctx, &current) {
                            Some(texture) => {
                                ui.add(
                                    egui::Image::new(&texture)
                                        .max_size(egui::vec2(PREVIEW_MAX, PREVIEW_MAX))
                                        .maintain_aspect_ratio(true),
                                );
                            }
                            None => {
                                ui.weak("Preview not available.");
                            }
                        }
                    }
                    None => {
                        ui.weak("No image loaded.");
                    }
                }
            });
    }

    fn show_results(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let can_run = self.state.current().is_some();
            if ui
                .add_enabled(can_run, egui::Button::new("Run all advanced processes"))
                .clicked()
            {
                if let Some(cmd) = fan_out_command(&mut self.state) {
                    self.queue(cmd);
                }
            }
            ui.add_space(12.0);

            let mut opened = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("results_grid")
                    .num_columns(3)
                    .spacing(egui::vec2(12.0, 12.0))
                    .show(ui, |ui| {
                        for (index, slot_id) in SlotId::ALL.into_iter().enumerate() {
                            if self.show_tile(ui, slot_id) {
                                opened = Some(slot_id);
                            }
                            if index % 3 == 2 {
                                ui.end_row();
                            }
                        }
                    });
            });
            if let Some(slot_id) = opened {
                self.state.open_modal(slot_id);
            }
        });
    }

    /// Draws one result tile; returns whether it was clicked while populated.
    fn show_tile(&mut self, ui: &mut egui::Ui, slot_id: SlotId) -> bool {
        let content = self.state.slot(slot_id).content().clone();
        let frame = egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_min_size(egui::vec2(TILE_SIZE, TILE_SIZE));
            ui.set_max_width(TILE_SIZE);
            ui.strong(slot_id.title());
            match &content {
                SlotContent::Empty => {
                    ui.weak("No result yet.");
                }
                SlotContent::Pending(label) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(label.as_str());
                    });
                }
                SlotContent::Image(image) => match self.textures.get_or_load(ui.ctx(), image) {
                    Some(texture) => {
                        ui.add(
                            egui::Image::new(&texture)
                                .max_size(egui::vec2(TILE_SIZE, TILE_SIZE - 24.0))
                                .maintain_aspect_ratio(true),
                        );
                    }
                    None => {
                        ui.weak("Preview not available.");
                    }
                },
                SlotContent::Text(text) => {
                    egui::ScrollArea::vertical()
                        .id_salt(slot_id.key())
                        .max_height(TILE_SIZE - 24.0)
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(text.as_str()).monospace());
                        });
                }
            }
        });
        let populated = matches!(content, SlotContent::Image(_) | SlotContent::Text(_));
        let response = frame.response.interact(egui::Sense::click());
        if populated {
            response.on_hover_cursor(egui::CursorIcon::PointingHand).clicked()
        } else {
            false
        }
    }

    fn show_modal(&mut self, ctx: &egui::Context) {
        let Some(modal) = self.state.modal().cloned() else {
            return;
        };
        let texture = modal
            .image()
            .and_then(|image| self.textures.get_or_load(ctx, image));

        let mut intent = None;
        let response = egui::Modal::new(egui::Id::new("result_modal")).show(ctx, |ui| {
            ui.set_max_width(MODAL_IMAGE_MAX);
            ui.heading(modal.origin().title());
            ui.add_space(8.0);

            match &texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(texture)
                            .max_size(egui::vec2(MODAL_IMAGE_MAX, MODAL_IMAGE_MAX))
                            .maintain_aspect_ratio(true),
                    );
                }
                None => {
                    ui.weak("No image to display.");
                }
            }
            if let Some(text) = modal.text() {
                egui::ScrollArea::vertical()
                    .id_salt("modal_text")
                    .max_height(200.0)
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(text).monospace());
                    });
            }
            if let Some(status) = modal.status() {
                ui.horizontal(|ui| {
                    if modal.is_busy() {
                        ui.spinner();
                    }
                    ui.label(status);
                });
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!modal.is_busy(), egui::Button::new(MODAL_ACTION.label()))
                    .clicked()
                {
                    intent = Some(ModalIntent::Measure);
                }
                let has_image = modal.image().is_some();
                if ui
                    .add_enabled(has_image, egui::Button::new("Save image..."))
                    .clicked()
                {
                    intent = Some(ModalIntent::Save);
                }
                if ui
                    .add_enabled(has_image, egui::Button::new("Copy image"))
                    .clicked()
                {
                    intent = Some(ModalIntent::Copy);
                }
                if ui.button("Close").clicked() {
                    intent = Some(ModalIntent::Close);
                }
            });
        });
        if response.should_close() {
            intent = Some(ModalIntent::Close);
        }

        match intent {
            Some(ModalIntent::Measure) => {
                if let Some(cmd) = modal_command(&mut self.state, MODAL_ACTION) {
                    self.queue(cmd);
                }
            }
            Some(ModalIntent::Save) => {
                if let Some(image) = modal.image().cloned() {
                    let file_name = format!("{}.{}", modal.origin().key(), image.extension());
                    if let Some(path) = rfd::FileDialog::new().set_file_name(&file_name).save_file()
                    {
                        self.queue(BackendCommand::SaveImage { image, path });
                    }
                }
            }
            Some(ModalIntent::Copy) => {
                if let Some(image) = modal.image() {
                    let notice = match copy_image_to_clipboard(image.bytes()) {
                        Ok(()) => Notice::Info("Image copied to clipboard".to_string()),
                        Err(err) => Notice::Error(format!("Copy failed: {err}")),
                    };
                    self.state.set_notice(notice);
                }
            }
            Some(ModalIntent::Close) => self.state.close_modal(),
            None => {}
        }
    }
}

fn copy_image_to_clipboard(bytes: &[u8]) -> Result<(), String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_image(ImageData {
            width: rgba.width() as usize,
            height: rgba.height() as usize,
            bytes: std::borrow::Cow::Owned(rgba.into_raw()),
        })
        .map_err(|err| err.to_string())
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.handle_dropped_files(ctx);

        self.show_header(ctx);
        self.show_source_panel(ctx);
        self.show_results(ctx);
        self.show_modal(ctx);

        let busy = self.state.requests_in_flight() > 0 || self.state.transform_in_flight().is_some();
        if busy {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
