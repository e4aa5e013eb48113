// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::info;
use status_client::{DisplayModel, FeatureLine, ViewState};

const PROJECT_URL: &str = "https://github.com/genshen/wssocks";

const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const VALUE_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 200, 200);
const ACCENT_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 180, 220);
const GOOD_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 255, 100);
const MUTED_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);

/// Renders a [`ViewState`]. Holds nothing but UI toggles.
#[derive(Debug, Default)]
pub struct StatusPane {
    show_version_details: bool,
}

impl StatusPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, ctx: &egui::Context, view: &ViewState) {
        egui::CentralPanel::default().show(ctx, |ui| {
            Self::render_header(ui);
            ui.separator();
            ui.add_space(12.0);

            match view {
                ViewState::Loading => {
                    ui.vertical_centered(|ui| {
                        ui.spinner();
                    });
                }
                ViewState::Error(message) => {
                    ui.vertical_centered(|ui| {
                        ui.label(egui::RichText::new(format!("✕ {message}"))
                            .color(ERROR_COLOR)
                            .size(14.0)
                            .strong());
                    });
                }
                ViewState::Ready(model) => {
                    self.render_information_section(ui, model);
                    ui.add_space(16.0);
                    Self::render_statistics_section(ui, model);
                }
            }
        });
    }

    fn render_header(ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("◈ wssocks status")
                .color(ACCENT_COLOR)
                .size(18.0)
                .strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.hyperlink_to("Github", PROJECT_URL);
            });
        });
    }

    fn render_information_section(&mut self, ui: &mut egui::Ui, model: &DisplayModel) {
        section_title(ui, "INFORMATION");

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Server Version").color(LABEL_COLOR));
            ui.label(egui::RichText::new(&model.version_line)
                .color(ACCENT_COLOR)
                .monospace());

            let toggle = if self.show_version_details { "▲" } else { "▼" };
            if ui.small_button(toggle)
                .on_hover_text("Protocol versions")
                .clicked() {
                self.show_version_details = !self.show_version_details;
            }
        });

        if self.show_version_details {
            ui.indent("version_details", |ui| {
                value_row(ui, "Protocol Version", &model.protocol_version.to_string());
                value_row(ui, "Compatible Protocol Version", &model.compatible_version.to_string())
                    .on_hover_text("Lowest protocol version allowed for a client");
            });
        }

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Address").color(LABEL_COLOR));
            ui.label(egui::RichText::new(&model.server_address)
                .color(ACCENT_COLOR)
                .monospace());
            if ui.small_button("⎘").on_hover_text("Copy address").clicked() {
                ui.ctx().copy_text(model.server_address.clone());
                info!("Remote server address copied: {}", model.server_address);
            }
        });

        for line in &model.features {
            render_feature_line(ui, line);
        }

        if let Some(compat) = model.client_compatibility {
            let (text, color) = if compat.compatible {
                (format!("✓ client protocol {} accepted", compat.client_version), GOOD_COLOR)
            } else {
                (format!("✕ client protocol {} not accepted", compat.client_version), ERROR_COLOR)
            };
            ui.label(egui::RichText::new(text).color(color).size(11.0));
        }
    }

    fn render_statistics_section(ui: &mut egui::Ui, model: &DisplayModel) {
        section_title(ui, "STATISTICS");

        let stats = &model.statistics;

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Status").color(LABEL_COLOR));
            ui.label(egui::RichText::new(stats.service_state)
                .color(GOOD_COLOR)
                .strong());
        });
        value_row(ui, "Uptime", &stats.up_time);
        value_row(ui, "Clients", &stats.clients.to_string());
        value_row(ui, "Proxy Connections", &stats.proxies.to_string());

        ui.add_space(6.0);
        ui.label(egui::RichText::new(format!(
            "fetched at {}",
            model.fetched_at.format("%H:%M:%S UTC")
        ))
            .color(MUTED_COLOR)
            .size(9.0)
            .italics());
    }
}

fn section_title(ui: &mut egui::Ui, title: &str) {
    ui.label(egui::RichText::new(title)
        .color(MUTED_COLOR)
        .size(11.0)
        .strong());
    ui.add_space(3.0);
}

fn value_row(ui: &mut egui::Ui, label: &str, value: &str) -> egui::Response {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(label).color(LABEL_COLOR));
        ui.label(egui::RichText::new(value)
            .color(VALUE_COLOR)
            .monospace());
    })
    .response
}

fn render_feature_line(ui: &mut egui::Ui, line: &FeatureLine) {
    ui.horizontal(|ui| {
        let (icon, color) = feature_indicator(line);
        ui.label(egui::RichText::new(icon).color(color));
        ui.label(egui::RichText::new(line.label).color(LABEL_COLOR));
        ui.label(egui::RichText::new(line.state_label).color(color).size(10.0));

        if let Some(reason) = &line.disabled_reason {
            ui.label(egui::RichText::new(format!("({reason})"))
                .color(MUTED_COLOR)
                .size(10.0)
                .italics());
        }
    });
}

fn feature_indicator(line: &FeatureLine) -> (&'static str, egui::Color32) {
    if line.enabled {
        ("●", GOOD_COLOR)
    } else {
        ("○", MUTED_COLOR)
    }
}
