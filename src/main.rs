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

mod config;
mod status_pane;

use std::time::Duration;

use clap::Parser;
use config::AppConfig;
use log::{error, info, warn};
use status_client::{Dashboard, ViewState};
use status_pane::StatusPane;

// Repaint often enough that the ticking uptime never looks stuck
const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Live status dashboard for a wssocks proxy server
#[derive(Parser, Debug)]
#[command(name = "wssocks-status-desktop", version, about)]
struct Cli {
    /// Server origin to read status from (http, https, ws or wss)
    #[arg(long)]
    origin: Option<String>,

    /// Status request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Persist the command line overrides to the config file
    #[arg(long)]
    save: bool,

    /// Print the config file location and exit
    #[arg(long)]
    print_config_path: bool,
}

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.print_config_path {
        match AppConfig::get_config_path() {
            Ok(path) => println!("{}", path.display()),
            Err(e) => error!("Failed to resolve config path: {}", e),
        }
        return Ok(());
    }

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    config.apply_overrides(cli.origin, cli.timeout);

    if cli.save {
        match config.save() {
            Ok(()) => info!("Configuration saved"),
            Err(e) => warn!("Failed to save config: {}", e),
        }
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;

    info!("Starting wssocks status dashboard for {}", config.server_origin);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title("wssocks status"),
        ..Default::default()
    };

    eframe::run_native(
        "wssocks status",
        options,
        Box::new(move |_cc| Ok(Box::new(StatusApp::new(runtime, &config)))),
    )
}

struct StatusApp {
    // Declared before the runtime so it is torn down while the runtime lives
    dashboard: Result<Dashboard, String>,
    pane: StatusPane,
    _runtime: tokio::runtime::Runtime,
}

impl StatusApp {
    fn new(runtime: tokio::runtime::Runtime, config: &AppConfig) -> Self {
        let dashboard = {
            let _guard = runtime.enter();
            Dashboard::spawn(config.dashboard_config()).map_err(|e| {
                error!("Cannot start dashboard: {}", e);
                e.to_string()
            })
        };

        if let Ok(dashboard) = &dashboard {
            info!("Requesting status from {}", dashboard.endpoint());
        }

        Self {
            dashboard,
            pane: StatusPane::new(),
            _runtime: runtime,
        }
    }

    fn view_state(&self) -> ViewState {
        match &self.dashboard {
            Ok(dashboard) => dashboard.view_state(),
            Err(message) => ViewState::Error(message.clone()),
        }
    }
}

impl eframe::App for StatusApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(REPAINT_INTERVAL);

        let view = self.view_state();
        self.pane.render(ctx, &view);
    }
}
