//! PV Broadcaster: re-encode a local video into an HTTP transport stream
//! through the installed player.

use std::path::PathBuf;

use eframe::egui;

use ppv_via_vlc::stream::{self, AccessToken, StreamLauncher, DEFAULT_PORT};

struct BroadcasterApp {
    launcher: StreamLauncher,
    source_input: String,
    player_input: String,
    port_input: String,
    token: AccessToken,
    status: String,
    error: Option<String>,
}

impl Default for BroadcasterApp {
    fn default() -> Self {
        Self {
            launcher: StreamLauncher::new(),
            source_input: String::new(),
            player_input: "vlc".to_owned(),
            port_input: DEFAULT_PORT.to_string(),
            token: AccessToken::generate(),
            status: "Ready".to_owned(),
            error: None,
        }
    }
}

impl BroadcasterApp {
    fn start_stream(&mut self) {
        self.error = None;
        let port = match stream::parse_port(&self.port_input) {
            Ok(port) => port,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        let player = PathBuf::from(self.player_input.trim());
        let source = PathBuf::from(self.source_input.trim());
        match self
            .launcher
            .start(&player, &source, self.token.clone(), port)
        {
            Ok(session) => {
                self.status = format!(
                    "Stream started on {} (token {})",
                    session.url(),
                    session.token()
                );
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn stop_stream(&mut self) {
        if self.launcher.active().is_some() {
            self.launcher.stop();
            self.status = "Streaming stopped".to_owned();
        }
    }
}

impl eframe::App for BroadcasterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("PV Streaming UI");
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.label("Video file:");
                ui.text_edit_singleline(&mut self.source_input);
            });
            ui.horizontal(|ui| {
                ui.label("VLC path:");
                ui.text_edit_singleline(&mut self.player_input);
            });
            ui.horizontal(|ui| {
                ui.label("Port:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.port_input).desired_width(60.0),
                );
            });

            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.label("Token:");
                ui.monospace(self.token.as_str());
                if ui.button("New token").clicked() {
                    self.token = AccessToken::generate();
                }
                if ui.button("Copy").clicked() {
                    ui.ctx()
                        .output_mut(|out| out.copied_text = self.token.as_str().to_owned());
                }
            });

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                let idle = self.launcher.active().is_none();
                if ui.add_enabled(idle, egui::Button::new("Start stream")).clicked() {
                    self.start_stream();
                }
                if ui.add_enabled(!idle, egui::Button::new("Stop stream")).clicked() {
                    self.stop_stream();
                }
            });

            ui.add_space(10.0);
            if let Some(error) = &self.error {
                ui.colored_label(egui::Color32::RED, error);
            } else {
                ui.label(&self.status);
            }
            if let Some(session) = self.launcher.active() {
                ui.label(format!(
                    "Serving {} at {}",
                    session.source().display(),
                    session.url()
                ));
            }
        });
    }
}

// Dropping the app tears down the launcher and with it any tracked player
// process, so closing the window stops the stream.
fn main() {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "PV Broadcaster",
        native_options,
        Box::new(|_cc| Ok(Box::new(BroadcasterApp::default()))),
    )
    .expect("eframe application failed to run");
}
