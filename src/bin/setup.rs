//! PPVviaVLC setup tool: find, install, or update the VLC player.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use eframe::egui;

use ppv_via_vlc::install::{self, LiveSetup, SetupOps, UserPrompt};
use ppv_via_vlc::player;
use ppv_via_vlc::process;
use ppv_via_vlc::version::VersionInfo;

/// State shared between the UI thread and the setup workers.
#[derive(Default)]
struct SharedState {
    log: String,
    status: String,
    busy: bool,
    /// Download progress, 0.0 to 1.0, while a transfer is running.
    progress: Option<f32>,
    /// Question a worker is blocked on, if any.
    ask: Option<Ask>,
    /// "Found VLC at ..." display line.
    player_display: String,
}

enum Ask {
    Confirm {
        message: String,
        reply: mpsc::Sender<bool>,
    },
    PickPlayer {
        reply: mpsc::Sender<Option<PathBuf>>,
    },
}

fn push_log(shared: &Arc<Mutex<SharedState>>, line: impl AsRef<str>) {
    let mut state = shared.lock().expect("state lock poisoned");
    state.log.push_str(line.as_ref());
    state.log.push('\n');
}

fn set_status(shared: &Arc<Mutex<SharedState>>, status: impl Into<String>) {
    shared.lock().expect("state lock poisoned").status = status.into();
}

/// [`SetupOps`] wiring that wraps [`LiveSetup`] and mirrors progress and
/// log lines into the UI.
struct GuiSetup {
    live: LiveSetup,
    shared: Arc<Mutex<SharedState>>,
}

impl GuiSetup {
    fn new(shared: Arc<Mutex<SharedState>>, ctx: egui::Context) -> ppv_via_vlc::Result<Self> {
        let progress_shared = shared.clone();
        let live = LiveSetup::new()?.with_progress(move |done, total| {
            let fraction = match total {
                Some(total) if total > 0 => done as f32 / total as f32,
                _ => 0.0,
            };
            progress_shared.lock().expect("state lock poisoned").progress = Some(fraction);
            ctx.request_repaint();
        });
        Ok(Self { live, shared })
    }
}

impl SetupOps for GuiSetup {
    fn locate_installed(&mut self) -> Option<PathBuf> {
        let found = self.live.locate_installed();
        match &found {
            Some(path) => {
                let line = format!("Found VLC at {}", path.display());
                push_log(&self.shared, &line);
                self.shared.lock().expect("state lock poisoned").player_display = line;
            }
            None => push_log(&self.shared, "VLC not found in the default locations"),
        }
        found
    }

    fn latest_version(&mut self) -> Option<VersionInfo> {
        push_log(&self.shared, "Checking the latest published version...");
        let info = self.live.latest_version();
        match &info {
            Some(info) => push_log(&self.shared, format!("Latest version: {}", info.latest)),
            None => push_log(&self.shared, "Could not read the version endpoint"),
        }
        info
    }

    fn installed_version(&mut self, path: &std::path::Path) -> Option<String> {
        let have = self.live.installed_version(path);
        match &have {
            Some(v) => push_log(&self.shared, format!("Installed VLC version: {}", v)),
            None => push_log(&self.shared, "Could not read the installed VLC version"),
        }
        have
    }

    fn download(&mut self, url: &str, dest: &std::path::Path) -> ppv_via_vlc::Result<()> {
        push_log(&self.shared, format!("Downloading {}", url));
        let result = self.live.download(url, dest);
        self.shared.lock().expect("state lock poisoned").progress = None;
        if result.is_ok() {
            push_log(&self.shared, format!("Installer saved to {}", dest.display()));
        }
        result
    }

    fn launch_installer(&mut self, path: &std::path::Path) -> ppv_via_vlc::Result<()> {
        push_log(&self.shared, "Running the installer...");
        self.live.launch_installer(path)
    }
}

/// [`UserPrompt`] that parks the worker on a channel until the UI answers.
struct GuiPrompt {
    shared: Arc<Mutex<SharedState>>,
    ctx: egui::Context,
}

impl UserPrompt for GuiPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        let (tx, rx) = mpsc::channel();
        self.shared.lock().expect("state lock poisoned").ask = Some(Ask::Confirm {
            message: message.to_owned(),
            reply: tx,
        });
        self.ctx.request_repaint();
        // window closed before answering reads as "no"
        rx.recv().unwrap_or(false)
    }

    fn pick_player(&mut self) -> Option<PathBuf> {
        let (tx, rx) = mpsc::channel();
        self.shared.lock().expect("state lock poisoned").ask = Some(Ask::PickPlayer { reply: tx });
        self.ctx.request_repaint();
        rx.recv().unwrap_or(None)
    }
}

struct SetupApp {
    shared: Arc<Mutex<SharedState>>,
    manual_path: String,
    show_quit_confirmation: bool,
}

impl SetupApp {
    fn new() -> Self {
        let shared = SharedState {
            status: "Ready".to_owned(),
            ..SharedState::default()
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            manual_path: String::new(),
            show_quit_confirmation: false,
        }
    }

    fn find_player(&mut self) {
        let mut state = self.shared.lock().expect("state lock poisoned");
        match player::locate() {
            Some(path) => state.player_display = format!("Found VLC at {}", path.display()),
            None => {
                state.player_display =
                    "VLC not found in the default locations; enter its path below".to_owned();
            }
        }
    }

    fn start_download(&mut self, ctx: &egui::Context) {
        let shared = self.shared.clone();
        let ctx = ctx.clone();
        {
            let mut state = shared.lock().expect("state lock poisoned");
            state.busy = true;
            state.status = "Downloading the VLC installer...".to_owned();
        }
        thread::spawn(move || {
            let dest = install::installer_destination();
            push_log(
                &shared,
                format!("Downloading {}", install::FALLBACK_INSTALLER_URL),
            );
            let progress_shared = shared.clone();
            let progress_ctx = ctx.clone();
            let downloaded = install::download_client().and_then(|client| {
                install::download_installer(
                    &client,
                    install::FALLBACK_INSTALLER_URL,
                    &dest,
                    move |done, total| {
                        let fraction = match total {
                            Some(total) if total > 0 => done as f32 / total as f32,
                            _ => 0.0,
                        };
                        progress_shared.lock().expect("state lock poisoned").progress =
                            Some(fraction);
                        progress_ctx.request_repaint();
                    },
                )
            });
            let outcome = downloaded.and_then(|path| {
                push_log(&shared, format!("Installer saved to {}", path.display()));
                process::spawn_detached(&path, std::iter::empty::<&str>())
            });
            let mut state = shared.lock().expect("state lock poisoned");
            match &outcome {
                Ok(()) => state.status = "Installer started".to_owned(),
                Err(e) => {
                    state.status = format!("Failed to download VLC: {}", e);
                    state.log.push_str(&format!("ERROR: {}\n", e));
                }
            }
            state.busy = false;
            state.progress = None;
            // re-probe once the installer is on its way, as the finder button does
            if let Some(path) = player::locate() {
                state.player_display = format!("Found VLC at {}", path.display());
            }
            drop(state);
            ctx.request_repaint();
        });
    }

    fn start_update_check(&mut self, ctx: &egui::Context) {
        let shared = self.shared.clone();
        let ctx = ctx.clone();
        {
            let mut state = shared.lock().expect("state lock poisoned");
            state.busy = true;
            state.status = "Checking for updates...".to_owned();
        }
        thread::spawn(move || {
            let outcome = match GuiSetup::new(shared.clone(), ctx.clone()) {
                Ok(mut ops) => {
                    let mut prompt = GuiPrompt {
                        shared: shared.clone(),
                        ctx: ctx.clone(),
                    };
                    install::ensure_up_to_date(&mut ops, &mut prompt).message()
                }
                Err(e) => format!("setup failed: {}", e),
            };
            push_log(&shared, &outcome);
            set_status(&shared, outcome);
            let mut state = shared.lock().expect("state lock poisoned");
            state.busy = false;
            state.progress = None;
            drop(state);
            ctx.request_repaint();
        });
    }

    fn answer_confirm(&mut self, answer: bool) {
        let taken = self.shared.lock().expect("state lock poisoned").ask.take();
        if let Some(Ask::Confirm { reply, .. }) = taken {
            let _ = reply.send(answer);
        }
    }

    fn answer_pick(&mut self, picked: Option<PathBuf>) {
        let taken = self.shared.lock().expect("state lock poisoned").ask.take();
        if let Some(Ask::PickPlayer { reply }) = taken {
            let _ = reply.send(picked);
        }
    }
}

enum AskView {
    Confirm(String),
    Pick,
}

impl eframe::App for SetupApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            egui::menu::bar(ui, |ui| {
                ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.heading("PPVviaVLC Setup");
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Quit").clicked() {
                        self.show_quit_confirmation = true;
                    }
                });
            });
            ui.add_space(5.0);
        });

        let (busy, status, progress, player_display, ask_view) = {
            let state = self.shared.lock().expect("state lock poisoned");
            let ask_view = match &state.ask {
                Some(Ask::Confirm { message, .. }) => Some(AskView::Confirm(message.clone())),
                Some(Ask::PickPlayer { .. }) => Some(AskView::Pick),
                None => None,
            };
            (
                state.busy,
                state.status.clone(),
                state.progress,
                state.player_display.clone(),
                ask_view,
            )
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);

            ui.vertical(|ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new("I already have VLC installed"))
                    .clicked()
                {
                    self.find_player();
                }
                ui.add_space(5.0);
                if ui
                    .add_enabled(!busy, egui::Button::new("Download and install VLC"))
                    .clicked()
                {
                    self.start_download(ctx);
                }
                ui.add_space(5.0);
                if ui
                    .add_enabled(!busy, egui::Button::new("Check for updates"))
                    .clicked()
                {
                    self.start_update_check(ctx);
                }
            });

            ui.add_space(10.0);
            if !player_display.is_empty() {
                ui.label(&player_display);
            }

            ui.horizontal(|ui| {
                ui.label("VLC path:");
                ui.text_edit_singleline(&mut self.manual_path);
            });

            ui.add_space(10.0);
            ui.label(&status);
            if let Some(fraction) = progress {
                ui.add_space(5.0);
                ui.add(egui::ProgressBar::new(fraction).show_percentage());
            }

            ui.add_space(10.0);
            ui.separator();
            ui.heading("Log");
            ui.add_space(5.0);
            egui::ScrollArea::vertical().stick_to_bottom(true).show(ui, |ui| {
                let state = self.shared.lock().expect("state lock poisoned");
                ui.monospace(&state.log);
            });
        });

        match ask_view {
            Some(AskView::Confirm(message)) => {
                egui::Window::new("Confirm")
                    .collapsible(false)
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label(&message);
                        ui.add_space(10.0);
                        ui.horizontal(|ui| {
                            if ui.button("Yes").clicked() {
                                self.answer_confirm(true);
                            }
                            if ui.button("No").clicked() {
                                self.answer_confirm(false);
                            }
                        });
                    });
            }
            Some(AskView::Pick) => {
                egui::Window::new("Locate VLC")
                    .collapsible(false)
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label("VLC was not found. Enter the full path to the executable:");
                        ui.text_edit_singleline(&mut self.manual_path);
                        ui.add_space(10.0);
                        ui.horizontal(|ui| {
                            if ui.button("Use this path").clicked() {
                                let trimmed = self.manual_path.trim();
                                if !trimmed.is_empty() {
                                    self.answer_pick(Some(PathBuf::from(trimmed)));
                                }
                            }
                            if ui.button("I don't have VLC").clicked() {
                                self.answer_pick(None);
                            }
                        });
                    });
            }
            None => {}
        }

        if self.show_quit_confirmation {
            egui::Window::new("Quit")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Quit the setup tool?");
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        if ui.button("Yes, quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                        if ui.button("No, stay").clicked() {
                            self.show_quit_confirmation = false;
                        }
                    });
                });
        }
    }
}

fn main() {
    env_logger::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "PPVviaVLC Setup",
        native_options,
        Box::new(|_cc| Ok(Box::new(SetupApp::new()))),
    )
    .expect("eframe application failed to run");
}
