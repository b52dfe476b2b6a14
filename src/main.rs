#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use beatgrid::{
    midi_note_name, AudioOutput, Command, FrameTimer, Interruption, MidiOutputDevice,
    PlaybackController, PlaybackEvent, SequencerConfig, TriggerSink,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => SequencerConfig::from_json_file(std::path::Path::new(&path))
            .unwrap_or_else(|e| {
                eprintln!("{}; using the default kit", e);
                SequencerConfig::default()
            }),
        None => SequencerConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 440.0])
            .with_title("BEATGRID - Drum Machine"),
        ..Default::default()
    };

    eframe::run_native(
        "BEATGRID",
        options,
        Box::new(move |_cc| Ok(Box::new(DrumMachineApp::new(config)?))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct DrumMachineApp {
    controller: PlaybackController,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,
    frame_timer: FrameTimer,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
}

#[cfg(feature = "gui")]
impl DrumMachineApp {
    fn new(config: SequencerConfig) -> Result<Self, beatgrid::SequencerError> {
        let controller = PlaybackController::from_config(&config)?;
        let audio_output = AudioOutput::new(&config).unwrap_or_else(|e| {
            eprintln!("audio disabled: {}", e);
            AudioOutput::silent()
        });

        Ok(Self {
            controller,
            audio_output,
            midi_output: MidiOutputDevice::new(),
            frame_timer: FrameTimer::new(),
            available_midi_ports: MidiOutputDevice::available_ports(),
            selected_port: None,
        })
    }

    fn apply(&mut self, command: Command) {
        let was_playing = self.controller.is_playing();
        if self.controller.handle(command).is_err() {
            return;
        }
        match (was_playing, self.controller.is_playing()) {
            (false, true) => self.frame_timer.reset(),
            (true, false) => self.midi_output.release_notes(),
            _ => {}
        }
    }

    fn interrupt(&mut self, reason: Interruption) {
        if self.controller.is_playing() {
            self.controller.interrupt(reason);
            self.midi_output.release_notes();
            self.audio_output.stop_all();
        }
    }

    fn handle_playback_events(&mut self) {
        if !self.controller.is_playing() {
            return;
        }
        let delta_ms = self.frame_timer.tick(std::time::Instant::now());

        // drum hits are one-shots; close last frame's MIDI notes before new ones
        self.midi_output.release_notes();

        for event in self.controller.advance(delta_ms) {
            if let PlaybackEvent::Trigger(request) = event {
                self.audio_output.play(&request.sample_id, request.volume);
                self.midi_output.play(&request);
            }
        }
    }

    fn draw_playhead(&self, ui: &mut egui::Ui, width: f32) {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, 24.0), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let bar = egui::Rect::from_min_size(
            egui::pos2(rect.left(), rect.center().y - 5.0),
            egui::vec2(rect.width(), 10.0),
        );
        painter.rect_filled(bar, 4.0, egui::Color32::from_rgb(0x22, 0x18, 0x2d));

        let fraction = self.controller.view().playhead_fraction as f32;
        let x = rect.left() + 12.0 + fraction * (rect.width() - 24.0);
        painter.circle_filled(
            egui::pos2(x, rect.center().y),
            10.0,
            egui::Color32::from_rgb(0xd3, 0x58, 0xf1),
        );
    }
}

#[cfg(feature = "gui")]
impl eframe::App for DrumMachineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (focused, minimized) =
            ctx.input(|i| (i.focused, i.viewport().minimized.unwrap_or(false)));
        if minimized {
            self.interrupt(Interruption::Minimized);
        } else if !focused {
            self.interrupt(Interruption::FocusLost);
        }

        self.handle_playback_events();

        let mut commands = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("BEATGRID - Drum Machine");
            ui.add_space(10.0);

            // MIDI Port Selection
            let mut selected_port_changed = None;
            ui.horizontal(|ui| {
                ui.label("MIDI Output:");
                if self.available_midi_ports.is_empty() {
                    ui.label("No MIDI ports available");
                } else {
                    egui::ComboBox::from_label("")
                        .selected_text(
                            self.selected_port
                                .map(|i| self.available_midi_ports[i].as_str())
                                .unwrap_or("Select port..."),
                        )
                        .show_ui(ui, |ui| {
                            for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                                if ui
                                    .selectable_label(self.selected_port == Some(i), port_name)
                                    .clicked()
                                {
                                    selected_port_changed = Some(i);
                                }
                            }
                        });
                }
            });

            if let Some(port_idx) = selected_port_changed {
                match self.midi_output.connect(port_idx) {
                    Ok(()) => self.selected_port = Some(port_idx),
                    Err(e) => eprintln!("{}", e),
                }
            }

            ui.add_space(10.0);

            // Transport controls
            let view = self.controller.view();
            ui.horizontal(|ui| {
                let label = if view.playing { "⏸ Stop" } else { "▶ Play" };
                if ui.button(label).clicked() {
                    commands.push(Command::TogglePlayback);
                }

                ui.add_space(20.0);

                ui.label("BPM:");
                let mut bpm = view.bpm;
                if ui
                    .add(egui::Slider::new(&mut bpm, 40.0..=300.0).step_by(1.0))
                    .changed()
                {
                    commands.push(Command::SetTempo(bpm));
                }

                ui.add_space(20.0);

                if ui.button("Clear").clicked() {
                    commands.push(Command::Clear);
                }
                if ui.button("Fill").clicked() {
                    commands.push(Command::Fill);
                }
            });

            ui.add_space(20.0);

            let sequencer = self.controller.sequencer();
            for (track_idx, track) in sequencer.tracks().iter().enumerate() {
                ui.horizontal(|ui| {
                    let note = track
                        .midi_note()
                        .map(|n| format!(" ({})", midi_note_name(n)))
                        .unwrap_or_default();
                    let name = format!("{}{}", track.sample_id(), note);
                    ui.add_sized([110.0, 20.0], egui::Label::new(name));

                    let mut volume = track.volume();
                    if ui.add(egui::Slider::new(&mut volume, 0.0..=1.0)).changed() {
                        commands.push(Command::SetVolume { track: track_idx, volume });
                    }

                    for step in track.steps() {
                        let is_current = view.playing && view.current_step == step.index;
                        let button = egui::Button::new(format!("{}", step.index + 1))
                            .min_size(egui::vec2(48.0, 48.0))
                            .fill(if step.toggled {
                                egui::Color32::from_rgb(0xc6, 0x8b, 0xeb)
                            } else if is_current {
                                egui::Color32::from_rgb(0x22, 0x18, 0x2d)
                            } else {
                                egui::Color32::from_rgb(0x13, 0x0e, 0x19)
                            });

                        if ui.add(button).clicked() {
                            commands.push(Command::ToggleStep {
                                track: track_idx,
                                step: step.index,
                            });
                        }
                    }
                });
            }

            ui.add_space(20.0);
            let width = ui.available_width();
            self.draw_playhead(ui, width);

            // Info
            ui.separator();
            ui.label("Click steps to enable/disable them");
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI output connected - audio playback only",
                );
            }
        });

        for command in commands {
            self.apply(command);
        }

        // no repaint loop while stopped
        if self.controller.is_playing() {
            ctx.request_repaint();
        }
    }
}
