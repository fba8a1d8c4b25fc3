//! Terminal rendering of clone and install progress events.
//!
//! The library pushes events into an [`EventSink`]; a renderer thread owns
//! the receiving end and drives an `indicatif` bar until the sink is dropped.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};

use crate::events::EventSink;
use crate::git::{ClonePhase, CloneProgress};
use crate::installer::{InstallPhase, InstallProgress};

/// An event sink with an optional renderer thread behind it.
pub struct ProgressRenderer<T> {
    sink: EventSink<T>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> ProgressRenderer<T> {
    fn spawn(enabled: bool, render: impl FnOnce(Receiver<T>) + Send + 'static) -> Self {
        if !enabled {
            return Self {
                sink: EventSink::none(),
                handle: None,
            };
        }
        let (sink, events) = EventSink::channel();
        Self {
            sink,
            handle: Some(std::thread::spawn(move || render(events))),
        }
    }

    #[must_use]
    pub const fn sink(&self) -> &EventSink<T> {
        &self.sink
    }

    /// Close the stream and wait for the renderer to clear its bar.
    pub fn finish(mut self) {
        self.sink = EventSink::none();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Whether progress bars should be drawn at all.
#[must_use]
pub fn progress_enabled(robot: bool) -> bool {
    !robot && console::Term::stderr().is_term()
}

fn styled(bar: &ProgressBar, template: &str) {
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars("=> "));
    }
}

#[must_use]
pub fn clone_renderer(enabled: bool, label: String) -> ProgressRenderer<CloneProgress> {
    ProgressRenderer::spawn(enabled, move |events: Receiver<CloneProgress>| {
        let bar = ProgressBar::new_spinner();
        styled(&bar, "{spinner:.green} {msg}");
        bar.enable_steady_tick(Duration::from_millis(100));

        for event in events {
            match event.phase {
                ClonePhase::Connecting => bar.set_message(format!("Connecting to {label}")),
                ClonePhase::Cloning => bar.set_message(format!(
                    "Cloning {label} ({}s / {}s)",
                    event.elapsed_secs, event.timeout_secs
                )),
                ClonePhase::Done => {
                    bar.finish_and_clear();
                    return;
                }
                ClonePhase::Error => {
                    bar.abandon_with_message(format!(
                        "Clone failed: {}",
                        event.message.unwrap_or_default()
                    ));
                    return;
                }
            }
        }
        bar.finish_and_clear();
    })
}

#[must_use]
pub fn install_renderer(enabled: bool) -> ProgressRenderer<InstallProgress> {
    ProgressRenderer::spawn(enabled, |events: Receiver<InstallProgress>| {
        let bar = ProgressBar::new(0);
        styled(&bar, "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}");

        for event in events {
            bar.set_length(event.total as u64);
            bar.set_position(event.completed as u64);
            match event.phase {
                InstallPhase::Installing => {
                    bar.set_message(event.current_skill.unwrap_or_default());
                }
                InstallPhase::WritingLock => {
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar.set_message("Writing lock file");
                }
            }
        }
        bar.finish_and_clear();
    })
}
