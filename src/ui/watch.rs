//! Spinner shown while a session is being watched.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::board_view::render_session;
use super::icons::CROSS;
use crate::service::models::SessionResponse;

pub struct WatchUI {
    spinner: ProgressBar,
}

impl WatchUI {
    pub fn new(label: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {msg}")
                .expect("progress bar template is a valid static string"),
        );
        spinner.set_prefix(label.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }

    /// Show the latest known state of the session.
    pub fn update(&self, session: &SessionResponse) {
        let record = &session.record;
        let message = record.message.as_deref().unwrap_or("");
        self.spinner.set_message(format!(
            "{} {}",
            style(&record.status).yellow(),
            style(message).dim()
        ));
    }

    pub fn banner(&self, error: &str) {
        self.spinner
            .println(format!("{}{}", CROSS, style(error).red()));
    }

    /// Stop the spinner and print the final state.
    pub fn finish(&self, session: Option<&SessionResponse>) {
        self.spinner.finish_and_clear();
        if let Some(session) = session {
            println!("{}", render_session(session));
        }
    }
}
