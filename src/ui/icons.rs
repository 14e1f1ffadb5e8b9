//! Shared UI icons.
//!
//! Each icon falls back to a plain-text marker on terminals without emoji
//! support.

use console::Emoji;

use crate::service::models::SessionStatus;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Session indicators
pub static SCOPING: Emoji<'_, '_> = Emoji("🔍 ", "[?]");
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static BLOCKER: Emoji<'_, '_> = Emoji("🚧 ", "[BLOCK]");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "->");
pub static PLAN: Emoji<'_, '_> = Emoji("📝 ", "~");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");

/// Icon for a session status.
pub fn status_icon(status: &SessionStatus) -> &'static Emoji<'static, 'static> {
    match status {
        SessionStatus::Scoping => &SCOPING,
        SessionStatus::Implementing => &RUNNING,
        SessionStatus::Blocked => &BLOCKER,
        SessionStatus::Finished => &CHECK,
        SessionStatus::Other(_) => &CLOCK,
    }
}
