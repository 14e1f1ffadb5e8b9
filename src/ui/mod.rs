pub mod board_view;
pub mod icons;
pub mod watch;

pub use board_view::{render_board, render_session};
pub use watch::WatchUI;
