//! CLI command implementations.
//!
//! | Module    | Commands handled                   |
//! |-----------|------------------------------------|
//! | `serve`   | `Serve`                            |
//! | `issues`  | `Issues`                           |
//! | `board`   | `Board`                            |
//! | `session` | `Scope`, `Complete`, `Watch`       |

pub mod board;
pub mod context;
pub mod issues;
pub mod serve;
pub mod session;

pub use board::cmd_board;
pub use context::ClientContext;
pub use issues::cmd_issues;
pub use serve::cmd_serve;
pub use session::{cmd_complete, cmd_scope, cmd_watch};
