//! CLI-side client of the backend API.
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | `api_client` | `BackendApi` trait + `BackendClient` over `reqwest`     |
//! | `board`      | `IssueBoard`: issues, one session per issue, error banner |
//! | `poller`     | `SessionPoller`: interval refresh, one in flight per session |

pub mod api_client;
pub mod board;
pub mod poller;

pub use api_client::{BackendApi, BackendClient};
pub use board::IssueBoard;
pub use poller::{PollOutcome, SessionPoller, SharedBoard};
