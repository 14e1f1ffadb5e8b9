//! Backend service: GitHub issues in, Devin sessions out.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  HTTP  ┌─────────────────────────────────────────────────┐
//! │  Client  │ ─────> │  server.rs  (axum Router, ServerConfig)         │
//! │  (CLI /  │ <───── │    └─ api.rs  (route handlers, ApiError)        │
//! │  browser)│        │         │                                       │
//! └──────────┘        │         v                                       │
//!                     │  dispatcher.rs  (scope / complete / refresh)    │
//!                     │     │            │              │               │
//!                     │     v            v              v               │
//!                     │  github.rs    devin.rs     registry.rs          │
//!                     │  (IssueSource)(AgentService)(SessionRegistry)   │
//!                     └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                            |
//! |-----------|-----------------------------------------------------------|
//! | `models`  | `RepoSlug`, `Credential`, `Issue`, `SessionRecord`        |
//! | `prompts` | Scope/complete prompts and `CONFIDENCE:` / plan parsing   |
//! | `http`    | Shared `reqwest` client and upstream error classification |
//!
//! ## Typical Request Flow (scope an issue)
//!
//! 1. `POST /api/scope` → `api::scope_issue()` validates the repo slug.
//! 2. `Dispatcher::scope_issue()` fetches the issue from GitHub with the
//!    caller's token and builds the scoping prompt.
//! 3. A Devin session is created with the caller's key; the resulting
//!    `SessionRecord` (`status=scoping`) is stored under `(repo, issue)`.
//! 4. The client polls `GET /api/session/{id}`; each call reconciles the
//!    stored record with Devin's view until the status is terminal.

pub mod api;
pub mod devin;
pub mod dispatcher;
pub mod github;
pub mod http;
pub mod models;
pub mod prompts;
pub mod registry;
pub mod server;
