//! Periodic status refresh for every active session on a board.
//!
//! Each tick scans the board and spawns one refresh per active session,
//! skipping sessions whose previous refresh has not returned yet. Polling
//! pauses while no Devin API key is available.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::api_client::BackendApi;
use super::board::IssueBoard;
use crate::service::models::Credential;

pub type SharedBoard = Arc<Mutex<IssueBoard>>;

/// Why [`SessionPoller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Cancelled,
    /// No tracked session is active any more.
    Idle,
}

pub struct SessionPoller {
    backend: Arc<dyn BackendApi>,
    board: SharedBoard,
    api_key: watch::Receiver<Option<Credential>>,
    interval: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
    stop_when_idle: bool,
}

/// Clears a session's in-flight mark when its refresh task ends.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    session_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

impl SessionPoller {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        board: SharedBoard,
        api_key: watch::Receiver<Option<Credential>>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            board,
            api_key,
            interval,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            stop_when_idle: false,
        }
    }

    /// Return from [`run`](Self::run) once nothing on the board is active.
    pub fn stop_when_idle(mut self, stop: bool) -> Self {
        self.stop_when_idle = stop;
        self
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_idle(&self) -> bool {
        let active = self
            .board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .has_active();
        !active && self.in_flight_count() == 0
    }

    /// Scan the board once. Returns how many refreshes were started.
    pub fn tick(&self) -> usize {
        let Some(key) = self.api_key.borrow().clone() else {
            debug!("no Devin API key, polling paused");
            return 0;
        };

        let candidates = self
            .board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pollable_sessions();

        let mut started = 0;
        for session_id in candidates {
            if !self.lock_in_flight().insert(session_id.clone()) {
                debug!(session_id = %session_id, "refresh still in flight, skipping");
                continue;
            }
            let guard = InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
                session_id: session_id.clone(),
            };
            let backend = Arc::clone(&self.backend);
            let board = Arc::clone(&self.board);
            let key = key.clone();

            tokio::spawn(async move {
                let result = backend.session(&guard.session_id, &key).await;
                board
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply_refresh(&guard.session_id, result);
                drop(guard);
            });
            debug!(session_id = %session_id, "refresh started");
            started += 1;
        }
        started
    }

    /// Tick every `interval` until cancelled (or idle, when enabled).
    pub async fn run(self, cancel: CancellationToken) -> PollOutcome {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("poller cancelled");
                    return PollOutcome::Cancelled;
                }
                _ = ticker.tick() => {
                    if self.stop_when_idle && self.is_idle() {
                        debug!("no active sessions, poller stopping");
                        return PollOutcome::Idle;
                    }
                    self.tick();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::client::board::testing::{FakeBackend, response};
    use crate::service::models::{RepoSlug, SessionKind, SessionStatus};

    fn setup(
        backend: Arc<FakeBackend>,
        key: Option<&str>,
        interval: Duration,
    ) -> (SessionPoller, SharedBoard, watch::Sender<Option<Credential>>) {
        let mut board = IssueBoard::new(RepoSlug::parse("octo/demo").unwrap());
        board.track(response("s1", "scoping", SessionKind::Scope, 1));
        let board = Arc::new(Mutex::new(board));
        let (tx, rx) = watch::channel(key.map(Credential::new));
        let poller = SessionPoller::new(backend, Arc::clone(&board), rx, interval);
        (poller, board, tx)
    }

    async fn wait_until<F: Fn() -> bool>(check: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_tick_skips_session_with_refresh_in_flight() {
        let backend = Arc::new(FakeBackend::default());
        *backend.delay.lock().unwrap() = Duration::from_millis(200);
        backend.set_refresh(response("s1", "scoping", SessionKind::Scope, 1));
        let (poller, _board, _tx) = setup(backend.clone(), Some("k"), Duration::from_secs(10));

        assert_eq!(poller.tick(), 1);
        assert_eq!(poller.tick(), 0);
        assert_eq!(poller.in_flight_count(), 1);

        wait_until(|| poller.in_flight_count() == 0).await;
        assert_eq!(backend.session_calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.tick(), 1);
    }

    #[tokio::test]
    async fn test_never_two_refreshes_for_one_session() {
        let backend = Arc::new(FakeBackend::default());
        *backend.delay.lock().unwrap() = Duration::from_millis(40);
        backend.set_refresh(response("s1", "scoping", SessionKind::Scope, 1));
        let (poller, _board, _tx) = setup(backend.clone(), Some("k"), Duration::from_millis(5));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poller.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), PollOutcome::Cancelled);

        assert!(backend.session_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finished_session_stops_polling() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_refresh(response("s1", "finished", SessionKind::Scope, 1));
        let (poller, board, _tx) = setup(backend.clone(), Some("k"), Duration::from_millis(10));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            poller.stop_when_idle(true).run(CancellationToken::new()),
        )
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Idle);
        assert_eq!(backend.session_calls.load(Ordering::SeqCst), 1);
        let board = board.lock().unwrap();
        assert_eq!(board.session(1).unwrap().record.status, SessionStatus::Finished);
    }

    #[tokio::test]
    async fn test_paused_without_key_then_resumes() {
        let backend = Arc::new(FakeBackend::default());
        let (poller, _board, tx) = setup(backend.clone(), None, Duration::from_secs(10));

        assert_eq!(poller.tick(), 0);
        assert_eq!(backend.session_calls.load(Ordering::SeqCst), 0);

        tx.send(Some(Credential::new("k"))).unwrap();
        assert_eq!(poller.tick(), 1);
        wait_until(|| backend.session_calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_record_and_sets_banner() {
        let backend = Arc::new(FakeBackend::default());
        *backend.failing.lock().unwrap() = true;
        let (poller, board, _tx) = setup(backend.clone(), Some("k"), Duration::from_secs(10));

        assert_eq!(poller.tick(), 1);
        wait_until(|| poller.in_flight_count() == 0).await;

        let board = board.lock().unwrap();
        assert_eq!(board.session(1).unwrap().record.status, SessionStatus::Scoping);
        assert!(board.error().unwrap().contains("Failed to refresh session s1"));
    }

    #[tokio::test]
    async fn test_cancel_before_first_refresh() {
        let backend = Arc::new(FakeBackend::default());
        let (poller, _board, _tx) = setup(backend, None, Duration::from_millis(5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(poller.run(cancel).await, PollOutcome::Cancelled);
    }
}
