//! Process-wide run status shared between the run orchestrator and the
//! HTTP status endpoint.
//!
//! The orchestrator is the only writer; the HTTP side reads concurrently
//! through atomic snapshots, so a reader can never observe a torn state.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;

#[derive(Debug, Default)]
struct RunState {
    last_import: Option<DateTime<Utc>>,
    import_running: bool,
}

/// Owner of the shared run status. One instance per process, behind `Arc`.
pub struct StatusBoard {
    state: RwLock<RunState>,
    schedule: Schedule,
}

/// Immutable point-in-time view served to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub last_import: Option<DateTime<Utc>>,
    pub next_import: Option<DateTime<Utc>>,
    pub import_running: bool,
}

impl StatusBoard {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            state: RwLock::new(RunState::default()),
            schedule,
        }
    }

    /// Mark a run as started. The returned guard flips the state back and
    /// stamps the last-import time when dropped, on every exit path.
    pub fn begin_run(self: &Arc<Self>) -> RunGuard {
        self.state.write().unwrap().import_running = true;
        RunGuard {
            board: Arc::clone(self),
        }
    }

    /// Take an atomic snapshot; the next-import time is computed from the
    /// schedule on demand.
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.read().unwrap();
        StatusSnapshot {
            last_import: state.last_import,
            next_import: self.schedule.upcoming(Utc).next(),
            import_running: state.import_running,
        }
    }

    fn finish_run(&self) {
        let mut state = self.state.write().unwrap();
        state.import_running = false;
        state.last_import = Some(Utc::now());
    }
}

/// RAII token for a running import; see [`StatusBoard::begin_run`].
pub struct RunGuard {
    board: Arc<StatusBoard>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.board.finish_run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn board() -> Arc<StatusBoard> {
        let schedule = Schedule::from_str("0 0 0 * * *").unwrap();
        Arc::new(StatusBoard::new(schedule))
    }

    #[test]
    fn running_flag_flips_once_per_run() {
        let board = board();
        assert!(!board.snapshot().import_running);

        let guard = board.begin_run();
        assert!(board.snapshot().import_running);

        drop(guard);
        assert!(!board.snapshot().import_running);
    }

    #[test]
    fn guard_drop_stamps_last_import() {
        let board = board();
        assert_eq!(board.snapshot().last_import, None);

        let before = Utc::now();
        drop(board.begin_run());

        let last = board.snapshot().last_import.unwrap();
        assert!(last >= before);
        assert!(last <= Utc::now());
    }

    #[test]
    fn last_import_is_stamped_even_when_the_run_body_panics() {
        let board = board();
        let for_run = Arc::clone(&board);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = for_run.begin_run();
            panic!("run body failed");
        }));
        assert!(result.is_err());

        let snapshot = board.snapshot();
        assert!(!snapshot.import_running);
        assert!(snapshot.last_import.is_some());
    }

    #[test]
    fn next_import_is_in_the_future() {
        let snapshot = board().snapshot();
        assert!(snapshot.next_import.unwrap() > Utc::now());
    }

    #[test]
    fn snapshot_serializes_with_camel_case_wire_names() {
        let json = serde_json::to_value(board().snapshot()).unwrap();
        assert!(json.get("lastImport").is_some());
        assert!(json.get("nextImport").is_some());
        assert_eq!(json["importRunning"], serde_json::Value::Bool(false));
        assert_eq!(json["lastImport"], serde_json::Value::Null);
    }
}
