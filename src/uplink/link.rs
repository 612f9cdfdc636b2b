//! Per-connection link state.
//!
//! Everything here lives exactly as long as one uplink connection; the
//! network state itself survives in [`crate::state::Network`] and is torn
//! down separately.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::UplinkBlock;

/// Extra kills tolerated per second before a kill fight is declared.
const KILL_FIGHT_SLACK: usize = 5;

/// Why the session wants to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub reason: String,
    /// Stop the process instead of reconnecting.
    pub shutdown: bool,
}

/// Kills of our own clients within the current second.
#[derive(Debug, Clone, Copy, Default)]
struct KillGuard {
    second: i64,
    count: usize,
}

#[derive(Debug)]
pub struct LinkState {
    /// Configured uplink name.
    pub uplink_name: String,
    receive_password: String,
    /// SID announced in the uplink's `PASS`, if any.
    pub uplink_sid: Option<String>,
    pub connected_at: Instant,
    pub last_recv: Instant,
    pub last_ping: Option<Instant>,
    pub last_pong: Option<Instant>,
    bursting: bool,
    burst_started: Instant,
    kills: KillGuard,
    close: Option<CloseRequest>,
}

impl LinkState {
    pub fn new(uplink_name: &str, receive_password: &str) -> Self {
        let now = Instant::now();
        Self {
            uplink_name: uplink_name.to_string(),
            receive_password: receive_password.to_string(),
            uplink_sid: None,
            connected_at: now,
            last_recv: now,
            last_ping: None,
            last_pong: None,
            bursting: true,
            burst_started: now,
            kills: KillGuard::default(),
            close: None,
        }
    }

    pub fn from_config(block: &UplinkBlock) -> Self {
        Self::new(&block.name, block.receive_password())
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.receive_password == password
    }

    /// Still waiting for the uplink to finish its burst.
    pub fn is_bursting(&self) -> bool {
        self.bursting
    }

    /// Leave the bursting phase. Returns how long it took, or `None` if the
    /// burst was already over.
    pub fn finish_burst(&mut self) -> Option<Duration> {
        if !self.bursting {
            return None;
        }
        self.bursting = false;
        Some(self.burst_started.elapsed())
    }

    pub fn record_recv(&mut self) {
        self.last_recv = Instant::now();
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    pub fn record_pong(&mut self) {
        self.last_pong = Some(Instant::now());
    }

    /// Time since anything arrived from the uplink.
    pub fn idle_for(&self) -> Duration {
        self.last_recv.elapsed()
    }

    /// Count a kill of one of our clients at unix time `now`. Returns false
    /// once more than `5 + local_clients` kills landed in the same second.
    pub fn note_service_kill(&mut self, now: i64, local_clients: usize) -> bool {
        let limit = KILL_FIGHT_SLACK + local_clients;
        if self.kills.second != now && self.kills.count < limit {
            self.kills = KillGuard {
                second: now,
                count: 0,
            };
        }
        self.kills.count += 1;
        self.kills.count < limit
    }

    /// Ask the session to drop the link and reconnect.
    pub fn request_close(&mut self, reason: impl Into<String>) {
        self.close.get_or_insert(CloseRequest {
            reason: reason.into(),
            shutdown: false,
        });
    }

    /// Ask the session to drop the link and stop the process.
    pub fn request_shutdown(&mut self, reason: impl Into<String>) {
        self.close = Some(CloseRequest {
            reason: reason.into(),
            shutdown: true,
        });
    }

    pub fn close_request(&self) -> Option<&CloseRequest> {
        self.close.as_ref()
    }
}
