//! Board info handshake.
//!
//! After a connection is established the host waits for the board to settle,
//! requests its firmware identification, re-sends the request a bounded number
//! of times, and finally reports the firmware as unknown. Heartbeats are held
//! back while the handshake is pending.

use crate::ProtocolTiming;
use affine_protocol::{BoardInfo, ProtocolError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting to send or waiting for a reply.
    Pending,
    /// A valid reply was received.
    Identified,
    /// Gave up or received a malformed reply.
    Unknown,
}

/// What the supervisor should do after [`BoardInfoHandshake::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    Idle,
    SendRequest,
    /// The handshake just timed out. Log the firmware as unknown.
    GiveUp,
}

/// Result of feeding a reply to [`BoardInfoHandshake::on_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// First valid identification since connecting, or first after the
    /// firmware was reported unknown.
    Identified(BoardInfo),
    /// Valid, but the version was already reported.
    Duplicate,
    /// The payload could not be parsed.
    Malformed(ProtocolError),
}

#[derive(Debug, Clone)]
pub struct BoardInfoHandshake {
    connected_at: Instant,
    requested_at: Option<Instant>,
    retries_left: u32,
    state: HandshakeState,
    delay: Duration,
    timeout: Duration,
    give_up: Duration,
}

impl BoardInfoHandshake {
    pub fn new(timing: &ProtocolTiming, connected_at: Instant) -> Self {
        Self {
            connected_at,
            requested_at: None,
            retries_left: timing.board_info_retries,
            state: HandshakeState::Pending,
            delay: timing.board_info_delay(),
            timeout: timing.board_info_timeout(),
            give_up: timing.board_info_give_up(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == HandshakeState::Pending
    }

    pub fn poll(&mut self, now: Instant) -> HandshakeAction {
        if !self.is_pending() {
            return HandshakeAction::Idle;
        }

        if now.saturating_duration_since(self.connected_at) >= self.give_up {
            self.state = HandshakeState::Unknown;
            return HandshakeAction::GiveUp;
        }

        match self.requested_at {
            None if now.saturating_duration_since(self.connected_at) >= self.delay => {
                HandshakeAction::SendRequest
            }
            Some(at)
                if self.retries_left > 0 && now.saturating_duration_since(at) >= self.timeout =>
            {
                HandshakeAction::SendRequest
            }
            _ => HandshakeAction::Idle,
        }
    }

    /// Records that a request was written at `now`.
    pub fn mark_requested(&mut self, now: Instant) {
        if self.requested_at.is_some() {
            self.retries_left = self.retries_left.saturating_sub(1);
        }
        self.requested_at = Some(now);
    }

    pub fn on_reply(&mut self, payload: &[u8]) -> ReplyOutcome {
        match BoardInfo::parse(payload) {
            Ok(info) => {
                let first = self.state != HandshakeState::Identified;
                self.state = HandshakeState::Identified;
                if first {
                    ReplyOutcome::Identified(info)
                } else {
                    ReplyOutcome::Duplicate
                }
            }
            Err(e) => {
                if self.state == HandshakeState::Pending {
                    self.state = HandshakeState::Unknown;
                }
                ReplyOutcome::Malformed(e)
            }
        }
    }
}
