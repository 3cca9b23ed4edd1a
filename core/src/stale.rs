//! Last-write-wins guard for chat replies.
//!
//! Every submitted message takes a ticket. A reply is applied only if its
//! ticket is still the latest one issued; anything older was superseded
//! while in flight and is dropped on arrival.

use chrono::Utc;
use serde::Serialize;

/// Send-time stamp of one request, in wall-clock milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestTicket(i64);

impl RequestTicket {
    pub fn millis(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaleGuard {
    latest: Option<RequestTicket>,
}

impl StaleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket stamped with the current time.
    pub fn issue(&mut self) -> RequestTicket {
        self.issue_at(Utc::now().timestamp_millis())
    }

    /// Issue a ticket for `now_ms`. Tickets are strictly increasing even if
    /// two sends land in the same millisecond or the clock steps back.
    pub fn issue_at(&mut self, now_ms: i64) -> RequestTicket {
        let stamp = match self.latest {
            Some(RequestTicket(prev)) if now_ms <= prev => prev + 1,
            _ => now_ms,
        };
        let ticket = RequestTicket(stamp);
        self.latest = Some(ticket);
        ticket
    }

    pub fn latest(&self) -> Option<RequestTicket> {
        self.latest
    }

    /// `false` once a newer ticket has been issued.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        match self.latest {
            Some(latest) => ticket >= latest,
            None => true,
        }
    }
}
