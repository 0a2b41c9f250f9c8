//! Best-effort cancellation set for in-flight streamed requests. Concurrent
//! insert from the receive-loop, concurrent read from the send-loop — a
//! `DashMap`-backed set covers both without a dedicated mutex.

use dashmap::DashSet;

#[derive(Default)]
pub struct CancellationRegistry {
    cancelled: DashSet<String>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, request_id: &str) {
        self.cancelled.insert(request_id.to_string());
    }

    /// Checked by the producer loop before every chunk send.
    pub fn is_cancelled(&self, request_id: &str) -> bool {
        self.cancelled.contains(request_id)
    }

    /// Called once the terminal event for `request_id` has been sent, so
    /// the set does not grow unbounded across the process lifetime.
    pub fn clear(&self, request_id: &str) {
        self.cancelled.remove(request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_then_check_observes_it() {
        let reg = CancellationRegistry::new();
        assert!(!reg.is_cancelled("r1"));
        reg.cancel("r1");
        assert!(reg.is_cancelled("r1"));
    }

    #[test]
    fn clear_removes_the_flag() {
        let reg = CancellationRegistry::new();
        reg.cancel("r1");
        reg.clear("r1");
        assert!(!reg.is_cancelled("r1"));
    }
}
