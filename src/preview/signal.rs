// SPDX-License-Identifier: GPL-3.0-only

//! Render-requested signal
//!
//! Any thread may request a redraw. Requests made while one is already
//! pending coalesce into a single draw cycle.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Result of waiting on a [`RedrawSignal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A redraw was requested
    Redraw,
    /// No request arrived before the timeout
    TimedOut,
    /// The signal was closed; the render loop should exit
    Closed,
}

#[derive(Debug, Default)]
struct SignalState {
    pending: bool,
    closed: bool,
}

/// Condition-variable backed redraw request flag
#[derive(Debug, Default)]
pub struct RedrawSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl RedrawSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the render thread for one more draw cycle
    pub fn request(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.closed {
            return;
        }
        state.pending = true;
        self.condvar.notify_one();
    }

    /// Wake the render loop for good
    pub fn close(&self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|state| state.closed).unwrap_or(true)
    }

    /// Whether a request is waiting to be picked up
    pub fn is_pending(&self) -> bool {
        self.state.lock().map(|state| state.pending).unwrap_or(false)
    }

    /// Block until a redraw is requested or the signal is closed
    pub fn wait(&self) -> WaitOutcome {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            if state.closed {
                return WaitOutcome::Closed;
            }
            if state.pending {
                state.pending = false;
                return WaitOutcome::Redraw;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (mut state, _) = self
            .condvar
            .wait_timeout_while(state, timeout, |state| !state.pending && !state.closed)
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.closed {
            WaitOutcome::Closed
        } else if state.pending {
            state.pending = false;
            WaitOutcome::Redraw
        } else {
            WaitOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_requests_coalesce() {
        let signal = RedrawSignal::new();
        signal.request();
        signal.request();
        assert_eq!(signal.wait(), WaitOutcome::Redraw);
        assert_eq!(
            signal.wait_timeout(Duration::from_millis(10)),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn test_close_wakes_waiter() {
        let signal = Arc::new(RedrawSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        };
        thread::sleep(Duration::from_millis(20));
        signal.close();
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Closed);
    }

    #[test]
    fn test_request_after_close_is_ignored() {
        let signal = RedrawSignal::new();
        signal.close();
        signal.request();
        assert!(!signal.is_pending());
        assert!(signal.is_closed());
    }
}
