// SPDX-License-Identifier: GPL-3.0-only
//! Producer thread lifecycle
//!
//! Runs one closure repeatedly on a named thread until it asks to stop or
//! the controller is stopped. Stopping joins the thread, so once `stop()`
//! returns the closure will never run again.

use crate::errors::CaptureError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// What the loop body wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    /// Leave the loop; the thread exits
    Stop,
}

/// A closure driven repeatedly on its own named thread
///
/// ```ignore
/// let mut producer = CaptureLoopController::start("edgecam-capture", move || producer.step())?;
/// producer.stop();
/// ```
pub struct CaptureLoopController {
    name: String,
    stop_requested: Arc<AtomicBool>,
    worker: Option<JoinHandle<u64>>,
}

impl CaptureLoopController {
    /// Spawn the thread and start calling `body`
    ///
    /// `body` runs until it returns [`LoopAction::Stop`] or a stop is
    /// requested; the request is checked before every call.
    pub fn start<F>(name: &str, mut body: F) -> Result<Self, CaptureError>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_requested = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop_requested = Arc::clone(&stop_requested);
            thread::Builder::new()
                .name(name.to_owned())
                .spawn(move || {
                    let mut iterations = 0u64;
                    while !stop_requested.load(Ordering::Acquire) {
                        iterations += 1;
                        if body() == LoopAction::Stop {
                            break;
                        }
                    }
                    iterations
                })
                .map_err(|e| CaptureError::Unavailable(format!("failed to spawn {}: {}", name, e)))?
        };

        info!(name, "Producer loop started");
        Ok(Self {
            name: name.to_owned(),
            stop_requested,
            worker: Some(worker),
        })
    }

    /// False once the body asked to stop or the thread was joined
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Ask the loop to exit after the current iteration
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Request a stop and block until the thread is gone
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Block until the thread exits on its own
    pub fn join(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(iterations) => debug!(name = %self.name, iterations, "Producer loop exited"),
            Err(_) => warn!(name = %self.name, "Producer loop panicked"),
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_joins_before_returning() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        controller.stop();

        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_is_running_until_dropped() {
        let controller = CaptureLoopController::start("test-running", || {
            thread::sleep(Duration::from_millis(10));
            LoopAction::Continue
        })
        .unwrap();

        assert!(controller.is_running());
        drop(controller);
    }
}
