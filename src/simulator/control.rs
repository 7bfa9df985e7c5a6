//! Pause/resume/terminate control shared between a World's worker (running
//! `run_for`'s step loop) and whichever thread calls `pause`/`resume`/
//! `terminate`.
//!
//! spec.md §4.E queues `pause`/`resume`/`terminate` as worker invocations,
//! but a long-running `run_for` occupies the worker for its entire
//! duration — a queued pause would never run until the loop already
//! finished. We instead expose these as a lock-free-ish control block the
//! step loop polls every iteration, so any thread can interrupt a run in
//! progress without routing through the worker queue. See DESIGN.md.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct SimulatorControl {
    paused: Mutex<bool>,
    pause_cv: Condvar,
    running: AtomicBool,
}

impl SimulatorControl {
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            pause_cv: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    pub fn pause(&self) {
        *self.paused.lock().expect("control mutex poisoned") = true;
    }

    pub fn resume(&self) {
        *self.paused.lock().expect("control mutex poisoned") = false;
        self.pause_cv.notify_all();
    }

    pub fn terminate(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.pause_cv.notify_all();
    }

    pub fn reset(&self) {
        *self.paused.lock().expect("control mutex poisoned") = false;
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().expect("control mutex poisoned")
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block the calling (worker) thread while paused. Returns immediately
    /// once resumed or terminated.
    pub fn wait_while_paused(&self) {
        let mut guard = self.paused.lock().expect("control mutex poisoned");
        while *guard && self.running.load(Ordering::SeqCst) {
            guard = self.pause_cv.wait(guard).expect("control mutex poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn resume_wakes_a_waiting_thread() {
        let control = Arc::new(SimulatorControl::new());
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.wait_while_paused())
        };
        thread::sleep(Duration::from_millis(20));
        control.resume();
        waiter.join().unwrap();
    }

    #[test]
    fn terminate_wakes_a_paused_waiter_without_resuming() {
        let control = Arc::new(SimulatorControl::new());
        control.pause();
        let waiter = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.wait_while_paused())
        };
        thread::sleep(Duration::from_millis(20));
        control.terminate();
        waiter.join().unwrap();
        assert!(!control.is_running());
    }

    #[test]
    fn pause_pause_is_idempotent() {
        let control = SimulatorControl::new();
        control.pause();
        control.pause();
        assert!(control.is_paused());
    }
}
