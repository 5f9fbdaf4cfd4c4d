//! One-shot deferred actions on a dedicated thread.
//!
//! A scheduled action runs once after its delay unless cancelled first.
//! The controller uses this for the safe-mode reboot ceiling and never
//! cancels it.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct TimerState {
    cancelled: bool,
    fired: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Handle to a scheduled action.
///
/// Dropping the handle does not cancel the action.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    shared: Arc<Shared>,
}

impl TimerHandle {
    /// Cancel the action. Returns `false` if it already fired.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.fired {
            return false;
        }
        state.cancelled = true;
        self.shared.wake.notify_all();
        true
    }

    /// Whether the action has started running.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.shared.state.lock().fired
    }

    /// Whether the action was cancelled before firing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.state.lock().cancelled
    }
}

/// Run `action` once after `delay` on a new thread named `name`.
///
/// # Errors
///
/// Returns an error if the thread could not be spawned.
pub fn schedule_once<F>(name: &str, delay: Duration, action: F) -> io::Result<TimerHandle>
where
    F: FnOnce() + Send + 'static,
{
    let shared = Arc::new(Shared::default());
    let timer = Arc::clone(&shared);
    let deadline = Instant::now().checked_add(delay);

    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let mut state = timer.state.lock();
            while !state.cancelled {
                match deadline {
                    Some(deadline) => {
                        if timer.wake.wait_until(&mut state, deadline).timed_out() {
                            break;
                        }
                    }
                    None => timer.wake.wait(&mut state),
                }
            }
            if state.cancelled {
                return;
            }
            state.fired = true;
            drop(state);
            action();
        })?;

    Ok(TimerHandle { shared })
}
