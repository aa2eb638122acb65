//! Single-threaded driver for the control loop.
//!
//! One worker owns the [`ControlLoop`] and waits on a single command queue
//! with a timeout taken from the coarse and fine deadlines, so ticks and
//! actions never interleave.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::control::ControlLoop;
use crate::modes::Action;

/// Messages accepted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handle a user action.
    Action(Action),
    /// Revert the displays and stop the worker.
    Shutdown,
}

/// Cloneable handle for delivering actions to a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: Sender<Command>,
}

impl ActionSender {
    /// Queue `action`. Returns `false` if the worker has already stopped.
    pub fn send(&self, action: Action) -> bool {
        self.tx.send(Command::Action(action)).is_ok()
    }

    /// Ask the worker to revert the displays and exit.
    pub fn shutdown(&self) -> bool {
        self.tx.send(Command::Shutdown).is_ok()
    }
}

/// Drives the coarse and fine ticks of a [`ControlLoop`].
pub struct Scheduler {
    control: ControlLoop,
    rx: Receiver<Command>,
    tx: Sender<Command>,
    coarse_interval: Duration,
    fine_interval: Duration,
}

impl Scheduler {
    /// Wrap `control`, using the tick periods from its configuration.
    pub fn new(control: ControlLoop) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            coarse_interval: control.config().coarse_interval,
            fine_interval: control.config().fine_interval,
            control,
            rx,
            tx,
        }
    }

    /// A handle for sending actions once [`run`](Self::run) is going.
    pub fn sender(&self) -> ActionSender {
        ActionSender {
            tx: self.tx.clone(),
        }
    }

    /// Run until a shutdown is requested or every sender is gone, then
    /// revert the displays and hand the loop back.
    pub fn run(self) -> ControlLoop {
        let Self {
            mut control,
            rx,
            tx,
            coarse_interval,
            fine_interval,
        } = self;
        // only external senders keep the worker alive
        drop(tx);

        control.start();
        let mut next_coarse = Instant::now() + coarse_interval;
        let mut next_fine = control.is_fine_loop_active().then(|| Instant::now() + fine_interval);

        loop {
            let deadline = next_fine.map_or(next_coarse, |fine| fine.min(next_coarse));
            let timeout = deadline.saturating_duration_since(Instant::now());

            match rx.recv_timeout(timeout) {
                Ok(Command::Action(action)) => control.handle(action),
                Ok(Command::Shutdown) => {
                    info!("shutdown requested");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("all action senders dropped");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let now = Instant::now();
            if now >= next_coarse {
                control.coarse_tick();
                next_coarse = Instant::now() + coarse_interval;
            }

            next_fine = next_fine_deadline(&mut control, next_fine, fine_interval);
        }

        control.shutdown();
        control
    }
}

/// Run the fine tick if it is due and return the next fine deadline.
///
/// A late tick is not caught up: the next one is scheduled a full period
/// after the current one finishes.
fn next_fine_deadline(control: &mut ControlLoop, next: Option<Instant>, interval: Duration) -> Option<Instant> {
    if !control.is_fine_loop_active() {
        return None;
    }
    match next {
        Some(due) if Instant::now() >= due => {
            if let Some(tick) = control.fine_tick() {
                debug!(
                    "fine tick: brightness={:.1} target={:.2} gamma={:.3}",
                    tick.brightness, tick.target_gamma, tick.gamma
                );
            }
            Some(Instant::now() + interval)
        }
        Some(due) => Some(due),
        None => Some(Instant::now() + interval),
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("coarse_interval", &self.coarse_interval)
            .field("fine_interval", &self.fine_interval)
            .field("control", &self.control)
            .finish()
    }
}
