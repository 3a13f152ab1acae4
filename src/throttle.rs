//! Cross-motor command rate limiting.
//!
//! Re-commanding any motor too soon after the last accepted command, on *any* motor, draws a
//! current surge through the shared supply rail that can brown out the whole controller. The
//! throttle is therefore one resource per power domain, not per motor: every `Motor` holds a
//! handle to the same [`SharedThrottle`], whatever board it sits on.

use clock::Monotonic;
use mutex::IOMutex;

/// Minimum interval between accepted motor commands, in milliseconds.
pub const MOTOR_CONTROL_WINDOW_MS: u64 = 150;

/// Returned when the activation window has not yet elapsed. `remaining_ms` is how long the caller
/// would have to wait for the same command to be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoldOff {
    pub remaining_ms: u64,
}

/// The record of the last accepted motor activation. Plain state with no locking or time source
/// of its own; [`SharedThrottle`] adds both.
#[derive(Debug)]
pub struct ActivationThrottle {
    window_ms: u64,
    last_activation: Option<u64>,
}

impl ActivationThrottle {
    pub fn new() -> Self {
        ActivationThrottle::with_window(MOTOR_CONTROL_WINDOW_MS)
    }

    pub fn with_window(window_ms: u64) -> Self {
        ActivationThrottle {
            window_ms,
            last_activation: None,
        }
    }

    /// Accept the command and record `now_ms` if at least the window has elapsed since the last
    /// accepted command (or none was ever accepted). On rejection nothing is recorded, so a
    /// stream of premature retries does not push the window out further.
    pub fn check_and_record(&mut self, now_ms: u64) -> Result<(), HoldOff> {
        if let Some(last) = self.last_activation {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.window_ms {
                return Err(HoldOff {
                    remaining_ms: self.window_ms - elapsed,
                });
            }
        }
        self.last_activation = Some(now_ms);
        Ok(())
    }
}

impl Default for ActivationThrottle {
    fn default() -> Self {
        ActivationThrottle::new()
    }
}

/// The admission seam motors depend on. A motor asks its gate for permission immediately before
/// moving pins; the gate either records the activation and admits it, or reports the hold-off.
pub trait CommandGate {
    fn admit(&self) -> Result<(), HoldOff>;
}

/// An [`ActivationThrottle`] behind a mutex, paired with the clock that timestamps activations.
/// Create one per power domain (normally one per process) and pass it by reference to every
/// motor.
pub struct SharedThrottle<M, C>
where
    M: IOMutex<ActivationThrottle>,
    C: Monotonic,
{
    slot: M,
    clock: C,
}

impl<M, C> SharedThrottle<M, C>
where
    M: IOMutex<ActivationThrottle>,
    C: Monotonic,
{
    pub fn new(clock: C) -> Self {
        SharedThrottle {
            slot: M::new(ActivationThrottle::new()),
            clock,
        }
    }

    pub fn with_window(window_ms: u64, clock: C) -> Self {
        SharedThrottle {
            slot: M::new(ActivationThrottle::with_window(window_ms)),
            clock,
        }
    }
}

impl<M, C> CommandGate for SharedThrottle<M, C>
where
    M: IOMutex<ActivationThrottle>,
    C: Monotonic,
{
    fn admit(&self) -> Result<(), HoldOff> {
        let now_ms = self.clock.now_ms();
        self.slot.lock(|throttle| throttle.check_and_record(now_ms))
    }
}
