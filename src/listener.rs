//! Input event dispatch. Listens for the expander's interrupt-on-change signal and calls the
//! callback registered for each (pin, edge) that fired.

use std::collections::HashMap;
use std::error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use error::Error;
use io::RegisterIo;
use registers::{Port, Register};
use views::valid_bit;

/// How long one `InterruptSource::wait` call may block before the dispatch loop re-checks its
/// deactivation flag. Bounds how stale a `deactivate` request can go unnoticed.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The direction an input pin changed in, as latched by the interrupt capture register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The pin went high.
    Rising,
    /// The pin went low. On the board's pulled-up input terminals this is the
    /// switch-closed/button-pressed direction.
    Falling,
}

/// Which events a registration is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Rising,
    Falling,
    Either,
}

impl From<Edge> for Trigger {
    fn from(edge: Edge) -> Trigger {
        match edge {
            Edge::Rising => Trigger::Rising,
            Edge::Falling => Trigger::Falling,
        }
    }
}

/// One observed input change, passed to callbacks.
#[derive(Clone, Copy, Debug)]
pub struct InputEvent {
    /// Bit index of the pin within the watched port, 0..=7.
    pub pin: u8,
    /// The direction the pin changed in.
    pub edge: Edge,
    /// The pin's physical value latched when the interrupt fired, 0 or 1.
    pub captured: u8,
    /// The raw interrupt flag byte; other bits may be set when several pins changed in the same
    /// event.
    pub interrupt_flag: u8,
}

/// What the dispatch loop does when a callback returns an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Log the failure through the `log` facade and keep dispatching. The default: a long-lived
    /// listener should survive one misbehaving callback.
    LogAndContinue,
    /// Stop the loop and return the failure from `activate` as `ListenError::Callback`.
    Propagate,
}

/// The failures a dispatch loop can end with. Device and source faults always stop the loop;
/// callback failures only under `DispatchPolicy::Propagate`.
#[derive(Debug)]
pub enum ListenError<DE, SE> {
    /// Reading the interrupt registers failed.
    Device(Error<DE>),
    /// The interrupt source failed.
    Source(SE),
    /// A callback failed and the policy is `Propagate`.
    Callback(Box<dyn error::Error + Send + Sync>),
}

/// The hardware signal that interrupt capture data is waiting to be read. Implementations wrap
/// whatever delivers the expander's INT line state: a GPIO edge file descriptor, a pin-change
/// queue, a test script.
pub trait InterruptSource {
    type Error;

    /// Block until the interrupt line asserts or `timeout` elapses. Returns `Ok(true)` when the
    /// line asserted, `Ok(false)` on timeout. Must honor `timeout` so the caller can remain
    /// cancellable.
    fn wait(&mut self, timeout: Duration) -> Result<bool, Self::Error>;
}

/// The result type callbacks return.
pub type CallbackResult = Result<(), Box<dyn error::Error + Send + Sync>>;

type Callback = Box<dyn FnMut(&InputEvent) -> CallbackResult + Send>;

/// A cloneable handle that deactivates a running listener from another thread.
#[derive(Clone)]
pub struct ListenerHandle(Arc<AtomicBool>);

impl ListenerHandle {
    /// Ask the listener's `activate` loop to return. Takes effect within one poll interval.
    pub fn deactivate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Listens for events on the input port and calls the mapped callback functions.
///
/// Registrations are keyed by (pin, trigger); registering the same key again replaces the
/// earlier callback. `activate` runs the dispatch loop on the calling thread until a fault
/// stops it or a [`ListenerHandle`] deactivates it.
pub struct InputEventListener<'io, IO: RegisterIo, S: InterruptSource> {
    io: &'io IO,
    source: S,
    port: Port,
    callbacks: HashMap<(u8, Trigger), Callback>,
    policy: DispatchPolicy,
    active: Arc<AtomicBool>,
}

impl<'io, IO: RegisterIo, S: InterruptSource> InputEventListener<'io, IO, S> {
    /// Create a listener over the interrupt registers of `port`, with the `LogAndContinue`
    /// policy. The corresponding interrupt-on-change bits must be armed separately (see
    /// `board::initialize` / `board::set_input_events`).
    pub fn new(io: &'io IO, source: S, port: Port) -> Self {
        InputEventListener {
            io,
            source,
            port,
            callbacks: HashMap::new(),
            policy: DispatchPolicy::LogAndContinue,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the callback failure policy.
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register `callback` for events on `pin` matching `trigger`. At most one callback exists
    /// per (pin, trigger); a later registration replaces the earlier one.
    pub fn register<F>(&mut self, pin: u8, trigger: Trigger, callback: F)
    where
        F: FnMut(&InputEvent) -> CallbackResult + Send + 'static,
    {
        self.callbacks
            .insert((valid_bit(pin), trigger), Box::new(callback));
    }

    /// A handle that can deactivate this listener while `activate` is blocking.
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle(self.active.clone())
    }

    /// Run the dispatch loop on the calling thread.
    ///
    /// Blocks until a [`ListenerHandle`] deactivates the listener (returning `Ok`), the
    /// interrupt source or register access fails, or a callback fails under
    /// `DispatchPolicy::Propagate`. The loop wakes at least every [`POLL_INTERVAL`] to notice
    /// deactivation.
    pub fn activate(&mut self) -> Result<(), ListenError<IO::Error, S::Error>> {
        self.active.store(true, Ordering::SeqCst);
        while self.active.load(Ordering::SeqCst) {
            match self.source.wait(POLL_INTERVAL) {
                Ok(true) => self.dispatch()?,
                Ok(false) => {}
                Err(e) => {
                    self.active.store(false, Ordering::SeqCst);
                    return Err(ListenError::Source(e));
                }
            }
        }
        Ok(())
    }

    /// Ask a running `activate` loop to return; identical to deactivating through a handle.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Read the pending interrupt out of the expander and fire the matching registrations.
    fn dispatch(&mut self) -> Result<(), ListenError<IO::Error, S::Error>> {
        let flags = self
            .io
            .read_register(Register::IntFlag(self.port))
            .map_err(ListenError::Device)?;
        if flags == 0 {
            return Ok(());
        }
        // Reading the capture register clears the pending interrupt on the chip.
        let captured = self
            .io
            .read_register(Register::IntCapture(self.port))
            .map_err(ListenError::Device)?;

        for pin in 0..8 {
            if flags & (1 << pin) == 0 {
                continue;
            }
            let bit = captured >> pin & 1;
            let edge = if bit == 1 { Edge::Rising } else { Edge::Falling };
            let event = InputEvent {
                pin,
                edge,
                captured: bit,
                interrupt_flag: flags,
            };
            self.fire((pin, Trigger::from(edge)), &event)?;
            self.fire((pin, Trigger::Either), &event)?;
        }
        Ok(())
    }

    fn fire(
        &mut self,
        key: (u8, Trigger),
        event: &InputEvent,
    ) -> Result<(), ListenError<IO::Error, S::Error>> {
        let outcome = match self.callbacks.get_mut(&key) {
            Some(callback) => callback(event),
            None => return Ok(()),
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => match self.policy {
                DispatchPolicy::LogAndContinue => {
                    warn!("input callback for pin {} ({:?}) failed: {}", event.pin, event.edge, e);
                    Ok(())
                }
                DispatchPolicy::Propagate => {
                    self.active.store(false, Ordering::SeqCst);
                    Err(ListenError::Callback(e))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::Expander;
    use interface::test_spy::{TestRegister as TR, TestSpyInterface};
    use mutex::DefaultMutex;
    use std::sync::atomic::AtomicUsize;

    const INTFB: u8 = 0x0F;
    const INTCAPB: u8 = 0x11;

    /// A source that reports its scripted pulses in order, then times out forever.
    struct ScriptedSource {
        pulses: Vec<bool>,
        next: usize,
    }

    impl ScriptedSource {
        fn new(pulses: &[bool]) -> Self {
            ScriptedSource {
                pulses: pulses.to_vec(),
                next: 0,
            }
        }
    }

    impl InterruptSource for ScriptedSource {
        type Error = ::std::convert::Infallible;

        fn wait(&mut self, _timeout: Duration) -> Result<bool, Self::Error> {
            let pulse = self.pulses.get(self.next).cloned().unwrap_or(false);
            self.next += 1;
            Ok(pulse)
        }
    }

    /// A source that fails on its first wait.
    struct BrokenSource;

    impl InterruptSource for BrokenSource {
        type Error = &'static str;

        fn wait(&mut self, _timeout: Duration) -> Result<bool, Self::Error> {
            Err("interrupt line gone")
        }
    }

    #[test]
    fn dispatch_fires_matching_edge_registration() {
        let mut ei = TestSpyInterface::new();
        // Pin 4 flagged, captured low: a falling edge.
        ei.set(INTFB, TR::ResetValue(0b00010000));
        ei.set(INTCAPB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_callback = seen.clone();
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(4, Trigger::Falling, move |event| {
            assert_eq!(event.pin, 4);
            assert_eq!(event.edge, Edge::Falling);
            assert_eq!(event.captured, 0);
            assert_eq!(event.interrupt_flag, 0b00010000);
            seen_in_callback.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        listener.dispatch().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_skips_mismatched_edge_registration() {
        let mut ei = TestSpyInterface::new();
        // Pin 5 flagged, captured high: a rising edge.
        ei.set(INTFB, TR::ResetValue(0b00100000));
        ei.set(INTCAPB, TR::ResetValue(0b00100000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_falling = seen.clone();
        let seen_either = seen.clone();
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(5, Trigger::Falling, move |_| {
            seen_falling.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        listener.register(5, Trigger::Either, move |_| {
            seen_either.fetch_add(100, Ordering::SeqCst);
            Ok(())
        });

        listener.dispatch().unwrap();
        // Only the Either registration matched the rising edge.
        assert_eq!(seen.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn later_registration_replaces_earlier_for_same_key() {
        let mut ei = TestSpyInterface::new();
        ei.set(INTFB, TR::ResetValue(0b01000000));
        ei.set(INTCAPB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let seen = Arc::new(AtomicUsize::new(0));
        let first = seen.clone();
        let second = seen.clone();
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(6, Trigger::Falling, move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        listener.register(6, Trigger::Falling, move |_| {
            second.fetch_add(1000, Ordering::SeqCst);
            Ok(())
        });

        listener.dispatch().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1000);
    }

    #[test]
    fn dispatch_synthesizes_one_event_per_flagged_pin() {
        let mut ei = TestSpyInterface::new();
        // Pins 4 and 7 flagged; 4 went low, 7 went high.
        ei.set(INTFB, TR::ResetValue(0b10010000));
        ei.set(INTCAPB, TR::ResetValue(0b10000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let seen = Arc::new(AtomicUsize::new(0));
        let fall = seen.clone();
        let rise = seen.clone();
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(4, Trigger::Falling, move |_| {
            fall.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        listener.register(7, Trigger::Rising, move |_| {
            rise.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });

        listener.dispatch().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn log_and_continue_keeps_dispatching_after_callback_failure() {
        let mut ei = TestSpyInterface::new();
        ei.set(INTFB, TR::ResetValue(0b00110000));
        ei.set(INTCAPB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let seen = Arc::new(AtomicUsize::new(0));
        let survivor = seen.clone();
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(4, Trigger::Falling, |_| Err("boom".into()));
        listener.register(5, Trigger::Falling, move |_| {
            survivor.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(listener.dispatch().is_ok());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn propagate_stops_at_callback_failure() {
        let mut ei = TestSpyInterface::new();
        ei.set(INTFB, TR::ResetValue(0b00010000));
        ei.set(INTCAPB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B)
            .with_policy(DispatchPolicy::Propagate);
        listener.register(4, Trigger::Falling, |_| Err("boom".into()));

        match listener.dispatch() {
            Err(ListenError::Callback(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected callback failure, got {:?}", other),
        }
    }

    #[test]
    fn activate_returns_when_deactivated_from_a_callback() {
        let mut ei = TestSpyInterface::new();
        ei.set(INTFB, TR::ResetValue(0b00010000));
        ei.set(INTCAPB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        // The source reports one interrupt, then times out; the callback deactivates the
        // listener, so the loop must exit on its next flag check.
        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[true]), Port::B);
        let handle = listener.handle();
        listener.register(4, Trigger::Either, move |_| {
            handle.deactivate();
            Ok(())
        });

        assert!(listener.activate().is_ok());
    }

    #[test]
    fn activate_surfaces_source_failures() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let mut listener = InputEventListener::new(&io, BrokenSource, Port::B);
        match listener.activate() {
            Err(ListenError::Source(msg)) => assert_eq!(msg, "interrupt line gone"),
            _ => panic!("expected source failure"),
        }
    }

    #[test]
    fn zero_flag_byte_dispatches_nothing() {
        let mut ei = TestSpyInterface::new();
        ei.set(INTFB, TR::ResetValue(0x00));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();

        let mut listener = InputEventListener::new(&io, ScriptedSource::new(&[]), Port::B);
        listener.register(4, Trigger::Either, |_| panic!("no event expected"));
        listener.dispatch().unwrap();
        // The capture register was never read, so the pending interrupt state is untouched.
        assert_eq!(ei.reads(), vec![INTFB]);
    }
}
