//! Driver library for the PiFace Relay Plus expansion board.
//!
//! The board carries an MCP23S17, a 16-bit SPI port expander whose two 8-bit ports are wired to
//! relays, DC motor drivers (DRV8835), and pulled-up input terminals with interrupt-on-change
//! support. This driver exposes each of those as a typed object built from *register views*:
//! accessors over a single bit, a nibble, or a whole register, with polarity inversion handled
//! once at the view rather than at every call site.
//!
//! It is intended to work on a Linux host (typically a Raspberry Pi) using any implementation of
//! the `embedded-hal` trait library for the SPI bus and chip-select GPIO.
//!
//! # Construction
//!
//! To set up the driver:
//!
//! - Use your platform's `embedded-hal` implementation to obtain the SPI master device and a
//!   push-pull output pin for chip select.
//! - Construct an [`ExpanderInterface`] — the [`SpiInterface`] for a real board — which takes
//!   ownership of the I/O devices and the chip's 3-bit hardware address.
//! - Construct an [`Expander`] over the interface and run [`board::initialize`], which probes for
//!   the chip and writes the direction, pull-up, and interrupt configuration the board's wiring
//!   assumes.
//!
//! ```ignore
//! let spi = /* construct something implementing embedded_hal::blocking::spi::{Write, Transfer} */
//! let cs = /* construct something implementing embedded_hal::digital::v2::OutputPin */
//!
//! let ei = relay_plus::SpiInterface::new(spi, cs, 0);
//! let mut expander = relay_plus::Expander::new(ei);
//! relay_plus::board::initialize(&mut expander)?;
//! ```
//!
//! Probing writes the IOCON configuration byte and reads it back; a mismatch fails with
//! [`Error::NoDeviceDetected`] and the board instance is unusable.
//!
//! # Boards
//!
//! The "plus" section of the board comes in three factory populations, each a distinct type with
//! its own constructor and field set: [`RelayBoard`] (eight relays), [`MotorDcBoard`] (four
//! relays and four DC motors), and [`DigitalBoard`] (four relays only). All of them also expose
//! the four input terminals, both as individual active-low bits and as one 4-bit port.
//!
//! The expander is first converted into a [`BoardIo`] adapter, which serializes all register
//! traffic behind a mutex; the board object then borrows its views from the adapter:
//!
//! ```
//! # fn main() -> Result<(), relay_plus::Error<std::convert::Infallible>> {
//! use relay_plus::{board, DefaultMutex, Expander};
//!
//! let ei = relay_plus::interface::loopback::LoopbackInterface::new();
//! let mut expander = Expander::new(ei);
//! board::initialize(&mut expander)?;
//! let io = expander.into_io::<DefaultMutex<_>>();
//!
//! let board = board::DigitalBoard::new(&io)?;
//! board.relays[0].turn_on()?;
//! assert_eq!(board.relays[0].state()?, 1);
//! assert_eq!(board.input_port.value()?, 0);
//! # Ok(())
//! # }
//! ```
//!
//! Views are claimed exclusively when they drive output bits: constructing two boards, or any two
//! exclusive views over overlapping bits of one register, fails with [`Error::Claimed`] so wiring
//! mistakes surface at construction instead of as bits mysteriously stomping each other.
//!
//! # Motors
//!
//! A [`Motor`] is a four-state direction machine over two pins: `Brake`, `Coast`, `Forward`,
//! `Reverse`. Two rules are enforced before anything reaches the hardware:
//!
//! - A direct `Forward`/`Reverse` flip is refused with [`Error::ForbiddenTransition`]; the motor
//!   must pass through `Brake` or `Coast` first.
//! - Every accepted mode change is admitted by a shared [`CommandGate`] first. The provided
//!   [`SharedThrottle`] enforces one activation window (150 ms) across *all* motors holding the
//!   handle, because the current surge being limited is drawn from the shared supply rail, not
//!   from one motor. Premature commands fail with [`Error::TooSoon`] and the caller decides
//!   whether and when to retry.
//!
//! ```
//! # fn main() -> Result<(), relay_plus::Error<std::convert::Infallible>> {
//! use relay_plus::{board, DefaultMutex, Expander, MotorMode, SharedThrottle, SystemClock};
//!
//! let ei = relay_plus::interface::loopback::LoopbackInterface::new();
//! let mut expander = Expander::new(ei);
//! board::initialize(&mut expander)?;
//! let io = expander.into_io::<DefaultMutex<_>>();
//! let throttle = SharedThrottle::<DefaultMutex<_>, _>::new(SystemClock::new());
//!
//! let mut board = board::MotorDcBoard::new(&io, &throttle)?;
//! board.motors[0].forward()?;
//! assert_eq!(board.motors[0].mode(), MotorMode::Forward);
//! assert!(board.motors[0].reverse().is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Input events
//!
//! An [`InputEventListener`] dispatches callbacks when the expander latches an input change. It
//! is bound to a port and an [`InterruptSource`] (the platform-specific way of waiting on the
//! chip's INT line), and calls the callback registered for each (pin, edge) that fired:
//!
//! ```ignore
//! let mut listener = relay_plus::InputEventListener::new(&io, int_source, relay_plus::Port::B);
//! listener.register(4, relay_plus::Trigger::Falling, |event| {
//!     println!("terminal 0 pressed (flags {:#04x})", event.interrupt_flag);
//!     Ok(())
//! });
//! let handle = listener.handle();   // hand this to whoever stops the listener
//! listener.activate()?;             // blocks until deactivated or a fault stops the loop
//! ```
//!
//! Registrations are replace-by-key: at most one callback per (pin, trigger). Callback failures
//! follow an explicit [`DispatchPolicy`], either log-and-continue (the default) or propagation
//! out of `activate`.
//!
//! # Mutual exclusion
//!
//! The adapters require a mutual exclusion primitive to arbitrate access to shared state: the
//! expander behind the register views, and the activation throttle shared by every motor. Both
//! are parameterized over the [`IOMutex`] trait; [`DefaultMutex<T>`](DefaultMutex) aliases
//! `std::sync::Mutex` so specifying `DefaultMutex` does the correct thing in ordinary use.
//! Read-modify-write of a register happens inside one lock acquisition, so views over different
//! bits of the same register never drop each other's changes.

extern crate core;
extern crate embedded_hal as hal;
#[macro_use]
extern crate log;
extern crate thiserror;

#[cfg(test)]
#[macro_use]
extern crate proptest;

pub mod board;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod interface;
pub mod io;
pub mod listener;
pub mod motor;
pub mod mutex;
pub mod registers;
pub mod throttle;
pub mod views;

pub use board::{DigitalBoard, MotorDcBoard, Relay, RelayBoard};
pub use clock::{Monotonic, SystemClock};
pub use config::IoConfig;
pub use device::Expander;
pub use error::Error;
pub use interface::spi::SpiInterface;
pub use interface::ExpanderInterface;
pub use io::{BoardIo, RegisterIo};
pub use listener::{
    DispatchPolicy, Edge, InputEvent, InputEventListener, InterruptSource, ListenError,
    ListenerHandle, Trigger,
};
pub use motor::{DrivePattern, DrivePatterns, Motor, MotorMode};
pub use mutex::{DefaultMutex, IOMutex};
pub use registers::{Port, Register};
pub use throttle::{
    ActivationThrottle, CommandGate, HoldOff, SharedThrottle, MOTOR_CONTROL_WINDOW_MS,
};
pub use views::{BitView, Nibble, NibbleView, Polarity, PortView};
