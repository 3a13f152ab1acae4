//! The PiFace Relay Plus board: which expander bits its relays, motor drivers, and input
//! terminals are wired to, and the power-up register configuration that wiring assumes.
//!
//! A board object is a bundle of register views over a [`BoardIo`](::io::BoardIo); the expander
//! and the interrupt listener are held separately, composed rather than inherited. The add-on
//! ("plus") section of the board comes in three factory populations, one constructor each:
//! [`RelayBoard`], [`MotorDcBoard`], and [`DigitalBoard`]. All three share the base population of
//! four relays and four pulled-up input terminals.

use config::IoConfig;
use device::Expander;
use error::Error;
use interface::ExpanderInterface;
use io::RegisterIo;
use motor::Motor;
use registers::{Port, Register};
use throttle::CommandGate;
use views::{BitView, Nibble, NibbleView, Polarity, PortView};

/// Probe for the expander and bring its registers into the state the board wiring assumes:
/// port A all outputs and driven low, the lower half of port B outputs (motor pins), the upper
/// half inputs with pull-ups and interrupt-on-change armed.
///
/// Fails with `Error::NoDeviceDetected` when the IOCON read-back mismatches, in which case no
/// further configuration is attempted.
pub fn initialize<EI: ExpanderInterface>(expander: &mut Expander<EI>) -> Result<(), Error<EI::Error>> {
    expander.probe(IoConfig::default())?;
    expander.write(Register::Gpio(Port::A), 0x00)?;
    expander.write(Register::IoDir(Port::A), 0x00)?;
    expander.write(Register::IoDir(Port::B), 0xF0)?;
    expander.write(Register::PullUp(Port::B), 0xF0)?;
    expander.write(Register::IntEnable(Port::B), 0xF0)?;
    Ok(())
}

/// Arm or disarm interrupt-on-change for the four input terminals.
pub fn set_input_events<IO: RegisterIo>(io: &IO, enabled: bool) -> Result<(), Error<IO::Error>> {
    let mask = if enabled { 0xF0 } else { 0x00 };
    io.write_register(Register::IntEnable(Port::B), mask)
}

/// One relay on the board. A thin wrapper over the claimed GPIO bit that drives the relay coil.
pub struct Relay<'io, IO: RegisterIo> {
    bit: BitView<'io, IO>,
}

impl<'io, IO: RegisterIo> Relay<'io, IO> {
    pub fn new(bit: BitView<'io, IO>) -> Self {
        Relay { bit }
    }

    /// Energize the relay coil.
    pub fn turn_on(&self) -> Result<(), Error<IO::Error>> {
        self.bit.set(1)
    }

    /// Release the relay coil.
    pub fn turn_off(&self) -> Result<(), Error<IO::Error>> {
        self.bit.set(0)
    }

    /// Flip the relay to the opposite state.
    pub fn toggle(&self) -> Result<(), Error<IO::Error>> {
        let current = self.bit.value()?;
        self.bit.set(current ^ 1)
    }

    /// The commanded state of the relay, 1 when energized.
    pub fn state(&self) -> Result<u8, Error<IO::Error>> {
        self.bit.value()
    }
}

/// Relay terminals sit on GPIOA bits 3..0 with relay index 0 on bit 3.
fn base_relays<'io, IO: RegisterIo>(io: &'io IO) -> Result<[Relay<'io, IO>; 4], Error<IO::Error>> {
    Ok([
        Relay::new(BitView::claim(io, Register::Gpio(Port::A), 3, Polarity::ActiveHigh)?),
        Relay::new(BitView::claim(io, Register::Gpio(Port::A), 2, Polarity::ActiveHigh)?),
        Relay::new(BitView::claim(io, Register::Gpio(Port::A), 1, Polarity::ActiveHigh)?),
        Relay::new(BitView::claim(io, Register::Gpio(Port::A), 0, Polarity::ActiveHigh)?),
    ])
}

/// The input terminals are the upper nibble of GPIOB, pulled up and switched to ground, so the
/// views are active-low. The per-pin views and the nibble view deliberately alias.
fn input_bits<'io, IO: RegisterIo>(io: &'io IO) -> [BitView<'io, IO>; 4] {
    [
        BitView::shared(io, Register::Gpio(Port::B), 4, Polarity::ActiveLow),
        BitView::shared(io, Register::Gpio(Port::B), 5, Polarity::ActiveLow),
        BitView::shared(io, Register::Gpio(Port::B), 6, Polarity::ActiveLow),
        BitView::shared(io, Register::Gpio(Port::B), 7, Polarity::ActiveLow),
    ]
}

fn input_port<'io, IO: RegisterIo>(io: &'io IO) -> NibbleView<'io, IO> {
    NibbleView::shared(io, Register::Gpio(Port::B), Nibble::Upper, Polarity::ActiveLow)
}

/// A board whose plus section is populated with four more relays, for eight in total.
pub struct RelayBoard<'io, IO: RegisterIo> {
    /// The base relays; index 0 is the terminal wired to GPIOA bit 3.
    pub relays: [Relay<'io, IO>; 4],
    /// The plus-section relays on GPIOA bits 4..7, in bit order.
    pub extra_relays: [Relay<'io, IO>; 4],
    /// All eight relay coils as one byte, aliasing the individual relays.
    pub relay_port: PortView<'io, IO>,
    /// The four input terminals, active-low.
    pub inputs: [BitView<'io, IO>; 4],
    /// The input terminals as one 4-bit value, aliasing `inputs`.
    pub input_port: NibbleView<'io, IO>,
}

impl<'io, IO: RegisterIo> RelayBoard<'io, IO> {
    pub fn new(io: &'io IO) -> Result<Self, Error<IO::Error>> {
        Ok(RelayBoard {
            relays: base_relays(io)?,
            extra_relays: [
                Relay::new(BitView::claim(io, Register::Gpio(Port::A), 4, Polarity::ActiveHigh)?),
                Relay::new(BitView::claim(io, Register::Gpio(Port::A), 5, Polarity::ActiveHigh)?),
                Relay::new(BitView::claim(io, Register::Gpio(Port::A), 6, Polarity::ActiveHigh)?),
                Relay::new(BitView::claim(io, Register::Gpio(Port::A), 7, Polarity::ActiveHigh)?),
            ],
            relay_port: PortView::shared(io, Register::Gpio(Port::A), Polarity::ActiveHigh),
            inputs: input_bits(io),
            input_port: input_port(io),
        })
    }
}

/// A board whose plus section is populated with four DC motor drivers.
///
/// Every motor shares the caller's [`CommandGate`]; use one gate per power supply, normally one
/// per process, so the activation window spans all motors regardless of board.
pub struct MotorDcBoard<'io, 'g, IO: RegisterIo, G: CommandGate> {
    /// The base relays; index 0 is the terminal wired to GPIOA bit 3.
    pub relays: [Relay<'io, IO>; 4],
    /// The four motor drivers. Motors 0 and 1 sit on the inverted GPIOB pins, motors 2 and 3 on
    /// GPIOA.
    pub motors: [Motor<'io, 'g, IO, G>; 4],
    /// The four input terminals, active-low.
    pub inputs: [BitView<'io, IO>; 4],
    /// The input terminals as one 4-bit value, aliasing `inputs`.
    pub input_port: NibbleView<'io, IO>,
}

impl<'io, 'g, IO: RegisterIo, G: CommandGate> MotorDcBoard<'io, 'g, IO, G> {
    /// Construct the motor board. All four motors are braked as they are created.
    pub fn new(io: &'io IO, gate: &'g G) -> Result<Self, Error<IO::Error>> {
        Ok(MotorDcBoard {
            relays: base_relays(io)?,
            motors: [
                Motor::new(
                    BitView::claim(io, Register::Gpio(Port::B), 3, Polarity::ActiveLow)?,
                    BitView::claim(io, Register::Gpio(Port::B), 2, Polarity::ActiveLow)?,
                    gate,
                )?,
                Motor::new(
                    BitView::claim(io, Register::Gpio(Port::B), 1, Polarity::ActiveLow)?,
                    BitView::claim(io, Register::Gpio(Port::B), 0, Polarity::ActiveLow)?,
                    gate,
                )?,
                Motor::new(
                    BitView::claim(io, Register::Gpio(Port::A), 4, Polarity::ActiveHigh)?,
                    BitView::claim(io, Register::Gpio(Port::A), 5, Polarity::ActiveHigh)?,
                    gate,
                )?,
                Motor::new(
                    BitView::claim(io, Register::Gpio(Port::A), 6, Polarity::ActiveHigh)?,
                    BitView::claim(io, Register::Gpio(Port::A), 7, Polarity::ActiveHigh)?,
                    gate,
                )?,
            ],
            inputs: input_bits(io),
            input_port: input_port(io),
        })
    }
}

/// A board whose plus section is unpopulated; only the base relays and inputs exist.
pub struct DigitalBoard<'io, IO: RegisterIo> {
    /// The base relays; index 0 is the terminal wired to GPIOA bit 3.
    pub relays: [Relay<'io, IO>; 4],
    /// The four input terminals, active-low.
    pub inputs: [BitView<'io, IO>; 4],
    /// The input terminals as one 4-bit value, aliasing `inputs`.
    pub input_port: NibbleView<'io, IO>,
}

impl<'io, IO: RegisterIo> DigitalBoard<'io, IO> {
    pub fn new(io: &'io IO) -> Result<Self, Error<IO::Error>> {
        Ok(DigitalBoard {
            relays: base_relays(io)?,
            inputs: input_bits(io),
            input_port: input_port(io),
        })
    }
}
