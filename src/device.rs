//! The port expander device API. This provides the `Expander` type which is a direct abstraction
//! of the MCP23S17's register set. It owns the bus interface; everything above it addresses the
//! chip through `Register` names rather than raw bytes.

use config::IoConfig;
use error::Error;
use interface::ExpanderInterface;
use io::BoardIo;
use mutex::IOMutex;
use registers::{Register, RegisterAddress, ADDRESS_COUNT};

/// The port expander device itself.
pub struct Expander<EI: ExpanderInterface> {
    iface: EI,
    /// Bits of each register handed out to exclusive views. Guards against two logical owners
    /// being wired onto the same output bits.
    claims: [u8; ADDRESS_COUNT],
}

impl<EI: ExpanderInterface> Expander<EI> {
    /// Create a new `Expander`.
    ///
    /// Takes ownership of the `ExpanderInterface` which it should use to communicate with the
    /// MCP23S17.
    pub fn new(iface: EI) -> Self {
        Expander {
            iface,
            claims: [0; ADDRESS_COUNT],
        }
    }

    /// Read the current value of a register.
    pub fn read(&mut self, reg: Register) -> Result<u8, Error<EI::Error>> {
        self.iface
            .read_register(reg.into())
            .map_err(Error::Transport)
    }

    /// Write a value to a register.
    pub fn write(&mut self, reg: Register, value: u8) -> Result<(), Error<EI::Error>> {
        self.iface
            .write_register(reg.into(), value)
            .map_err(Error::Transport)
    }

    /// Replace the bits selected by `mask` with `bits`, leaving every other bit of the register
    /// untouched. Issues exactly one read and one write.
    pub fn update(&mut self, reg: Register, mask: u8, bits: u8) -> Result<(), Error<EI::Error>> {
        let current = self.read(reg)?;
        self.write(reg, current & !mask | bits & mask)
    }

    /// Write the IOCON configuration byte and read it back. A mismatch means nothing answered at
    /// this chip select / hardware address, and the board instance is unusable.
    pub fn probe(&mut self, config: IoConfig) -> Result<(), Error<EI::Error>> {
        let expected = u8::from(config);
        self.write(Register::IoCon, expected)?;
        let found = self.read(Register::IoCon)?;
        if found == expected {
            Ok(())
        } else {
            warn!(
                "expander probe failed: IOCON wrote {:#04x}, read back {:#04x}",
                expected, found
            );
            Err(Error::NoDeviceDetected { expected, found })
        }
    }

    /// Record that an exclusive view owns the `mask` bits of `reg`, failing if any of them is
    /// already owned.
    pub(crate) fn claim_bits(&mut self, reg: Register, mask: u8) -> Result<(), Error<EI::Error>> {
        let idx = u8::from(RegisterAddress::from(reg)) as usize;
        if self.claims[idx] & mask != 0 {
            return Err(Error::Claimed {
                register: reg,
                mask,
            });
        }
        self.claims[idx] |= mask;
        Ok(())
    }

    /// Convert this expander into a shared I/O adapter.
    ///
    /// The adapter serializes all register traffic behind the mutex `M` and hands out the bit,
    /// nibble, and port views the board objects are built from. See [`BoardIo`] for detail.
    pub fn into_io<M: IOMutex<Self>>(self) -> BoardIo<M, EI> {
        BoardIo::new(self)
    }
}
