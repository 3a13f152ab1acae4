//! The register addresses within the MCP23S17.

/// A register address within the MCP23S17. These are created by conversion from `Register`. It is
/// a newtype around `u8` that prevents invalid addresses from being forged and passed to
/// `ExpanderInterface` methods which may trigger UB on the device.
#[derive(PartialEq, Clone, Copy)]
pub struct RegisterAddress(pub(crate) u8);

/// Number of addressable registers in the BANK=0 layout.
pub(crate) const ADDRESS_COUNT: usize = 0x16;

impl From<RegisterAddress> for u8 {
    /// Convert a `RegisterAddress` into a `u8` corresponding to the hardware address.
    fn from(addr: RegisterAddress) -> u8 {
        addr.0
    }
}

/// One of the two 8-bit I/O ports of the MCP23S17.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    fn offset(self) -> u8 {
        match self {
            Port::A => 0,
            Port::B => 1,
        }
    }
}

/// The per-port register set of the MCP23S17, assuming the device is in the BANK=0 (interleaved)
/// layout. Each variant except `IoCon` exists once per port.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Register {
    /// Data direction register. A set bit configures the corresponding pin as an input.
    IoDir(Port),

    /// Input polarity register. A set bit inverts the corresponding GPIO bit on read.
    IPol(Port),

    /// Interrupt-on-change enable register. A set bit arms the corresponding pin for
    /// interrupt-on-change.
    IntEnable(Port),

    /// Default compare register for interrupt-on-change, used when the corresponding `IntControl`
    /// bit selects compare-against-default.
    DefaultCompare(Port),

    /// Interrupt control register. Selects, per pin, whether any change or a mismatch against
    /// `DefaultCompare` raises the interrupt.
    IntControl(Port),

    /// Device configuration register. Shared between both ports; holds the register layout,
    /// interrupt mirroring, and hardware addressing control bits.
    IoCon,

    /// Weak pull-up enable register. A set bit enables the 100k pull-up on the corresponding pin.
    PullUp(Port),

    /// Interrupt flag register. A set bit indicates the corresponding pin raised the pending
    /// interrupt. Read-only.
    IntFlag(Port),

    /// Interrupt capture register. Holds the port value latched at the moment the interrupt
    /// fired; reading it clears the pending interrupt.
    IntCapture(Port),

    /// GPIO register. Reading yields the pin states; writing drives the output latch.
    Gpio(Port),

    /// Output latch register. Reading yields the latched output value rather than the pin states.
    OutputLatch(Port),
}

impl From<Register> for RegisterAddress {
    /// Convert a `Register` into a `RegisterAddress`.
    fn from(reg: Register) -> RegisterAddress {
        use self::Register::*;
        match reg {
            IoDir(port) => RegisterAddress(0x00 + port.offset()),
            IPol(port) => RegisterAddress(0x02 + port.offset()),
            IntEnable(port) => RegisterAddress(0x04 + port.offset()),
            DefaultCompare(port) => RegisterAddress(0x06 + port.offset()),
            IntControl(port) => RegisterAddress(0x08 + port.offset()),
            IoCon => RegisterAddress(0x0A),
            PullUp(port) => RegisterAddress(0x0C + port.offset()),
            IntFlag(port) => RegisterAddress(0x0E + port.offset()),
            IntCapture(port) => RegisterAddress(0x10 + port.offset()),
            Gpio(port) => RegisterAddress(0x12 + port.offset()),
            OutputLatch(port) => RegisterAddress(0x14 + port.offset()),
        }
    }
}
