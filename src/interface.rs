//! This module provides shims for the `embedded-hal` hardware corresponding to the MCP23S17's
//! SPI bus interface. It is a shim between `embedded-hal` implementations and the expander's
//! registers.

use registers::RegisterAddress;

/// An interface for the MCP23S17 implements this trait, which provides the basic operations for
/// sending pre-encoded register accesses to the chip via the interface.
pub trait ExpanderInterface {
    /// The type of error that register reads and writes may return.
    type Error;
    /// Issue a write command to the expander to write `value` into the register at `addr`.
    fn write_register(&mut self, addr: RegisterAddress, value: u8) -> Result<(), Self::Error>;
    /// Issue a read command to the expander to fetch the `u8` value at register `addr`.
    fn read_register(&mut self, addr: RegisterAddress) -> Result<u8, Self::Error>;
}

// This is here (and has to be pub) for doctests only. It's useless otherwise.
#[doc(hidden)]
pub mod loopback {
    use super::ExpanderInterface;
    use registers::{RegisterAddress, ADDRESS_COUNT};

    /// A RAM-backed register file that reads back whatever was last written, seeded with the
    /// MCP23S17's reset values.
    pub struct LoopbackInterface {
        regs: [u8; ADDRESS_COUNT],
    }

    impl LoopbackInterface {
        pub fn new() -> Self {
            let mut regs = [0u8; ADDRESS_COUNT];
            // IODIRA/IODIRB reset to all-inputs.
            regs[0x00] = 0xFF;
            regs[0x01] = 0xFF;
            // The pull-ups hold the input nibble of GPIOB high when nothing is pressed.
            regs[0x13] = 0xF0;
            LoopbackInterface { regs }
        }
    }

    impl Default for LoopbackInterface {
        fn default() -> Self {
            LoopbackInterface::new()
        }
    }

    impl ExpanderInterface for LoopbackInterface {
        type Error = ::std::convert::Infallible;
        fn write_register(&mut self, addr: RegisterAddress, value: u8) -> Result<(), Self::Error> {
            self.regs[u8::from(addr) as usize] = value;
            Ok(())
        }
        fn read_register(&mut self, addr: RegisterAddress) -> Result<u8, Self::Error> {
            Ok(self.regs[u8::from(addr) as usize])
        }
    }
}

pub mod spi {
    //! The SPI interface controls an MCP23S17 via a 4-wire interface (SCK, MOSI, MISO, CS). With
    //! hardware addressing enabled, up to eight chips share one chip select and are told apart by
    //! the 3-bit address field of the control byte.

    use hal;

    use super::{ExpanderInterface, RegisterAddress};

    /// The union of all errors that may occur on the SPI interface. This primarily consists of
    /// variants for each of the error types for the chip select GPIO, SPI write, and SPI transfer.
    #[derive(Debug)]
    pub enum SpiInterfaceError<CSE, WE, TE> {
        /// The chip select GPIO threw an error.
        CSError(CSE),
        /// An error occurred during SPI write.
        WriteError(WE),
        /// An error occurred during SPI transfer.
        TransferError(TE),
    }

    impl<CSE, WE, TE> SpiInterfaceError<CSE, WE, TE> {
        fn from_cs(e: CSE) -> Self {
            SpiInterfaceError::CSError(e)
        }
        fn from_write(e: WE) -> Self {
            SpiInterfaceError::WriteError(e)
        }
        fn from_transfer(e: TE) -> Self {
            SpiInterfaceError::TransferError(e)
        }
    }

    fn valid_hardware_addr(addr: u8) -> u8 {
        match addr {
            0..=7 => addr,
            _ => panic!("MCP23S17 has no hardware address {}", addr),
        }
    }

    /// A configured `ExpanderInterface` for controlling an MCP23S17 via SPI.
    pub struct SpiInterface<SPI, CS> {
        /// The SPI master device connected to the MCP23S17.
        spi: SPI,
        /// A GPIO output pin connected to the CS pin of the MCP23S17.
        cs: CS,
        /// Control byte for writes: `0100 A2 A1 A0 0`.
        write_command: u8,
        /// Control byte for reads: `0100 A2 A1 A0 1`.
        read_command: u8,
    }

    impl<SPI, CS> SpiInterface<SPI, CS>
    where
        SPI: hal::blocking::spi::Write<u8> + hal::blocking::spi::Transfer<u8>,
        CS: hal::digital::v2::OutputPin,
    {
        /// Create a new SPI interface to communicate with the port expander. `spi` is the SPI
        /// master device, `cs` is the GPIO output pin connected to the CS pin of the MCP23S17,
        /// and `hardware_addr` is the 3-bit address strapped on the chip's A2..A0 pins.
        pub fn new(spi: SPI, cs: CS, hardware_addr: u8) -> Self {
            let base = 0b0100_0000 | valid_hardware_addr(hardware_addr) << 1;
            SpiInterface {
                spi,
                cs,
                write_command: base,
                read_command: base | 1,
            }
        }
    }

    impl<SPI, CS> ExpanderInterface for SpiInterface<SPI, CS>
    where
        SPI: hal::blocking::spi::Write<u8> + hal::blocking::spi::Transfer<u8>,
        CS: hal::digital::v2::OutputPin,
    {
        type Error = SpiInterfaceError<
            <CS as hal::digital::v2::OutputPin>::Error,
            <SPI as hal::blocking::spi::Write<u8>>::Error,
            <SPI as hal::blocking::spi::Transfer<u8>>::Error,
        >;

        fn write_register(&mut self, addr: RegisterAddress, value: u8) -> Result<(), Self::Error> {
            let buf = [self.write_command, u8::from(addr), value];

            // Select chip and do bus write.
            self.cs.set_low().map_err(Self::Error::from_cs)?;
            let result = self.spi.write(&buf);
            self.cs.set_high().map_err(Self::Error::from_cs)?;
            result.map_err(Self::Error::from_write)
        }

        fn read_register(&mut self, addr: RegisterAddress) -> Result<u8, Self::Error> {
            // The chip shifts the register value out during the third byte; the first two clock
            // in the control byte and register address.
            let mut buf = [self.read_command, u8::from(addr), 0u8];

            self.cs.set_low().map_err(Self::Error::from_cs)?;
            let data_result = self.spi.transfer(&mut buf);
            self.cs.set_high().map_err(Self::Error::from_cs)?;
            let return_data = data_result.map_err(Self::Error::from_transfer)?;

            Ok(return_data[2])
        }
    }
}
