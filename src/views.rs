//! Logical accessors exposing subsets of a register's bits as independent read/write values.
//! Relays, motor direction pins, and the input port are all built from these. Polarity inversion
//! for active-low wiring lives here and nowhere else.

use hal::digital::v2::{InputPin, OutputPin};

use error::Error;
use io::RegisterIo;
use registers::Register;

pub(crate) fn valid_bit(bit: u8) -> u8 {
    match bit {
        0..=7 => bit,
        _ => panic!("a byte register has no bit {}", bit),
    }
}

/// Whether the logical value of a view is the physical bit value or its complement. Active-low
/// wiring (input pull-ups, the inverted motor pins) uses `ActiveLow`, so call sites never repeat
/// the XOR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// The XOR mask translating between logical and physical values of a field whose significant
    /// bits are `width_mask`.
    fn invert_mask(self, width_mask: u8) -> u8 {
        match self {
            Polarity::ActiveHigh => 0,
            Polarity::ActiveLow => width_mask,
        }
    }
}

/// Which half of a register a `NibbleView` addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nibble {
    Lower,
    Upper,
}

impl Nibble {
    fn shift(self) -> u8 {
        match self {
            Nibble::Lower => 0,
            Nibble::Upper => 4,
        }
    }
}

/// A single bit of a register, read and written as a logical 0/1. Writes are read-modify-write
/// through [`RegisterIo::update_register`], so sibling bits are never perturbed.
pub struct BitView<'io, IO: RegisterIo> {
    io: &'io IO,
    register: Register,
    bit: u8,
    polarity: Polarity,
}

impl<'io, IO: RegisterIo> BitView<'io, IO> {
    /// Create a view with exclusive ownership of its bit, recorded in the device's claim table.
    /// Fails with `Error::Claimed` if another exclusive view already owns it.
    pub fn claim(
        io: &'io IO,
        register: Register,
        bit: u8,
        polarity: Polarity,
    ) -> Result<Self, Error<IO::Error>> {
        let bit = valid_bit(bit);
        io.claim_bits(register, 1 << bit)?;
        Ok(BitView::shared(io, register, bit, polarity))
    }

    /// Create a view without recording a claim. For deliberately aliased, read-mostly views such
    /// as an input port overlaying its individual input bits.
    pub fn shared(io: &'io IO, register: Register, bit: u8, polarity: Polarity) -> Self {
        BitView {
            io,
            register,
            bit: valid_bit(bit),
            polarity,
        }
    }

    /// Read the logical value of the bit, 0 or 1.
    pub fn value(&self) -> Result<u8, Error<IO::Error>> {
        let byte = self.io.read_register(self.register)?;
        Ok((byte >> self.bit & 1) ^ self.polarity.invert_mask(1))
    }

    /// Set the logical value of the bit. `value` must be 0 or 1.
    pub fn set(&self, value: u8) -> Result<(), Error<IO::Error>> {
        if value > 1 {
            return Err(Error::Domain { value, max: 1 });
        }
        let physical = value ^ self.polarity.invert_mask(1);
        self.io
            .update_register(self.register, 1 << self.bit, physical << self.bit)
    }
}

impl<'io, IO: RegisterIo> OutputPin for BitView<'io, IO> {
    type Error = Error<IO::Error>;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(0)
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(1)
    }
}

impl<'io, IO: RegisterIo> InputPin for BitView<'io, IO> {
    type Error = Error<IO::Error>;

    fn is_high(&self) -> Result<bool, Self::Error> {
        self.value().map(|v| v == 1)
    }
    fn is_low(&self) -> Result<bool, Self::Error> {
        self.value().map(|v| v == 0)
    }
}

/// Four contiguous bits of a register, read and written as a value 0..=15.
pub struct NibbleView<'io, IO: RegisterIo> {
    io: &'io IO,
    register: Register,
    nibble: Nibble,
    polarity: Polarity,
}

impl<'io, IO: RegisterIo> NibbleView<'io, IO> {
    /// Create a view with exclusive ownership of its four bits. Fails with `Error::Claimed` if
    /// any of them is already owned.
    pub fn claim(
        io: &'io IO,
        register: Register,
        nibble: Nibble,
        polarity: Polarity,
    ) -> Result<Self, Error<IO::Error>> {
        io.claim_bits(register, 0x0F << nibble.shift())?;
        Ok(NibbleView::shared(io, register, nibble, polarity))
    }

    /// Create a view without recording a claim; see [`BitView::shared`].
    pub fn shared(io: &'io IO, register: Register, nibble: Nibble, polarity: Polarity) -> Self {
        NibbleView {
            io,
            register,
            nibble,
            polarity,
        }
    }

    /// Read the logical value of the nibble, 0..=15.
    pub fn value(&self) -> Result<u8, Error<IO::Error>> {
        let byte = self.io.read_register(self.register)?;
        Ok((byte >> self.nibble.shift() & 0x0F) ^ self.polarity.invert_mask(0x0F))
    }

    /// Set the logical value of the nibble. `value` must be in 0..=15.
    pub fn set(&self, value: u8) -> Result<(), Error<IO::Error>> {
        if value > 0x0F {
            return Err(Error::Domain { value, max: 0x0F });
        }
        let physical = value ^ self.polarity.invert_mask(0x0F);
        self.io.update_register(
            self.register,
            0x0F << self.nibble.shift(),
            physical << self.nibble.shift(),
        )
    }
}

/// A whole register read and written as one byte. Unlike the narrower views this does not
/// read-modify-write; writing replaces the entire byte, which is its contract.
pub struct PortView<'io, IO: RegisterIo> {
    io: &'io IO,
    register: Register,
    polarity: Polarity,
}

impl<'io, IO: RegisterIo> PortView<'io, IO> {
    /// Create a view with exclusive ownership of all eight bits.
    pub fn claim(
        io: &'io IO,
        register: Register,
        polarity: Polarity,
    ) -> Result<Self, Error<IO::Error>> {
        io.claim_bits(register, 0xFF)?;
        Ok(PortView::shared(io, register, polarity))
    }

    /// Create a view without recording a claim; see [`BitView::shared`].
    pub fn shared(io: &'io IO, register: Register, polarity: Polarity) -> Self {
        PortView {
            io,
            register,
            polarity,
        }
    }

    /// Read the logical value of the whole register.
    pub fn value(&self) -> Result<u8, Error<IO::Error>> {
        let byte = self.io.read_register(self.register)?;
        Ok(byte ^ self.polarity.invert_mask(0xFF))
    }

    /// Write the whole register.
    pub fn set(&self, value: u8) -> Result<(), Error<IO::Error>> {
        self.io
            .write_register(self.register, value ^ self.polarity.invert_mask(0xFF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::Expander;
    use interface::test_spy::{TestRegister as TR, TestSpyInterface};
    use mutex::DefaultMutex;
    use proptest::prelude::*;
    use registers::Port;

    const GPIOA: u8 = 0x12;
    const GPIOB: u8 = 0x13;

    #[test]
    fn bit_set_and_read_back() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let bit = io.bit(Register::Gpio(Port::A), 3, Polarity::ActiveHigh).unwrap();

        assert!(bit.set(1).is_ok());
        assert_eq!(ei.get(GPIOA), TR::WrittenValue(0b00001000));
        assert_eq!(bit.value(), Ok(1));
    }

    #[test]
    fn bit_set_preserves_siblings() {
        let mut ei = TestSpyInterface::new();
        ei.set(GPIOA, TR::ResetValue(0b11110000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let bit = io.bit(Register::Gpio(Port::A), 0, Polarity::ActiveHigh).unwrap();

        assert!(bit.set(1).is_ok());
        assert_eq!(ei.get(GPIOA), TR::WrittenValue(0b11110001));
        assert!(bit.set(0).is_ok());
        assert_eq!(ei.get(GPIOA), TR::WrittenValue(0b11110000));
    }

    #[test]
    fn bit_active_low_inverts_both_ways() {
        let mut ei = TestSpyInterface::new();
        ei.set(GPIOB, TR::ResetValue(0b00000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let bit = io.bit(Register::Gpio(Port::B), 2, Polarity::ActiveLow).unwrap();

        // Physical 0 reads as logical 1 on active-low wiring.
        assert_eq!(bit.value(), Ok(1));
        assert!(bit.set(1).is_ok());
        assert_eq!(ei.get(GPIOB), TR::WrittenValue(0b00000000));
        assert!(bit.set(0).is_ok());
        assert_eq!(ei.get(GPIOB), TR::WrittenValue(0b00000100));
    }

    #[test]
    fn bit_rejects_out_of_domain_values() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let bit = io.bit(Register::Gpio(Port::A), 0, Polarity::ActiveHigh).unwrap();

        assert_eq!(bit.set(2), Err(Error::Domain { value: 2, max: 1 }));
        // Nothing was written.
        assert_eq!(ei.get(GPIOA), TR::ResetValue(0x00));
    }

    #[test]
    #[should_panic]
    fn bit_index_out_of_range_panics() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let _ = io.bit(Register::Gpio(Port::A), 8, Polarity::ActiveHigh);
    }

    #[test]
    fn overlapping_exclusive_bits_are_rejected() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let _first = io.bit(Register::Gpio(Port::A), 5, Polarity::ActiveHigh).unwrap();

        assert_eq!(
            io.bit(Register::Gpio(Port::A), 5, Polarity::ActiveLow).err(),
            Some(Error::Claimed {
                register: Register::Gpio(Port::A),
                mask: 0b00100000,
            })
        );
        // A shared view over the same bit is allowed.
        let aliased = io.shared_bit(Register::Gpio(Port::A), 5, Polarity::ActiveHigh);
        assert_eq!(aliased.value(), Ok(0));
    }

    #[test]
    fn nibble_claim_overlapping_bit_rejected() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let _bit = io.bit(Register::Gpio(Port::B), 6, Polarity::ActiveHigh).unwrap();

        assert!(io
            .nibble(Register::Gpio(Port::B), Nibble::Upper, Polarity::ActiveHigh)
            .is_err());
        assert!(io
            .nibble(Register::Gpio(Port::B), Nibble::Lower, Polarity::ActiveHigh)
            .is_ok());
    }

    #[test]
    fn nibble_upper_set_leaves_lower_untouched() {
        let mut ei = TestSpyInterface::new();
        ei.set(GPIOB, TR::ResetValue(0b00000101));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let nib = io
            .nibble(Register::Gpio(Port::B), Nibble::Upper, Polarity::ActiveHigh)
            .unwrap();

        assert!(nib.set(0b1010).is_ok());
        assert_eq!(ei.get(GPIOB), TR::WrittenValue(0b10100101));
        assert_eq!(nib.value(), Ok(0b1010));
    }

    #[test]
    fn nibble_lower_set_leaves_upper_untouched() {
        let mut ei = TestSpyInterface::new();
        ei.set(GPIOB, TR::ResetValue(0b11000000));
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let nib = io
            .nibble(Register::Gpio(Port::B), Nibble::Lower, Polarity::ActiveHigh)
            .unwrap();

        assert!(nib.set(0x0F).is_ok());
        assert_eq!(ei.get(GPIOB), TR::WrittenValue(0b11001111));
    }

    #[test]
    fn nibble_active_low_round_trip() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let nib = io
            .nibble(Register::Gpio(Port::B), Nibble::Upper, Polarity::ActiveLow)
            .unwrap();

        assert!(nib.set(0b0011).is_ok());
        assert_eq!(ei.get(GPIOB), TR::WrittenValue(0b11000000));
        assert_eq!(nib.value(), Ok(0b0011));
    }

    #[test]
    fn nibble_rejects_out_of_domain_values() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let nib = io
            .nibble(Register::Gpio(Port::B), Nibble::Lower, Polarity::ActiveHigh)
            .unwrap();

        assert_eq!(nib.set(16), Err(Error::Domain { value: 16, max: 15 }));
    }

    #[test]
    fn port_view_round_trip_inverted() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let port = io.port(Register::Gpio(Port::A), Polarity::ActiveLow).unwrap();

        assert!(port.set(0xAA).is_ok());
        assert_eq!(ei.get(GPIOA), TR::WrittenValue(0x55));
        assert_eq!(port.value(), Ok(0xAA));
    }

    #[test]
    fn port_claim_excludes_bit_claims() {
        let ei = TestSpyInterface::new();
        let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
        let _port = io.port(Register::Gpio(Port::A), Polarity::ActiveHigh).unwrap();
        assert!(io.bit(Register::Gpio(Port::A), 0, Polarity::ActiveHigh).is_err());
    }

    proptest! {
        #[test]
        fn bit_round_trips_and_preserves_background(
            bit in 0u8..8,
            value in 0u8..2,
            invert in any::<bool>(),
            background in any::<u8>(),
        ) {
            let mut ei = TestSpyInterface::new();
            ei.set(GPIOA, TR::ResetValue(background));
            let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
            let polarity = if invert { Polarity::ActiveLow } else { Polarity::ActiveHigh };
            let view = io.bit(Register::Gpio(Port::A), bit, polarity).unwrap();

            view.set(value).unwrap();
            prop_assert_eq!(view.value().unwrap(), value);

            let written = match ei.get(GPIOA) {
                TR::WrittenValue(v) => v,
                TR::ResetValue(v) => v,
                TR::IgnoreWrite(v) => v,
            };
            prop_assert_eq!(written & !(1 << bit), background & !(1 << bit));
        }

        #[test]
        fn nibble_round_trips_and_preserves_opposite_half(
            upper in any::<bool>(),
            value in 0u8..16,
            invert in any::<bool>(),
            background in any::<u8>(),
        ) {
            let mut ei = TestSpyInterface::new();
            ei.set(GPIOB, TR::ResetValue(background));
            let io = Expander::new(ei.split()).into_io::<DefaultMutex<_>>();
            let nibble = if upper { Nibble::Upper } else { Nibble::Lower };
            let polarity = if invert { Polarity::ActiveLow } else { Polarity::ActiveHigh };
            let view = io.nibble(Register::Gpio(Port::B), nibble, polarity).unwrap();

            view.set(value).unwrap();
            prop_assert_eq!(view.value().unwrap(), value);

            let written = match ei.get(GPIOB) {
                TR::WrittenValue(v) => v,
                TR::ResetValue(v) => v,
                TR::IgnoreWrite(v) => v,
            };
            let opposite = match nibble {
                Nibble::Upper => 0x0Fu8,
                Nibble::Lower => 0xF0u8,
            };
            prop_assert_eq!(written & opposite, background & opposite);
        }
    }
}
