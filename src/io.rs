//! Shared register I/O. `BoardIo` is the immediate-mode adapter that serializes all register
//! traffic to one chip behind a mutex; every view operation locks, performs its bus
//! transaction(s), and unlocks.

use core::marker::PhantomData;

use device::Expander;
use error::Error;
use interface::ExpanderInterface;
use mutex::IOMutex;
use registers::Register;
use views::{BitView, Nibble, NibbleView, Polarity, PortView};

/// An indirection between the register views and the expander itself. Implementations must make
/// `update_register` atomic with respect to every other method, since the read-modify-write is
/// what keeps sibling bits of a shared register intact.
pub trait RegisterIo {
    /// The transport error type of the underlying interface.
    type Error;

    /// Read the current value of `reg`.
    fn read_register(&self, reg: Register) -> Result<u8, Error<Self::Error>>;

    /// Write `value` to `reg`, replacing the whole byte.
    fn write_register(&self, reg: Register, value: u8) -> Result<(), Error<Self::Error>>;

    /// Replace the bits selected by `mask` with `bits`, preserving the rest of the byte, as one
    /// atomic read-modify-write.
    fn update_register(&self, reg: Register, mask: u8, bits: u8) -> Result<(), Error<Self::Error>>;

    /// Record exclusive ownership of the `mask` bits of `reg`, failing if any is already owned.
    fn claim_bits(&self, reg: Register, mask: u8) -> Result<(), Error<Self::Error>>;
}

/// This I/O adapter captures the `Expander` and provides the factory methods for the register
/// views the board objects are built from. Each view operation immediately issues a bus
/// transaction under the adapter's mutex.
pub struct BoardIo<M, EI>(M, PhantomData<EI>)
where
    M: IOMutex<Expander<EI>>,
    EI: ExpanderInterface;

impl<M, EI> BoardIo<M, EI>
where
    M: IOMutex<Expander<EI>>,
    EI: ExpanderInterface,
{
    pub(crate) fn new(expander: Expander<EI>) -> Self {
        BoardIo(M::new(expander), PhantomData)
    }

    /// Create an exclusive [`BitView`] over one bit of `reg`. Fails if another exclusive view
    /// already owns the bit.
    pub fn bit<'io>(
        &'io self,
        reg: Register,
        bit: u8,
        polarity: Polarity,
    ) -> Result<BitView<'io, Self>, Error<EI::Error>> {
        BitView::claim(self, reg, bit, polarity)
    }

    /// Create a [`BitView`] that deliberately aliases bits other views may also address. Reserved
    /// for read-mostly views; writes through aliased views can stomp each other.
    pub fn shared_bit<'io>(&'io self, reg: Register, bit: u8, polarity: Polarity) -> BitView<'io, Self> {
        BitView::shared(self, reg, bit, polarity)
    }

    /// Create an exclusive [`NibbleView`] over one half of `reg`.
    pub fn nibble<'io>(
        &'io self,
        reg: Register,
        nibble: Nibble,
        polarity: Polarity,
    ) -> Result<NibbleView<'io, Self>, Error<EI::Error>> {
        NibbleView::claim(self, reg, nibble, polarity)
    }

    /// Create an aliasing [`NibbleView`]; see [`BoardIo::shared_bit`].
    pub fn shared_nibble<'io>(
        &'io self,
        reg: Register,
        nibble: Nibble,
        polarity: Polarity,
    ) -> NibbleView<'io, Self> {
        NibbleView::shared(self, reg, nibble, polarity)
    }

    /// Create an exclusive [`PortView`] over the whole of `reg`.
    pub fn port<'io>(
        &'io self,
        reg: Register,
        polarity: Polarity,
    ) -> Result<PortView<'io, Self>, Error<EI::Error>> {
        PortView::claim(self, reg, polarity)
    }

    /// Create an aliasing [`PortView`]; see [`BoardIo::shared_bit`].
    pub fn shared_port<'io>(&'io self, reg: Register, polarity: Polarity) -> PortView<'io, Self> {
        PortView::shared(self, reg, polarity)
    }
}

impl<M, EI> RegisterIo for BoardIo<M, EI>
where
    M: IOMutex<Expander<EI>>,
    EI: ExpanderInterface,
{
    type Error = EI::Error;

    fn read_register(&self, reg: Register) -> Result<u8, Error<EI::Error>> {
        self.0.lock(|ex| ex.read(reg))
    }

    fn write_register(&self, reg: Register, value: u8) -> Result<(), Error<EI::Error>> {
        self.0.lock(|ex| ex.write(reg, value))
    }

    fn update_register(&self, reg: Register, mask: u8, bits: u8) -> Result<(), Error<EI::Error>> {
        self.0.lock(|ex| ex.update(reg, mask, bits))
    }

    fn claim_bits(&self, reg: Register, mask: u8) -> Result<(), Error<EI::Error>> {
        self.0.lock(|ex| ex.claim_bits(reg, mask))
    }
}
