//! DC motor direction control through a DRV8835 driver wired to two expander pins.

use error::Error;
use io::RegisterIo;
use throttle::CommandGate;
use views::BitView;

/// The four drive modes of a two-pin DC motor driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorMode {
    /// Both outputs driven to the same rail; the motor windings are shorted and the rotor stops
    /// quickly.
    Brake,
    /// Outputs released; the rotor spins down freely.
    Coast,
    Forward,
    Reverse,
}

/// The logical (pin1, pin2) values commanded for one drive mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrivePattern {
    pub pin1: u8,
    pub pin2: u8,
}

/// The full mode-to-pins mapping for a motor.
///
/// The DRV8835 datasheet lists coast as (0, 0) and brake as (1, 1); boards in the field behave
/// with the two swapped, and the defaults here follow the boards. If your hardware follows the
/// datasheet, construct the motor with [`Motor::with_patterns`] and the swapped mapping instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrivePatterns {
    pub brake: DrivePattern,
    pub coast: DrivePattern,
    pub forward: DrivePattern,
    pub reverse: DrivePattern,
}

impl DrivePatterns {
    fn pattern(&self, mode: MotorMode) -> DrivePattern {
        match mode {
            MotorMode::Brake => self.brake,
            MotorMode::Coast => self.coast,
            MotorMode::Forward => self.forward,
            MotorMode::Reverse => self.reverse,
        }
    }
}

impl Default for DrivePatterns {
    fn default() -> Self {
        DrivePatterns {
            brake: DrivePattern { pin1: 0, pin2: 0 },
            coast: DrivePattern { pin1: 1, pin2: 1 },
            forward: DrivePattern { pin1: 1, pin2: 0 },
            reverse: DrivePattern { pin1: 0, pin2: 1 },
        }
    }
}

/// One DC motor. Owns the two direction pins and tracks the current mode so that destructive
/// transitions can be refused before anything reaches the hardware.
///
/// Commanding `Forward` from `Reverse` (or vice versa) reverses the winding current while the
/// rotor is still turning; the motor must be taken through `Brake` or `Coast` first, and the
/// state machine enforces that. Every mode change is additionally admitted by the shared
/// [`CommandGate`](::throttle::CommandGate) before pins move.
pub struct Motor<'io, 'g, IO: RegisterIo, G: CommandGate> {
    pin1: BitView<'io, IO>,
    pin2: BitView<'io, IO>,
    gate: &'g G,
    patterns: DrivePatterns,
    mode: MotorMode,
}

impl<'io, 'g, IO: RegisterIo, G: CommandGate> Motor<'io, 'g, IO, G> {
    /// Create a motor over two direction pins with the default drive patterns. The motor is
    /// braked immediately; construction-time initialization writes the pins directly and does
    /// not consult the gate.
    pub fn new(
        pin1: BitView<'io, IO>,
        pin2: BitView<'io, IO>,
        gate: &'g G,
    ) -> Result<Self, Error<IO::Error>> {
        Motor::with_patterns(pin1, pin2, gate, DrivePatterns::default())
    }

    /// Create a motor with an explicit mode-to-pins mapping.
    pub fn with_patterns(
        pin1: BitView<'io, IO>,
        pin2: BitView<'io, IO>,
        gate: &'g G,
        patterns: DrivePatterns,
    ) -> Result<Self, Error<IO::Error>> {
        let motor = Motor {
            pin1,
            pin2,
            gate,
            patterns,
            mode: MotorMode::Brake,
        };
        motor.apply(MotorMode::Brake)?;
        Ok(motor)
    }

    /// The mode the motor is currently commanded to.
    pub fn mode(&self) -> MotorMode {
        self.mode
    }

    /// Command the motor into `target` mode.
    ///
    /// Re-commanding the current mode succeeds without moving pins or consulting the gate. A
    /// direct `Forward`/`Reverse` flip fails with `Error::ForbiddenTransition` before the gate is
    /// consulted; any other change is admitted through the gate (`Error::TooSoon` if the shared
    /// activation window has not elapsed) and then written to both pins. On failure neither pins
    /// nor the tracked mode change.
    pub fn transition(&mut self, target: MotorMode) -> Result<(), Error<IO::Error>> {
        if target == self.mode {
            return Ok(());
        }
        match (self.mode, target) {
            (MotorMode::Forward, MotorMode::Reverse) | (MotorMode::Reverse, MotorMode::Forward) => {
                return Err(Error::ForbiddenTransition {
                    from: self.mode,
                    to: target,
                });
            }
            _ => {}
        }
        self.gate
            .admit()
            .map_err(|holdoff| Error::TooSoon {
                remaining_ms: holdoff.remaining_ms,
            })?;
        self.apply(target)?;
        self.mode = target;
        Ok(())
    }

    /// Sets the motor so that it is moving forward.
    pub fn forward(&mut self) -> Result<(), Error<IO::Error>> {
        self.transition(MotorMode::Forward)
    }

    /// Sets the motor so that it is moving in reverse.
    pub fn reverse(&mut self) -> Result<(), Error<IO::Error>> {
        self.transition(MotorMode::Reverse)
    }

    /// Sets the motor so that it is coasting.
    pub fn coast(&mut self) -> Result<(), Error<IO::Error>> {
        self.transition(MotorMode::Coast)
    }

    /// Stop the motor.
    pub fn brake(&mut self) -> Result<(), Error<IO::Error>> {
        self.transition(MotorMode::Brake)
    }

    fn apply(&self, mode: MotorMode) -> Result<(), Error<IO::Error>> {
        let pattern = self.patterns.pattern(mode);
        self.pin1.set(pattern.pin1)?;
        self.pin2.set(pattern.pin2)
    }
}
