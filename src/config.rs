//! Abstractions used to configure the MCP23S17 hardware.

/// The hardware feature bits of the MCP23S17's IOCON register. An `IoConfig` is written to the
/// device during `Expander::probe` and read back to verify that a board is actually present on
/// the bus.
///
/// The default configuration is the one the relay board is operated with: sequential addressing
/// disabled and hardware addressing enabled, everything else at its reset value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IoConfig {
    /// Select the segregated (BANK=1) register layout instead of the interleaved BANK=0 layout.
    /// The address map in [`registers`](::registers) assumes BANK=0; leave this unset.
    pub banked_layout: bool,

    /// Internally connect the INTA and INTB interrupt output pins.
    pub mirror_interrupts: bool,

    /// Disable automatic address-pointer increment during multi-byte transfers.
    pub sequential_disabled: bool,

    /// Disable slew-rate control on the SDA pin.
    pub slew_rate_disabled: bool,

    /// Honor the A2..A0 hardware address pins when decoding the SPI control byte.
    pub hardware_addressing: bool,

    /// Configure the interrupt output pins as open-drain.
    pub open_drain_interrupt: bool,

    /// Drive the interrupt output pins active-high instead of active-low.
    pub interrupt_active_high: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            banked_layout: false,
            mirror_interrupts: false,
            sequential_disabled: true,
            slew_rate_disabled: false,
            hardware_addressing: true,
            open_drain_interrupt: false,
            interrupt_active_high: false,
        }
    }
}

impl From<IoConfig> for u8 {
    fn from(cfg: IoConfig) -> u8 {
        let mut byte = 0u8;
        if cfg.banked_layout {
            byte |= 0b10000000;
        }
        if cfg.mirror_interrupts {
            byte |= 0b01000000;
        }
        if cfg.sequential_disabled {
            byte |= 0b00100000;
        }
        if cfg.slew_rate_disabled {
            byte |= 0b00010000;
        }
        if cfg.hardware_addressing {
            byte |= 0b00001000;
        }
        if cfg.open_drain_interrupt {
            byte |= 0b00000100;
        }
        if cfg.interrupt_active_high {
            byte |= 0b00000010;
        }
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_config_default() {
        assert_eq!(u8::from(IoConfig::default()), 0b00101000);
    }

    #[test]
    fn io_config_all_clear() {
        let cfg = IoConfig {
            sequential_disabled: false,
            hardware_addressing: false,
            ..IoConfig::default()
        };
        assert_eq!(u8::from(cfg), 0b00000000);
    }

    #[test]
    fn io_config_mirror_interrupts() {
        let cfg = IoConfig {
            mirror_interrupts: true,
            ..IoConfig::default()
        };
        assert_eq!(u8::from(cfg), 0b01101000);
    }

    #[test]
    fn io_config_interrupt_shape() {
        let cfg = IoConfig {
            open_drain_interrupt: true,
            interrupt_active_high: true,
            ..IoConfig::default()
        };
        assert_eq!(u8::from(cfg), 0b00101110);
    }

    #[test]
    fn io_config_banked_layout() {
        let cfg = IoConfig {
            banked_layout: true,
            ..IoConfig::default()
        };
        assert_eq!(u8::from(cfg), 0b10101000);
    }
}
