//! Acquisition of the control lines
//!
//! Boards expose their GPIOs through different kernel interfaces. Each of them
//! implements [`DigitalIoBackend`] and is handed to
//! [`PanelHandle::claim`](crate::PanelHandle::claim) when the driver is built.

use core::fmt;
use core::str::FromStr;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::TransportError;

/// A GPIO line addressed by its controller and offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId {
    /// Index of the gpiochip, the bank on Rockchip SoCs
    pub chip: u32,
    /// Line offset inside the chip
    pub offset: u32,
}

impl LineId {
    /// Broadcom numbering, everything lives on gpiochip0
    pub const fn bcm(pin: u32) -> Self {
        LineId {
            chip: 0,
            offset: pin,
        }
    }

    /// Rockchip naming: bank, group letter `A`..`D`, index inside the group
    pub const fn rockchip(bank: u32, group: char, index: u32) -> Self {
        LineId {
            chip: bank,
            offset: (group as u32 - 'A' as u32) * 8 + index,
        }
    }

    /// Parses names like `GPIO1_C6`
    pub fn parse_rockchip(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("GPIO")?;
        let (bank, pin) = rest.split_once('_')?;
        let bank = bank.parse().ok()?;
        let mut chars = pin.chars();
        let group = chars.next().filter(|c| ('A'..='D').contains(c))?;
        let index = chars.as_str().parse().ok().filter(|i| *i < 8)?;
        Some(LineId::rockchip(bank, group, index))
    }

    /// Global number used by the legacy sysfs interface
    pub fn sysfs_number(&self) -> u64 {
        u64::from(self.chip) * 32 + u64::from(self.offset)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpiochip{}/line{}", self.chip, self.offset)
    }
}

impl FromStr for LineId {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(line) = LineId::parse_rockchip(s) {
            return Ok(line);
        }
        s.parse::<u32>()
            .map(LineId::bcm)
            .map_err(|_| TransportError::claim(s, "not a gpio line name"))
    }
}

/// Hands out the pins the panel needs
///
/// Implementations own whatever kernel resources are required and give back
/// embedded-hal pins. Whether dropping a pin gives its line back depends on the
/// kernel interface: character device lines are released, sysfs lines stay
/// exported.
pub trait DigitalIoBackend {
    /// Pin type for DC and RST
    type Output: OutputPin;
    /// Pin type for BUSY
    type Input: InputPin;

    /// Claims `line` as an output driven to `initial_high`
    fn claim_output(
        &mut self,
        line: &LineId,
        initial_high: bool,
    ) -> Result<Self::Output, TransportError>;

    /// Claims `line` as an input
    fn claim_input(&mut self, line: &LineId) -> Result<Self::Input, TransportError>;
}
