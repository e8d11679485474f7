//! Linux board support: GPIO backends, spidev and board detection

use std::collections::HashMap;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    sysfs_gpio::Direction,
    CdevPin, Delay, SpidevDevice, SysfsPin,
};

use crate::backend::{DigitalIoBackend, LineId};
use crate::config::{Config, PanelPins, SpiSettings};
use crate::display::EinkDisplay;
use crate::error::{Error, Result, TransportError};

/// Consumer label shown by `gpioinfo` for claimed lines
const CONSUMER: &str = "epd-distiller";

/// Where the kernel reports its release string
const OSRELEASE: &str = "/proc/sys/kernel/osrelease";

/// How often a freshly exported sysfs line is checked for
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long udev gets to create a sysfs line
const EXPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Display on a Raspberry Pi through sysfs GPIO
pub type SysfsDisplay = EinkDisplay<SpidevDevice, SysfsPin, SysfsPin, SysfsPin, Delay>;
/// Display on a Rockchip board through the GPIO character device
pub type CdevDisplay = EinkDisplay<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

/// Legacy sysfs GPIO interface
///
/// Lines are exported on claim and stay exported after the pins are dropped.
/// `base` is added to the line number, newer Raspberry Pi kernels register
/// the main controller at 512.
#[derive(Debug, Clone)]
pub struct SysfsBackend {
    base: u64,
    export_timeout: Duration,
}

impl Default for SysfsBackend {
    fn default() -> Self {
        SysfsBackend {
            base: 0,
            export_timeout: EXPORT_TIMEOUT,
        }
    }
}

impl SysfsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: u64) -> Self {
        SysfsBackend {
            base,
            ..Self::default()
        }
    }

    /// How long a claim waits for the exported line to show up
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    fn export(&self, line: &LineId, direction: Direction) -> Result<SysfsPin, TransportError> {
        let pin = SysfsPin::new(self.base + line.sysfs_number());
        pin.export()
            .map_err(|e| TransportError::claim(line, e))?;
        // udev needs a moment to hand out permissions
        if !poll_until(|| pin.is_exported(), EXPORT_POLL_INTERVAL, self.export_timeout) {
            return Err(TransportError::claim(
                line,
                format!("not exported after {:?}", self.export_timeout),
            ));
        }
        pin.set_direction(direction)
            .map_err(|e| TransportError::claim(line, e))?;
        Ok(pin)
    }
}

/// Checks `ready` every `interval` until it holds or `timeout` ran out
fn poll_until(mut ready: impl FnMut() -> bool, interval: Duration, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if ready() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(interval);
    }
}

impl DigitalIoBackend for SysfsBackend {
    type Output = SysfsPin;
    type Input = SysfsPin;

    fn claim_output(
        &mut self,
        line: &LineId,
        initial_high: bool,
    ) -> Result<Self::Output, TransportError> {
        let direction = if initial_high {
            Direction::High
        } else {
            Direction::Low
        };
        self.export(line, direction)
    }

    fn claim_input(&mut self, line: &LineId) -> Result<Self::Input, TransportError> {
        self.export(line, Direction::In)
    }
}

/// GPIO character device interface, one `/dev/gpiochipN` per bank
#[derive(Default)]
pub struct CdevBackend {
    chips: HashMap<u32, Chip>,
}

impl CdevBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(
        &mut self,
        line: &LineId,
        flags: LineRequestFlags,
        default: u8,
    ) -> Result<CdevPin, TransportError> {
        let chip = match self.chips.entry(line.chip) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let path = format!("/dev/gpiochip{}", line.chip);
                let chip = Chip::new(&path).map_err(|e| TransportError::claim(&path, e))?;
                entry.insert(chip)
            }
        };
        let handle = chip
            .get_line(line.offset)
            .and_then(|l| l.request(flags, default, CONSUMER))
            .map_err(|e| TransportError::claim(line, e))?;
        CdevPin::new(handle).map_err(|e| TransportError::claim(line, e))
    }
}

impl DigitalIoBackend for CdevBackend {
    type Output = CdevPin;
    type Input = CdevPin;

    fn claim_output(
        &mut self,
        line: &LineId,
        initial_high: bool,
    ) -> Result<Self::Output, TransportError> {
        self.request(line, LineRequestFlags::OUTPUT, u8::from(initial_high))
    }

    fn claim_input(&mut self, line: &LineId) -> Result<Self::Input, TransportError> {
        self.request(line, LineRequestFlags::INPUT, 0)
    }
}

/// Opens and configures the SPI device node
pub fn open_spi(settings: &SpiSettings) -> Result<SpidevDevice, TransportError> {
    let mut spi = SpidevDevice::open(&settings.path)
        .map_err(|e| TransportError::claim(&settings.path, e))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(settings.max_speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)
        .map_err(|e| TransportError::claim(&settings.path, e))?;
    Ok(spi)
}

/// Boards the panel ships on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    /// Raspberry Pi, sysfs GPIO with BCM numbering
    RaspberryPi,
    /// Rockchip SoC, GPIO character devices
    Rockchip,
}

impl Board {
    /// Picks the board from the kernel release string
    pub fn detect() -> Result<Self> {
        let release = fs::read_to_string(OSRELEASE).map_err(|source| Error::Io {
            path: OSRELEASE.into(),
            source,
        })?;
        let board = Board::from_release(&release);
        log::info!("kernel {} -> {:?}", release.trim(), board);
        Ok(board)
    }

    pub fn from_release(release: &str) -> Self {
        if release.contains("rockchip") {
            Board::Rockchip
        } else {
            Board::RaspberryPi
        }
    }

    /// Control lines of the panel on this board
    pub fn pins(self) -> PanelPins {
        match self {
            Board::RaspberryPi => PanelPins::raspberry_pi(),
            Board::Rockchip => PanelPins::rockchip(),
        }
    }
}

/// Opens the panel on a Raspberry Pi
pub fn open_sysfs(settings: &SpiSettings, config: &Config) -> Result<SysfsDisplay> {
    let spi = open_spi(settings)?;
    let pins = Board::RaspberryPi.pins();
    EinkDisplay::claim(&mut SysfsBackend::new(), &pins, spi, Delay, config)
}

/// Opens the panel on a Rockchip board
pub fn open_cdev(settings: &SpiSettings, config: &Config) -> Result<CdevDisplay> {
    let spi = open_spi(settings)?;
    let pins = Board::Rockchip.pins();
    EinkDisplay::claim(&mut CdevBackend::new(), &pins, spi, Delay, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_from_release() {
        assert_eq!(
            Board::from_release("5.10.160-rockchip-rk3566"),
            Board::Rockchip
        );
        assert_eq!(Board::from_release("6.6.31+rpt-rpi-v8"), Board::RaspberryPi);
    }

    #[test]
    fn polling_gives_up_after_timeout() {
        let started = Instant::now();
        let mut checks = 0;
        let ready = poll_until(
            || {
                checks += 1;
                false
            },
            Duration::from_millis(5),
            Duration::from_millis(30),
        );
        assert!(!ready);
        assert!(checks > 1);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn polling_stops_once_ready() {
        let mut checks = 0;
        let ready = poll_until(
            || {
                checks += 1;
                checks == 3
            },
            Duration::from_millis(1),
            Duration::from_secs(5),
        );
        assert!(ready);
        assert_eq!(checks, 3);
    }

    #[test]
    fn board_pins() {
        assert_eq!(Board::Rockchip.pins().busy, LineId::rockchip(0, 'D', 3));
        assert_eq!(Board::RaspberryPi.pins().dc, LineId::bcm(6));
    }
}
