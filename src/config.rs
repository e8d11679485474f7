//! Timing parameters and board presets

use core::time::Duration;

use crate::backend::LineId;

/// Timings used by the transport and the refresh controller
///
/// The defaults match the timings the panel vendor recommends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Sleep between two reads of the busy line
    pub busy_poll_interval: Duration,
    /// Ceiling after which a busy panel is reported as [`Error::PanelTimeout`](crate::error::Error::PanelTimeout)
    pub busy_timeout: Duration,
    /// Time the reset line is held on each side of the reset pulse
    pub reset_settle: Duration,
    /// Idle time before the reset line is pulled low
    pub pre_reset_delay: Duration,
    /// Cadence of the animation worker
    pub frame_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            busy_poll_interval: Duration::from_millis(10),
            busy_timeout: Duration::from_secs(30),
            reset_settle: Duration::from_millis(20),
            pre_reset_delay: Duration::from_millis(100),
            frame_interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    pub fn with_busy_poll_interval(mut self, interval: Duration) -> Self {
        self.busy_poll_interval = interval;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_reset_settle(mut self, settle: Duration) -> Self {
        self.reset_settle = settle;
        self
    }

    pub fn with_pre_reset_delay(mut self, delay: Duration) -> Self {
        self.pre_reset_delay = delay;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Whole milliseconds, saturating, for the `DelayNs` based sleeps
    pub(crate) fn millis(duration: Duration) -> u32 {
        u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Control lines of the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelPins<L = LineId> {
    /// Data/Command select, high for data
    pub dc: L,
    /// Reset, active low
    pub rst: L,
    /// Busy sense, low while the panel is busy
    pub busy: L,
}

impl PanelPins<LineId> {
    /// Wiring of the Raspberry Pi carrier (BCM numbering)
    pub fn raspberry_pi() -> Self {
        PanelPins {
            dc: LineId::bcm(6),
            rst: LineId::bcm(13),
            busy: LineId::bcm(9),
        }
    }

    /// Wiring of the Rockchip carrier
    pub fn rockchip() -> Self {
        PanelPins {
            dc: LineId::rockchip(1, 'C', 6),
            rst: LineId::rockchip(1, 'B', 1),
            busy: LineId::rockchip(0, 'D', 3),
        }
    }
}

/// Settings of the spidev node the panel hangs off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiSettings {
    pub path: String,
    pub max_speed_hz: u32,
}

impl Default for SpiSettings {
    fn default() -> Self {
        SpiSettings {
            path: "/dev/spidev0.0".into(),
            max_speed_hz: 30_000_000,
        }
    }
}
