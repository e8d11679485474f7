use embedded_hal::{
    delay::DelayNs,
    digital::{Error as _, InputPin, OutputPin},
    spi::{Error as _, SpiDevice},
};

use crate::backend::DigitalIoBackend;
use crate::config::{Config, PanelPins};
use crate::error::{Error, Result, TransportError};
use crate::traits::Command;

/// Output lines the driver toggles directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    /// Data/Command select (high for data, low for command)
    DataCommand,
    /// Reset, active low
    Reset,
}

/// Owns everything the panel is wired to
///
/// SINGLE_BYTE_WRITE defines if a data block is written bytewise
/// or blockwise to the spi device
pub struct PanelHandle<SPI, BUSY, DC, RST, DELAY, const SINGLE_BYTE_WRITE: bool> {
    /// SPI
    spi: SPI,
    /// Low for busy, Wait until display is ready!
    busy: BUSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Resetting
    rst: RST,
    /// The concrete Delay implementation
    delay: DELAY,
    /// number of ms the idle loop should sleep on
    poll_interval_ms: u32,
    busy_timeout_ms: u32,
    reset_settle_ms: u32,
    pre_reset_ms: u32,
}

impl<SPI, BUSY, DC, RST, DELAY, const SINGLE_BYTE_WRITE: bool>
    PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Creates a new `PanelHandle` from already configured pins
    pub fn new(spi: SPI, busy: BUSY, dc: DC, rst: RST, delay: DELAY, config: &Config) -> Self {
        PanelHandle {
            spi,
            busy,
            dc,
            rst,
            delay,
            // a zero interval would never advance the timeout clock
            poll_interval_ms: Config::millis(config.busy_poll_interval).max(1),
            busy_timeout_ms: Config::millis(config.busy_timeout),
            reset_settle_ms: Config::millis(config.reset_settle),
            pre_reset_ms: Config::millis(config.pre_reset_delay),
        }
    }

    /// Gives back every resource the handle owns
    pub fn release(self) -> (SPI, BUSY, DC, RST, DELAY) {
        (self.spi, self.busy, self.dc, self.rst, self.delay)
    }

    /// Basic function for sending [Commands](Command).
    ///
    /// Enables direct interaction with the device with the help of [data()](PanelHandle::data())
    pub(crate) fn cmd<T: Command>(&mut self, command: T) -> Result<()> {
        // low for commands
        self.set_control_line(ControlLine::DataCommand, false)?;

        // Transfer the command over spi
        self.write(&[command.address()])
    }

    /// Basic function for sending an array of u8-values of data over spi
    ///
    /// Enables direct interaction with the device with the help of [cmd()](PanelHandle::cmd())
    pub(crate) fn data(&mut self, data: &[u8]) -> Result<()> {
        // high for data
        self.set_control_line(ControlLine::DataCommand, true)?;

        if SINGLE_BYTE_WRITE {
            for val in data.iter().copied() {
                // Transfer data one u8 at a time over spi
                self.write(&[val])?;
            }
        } else {
            self.write(data)?;
        }

        Ok(())
    }

    /// Basic function for sending [Commands](Command) and the data belonging to it.
    pub(crate) fn cmd_with_data<T: Command>(&mut self, command: T, data: &[u8]) -> Result<()> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Drives one of the output lines
    pub(crate) fn set_control_line(&mut self, line: ControlLine, high: bool) -> Result<()> {
        let result = match line {
            ControlLine::DataCommand => self
                .dc
                .set_state(high.into())
                .map_err(|e| TransportError::Dc(e.kind())),
            ControlLine::Reset => self
                .rst
                .set_state(high.into())
                .map_err(|e| TransportError::Rst(e.kind())),
        };
        Ok(result?)
    }

    // spi write helper/abstraction function
    fn write(&mut self, data: &[u8]) -> Result<()> {
        // transfer spi data
        // Be careful!! Linux has a default limit of 4096 bytes per spi transfer
        // see https://raspberrypi.stackexchange.com/questions/65595/spi-transfer-fails-with-buffer-size-greater-than-4096
        if cfg!(target_os = "linux") {
            for data_chunk in data.chunks(4096) {
                self.spi
                    .write(data_chunk)
                    .map_err(|e| TransportError::Spi(e.kind()))?;
            }
            Ok(())
        } else {
            self.spi
                .write(data)
                .map_err(|e| Error::from(TransportError::Spi(e.kind())))
        }
    }

    /// Checks if device is still busy
    ///
    /// The busy line of this panel is low while it is working.
    pub(crate) fn is_busy(&mut self) -> Result<bool> {
        Ok(self
            .busy
            .is_low()
            .map_err(|e| TransportError::Busy(e.kind()))?)
    }

    /// Waits until device isn't busy anymore (busy == HIGH)
    ///
    /// Polls every `busy_poll_interval` and gives up with
    /// [`Error::PanelTimeout`] once `busy_timeout` has passed.
    pub(crate) fn wait_until_idle(&mut self) -> Result<()> {
        let mut waited_ms = 0u32;
        while self.is_busy()? {
            if waited_ms >= self.busy_timeout_ms {
                log::warn!("panel still busy after {}ms, giving up", waited_ms);
                return Err(Error::PanelTimeout { waited_ms });
            }
            self.delay.delay_ms(self.poll_interval_ms);
            waited_ms = waited_ms.saturating_add(self.poll_interval_ms);
        }
        Ok(())
    }

    /// Abstraction of setting the delay for simpler calls
    pub(crate) fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Resets the device.
    ///
    /// Also the only way to wake the panel from deep sleep.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.delay.delay_ms(self.pre_reset_ms);
        self.set_control_line(ControlLine::Reset, false)?;
        self.delay.delay_ms(self.reset_settle_ms);
        self.set_control_line(ControlLine::Reset, true)?;
        self.delay.delay_ms(self.reset_settle_ms);
        Ok(())
    }
}

impl<SPI, BUSY, OUT, DELAY, const SINGLE_BYTE_WRITE: bool>
    PanelHandle<SPI, BUSY, OUT, OUT, DELAY, SINGLE_BYTE_WRITE>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    OUT: OutputPin,
    DELAY: DelayNs,
{
    /// Claims the control lines through `backend` and builds the handle
    ///
    /// DC starts high and RST starts released, so the panel sees no spurious reset.
    pub fn claim<B>(
        backend: &mut B,
        pins: &PanelPins,
        spi: SPI,
        delay: DELAY,
        config: &Config,
    ) -> Result<Self>
    where
        B: DigitalIoBackend<Input = BUSY, Output = OUT>,
    {
        let dc = backend.claim_output(&pins.dc, true)?;
        let rst = backend.claim_output(&pins.rst, true)?;
        let busy = backend.claim_input(&pins.busy)?;
        log::debug!(
            "claimed panel lines dc={} rst={} busy={}",
            pins.dc,
            pins.rst,
            pins.busy
        );
        Ok(Self::new(spi, busy, dc, rst, delay, config))
    }
}
