//! Refresh controller
//!
//! [`EinkDisplay`] turns frames into complete refresh cycles: it picks the init
//! sequence, encodes, transmits and keeps the last shown frame for
//! [`reflush`](RefreshController::reflush).
//!
//! A cycle either completes or leaves the driver as it was before the call. If
//! it fails after frame data went out, the panel is reset so the half written
//! RAM is never refreshed onto the glass.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::backend::DigitalIoBackend;
use crate::config::{Config, PanelPins};
use crate::encoder::{encode_1bit, encode_4gray};
use crate::error::{Error, Result};
use crate::frame::GreyscaleFrame;
use crate::interface::PanelHandle;
use crate::panel::{Panel, PanelState, HEIGHT, SINGLE_BYTE_WRITE, WIDTH};
use crate::traits::{DisplayMode, RefreshController};

/// Driver for the whole panel
pub struct EinkDisplay<SPI, BUSY, DC, RST, DELAY> {
    panel: Panel<SPI, BUSY, DC, RST, DELAY>,
    /// The panel RAM holds a 4 gray image, the next 1-bit update has to clear it first
    in_4gray: bool,
    last_frame: Option<(GreyscaleFrame, DisplayMode)>,
}

impl<SPI, BUSY, DC, RST, DELAY> EinkDisplay<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Creates the driver and initialises the panel in 4 gray mode
    pub fn new(
        spi: SPI,
        busy: BUSY,
        dc: DC,
        rst: RST,
        delay: DELAY,
        config: Config,
    ) -> Result<Self> {
        let interface = PanelHandle::new(spi, busy, dc, rst, delay, &config);
        Self::from_handle(interface)
    }

    /// Same as [`new`](EinkDisplay::new) for an already built handle
    pub fn from_handle(
        interface: PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE>,
    ) -> Result<Self> {
        let mut display = EinkDisplay {
            panel: Panel::new(interface),
            in_4gray: false,
            last_frame: None,
        };
        display.panel.init_4gray()?;
        display.in_4gray = true;
        Ok(display)
    }

    /// The command sequencer underneath
    pub fn panel(&self) -> &Panel<SPI, BUSY, DC, RST, DELAY> {
        &self.panel
    }

    pub fn state(&self) -> PanelState {
        self.panel.state()
    }

    /// Whether the panel still shows a 4 gray image
    pub fn is_4gray(&self) -> bool {
        self.in_4gray
    }

    /// Shows `frame` in 1-bit mode
    ///
    /// Coming from 4 gray mode the panel is re-initialised and cleared once.
    /// Every later update runs the partial init before transmitting.
    pub fn update_1bit(&mut self, frame: &GreyscaleFrame, dither: bool) -> Result<()> {
        check_frame(frame)?;
        log::info!("1-bit update, dithering {}", dither);
        let plane = encode_1bit(frame, dither);

        self.cycle("update_1bit", |display| {
            display.enter_one_bit()?;
            display.panel.pic_display(&plane)
        })?;
        self.last_frame = Some((frame.clone(), DisplayMode::OneBit { dither }));
        Ok(())
    }

    /// Shows `frame` in 4 gray mode and puts the panel to sleep afterwards
    pub fn update_4bit(&mut self, frame: &GreyscaleFrame) -> Result<()> {
        check_frame(frame)?;
        log::info!("4 gray update");
        let plane = encode_4gray(frame);

        self.cycle("update_4bit", |display| {
            // the LUTs change as soon as the init starts
            display.in_4gray = true;
            display.panel.init_4gray()?;
            display.panel.pic_display_4g(&plane)?;
            display.panel.sleep()
        })?;
        self.last_frame = Some((frame.clone(), DisplayMode::FourGray));
        Ok(())
    }

    /// Powers the panel off and puts it into deep sleep
    pub fn sleep(&mut self) -> Result<()> {
        self.cycle("sleep", |display| display.panel.sleep())
    }

    /// Parks the control lines, see [`Panel::deinit`]
    pub fn deinit(&mut self) -> Result<()> {
        self.panel.deinit()
    }

    /// Hands back the transport
    pub fn release(self) -> PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE> {
        self.panel.release()
    }

    /// Brings the panel into a 1-bit configuration for the next transfer
    fn enter_one_bit(&mut self) -> Result<()> {
        if self.in_4gray {
            log::debug!("leaving 4 gray mode");
            self.panel.init_fast()?;
            self.panel.pic_display_clear()?;
            self.in_4gray = false;
        } else if matches!(
            self.panel.state(),
            PanelState::OneBitFast | PanelState::OneBitPartial
        ) {
            self.panel.init_partial()?;
        } else {
            self.panel.init_fast()?;
        }
        Ok(())
    }

    /// Runs `steps` and undoes their effect on the driver if one fails
    ///
    /// The 4 gray flag is only ever rolled back towards forcing a transition.
    fn cycle<F>(&mut self, operation: &'static str, steps: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let snapshot = self.panel.snapshot();
        let in_4gray = self.in_4gray;

        let result = steps(self);
        if let Err(error) = &result {
            log::warn!("{} failed: {}", operation, error);
            if self.panel.transfer_pending() {
                log::warn!("frame transfer interrupted, resetting the panel");
                if let Err(reset_error) = self.panel.hardware_reset() {
                    log::warn!("reset after failed transfer failed too: {}", reset_error);
                }
            }
            self.panel.restore(snapshot);
            // a 4 gray image that may have reached the glass still needs the transition clear
            self.in_4gray |= in_4gray;
        }
        result
    }
}

impl<SPI, BUSY, OUT, DELAY> EinkDisplay<SPI, BUSY, OUT, OUT, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    OUT: OutputPin,
    DELAY: DelayNs,
{
    /// Claims the control lines through `backend` and initialises the panel
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
        let interface = PanelHandle::claim(backend, pins, spi, delay, config)?;
        Self::from_handle(interface)
    }
}

impl<SPI, BUSY, DC, RST, DELAY> RefreshController for EinkDisplay<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn update(&mut self, frame: &GreyscaleFrame, mode: DisplayMode) -> Result<()> {
        match mode {
            DisplayMode::OneBit { dither } => self.update_1bit(frame, dither),
            DisplayMode::FourGray => self.update_4bit(frame),
        }
    }

    fn clear(&mut self, power_off: bool) -> Result<()> {
        log::info!("clearing panel");
        let white = GreyscaleFrame::filled(WIDTH, HEIGHT, 0xFF);
        let plane = encode_1bit(&white, false);

        self.cycle("clear", |display| {
            display.enter_one_bit()?;
            display.panel.pic_display(&plane)?;
            display.panel.pic_display_clear()?;
            if power_off {
                display.panel.power_off()?;
            }
            Ok(())
        })?;
        self.last_frame = Some((white, DisplayMode::OneBit { dither: false }));
        Ok(())
    }

    fn reflush(&mut self) -> Result<()> {
        let Some((frame, mode)) = self.last_frame.clone() else {
            log::warn!("reflush without a previous frame, nothing to show");
            return Ok(());
        };
        log::debug!("reflush in {:?}", mode);
        self.update(&frame, mode)
    }

    fn last_frame(&self) -> Option<(&GreyscaleFrame, DisplayMode)> {
        self.last_frame.as_ref().map(|(frame, mode)| (frame, *mode))
    }
}

fn check_frame(frame: &GreyscaleFrame) -> Result<()> {
    if frame.dimensions() != (WIDTH, HEIGHT) {
        return Err(Error::FrameSize {
            expected: (WIDTH, HEIGHT),
            actual: frame.dimensions(),
        });
    }
    Ok(())
}
