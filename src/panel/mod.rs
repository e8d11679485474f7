//! Command sequencer for the 240x416 panel of the Distiller board
//!
//! The controller speaks the UC81xx command set. 1-bit refreshes run from the
//! OTP waveforms and use the differential old/new protocol, the 4 gray mode
//! loads its own waveform table.
//!
//! Every operation is a fixed sequence of commands, data and busy waits. The
//! [`PanelState`] is only advanced once a sequence has completed.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::buffer_len;
use crate::encoder::{split_4gray, BitDepth, Bitplane};
use crate::error::{Error, Result};
use crate::interface::{ControlLine, PanelHandle};

pub(crate) mod command;
use self::command::Command;

mod constants;
use self::constants::*;

/// Width of the panel in pixels
pub const WIDTH: u32 = 240;
/// Height of the panel in pixels
pub const HEIGHT: u32 = 416;
/// Bytes of one 1-bit plane
pub const PLANE_LEN: usize = buffer_len(WIDTH as usize, HEIGHT as usize);
/// The controller takes whole data blocks per transfer
pub const SINGLE_BYTE_WRITE: bool = false;

/// Where the panel is in its power/initialisation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    /// Freshly reset or never touched
    #[default]
    Uninitialized,
    /// Powered, OTP waveform with the fast temperature override
    OneBitFast,
    /// Powered, OTP waveform with default settings
    OneBitFull,
    /// Powered, OTP waveform with the partial temperature override
    OneBitPartial,
    /// Powered with the 4 gray waveform table loaded
    FourGray,
    /// Charge pumps off, configuration kept
    PoweredOff,
    /// Deep sleep, only a hardware reset wakes the panel
    Sleeping,
    /// Control lines parked
    Deinitialized,
}

impl PanelState {
    /// Powered in one of the 1-bit configurations
    pub fn is_one_bit(self) -> bool {
        matches!(
            self,
            PanelState::OneBitFast | PanelState::OneBitFull | PanelState::OneBitPartial
        )
    }

    /// Charge pumps running
    pub fn is_powered(self) -> bool {
        self.is_one_bit() || self == PanelState::FourGray
    }
}

/// Sequencer state that a failed refresh cycle rolls back to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    state: PanelState,
    old_data: Vec<u8>,
}

/// Panel driver
///
/// Owns the [`PanelHandle`] and the plane last transmitted as "new", which is
/// sent as "old" on the next differential refresh.
pub struct Panel<SPI, BUSY, DC, RST, DELAY> {
    /// Connection Interface
    interface: PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE>,
    state: PanelState,
    /// Plane sent as old data on the next 1-bit refresh
    old_data: Vec<u8>,
    /// Frame data went out but the refresh did not complete
    transfer_pending: bool,
}

impl<SPI, BUSY, DC, RST, DELAY> Panel<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Wraps the handle, nothing is sent to the panel yet
    pub fn new(interface: PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE>) -> Self {
        Panel {
            interface,
            state: PanelState::Uninitialized,
            old_data: vec![0; PLANE_LEN],
            transfer_pending: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Plane that will be sent as old data on the next 1-bit refresh
    pub fn old_data(&self) -> &[u8] {
        &self.old_data
    }

    /// Whether the last transfer stopped between the data commands and the end of the refresh
    ///
    /// The panel RAM then holds a half written frame, only a reset discards it.
    pub fn transfer_pending(&self) -> bool {
        self.transfer_pending
    }

    /// Tears the driver down and hands back the handle
    pub fn release(self) -> PanelHandle<SPI, BUSY, DC, RST, DELAY, SINGLE_BYTE_WRITE> {
        self.interface
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            old_data: self.old_data.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        if snapshot.state != self.state {
            log::debug!("panel state rolled back {:?} -> {:?}", self.state, snapshot.state);
        }
        self.state = snapshot.state;
        self.old_data = snapshot.old_data;
        self.transfer_pending = false;
    }

    fn transition(&mut self, state: PanelState) {
        log::debug!("panel state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn require(&self, operation: &'static str, allowed: fn(PanelState) -> bool) -> Result<()> {
        if allowed(self.state) {
            Ok(())
        } else {
            Err(Error::ProtocolState {
                operation,
                state: self.state,
            })
        }
    }

    /// Pulses the reset line, the panel forgets its configuration
    pub fn hardware_reset(&mut self) -> Result<()> {
        self.interface.reset()?;
        self.transfer_pending = false;
        self.transition(PanelState::Uninitialized);
        Ok(())
    }

    fn reset_and_power_on(&mut self) -> Result<()> {
        self.interface.reset()?;
        self.interface.cmd(Command::PowerOn)?;
        //waiting for the electronic paper IC to release the idle signal
        self.interface.wait_until_idle()
    }

    /// 1-bit mode with the default OTP waveform
    pub fn init_full(&mut self) -> Result<()> {
        self.reset_and_power_on()?;
        self.interface
            .cmd_with_data(Command::VcomAndDataIntervalSetting, &[0x97])?;
        self.transition(PanelState::OneBitFull);
        Ok(())
    }

    /// 1-bit mode with the fast waveform
    ///
    /// Allowed from any state, the reset brings the panel back from sleep.
    pub fn init_fast(&mut self) -> Result<()> {
        self.reset_and_power_on()?;
        self.interface.cmd_with_data(Command::CascadeSetting, &[0x02])?;
        self.interface
            .cmd_with_data(Command::ForceTemperature, &[0x5A])?;
        self.transition(PanelState::OneBitFast);
        Ok(())
    }

    /// 1-bit mode tuned for successive differential refreshes
    ///
    /// Only valid once the panel runs a 1-bit fast or partial configuration.
    pub fn init_partial(&mut self) -> Result<()> {
        self.require("init_partial", |state| {
            matches!(state, PanelState::OneBitFast | PanelState::OneBitPartial)
        })?;
        self.reset_and_power_on()?;
        self.interface.cmd_with_data(Command::CascadeSetting, &[0x02])?;
        self.interface
            .cmd_with_data(Command::ForceTemperature, &[0x6E])?;
        self.interface
            .cmd_with_data(Command::VcomAndDataIntervalSetting, &[0xD7])?;
        self.transition(PanelState::OneBitPartial);
        Ok(())
    }

    /// Full register programming and waveform upload for the 4 gray mode
    pub fn init_4gray(&mut self) -> Result<()> {
        self.interface.reset()?;

        // LUT from register, KW mode, scan up, shift right, booster on
        self.interface
            .cmd_with_data(Command::PanelSetting, &[0xFF, 0x0D])?;

        // internal VSH/VSL/VGH/VGL, levels from the table
        self.interface.cmd(Command::PowerSetting)?;
        self.interface.data(&[0x03])?;
        self.interface.data(&LUT_4GRAY[LUT_POWER])?;

        self.interface
            .cmd_with_data(Command::BoosterSoftStart, &[0xD7, 0xD7, 0x27])?;
        self.interface
            .cmd_with_data(Command::PllControl, &[LUT_4GRAY[LUT_PLL]])?;
        self.interface
            .cmd_with_data(Command::VcomAndDataIntervalSetting, &[0x57])?;
        self.interface.cmd_with_data(Command::TconSetting, &[0x22])?;
        self.interface.cmd_with_data(
            Command::ResolutionSetting,
            &[WIDTH as u8, (HEIGHT >> 8) as u8, HEIGHT as u8],
        )?;
        self.interface
            .cmd_with_data(Command::GateStartSetting, &[0x00])?;
        self.interface
            .cmd_with_data(Command::VcmDcSetting, &[LUT_4GRAY[LUT_VCOM_DC]])?;
        // VCOM_W[3:0], SD_W[3:0]
        self.interface.cmd_with_data(Command::PowerSaving, &[0x88])?;

        self.write_lut()?;

        self.interface.cmd(Command::PowerOn)?;
        self.interface.wait_until_idle()?;
        self.transition(PanelState::FourGray);
        Ok(())
    }

    fn write_lut(&mut self) -> Result<()> {
        for (command, range) in [
            (Command::LutForVcom, LUT_VCOM),
            (Command::LutWhiteToWhite, LUT_WW),
            (Command::LutRed, LUT_R),
            (Command::LutWhite, LUT_W),
            (Command::LutBlack, LUT_B),
        ] {
            self.interface.cmd_with_data(command, &LUT_4GRAY[range])?;
        }
        Ok(())
    }

    /// Transmits the retained plane as old data and `plane` as new data, then refreshes
    pub fn pic_display(&mut self, plane: &Bitplane) -> Result<()> {
        self.require("pic_display", PanelState::is_one_bit)?;
        check_plane(plane, BitDepth::One)?;

        self.transfer_old_new(plane.as_bytes())?;
        self.old_data.copy_from_slice(plane.as_bytes());
        Ok(())
    }

    /// Differential refresh towards an all zero plane
    pub fn pic_display_clear(&mut self) -> Result<()> {
        self.require("pic_display_clear", PanelState::is_one_bit)?;

        self.transfer_old_new(&[0x00; PLANE_LEN])?;

        self.old_data.fill(0);
        Ok(())
    }

    /// Transmits a packed 2 bits per pixel plane
    ///
    /// The high bit of every pixel code goes into the old plane and the low bit
    /// into the new plane, the 4 gray waveform resolves the pair into a level.
    pub fn pic_display_4g(&mut self, plane: &Bitplane) -> Result<()> {
        self.require("pic_display_4g", |state| state == PanelState::FourGray)?;
        check_plane(plane, BitDepth::Two)?;

        let planes = split_4gray(plane);
        self.transfer_pending = true;
        self.interface
            .cmd_with_data(Command::DataStartTransmission1, planes.old.as_bytes())?;
        self.interface
            .cmd_with_data(Command::DataStartTransmission2, planes.new.as_bytes())?;
        self.refresh()
    }

    fn transfer_old_new(&mut self, new_data: &[u8]) -> Result<()> {
        self.transfer_pending = true;
        let Self {
            interface,
            old_data,
            ..
        } = self;
        interface.cmd_with_data(Command::DataStartTransmission1, old_data)?;
        interface.cmd_with_data(Command::DataStartTransmission2, new_data)?;
        self.refresh()
    }

    fn refresh(&mut self) -> Result<()> {
        self.interface.cmd(Command::DisplayRefresh)?;
        // the controller needs a moment before busy is valid
        self.interface.delay_ms(1);
        self.interface.wait_until_idle()?;
        self.transfer_pending = false;
        Ok(())
    }

    /// Turns the charge pumps off, the panel keeps its configuration
    pub fn power_off(&mut self) -> Result<()> {
        self.require("power_off", PanelState::is_powered)?;
        self.interface.cmd(Command::PowerOff)?;
        self.interface.wait_until_idle()?;
        self.transition(PanelState::PoweredOff);
        Ok(())
    }

    /// Powers off and enters deep sleep, the next init resets the panel
    pub fn sleep(&mut self) -> Result<()> {
        self.require("sleep", |state| {
            state.is_powered() || state == PanelState::PoweredOff
        })?;
        self.interface.cmd(Command::PowerOff)?;
        self.interface.wait_until_idle()?;
        self.interface.cmd_with_data(Command::DeepSleep, &[0xA5])?;
        self.transition(PanelState::Sleeping);
        Ok(())
    }

    /// Parks the control lines low
    ///
    /// The lines stay owned by the handle, any init afterwards starts with a
    /// reset and works as usual. Use [`release`](Panel::release) to give them back.
    pub fn deinit(&mut self) -> Result<()> {
        self.interface
            .set_control_line(ControlLine::DataCommand, false)?;
        self.interface.set_control_line(ControlLine::Reset, false)?;
        self.transition(PanelState::Deinitialized);
        Ok(())
    }
}

fn check_plane(plane: &Bitplane, depth: BitDepth) -> Result<()> {
    if plane.depth() != depth || plane.width() != WIDTH || plane.height() != HEIGHT {
        return Err(Error::FrameSize {
            expected: (WIDTH, HEIGHT),
            actual: (plane.width(), plane.height()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::encoder::{encode_1bit, encode_4gray};
    use crate::frame::GreyscaleFrame;
    use crate::mock::{self, Event};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State, Transaction as PinTransaction},
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };

    #[test]
    fn epd_size() {
        assert_eq!(WIDTH, 240);
        assert_eq!(HEIGHT, 416);
        assert_eq!(PLANE_LEN, 12_480);
    }

    #[test]
    fn sleep_sequence_on_the_wire() {
        let mut spi_expectations = Vec::new();
        for bytes in [&[0x02][..], &[0x07][..], &[0xA5][..]] {
            spi_expectations.push(SpiTransaction::transaction_start());
            spi_expectations.push(SpiTransaction::write_vec(bytes.to_vec()));
            spi_expectations.push(SpiTransaction::transaction_end());
        }
        let spi = SpiMock::new(&spi_expectations);
        let busy = PinMock::new(&[PinTransaction::get(State::High)]);
        let dc = PinMock::new(&[
            PinTransaction::set(State::Low),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]);
        let rst = PinMock::new(&[]);

        let handle = PanelHandle::new(spi, busy, dc, rst, NoopDelay::new(), &Config::default());
        let mut panel = Panel::new(handle);
        panel.state = PanelState::FourGray;
        panel.sleep().unwrap();
        assert_eq!(panel.state(), PanelState::Sleeping);

        let (mut spi, mut busy, mut dc, mut rst, _) = panel.release().release();
        spi.done();
        busy.done();
        dc.done();
        rst.done();
    }

    #[test]
    fn init_fast_sequence() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        assert_eq!(panel.state(), PanelState::OneBitFast);
        assert_eq!(
            log.events(),
            vec![
                Event::Reset,
                Event::Command(0x04),
                Event::Command(0xE0),
                Event::Data(vec![0x02]),
                Event::Command(0xE5),
                Event::Data(vec![0x5A]),
            ]
        );
    }

    #[test]
    fn init_partial_requires_a_one_bit_configuration() {
        let (mut panel, log) = mock::panel();
        match panel.init_partial() {
            Err(Error::ProtocolState { operation, state }) => {
                assert_eq!(operation, "init_partial");
                assert_eq!(state, PanelState::Uninitialized);
            }
            other => panic!("expected a protocol error, got {other:?}"),
        }
        // nothing reached the bus
        assert!(log.events().is_empty());

        panel.init_fast().unwrap();
        log.clear();
        panel.init_partial().unwrap();
        assert_eq!(panel.state(), PanelState::OneBitPartial);
        assert_eq!(
            log.commands(),
            vec![0x04, 0xE0, 0xE5, 0x50],
            "partial init sends power on and the partial tuning"
        );
        assert_eq!(log.data_after(0x50), vec![0xD7]);
        assert_eq!(log.data_after(0xE5), vec![0x6E]);
    }

    #[test]
    fn init_4gray_programs_registers_and_lut() {
        let (mut panel, log) = mock::panel();
        panel.init_4gray().unwrap();
        assert_eq!(panel.state(), PanelState::FourGray);
        assert_eq!(
            log.commands(),
            vec![
                0x00, 0x01, 0x06, 0x30, 0x50, 0x60, 0x61, 0x65, 0x82, 0xE3, 0x20, 0x21, 0x22,
                0x23, 0x24, 0x04
            ]
        );
        assert_eq!(log.data_after(0x00), vec![0xFF, 0x0D]);
        assert_eq!(log.data_after(0x01), vec![0x03, 0x10, 0x3F, 0x3F, 0x00]);
        assert_eq!(log.data_after(0x30), vec![0x09]);
        assert_eq!(log.data_after(0x61), vec![0xF0, 0x01, 0xA0]);
        assert_eq!(log.data_after(0x82), vec![0x0B]);
        assert_eq!(log.data_after(0x20), LUT_4GRAY[LUT_VCOM].to_vec());
        assert_eq!(log.data_after(0x24), LUT_4GRAY[LUT_B].to_vec());
    }

    #[test]
    fn pic_display_sends_retained_plane_as_old() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();

        let black = encode_1bit(&GreyscaleFrame::filled(WIDTH, HEIGHT, 0), false);
        let white = encode_1bit(&GreyscaleFrame::filled(WIDTH, HEIGHT, 255), false);

        log.clear();
        panel.pic_display(&white).unwrap();
        assert_eq!(log.commands(), vec![0x10, 0x13, 0x12]);
        assert_eq!(log.data_after(0x10), vec![0x00; PLANE_LEN]);
        assert_eq!(log.data_after(0x13), vec![0xFF; PLANE_LEN]);

        log.clear();
        panel.pic_display(&black).unwrap();
        assert_eq!(log.data_after(0x10), vec![0xFF; PLANE_LEN]);
        assert_eq!(log.data_after(0x13), vec![0x00; PLANE_LEN]);
        assert_eq!(panel.old_data(), black.as_bytes());
    }

    #[test]
    fn planes_go_out_in_blocks() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        let white = encode_1bit(&GreyscaleFrame::filled(WIDTH, HEIGHT, 255), false);

        log.clear();
        panel.pic_display(&white).unwrap();
        let blocks = if cfg!(target_os = "linux") {
            PLANE_LEN.div_ceil(4096)
        } else {
            1
        };
        // 0x10, old plane, 0x13, new plane, 0x12
        assert_eq!(log.writes(), 3 + 2 * blocks);
    }

    #[test]
    fn pic_display_clear_resets_retained_plane() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        let white = encode_1bit(&GreyscaleFrame::filled(WIDTH, HEIGHT, 255), false);
        panel.pic_display(&white).unwrap();

        log.clear();
        panel.pic_display_clear().unwrap();
        assert_eq!(log.data_after(0x10), vec![0xFF; PLANE_LEN]);
        assert_eq!(log.data_after(0x13), vec![0x00; PLANE_LEN]);
        assert!(panel.old_data().iter().all(|b| *b == 0));
    }

    #[test]
    fn pic_display_4g_is_refused_in_one_bit_mode() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        panel.init_partial().unwrap();
        log.clear();

        let plane = encode_4gray(&GreyscaleFrame::filled(WIDTH, HEIGHT, 200));
        assert!(matches!(
            panel.pic_display_4g(&plane),
            Err(Error::ProtocolState {
                state: PanelState::OneBitPartial,
                ..
            })
        ));
        assert!(log.events().is_empty());
    }

    #[test]
    fn pic_display_4g_sends_split_planes() {
        let (mut panel, log) = mock::panel();
        panel.init_4gray().unwrap();
        log.clear();

        // white everywhere: code 0b11 gives a set bit in both planes
        let plane = encode_4gray(&GreyscaleFrame::filled(WIDTH, HEIGHT, 255));
        panel.pic_display_4g(&plane).unwrap();
        assert_eq!(log.commands(), vec![0x10, 0x13, 0x12]);
        assert_eq!(log.data_after(0x10), vec![0xFF; PLANE_LEN]);
        assert_eq!(log.data_after(0x13), vec![0xFF; PLANE_LEN]);
    }

    #[test]
    fn wrong_plane_size_is_rejected() {
        let (mut panel, _log) = mock::panel();
        panel.init_fast().unwrap();
        let small = encode_1bit(&GreyscaleFrame::filled(8, 8, 255), false);
        assert!(matches!(
            panel.pic_display(&small),
            Err(Error::FrameSize {
                actual: (8, 8),
                ..
            })
        ));
    }

    #[test]
    fn sleep_and_power_off_need_power() {
        let (mut panel, _log) = mock::panel();
        assert!(matches!(panel.sleep(), Err(Error::ProtocolState { .. })));
        assert!(matches!(panel.power_off(), Err(Error::ProtocolState { .. })));

        panel.init_fast().unwrap();
        panel.power_off().unwrap();
        assert_eq!(panel.state(), PanelState::PoweredOff);
        panel.sleep().unwrap();
        assert_eq!(panel.state(), PanelState::Sleeping);

        // waking up is a plain init
        panel.init_fast().unwrap();
        assert_eq!(panel.state(), PanelState::OneBitFast);
    }

    #[test]
    fn deinit_parks_lines_and_allows_reinit() {
        let (mut panel, log) = mock::panel();
        panel.init_4gray().unwrap();
        log.clear();

        panel.deinit().unwrap();
        assert_eq!(panel.state(), PanelState::Deinitialized);
        assert_eq!(log.events(), vec![Event::ResetLow]);

        panel.init_4gray().unwrap();
        assert_eq!(panel.state(), PanelState::FourGray);
    }

    #[test]
    fn interrupted_transfer_is_reported() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        let white = encode_1bit(&GreyscaleFrame::filled(WIDTH, HEIGHT, 255), false);

        // the bus dies halfway through the frame data
        log.fail_spi_after(3);
        assert!(panel.pic_display(&white).is_err());
        assert!(panel.transfer_pending());
        // the retained plane only moves on success
        assert!(panel.old_data().iter().all(|b| *b == 0));

        log.heal();
        panel.hardware_reset().unwrap();
        assert!(!panel.transfer_pending());
        assert_eq!(panel.state(), PanelState::Uninitialized);
    }

    #[test]
    fn failed_sequence_keeps_state() {
        let (mut panel, log) = mock::panel();
        panel.init_fast().unwrap();
        log.fail_spi_after(1);
        assert!(matches!(panel.init_partial(), Err(Error::Transport(_))));
        assert_eq!(panel.state(), PanelState::OneBitFast);
    }
}
