//! SPI Commands for the 240x416 panel controller
use crate::traits;

/// Panel commands
///
/// Only the registers the driver programs are listed. The controller is a member
/// of the UC81xx family, so the names follow its datasheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Set Resolution, LUT selection, BWR pixels, gate scan direction, source shift direction, booster switch, soft reset
    PanelSetting = 0x00,
    /// Selecting internal and external power
    PowerSetting = 0x01,
    /// Turns the charge pumps off, busy goes low until done
    PowerOff = 0x02,
    /// Turns the charge pumps on, busy goes low until done
    PowerOn = 0x04,
    /// Starting data transmission
    BoosterSoftStart = 0x06,
    /// After this command is transmitted, the chip would enter the deep-sleep mode to save power.
    ///
    /// The deep sleep mode would return to standby by hardware reset.
    ///
    /// The only one parameter is a check code, the command would be excuted if check code = 0xA5.
    DeepSleep = 0x07,
    /// This command starts transmitting data and write them into SRAM.
    ///
    /// In B/W mode, this command writes “OLD” data to SRAM.
    DataStartTransmission1 = 0x10,
    /// After this command is issued, driver will refresh display (data/VCOM) according to SRAM data and LUT.
    DisplayRefresh = 0x12,
    /// This command starts transmitting data and write them into SRAM.
    ///
    /// In B/W mode, this command writes “NEW” data to SRAM.
    DataStartTransmission2 = 0x13,
    /// This command builds the Look-up table for VCOM
    LutForVcom = 0x20,
    LutWhiteToWhite = 0x21,
    /// Red/gray1 transitions in 4 gray mode
    LutRed = 0x22,
    LutWhite = 0x23,
    LutBlack = 0x24,
    /// The command controls the PLL clock frequency.
    PllControl = 0x30,
    /// This command indicates the interval of Vcom and data output. When setting the vertical back porch, the total blanking will be kept (20 Hsync)
    VcomAndDataIntervalSetting = 0x50,
    /// This command defines non-overlap period of Gate and Source.
    TconSetting = 0x60,
    /// This command defines alternative resolution and this setting is of higher priority than the RES\[1:0\] in R00H (PSR).
    ResolutionSetting = 0x61,
    /// Gate start position, sent as an extra resolution byte
    GateStartSetting = 0x65,
    /// This command sets VCOM_DC value.
    VcmDcSetting = 0x82,
    /// Cascade setting, used to enter the fast/partial temperature override
    CascadeSetting = 0xE0,
    /// Power saving, VCOM and source output widths
    PowerSaving = 0xE3,
    /// Forces the temperature value used to pick the OTP waveform
    ForceTemperature = 0xE5,
}

impl traits::Command for Command {
    /// Returns the address of the command
    fn address(self) -> u8 {
        self as u8
    }
}
