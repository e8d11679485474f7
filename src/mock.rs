//! Recording fakes for scenario tests
//!
//! The SPI device and the pins share one log, so a test can read back the exact
//! command stream a sequence produced. Data bytes following a command are merged
//! into one [`Event::Data`], no matter how many transfers carried them.

use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::{
    digital::{self, InputPin, OutputPin},
    spi::{self, Operation, SpiDevice},
};
use embedded_hal_mock::eh1::delay::NoopDelay;

use crate::config::Config;
use crate::display::EinkDisplay;
use crate::interface::PanelHandle;
use crate::panel::{Panel, SINGLE_BYTE_WRITE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// Reset pulled low and released again
    Reset,
    /// Reset pulled low and left there
    ResetLow,
    Command(u8),
    Data(Vec<u8>),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    dc_high: bool,
    /// Busy reads that still report busy
    busy_reads: u32,
    stuck_busy: bool,
    /// Successful writes left before the bus starts failing
    writes_until_failure: Option<u32>,
    /// SPI writes since the last clear
    writes: usize,
}

/// Handle to the shared log
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder(Arc<Mutex<State>>);

impl Recorder {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state();
        state.events.clear();
        state.writes = 0;
    }

    /// Number of SPI writes since the last [`clear`](Recorder::clear)
    pub(crate) fn writes(&self) -> usize {
        self.state().writes
    }

    pub(crate) fn commands(&self) -> Vec<u8> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Data following the first occurrence of `command`
    pub(crate) fn data_after(&self, command: u8) -> Vec<u8> {
        let state = self.state();
        let mut events = state.events.iter();
        events
            .by_ref()
            .find(|event| **event == Event::Command(command));
        match events.next() {
            Some(Event::Data(data)) => data.clone(),
            _ => Vec::new(),
        }
    }

    /// Every data block sent after `command`, in order
    pub(crate) fn all_data_after(&self, command: u8) -> Vec<Vec<u8>> {
        let state = self.state();
        state
            .events
            .windows(2)
            .filter_map(|pair| match pair {
                [Event::Command(c), Event::Data(data)] if *c == command => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// The next `reads` busy reads report busy
    pub(crate) fn busy_for(&self, reads: u32) {
        self.state().busy_reads = reads;
    }

    pub(crate) fn stuck_busy(&self) {
        self.state().stuck_busy = true;
    }

    /// Lets `writes` transfers through, then fails every following one
    pub(crate) fn fail_spi_after(&self, writes: u32) {
        self.state().writes_until_failure = Some(writes);
    }

    pub(crate) fn heal(&self) {
        let mut state = self.state();
        state.writes_until_failure = None;
        state.stuck_busy = false;
        state.busy_reads = 0;
    }

    pub(crate) fn spi(&self) -> FakeSpi {
        FakeSpi(self.clone())
    }

    pub(crate) fn busy(&self) -> FakeBusy {
        FakeBusy(self.clone())
    }

    pub(crate) fn dc(&self) -> FakeDc {
        FakeDc(self.clone())
    }

    pub(crate) fn rst(&self) -> FakeRst {
        FakeRst(self.clone())
    }
}

pub(crate) struct FakeSpi(Recorder);

impl spi::ErrorType for FakeSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.0.state();
        for operation in operations.iter() {
            let Operation::Write(bytes) = operation else {
                continue;
            };
            match state.writes_until_failure {
                Some(0) => return Err(spi::ErrorKind::Other),
                Some(ref mut left) => *left -= 1,
                None => {}
            }
            state.writes += 1;
            if !state.dc_high {
                state
                    .events
                    .extend(bytes.iter().map(|byte| Event::Command(*byte)));
            } else if let Some(Event::Data(data)) = state.events.last_mut() {
                data.extend_from_slice(bytes);
            } else {
                state.events.push(Event::Data(bytes.to_vec()));
            }
        }
        Ok(())
    }
}

pub(crate) struct FakeBusy(Recorder);

impl digital::ErrorType for FakeBusy {
    type Error = core::convert::Infallible;
}

impl InputPin for FakeBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.0.state();
        if state.stuck_busy {
            return Ok(false);
        }
        if state.busy_reads > 0 {
            state.busy_reads -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

pub(crate) struct FakeDc(Recorder);

impl digital::ErrorType for FakeDc {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakeDc {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.state().dc_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.state().dc_high = true;
        Ok(())
    }
}

pub(crate) struct FakeRst(Recorder);

impl digital::ErrorType for FakeRst {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakeRst {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.state().events.push(Event::ResetLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.state();
        if state.events.last() == Some(&Event::ResetLow) {
            state.events.pop();
            state.events.push(Event::Reset);
        }
        Ok(())
    }
}

pub(crate) type FakeHandle =
    PanelHandle<FakeSpi, FakeBusy, FakeDc, FakeRst, NoopDelay, SINGLE_BYTE_WRITE>;
pub(crate) type FakePanel = Panel<FakeSpi, FakeBusy, FakeDc, FakeRst, NoopDelay>;
pub(crate) type FakeDisplay = EinkDisplay<FakeSpi, FakeBusy, FakeDc, FakeRst, NoopDelay>;

pub(crate) fn handle(config: &Config) -> (FakeHandle, Recorder) {
    let recorder = Recorder::default();
    let handle = PanelHandle::new(
        recorder.spi(),
        recorder.busy(),
        recorder.dc(),
        recorder.rst(),
        NoopDelay::new(),
        config,
    );
    (handle, recorder)
}

pub(crate) fn panel() -> (FakePanel, Recorder) {
    let (handle, recorder) = handle(&Config::default());
    (Panel::new(handle), recorder)
}

/// Display that already went through its 4 gray start-up
pub(crate) fn display() -> (FakeDisplay, Recorder) {
    display_with(&Config::default())
}

pub(crate) fn display_with(config: &Config) -> (FakeDisplay, Recorder) {
    let (handle, recorder) = handle(config);
    let display = EinkDisplay::from_handle(handle).unwrap();
    (display, recorder)
}
