//! SSD16xx e-ink controller driver.
//!
//! Blocking driver for the Solomon SSD16xx family, configured for the Good
//! Display GDEY0213B74 (2.13", 122×250) panel.
//!
//! # Wiring
//!
//! | Signal | Direction |
//! |--------|-----------|
//! | SCK / MOSI / CS | Managed by `SpiDevice` |
//! | DC     | Host → Display |
//! | RST    | Host → Display |
//! | BUSY   | Display → Host (HIGH while busy) |
//!
//! # Update cycle
//!
//! `start_update` writes the new image into the B/W RAM (0x24), selects the
//! update sequence for the refresh type and activates it, then returns. The
//! compositor polls BUSY on the panel's schedule. `finish_update` copies the
//! same image into the "old" RAM (0x26), which is the base the next
//! differential (FAST) refresh compares against.

use embedded_graphics::prelude::Size;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use platform::{image_len, DisplayError, EInkDriver, PollTiming, UpdateType};

// ---------------------------------------------------------------------------
// Panel description
// ---------------------------------------------------------------------------

/// GDEY0213B74 native width.
pub const GDEY0213B74_WIDTH: u32 = 122;
/// GDEY0213B74 native height.
pub const GDEY0213B74_HEIGHT: u32 = 250;
/// Packed 1bpp image size for the GDEY0213B74.
pub const GDEY0213B74_IMAGE_LEN: usize = image_len(GDEY0213B74_WIDTH, GDEY0213B74_HEIGHT);

/// Bytes per RAM row.
const BYTES_PER_ROW: u8 = GDEY0213B74_WIDTH.div_ceil(8) as u8;
/// Last gate / RAM row address.
const LAST_ROW: u16 = (GDEY0213B74_HEIGHT - 1) as u16;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// SSD16xx command codes used by this driver.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Driver output control: gate count and scan order (3 bytes).
    DriverOutputControl = 0x01,
    /// Deep sleep (1 byte).
    DeepSleep = 0x10,
    /// Data entry mode (1 byte).
    DataEntryMode = 0x11,
    /// Software reset; poll BUSY afterwards.
    SoftReset = 0x12,
    /// Temperature sensor selection (1 byte).
    TempSensorControl = 0x18,
    /// Master activation: run the selected update sequence.
    MasterActivation = 0x20,
    /// Display update control 1: RAM options and source range (2 bytes).
    DisplayUpdateCtrl1 = 0x21,
    /// Display update control 2: update sequence (1 byte).
    DisplayUpdateCtrl2 = 0x22,
    /// Write B/W RAM (new image).
    WriteRamBw = 0x24,
    /// Write "red" RAM (old image for differential refresh).
    WriteRamOld = 0x26,
    /// Border waveform (1 byte).
    BorderWaveform = 0x3C,
    /// RAM X start / end in bytes (2 bytes).
    SetRamXRange = 0x44,
    /// RAM Y start / end (4 bytes).
    SetRamYRange = 0x45,
    /// RAM X address counter (1 byte).
    SetRamXCounter = 0x4E,
    /// RAM Y address counter (2 bytes).
    SetRamYCounter = 0x4F,
}

/// Update sequence: load LUT from OTP, display mode 1.
pub const SEQUENCE_FULL: u8 = 0xF7;
/// Update sequence: load LUT from OTP, display mode 2 (differential).
pub const SEQUENCE_FAST: u8 = 0xFF;

/// Data entry mode: X increment, Y increment.
const ENTRY_X_INC_Y_INC: u8 = 0x03;

/// BUSY polls before a blocking wait gives up.
const MAX_BUSY_POLLS: u32 = 500;
/// Delay between blocking BUSY polls.
const BUSY_POLL_MS: u32 = 10;

// ---------------------------------------------------------------------------
// Driver struct
// ---------------------------------------------------------------------------

/// SSD16xx driver for the GDEY0213B74.
///
/// Generic over:
/// - `SPI`: an [`embedded_hal::spi::SpiDevice`] (manages CS).
/// - `DC`: Data/Command output.
/// - `RST`: Reset output.
/// - `BUSY`: Busy input (HIGH when busy).
/// - `DELAY`: [`embedded_hal::delay::DelayNs`] for reset timing and
///   blocking waits.
pub struct Ssd16xx<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
    begun: bool,
    in_flight: Option<UpdateType>,
    /// Last image sent, mirrored into the old-image RAM after each update.
    last_image: [u8; GDEY0213B74_IMAGE_LEN],
}

impl<SPI, DC, RST, BUSY, DELAY> Ssd16xx<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    /// Wrap the bus and pins. Nothing is sent until [`EInkDriver::begin`].
    #[allow(clippy::large_stack_arrays)]
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: DELAY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            begun: false,
            in_flight: None,
            last_image: [0xFF; GDEY0213B74_IMAGE_LEN],
        }
    }

    /// Refresh started and not yet finished.
    pub fn in_flight(&self) -> Option<UpdateType> {
        self.in_flight
    }

    // -----------------------------------------------------------------------
    // Low-level SPI helpers
    // -----------------------------------------------------------------------

    fn send_command(&mut self, cmd: Command) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::Gpio)?;
        self.spi
            .write(&[cmd as u8])
            .map_err(|_| DisplayError::Communication)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(|_| DisplayError::Gpio)?;
        self.spi.write(data).map_err(|_| DisplayError::Communication)
    }

    fn cmd_data(&mut self, cmd: Command, data: &[u8]) -> Result<(), DisplayError> {
        self.send_command(cmd)?;
        self.send_data(data)
    }

    /// Block until BUSY goes low, or give up with [`DisplayError::Timeout`].
    fn wait_busy(&mut self) -> Result<(), DisplayError> {
        for _ in 0..MAX_BUSY_POLLS {
            if !self.busy.is_high().map_err(|_| DisplayError::Gpio)? {
                return Ok(());
            }
            self.delay.delay_ms(BUSY_POLL_MS);
        }
        error!("display BUSY stuck high");
        Err(DisplayError::Timeout)
    }

    /// RST high 10 ms, low 10 ms, high 10 ms.
    fn hardware_reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::Gpio)?;
        self.delay.delay_ms(10);
        self.rst.set_low().map_err(|_| DisplayError::Gpio)?;
        self.delay.delay_ms(10);
        self.rst.set_high().map_err(|_| DisplayError::Gpio)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Panel configuration
    // -----------------------------------------------------------------------

    /// Scan gates 0 to 249.
    fn config_scanning(&mut self) -> Result<(), DisplayError> {
        let [lo, hi] = LAST_ROW.to_le_bytes();
        self.cmd_data(Command::DriverOutputControl, &[lo, hi, 0x00])
    }

    /// Border follows LUT1, source range S8..S167, internal temperature
    /// sensor selects the OTP waveform.
    fn config_waveform(&mut self) -> Result<(), DisplayError> {
        self.cmd_data(Command::BorderWaveform, &[0x05])?;
        self.cmd_data(Command::DisplayUpdateCtrl1, &[0x00, 0x80])?;
        self.cmd_data(Command::TempSensorControl, &[0x80])
    }

    fn config_update_sequence(&mut self, update: UpdateType) -> Result<(), DisplayError> {
        let sequence = match update {
            UpdateType::Fast => SEQUENCE_FAST,
            UpdateType::Full => SEQUENCE_FULL,
        };
        self.cmd_data(Command::DisplayUpdateCtrl2, &[sequence])
    }

    /// Whole-panel RAM window, counters at the origin.
    fn config_full_window(&mut self) -> Result<(), DisplayError> {
        let [lo, hi] = LAST_ROW.to_le_bytes();
        self.cmd_data(Command::DataEntryMode, &[ENTRY_X_INC_Y_INC])?;
        self.cmd_data(Command::SetRamXRange, &[0x00, BYTES_PER_ROW.saturating_sub(1)])?;
        self.cmd_data(
            Command::SetRamYRange,
            &[0x00, 0x00, lo, hi],
        )?;
        self.reset_counters()
    }

    fn reset_counters(&mut self) -> Result<(), DisplayError> {
        self.cmd_data(Command::SetRamXCounter, &[0x00])?;
        self.cmd_data(Command::SetRamYCounter, &[0x00, 0x00])
    }

    fn write_ram(&mut self, ram: Command) -> Result<(), DisplayError> {
        self.reset_counters()?;
        self.send_command(ram)?;
        self.dc.set_high().map_err(|_| DisplayError::Gpio)?;
        self.spi
            .write(&self.last_image)
            .map_err(|_| DisplayError::Communication)
    }

    /// Enter deep sleep, keeping RAM. `begin` must run again afterwards.
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        self.cmd_data(Command::DeepSleep, &[0x01])?;
        self.begun = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// platform::EInkDriver implementation
// ---------------------------------------------------------------------------

impl<SPI, DC, RST, BUSY, DELAY> EInkDriver for Ssd16xx<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    DELAY: DelayNs,
{
    type DriverError = DisplayError;

    fn size(&self) -> Size {
        Size::new(GDEY0213B74_WIDTH, GDEY0213B74_HEIGHT)
    }

    fn supports(&self, _update: UpdateType) -> bool {
        true
    }

    fn begin(&mut self) -> Result<(), DisplayError> {
        self.hardware_reset()?;
        self.send_command(Command::SoftReset)?;
        self.wait_busy()?;
        self.config_scanning()?;
        self.config_waveform()?;
        self.config_full_window()?;
        self.begun = true;
        self.in_flight = None;
        info!("SSD16xx ready, {}x{}", GDEY0213B74_WIDTH, GDEY0213B74_HEIGHT);
        Ok(())
    }

    fn start_update(&mut self, image: &[u8], update: UpdateType) -> Result<(), DisplayError> {
        if !self.begun {
            return Err(DisplayError::InvalidState);
        }
        if image.len() != GDEY0213B74_IMAGE_LEN {
            return Err(DisplayError::InvalidBuffer);
        }
        self.last_image.copy_from_slice(image);
        self.write_ram(Command::WriteRamBw)?;
        self.config_update_sequence(update)?;
        self.send_command(Command::MasterActivation)?;
        self.in_flight = Some(update);
        trace!("SSD16xx update started");
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, DisplayError> {
        self.busy.is_high().map_err(|_| DisplayError::Gpio)
    }

    fn finish_update(&mut self) -> Result<(), DisplayError> {
        if self.in_flight.take().is_none() {
            return Ok(());
        }
        self.write_ram(Command::WriteRamOld)
    }

    fn poll_timing(&self, update: UpdateType) -> PollTiming {
        match update {
            UpdateType::Fast => PollTiming::from_millis(50, 300),
            UpdateType::Full => PollTiming::from_millis(100, 2500),
        }
    }

    fn wait_idle(&mut self) -> Result<(), DisplayError> {
        self.wait_busy()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    /// Expectations for one command with optional data, as seen by the SPI
    /// and DC mocks.
    #[derive(Default)]
    struct Script {
        spi: Vec<SpiTransaction<u8>>,
        dc: Vec<PinTransaction>,
    }

    impl Script {
        fn write(&mut self, bytes: &[u8]) {
            self.spi.push(SpiTransaction::transaction_start());
            self.spi.push(SpiTransaction::write_vec(bytes.to_vec()));
            self.spi.push(SpiTransaction::transaction_end());
        }

        fn cmd(&mut self, cmd: Command, data: &[u8]) -> &mut Self {
            self.dc.push(PinTransaction::set(PinState::Low));
            self.write(&[cmd as u8]);
            if !data.is_empty() {
                self.dc.push(PinTransaction::set(PinState::High));
                self.write(data);
            }
            self
        }

        fn ram(&mut self, ram: Command, image: &[u8]) -> &mut Self {
            self.cmd(Command::SetRamXCounter, &[0x00]);
            self.cmd(Command::SetRamYCounter, &[0x00, 0x00]);
            self.cmd(ram, image)
        }
    }

    fn begin_script() -> Script {
        let mut s = Script::default();
        s.cmd(Command::SoftReset, &[])
            .cmd(Command::DriverOutputControl, &[0xF9, 0x00, 0x00])
            .cmd(Command::BorderWaveform, &[0x05])
            .cmd(Command::DisplayUpdateCtrl1, &[0x00, 0x80])
            .cmd(Command::TempSensorControl, &[0x80])
            .cmd(Command::DataEntryMode, &[0x03])
            .cmd(Command::SetRamXRange, &[0x00, 0x0F])
            .cmd(Command::SetRamYRange, &[0x00, 0x00, 0xF9, 0x00])
            .cmd(Command::SetRamXCounter, &[0x00])
            .cmd(Command::SetRamYCounter, &[0x00, 0x00]);
        s
    }

    fn rst_reset_sequence() -> PinMock {
        PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ])
    }

    #[test]
    fn test_geometry() {
        assert_eq!(BYTES_PER_ROW, 16);
        assert_eq!(GDEY0213B74_IMAGE_LEN, 4000);
    }

    #[test]
    fn test_begin_sequence() {
        let script = begin_script();
        let mut spi = SpiMock::new(&script.spi);
        let mut dc = PinMock::new(&script.dc);
        let mut rst = rst_reset_sequence();
        let mut busy = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);

        let mut drv = Ssd16xx::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.begin().unwrap();

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    #[test]
    fn test_fast_update_then_finish_mirrors_old_ram() {
        let image = vec![0xAAu8; GDEY0213B74_IMAGE_LEN];
        let mut script = begin_script();
        script
            .ram(Command::WriteRamBw, &image)
            .cmd(Command::DisplayUpdateCtrl2, &[SEQUENCE_FAST])
            .cmd(Command::MasterActivation, &[])
            .ram(Command::WriteRamOld, &image);

        let mut spi = SpiMock::new(&script.spi);
        let mut dc = PinMock::new(&script.dc);
        let mut rst = rst_reset_sequence();
        let mut busy = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);

        let mut drv = Ssd16xx::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.begin().unwrap();
        drv.start_update(&image, UpdateType::Fast).unwrap();
        assert_eq!(drv.in_flight(), Some(UpdateType::Fast));
        assert!(drv.is_busy().unwrap());
        assert!(!drv.is_busy().unwrap());
        drv.finish_update().unwrap();
        assert_eq!(drv.in_flight(), None);

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    #[test]
    fn test_full_update_sequence_byte() {
        let image = vec![0xFFu8; GDEY0213B74_IMAGE_LEN];
        let mut script = begin_script();
        script
            .ram(Command::WriteRamBw, &image)
            .cmd(Command::DisplayUpdateCtrl2, &[SEQUENCE_FULL])
            .cmd(Command::MasterActivation, &[]);

        let mut spi = SpiMock::new(&script.spi);
        let mut dc = PinMock::new(&script.dc);
        let mut rst = rst_reset_sequence();
        let mut busy = PinMock::new(&[PinTransaction::get(PinState::Low)]);

        let mut drv = Ssd16xx::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        drv.begin().unwrap();
        drv.start_update(&image, UpdateType::Full).unwrap();

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    #[test]
    fn test_update_rejected_before_begin_and_on_wrong_size() {
        let mut spi = SpiMock::new(&[]);
        let mut dc = PinMock::new(&[]);
        let mut rst = PinMock::new(&[]);
        let mut busy = PinMock::new(&[]);

        let mut drv = Ssd16xx::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        assert_eq!(
            drv.start_update(&[0u8; 10], UpdateType::Full),
            Err(DisplayError::InvalidState)
        );
        drv.begun = true;
        assert_eq!(
            drv.start_update(&[0u8; 10], UpdateType::Full),
            Err(DisplayError::InvalidBuffer)
        );

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    #[test]
    fn test_wait_idle_times_out() {
        let polls: Vec<PinTransaction> = (0..MAX_BUSY_POLLS)
            .map(|_| PinTransaction::get(PinState::High))
            .collect();
        let mut spi = SpiMock::new(&[]);
        let mut dc = PinMock::new(&[]);
        let mut rst = PinMock::new(&[]);
        let mut busy = PinMock::new(&polls);

        let mut drv = Ssd16xx::new(spi.clone(), dc.clone(), rst.clone(), busy.clone(), NoopDelay);
        assert_eq!(drv.wait_idle(), Err(DisplayError::Timeout));

        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }

    #[test]
    fn test_poll_timing_per_type() {
        let drv = Ssd16xx::new(
            SpiMock::<u8>::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[]),
            NoopDelay,
        );
        assert_eq!(drv.poll_timing(UpdateType::Fast), PollTiming::from_millis(50, 300));
        assert_eq!(drv.poll_timing(UpdateType::Full), PollTiming::from_millis(100, 2500));
        let mut spi = drv.spi.clone();
        spi.done();
        let (mut dc, mut rst, mut busy) = (drv.dc.clone(), drv.rst.clone(), drv.busy.clone());
        dc.done();
        rst.done();
        busy.done();
    }
}
