//! Bus transports for the SSD1306.
//!
//! A transport moves bursts: one control byte (or D/C level) followed by
//! command or pixel bytes. Transports that cap the burst length report
//! the cap through [`Interface::max_burst`] and the driver splits its
//! writes to fit.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(not(feature = "async"))]
use embedded_hal::spi::SpiDevice;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::spi::SpiDevice;

/// Burst limit of common I2C peripheral drivers, control byte included.
pub const DEFAULT_BURST: usize = 32;

/// Bus clock while talking to the panel.
pub const CLOCK_DURING: u32 = 400_000;
/// Bus clock restored afterwards for slower devices on the same bus.
pub const CLOCK_AFTER: u32 = 100_000;

/// How the controller interprets the bytes of a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Command,
    Data,
}

impl Mode {
    /// Leading byte of an I2C burst: Co = 0, D/C# per mode.
    pub fn control_byte(self) -> u8 {
        match self {
            Mode::Command => 0x00,
            Mode::Data => 0x40,
        }
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Interface",),
    async(feature = "async", keep_self)
)]
/// Byte-burst transport to the controller.
pub trait Interface {
    type Error;

    /// Largest burst the transport accepts, counting the control byte.
    fn max_burst(&self) -> usize;

    /// Target address for addressed buses. Direct-line transports ignore it.
    fn set_address(&mut self, _address: u8) {}

    /// Bring up the transport before first use.
    async fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Enter a transaction; brackets every command or data sequence.
    async fn begin_session(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Send `payload` as one burst in `mode`.
    async fn write_burst(&mut self, mode: Mode, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Bus whose clock can be changed between transfers.
pub trait BusClock {
    fn set_frequency(&mut self, hz: u32);
}

/// Clock control for buses that run at a fixed rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClock;

impl BusClock for NoClock {
    fn set_frequency(&mut self, _hz: u32) {}
}

/// Stand-in for an unconnected reset line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Addressed I2C transport.
///
/// Bursts are assembled in an `N`-byte scratch array, so `N` is also the
/// burst limit reported to the driver.
pub struct I2cInterface<I2C, CLK = NoClock, const N: usize = DEFAULT_BURST> {
    i2c: I2C,
    address: u8,
    clock: CLK,
    clock_during: u32,
    clock_after: u32,
    scratch: [u8; N],
}

impl<I2C> I2cInterface<I2C, NoClock, DEFAULT_BURST> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_clock(i2c, NoClock, CLOCK_DURING, CLOCK_AFTER)
    }
}

impl<I2C, CLK: BusClock, const N: usize> I2cInterface<I2C, CLK, N> {
    /// Transport that runs the bus at `during` hz inside each session and
    /// drops back to `after` hz when it ends.
    pub fn with_clock(i2c: I2C, clock: CLK, during: u32, after: u32) -> Self {
        const { assert!(N >= 2, "burst must hold the control byte and one payload byte") };
        Self {
            i2c,
            address: 0x3C,
            clock,
            clock_during: during,
            clock_after: after,
            scratch: [0; N],
        }
    }

    /// Same transport with a different burst limit.
    pub fn with_burst_limit<const M: usize>(self) -> I2cInterface<I2C, CLK, M> {
        let mut resized = I2cInterface::with_clock(self.i2c, self.clock, self.clock_during, self.clock_after);
        resized.address = self.address;
        resized
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> (I2C, CLK) {
        (self.i2c, self.clock)
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "I2cInterface",),
    async(feature = "async", keep_self)
)]
impl<I2C, CLK, const N: usize> Interface for I2cInterface<I2C, CLK, N>
where
    I2C: I2c,
    CLK: BusClock,
{
    type Error = I2C::Error;

    fn max_burst(&self) -> usize {
        N
    }

    fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    async fn begin_session(&mut self) -> Result<(), Self::Error> {
        self.clock.set_frequency(self.clock_during);
        Ok(())
    }

    async fn end_session(&mut self) -> Result<(), Self::Error> {
        self.clock.set_frequency(self.clock_after);
        Ok(())
    }

    async fn write_burst(&mut self, mode: Mode, payload: &[u8]) -> Result<(), Self::Error> {
        self.scratch[0] = mode.control_byte();
        for part in payload.chunks(N - 1) {
            self.scratch[1..=part.len()].copy_from_slice(part);
            self.i2c
                .write(self.address, &self.scratch[..=part.len()])
                .await?;
        }
        Ok(())
    }
}

/// Four-wire SPI transport. The `SpiDevice` owns chip select; the D/C line
/// tells commands from pixel data.
pub struct SpiInterface<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> SpiInterface<SPI, DC>
where
    DC: OutputPin<Error = Infallible>,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }

    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "SpiInterface",),
    async(feature = "async", keep_self)
)]
impl<SPI, DC> Interface for SpiInterface<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin<Error = Infallible>,
{
    type Error = SPI::Error;

    fn max_burst(&self) -> usize {
        usize::MAX
    }

    async fn init(&mut self) -> Result<(), Self::Error> {
        self.dc.set_low().map_err(|e| match e {})
    }

    async fn write_burst(&mut self, mode: Mode, payload: &[u8]) -> Result<(), Self::Error> {
        match mode {
            Mode::Command => self.dc.set_low(),
            Mode::Data => self.dc.set_high(),
        }
        .map_err(|e| -> Self::Error { match e {} })?;
        self.spi.write(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Level, LevelPin};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingClock(Rc<RefCell<Vec<u32>>>);

    impl BusClock for RecordingClock {
        fn set_frequency(&mut self, hz: u32) {
            self.0.borrow_mut().push(hz);
        }
    }

    #[test]
    fn control_bytes() {
        assert_eq!(Mode::Command.control_byte(), 0x00);
        assert_eq!(Mode::Data.control_byte(), 0x40);
    }

    #[test]
    fn i2c_burst_is_prefixed_and_split() {
        let expectations = [
            I2cTransaction::write(0x3D, vec![0x40, 1, 2, 3]),
            I2cTransaction::write(0x3D, vec![0x40, 4, 5, 6]),
            I2cTransaction::write(0x3D, vec![0x40, 7]),
            I2cTransaction::write(0x3D, vec![0x00, 0xAF]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut handle = i2c.clone();

        let mut interface = I2cInterface::new(i2c).with_burst_limit::<4>();
        interface.set_address(0x3D);
        assert_eq!(interface.max_burst(), 4);

        run!(interface.write_burst(Mode::Data, &[1, 2, 3, 4, 5, 6, 7])).unwrap();
        run!(interface.write_burst(Mode::Command, &[0xAF])).unwrap();
        handle.done();
    }

    #[test]
    fn i2c_session_raises_then_restores_clock() {
        let i2c = I2cMock::new(&[]);
        let mut handle = i2c.clone();
        let clock = RecordingClock::default();
        let log = clock.0.clone();

        let mut interface = I2cInterface::<_, _, DEFAULT_BURST>::with_clock(i2c, clock, 1_000_000, 100_000);
        assert_eq!(interface.address(), 0x3C);
        run!(interface.begin_session()).unwrap();
        run!(interface.end_session()).unwrap();

        assert_eq!(*log.borrow(), [1_000_000, 100_000]);
        handle.done();
    }

    #[test]
    fn spi_toggles_dc_per_mode() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0xAE, 0xD5]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0xFF; 40]),
            SpiTransaction::transaction_end(),
        ];
        let spi = SpiMock::new(&expectations);
        let mut handle = spi.clone();
        let dc = LevelPin::default();
        let levels = dc.levels();

        let mut interface = SpiInterface::new(spi, dc);
        assert_eq!(interface.max_burst(), usize::MAX);
        run!(interface.init()).unwrap();
        run!(interface.write_burst(Mode::Command, &[0xAE, 0xD5])).unwrap();
        run!(interface.write_burst(Mode::Data, &[0xFF; 40])).unwrap();

        assert_eq!(*levels.borrow(), [Level::Low, Level::Low, Level::High]);
        handle.done();
    }
}
