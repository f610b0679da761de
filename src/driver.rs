//! SSD1306 panel driver: framebuffer ownership, power-up and flush.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_graphics_core::Pixel;
use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Size};
use embedded_graphics_core::pixelcolor::BinaryColor;
use embedded_hal::digital::OutputPin;

use crate::canvas::{Canvas, CanvasState, Color};
use crate::command::{self, Instruction, VccMode};
use crate::framebuffer::Framebuffer;
use crate::interface::{Interface, Mode};
use crate::{Error, Timer};

/// Physical panel geometry.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub width: u8,
    pub height: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 128,
            height: 32,
        }
    }
}

/// Power-up options for [`Ssd1306::init`].
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    pub vcc: VccMode,
    /// Bus address; 0 picks 0x3C for 32-row panels and 0x3D otherwise.
    /// Ignored by direct-line transports.
    pub address: u8,
    /// Pulse the reset line, if one was given, before configuring.
    pub reset: bool,
    /// Call [`Interface::init`]. Clear it when the bus is shared and
    /// already running.
    pub init_peripheral: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            vcc: VccMode::SwitchCap,
            address: 0,
            reset: true,
            init_peripheral: true,
        }
    }
}

fn default_address(height: u8) -> u8 {
    if height == 32 { 0x3C } else { 0x3D }
}

/// Payload bytes per burst once the control byte is accounted for.
/// `None` when the limit leaves no room for payload.
fn burst_payload(max_burst: usize) -> Option<usize> {
    max_burst.checked_sub(1).filter(|&payload| payload > 0)
}

pub struct Ssd1306<DI, RST, TIMER>
where
    DI: Interface,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    interface: DI,
    rst: Option<RST>,
    config: Config,
    canvas: CanvasState,
    framebuffer: Framebuffer,
    vcc: VccMode,
    contrast: u8,
    _timer: PhantomData<TIMER>,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Ssd1306",),
    async(feature = "async", keep_self)
)]
impl<DI, RST, E, TIMER> Ssd1306<DI, RST, TIMER>
where
    DI: Interface<Error = E>,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    /// Create the driver. Nothing is allocated and no bus traffic happens
    /// until [`init`](Self::init).
    pub fn new(config: Config, interface: DI, rst: Option<RST>) -> Self {
        Self {
            interface,
            rst,
            config,
            canvas: CanvasState::new(config.width as u16, config.height as u16),
            framebuffer: Framebuffer::new(config.width, config.height),
            vcc: VccMode::SwitchCap,
            contrast: 0x8F,
            _timer: PhantomData,
        }
    }

    /// Allocate the framebuffer and power up the panel.
    ///
    /// The buffer is allocated on the first call only; later calls clear
    /// and reuse it. Must succeed before anything is drawn or flushed.
    pub async fn init(&mut self, options: InitOptions) -> Result<(), Error<E>> {
        if !self.framebuffer.is_allocated() {
            self.framebuffer.allocate().map_err(|_| Error::OutOfMemory)?;
            #[cfg(feature = "defmt")]
            defmt::debug!("ssd1306: allocated {} byte framebuffer", self.framebuffer.len());
        }
        self.framebuffer.clear();
        self.vcc = options.vcc;

        let address = match options.address {
            0 => default_address(self.config.height),
            address => address,
        };
        self.interface.set_address(address);

        if options.init_peripheral {
            self.interface.init().await.map_err(Error::Comm)?;
        }
        if options.reset {
            self.reset().await?;
        }

        let (com_pins, contrast) = command::panel_tuning(self.config.width, self.config.height, self.vcc);
        self.contrast = contrast;
        let sequence = command::init_sequence(self.config.height, self.vcc, com_pins, contrast);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ssd1306: init {}x{} at {=u8:#x}, vcc {}",
            self.config.width,
            self.config.height,
            address,
            self.vcc
        );

        self.in_session(&sequence).await
    }

    /// Pulse the reset line: high, 1 ms, low, 10 ms, high.
    pub async fn reset(&mut self) -> Result<(), Error<E>> {
        let Some(rst) = self.rst.as_mut() else {
            return Ok(());
        };
        rst.set_high().map_err(Error::Pin)?;
        TIMER::delay_ms(1).await;
        rst.set_low().map_err(Error::Pin)?;
        TIMER::delay_ms(10).await;
        rst.set_high().map_err(Error::Pin)?;
        Ok(())
    }

    /// Send the whole framebuffer to the panel.
    pub async fn flush(&mut self) -> Result<(), Error<E>> {
        if !self.framebuffer.is_allocated() {
            return Err(Error::NotInitialized);
        }
        let last_page = (self.framebuffer.page_count() as u8).saturating_sub(1);
        let addressing = [
            Instruction::PageAddress as u8,
            0,
            last_page,
            Instruction::ColumnAddress as u8,
            0,
            self.config.width.wrapping_sub(1),
        ];

        #[cfg(feature = "defmt")]
        defmt::debug!("ssd1306: flush {} bytes", self.framebuffer.len());

        self.begin_session().await?;
        let result = self.write_frame(&addressing).await;
        self.end_session(result).await
    }

    /// Switch between inverted and normal display without touching the
    /// buffer. Takes effect immediately.
    pub async fn set_inverted(&mut self, inverted: bool) -> Result<(), Error<E>> {
        let instruction = if inverted {
            Instruction::InvertDisplay
        } else {
            Instruction::NormalDisplay
        };
        self.in_session(&[instruction as u8]).await
    }

    /// Drop to minimum contrast, or restore `contrast` when `dim` is false.
    pub async fn set_dim(&mut self, dim: bool, contrast: u8) -> Result<(), Error<E>> {
        let value = if dim { 0 } else { contrast };
        self.in_session(&[Instruction::SetContrast as u8, value]).await
    }

    /// Issue one raw command byte.
    pub async fn command(&mut self, command: u8) -> Result<(), Error<E>> {
        self.begin_session().await?;
        let result = self.send_command(command).await;
        self.end_session(result).await
    }

    /// Scroll pages `start..=stop` to the right.
    pub async fn start_scroll_right(&mut self, start: u8, stop: u8) -> Result<(), Error<E>> {
        self.horizontal_scroll(Instruction::RightHorizontalScroll, start, stop).await
    }

    /// Scroll pages `start..=stop` to the left.
    pub async fn start_scroll_left(&mut self, start: u8, stop: u8) -> Result<(), Error<E>> {
        self.horizontal_scroll(Instruction::LeftHorizontalScroll, start, stop).await
    }

    /// Scroll pages `start..=stop` diagonally up and to the right.
    pub async fn start_scroll_diag_right(&mut self, start: u8, stop: u8) -> Result<(), Error<E>> {
        self.diagonal_scroll(Instruction::VerticalRightHorizontalScroll, start, stop).await
    }

    /// Scroll pages `start..=stop` diagonally up and to the left.
    pub async fn start_scroll_diag_left(&mut self, start: u8, stop: u8) -> Result<(), Error<E>> {
        self.diagonal_scroll(Instruction::VerticalLeftHorizontalScroll, start, stop).await
    }

    pub async fn stop_scroll(&mut self) -> Result<(), Error<E>> {
        self.in_session(&[Instruction::DeactivateScroll as u8]).await
    }

    async fn horizontal_scroll(&mut self, direction: Instruction, start: u8, stop: u8) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("ssd1306: scroll {} pages {}..={}", direction, start, stop);

        self.in_session(&[
            direction as u8,
            0x00,
            start,
            0x00, // frame interval
            stop,
            0x00,
            0xFF,
            Instruction::ActivateScroll as u8,
        ])
        .await
    }

    async fn diagonal_scroll(&mut self, direction: Instruction, start: u8, stop: u8) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("ssd1306: diagonal scroll {} pages {}..={}", direction, start, stop);

        self.in_session(&[
            Instruction::SetVerticalScrollArea as u8,
            0x00,
            self.config.height,
            direction as u8,
            0x00,
            start,
            0x00,
            stop,
            0x01, // vertical offset
            Instruction::ActivateScroll as u8,
        ])
        .await
    }

    async fn write_frame(&mut self, addressing: &[u8]) -> Result<(), Error<E>> {
        self.send_commands(addressing).await?;
        let chunk = burst_payload(self.interface.max_burst()).ok_or(Error::BurstLimit)?;
        for part in self.framebuffer.as_bytes().chunks(chunk) {
            #[cfg(feature = "defmt")]
            defmt::trace!("ssd1306: data burst {}", part.len());
            self.interface.write_burst(Mode::Data, part).await.map_err(Error::Comm)?;
        }
        Ok(())
    }

    /// Send a command list inside its own session.
    async fn in_session(&mut self, commands: &[u8]) -> Result<(), Error<E>> {
        self.begin_session().await?;
        let result = self.send_commands(commands).await;
        self.end_session(result).await
    }

    async fn begin_session(&mut self) -> Result<(), Error<E>> {
        self.interface.begin_session().await.map_err(Error::Comm)
    }

    /// Close the session whatever `result` is; the first error wins.
    async fn end_session(&mut self, result: Result<(), Error<E>>) -> Result<(), Error<E>> {
        let closed = self.interface.end_session().await.map_err(Error::Comm);
        result.and(closed)
    }

    async fn send_command(&mut self, command: u8) -> Result<(), Error<E>> {
        self.interface
            .write_burst(Mode::Command, &[command])
            .await
            .map_err(Error::Comm)
    }

    /// Command list split into bursts, each led by its own control byte.
    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), Error<E>> {
        let chunk = burst_payload(self.interface.max_burst()).ok_or(Error::BurstLimit)?;
        for part in commands.chunks(chunk) {
            #[cfg(feature = "defmt")]
            defmt::trace!("ssd1306: command burst {=[u8]:x}", part);
            self.interface.write_burst(Mode::Command, part).await.map_err(Error::Comm)?;
        }
        Ok(())
    }
}

impl<DI, RST, TIMER> Ssd1306<DI, RST, TIMER>
where
    DI: Interface,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    pub fn config(&self) -> Config {
        self.config
    }

    pub fn vcc(&self) -> VccMode {
        self.vcc
    }

    /// Contrast programmed by the last init.
    pub fn contrast(&self) -> u8 {
        self.contrast
    }

    pub fn is_initialized(&self) -> bool {
        self.framebuffer.is_allocated()
    }

    /// Zero the framebuffer. The panel is unchanged until the next flush.
    pub fn clear_buffer(&mut self) {
        self.framebuffer.clear();
    }

    /// Raw page-ordered framebuffer; empty before init.
    pub fn buffer(&self) -> &[u8] {
        self.framebuffer.as_bytes()
    }

    /// State of the logical pixel `(x, y)`; false when out of range.
    pub fn get_pixel(&self, x: i32, y: i32) -> bool {
        self.canvas
            .to_physical(x, y)
            .is_some_and(|(px, py)| self.framebuffer.get(px, py))
    }

    pub fn release(self) -> (DI, Option<RST>) {
        (self.interface, self.rst)
    }
}

impl<DI, RST, TIMER> Canvas for Ssd1306<DI, RST, TIMER>
where
    DI: Interface,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut CanvasState {
        &mut self.canvas
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some((px, py)) = self.canvas.to_physical(x, y) {
            self.framebuffer.set(px, py, color);
        }
    }
}

impl<DI, RST, TIMER> OriginDimensions for Ssd1306<DI, RST, TIMER>
where
    DI: Interface,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    fn size(&self) -> Size {
        Size::new(self.canvas.width() as u32, self.canvas.height() as u32)
    }
}

impl<DI, RST, TIMER> DrawTarget for Ssd1306<DI, RST, TIMER>
where
    DI: Interface,
    RST: OutputPin<Error = Infallible>,
    TIMER: Timer,
{
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            Canvas::set_pixel(self, point.x, point.y, color.into());
        }
        Ok(())
    }
}
