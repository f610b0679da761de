#![cfg_attr(not(test), no_std)]

//! SSD1306 monochrome OLED driver.
//!
//! Drawing goes through the [`Canvas`] trait into a page-ordered 1-bit
//! framebuffer owned by [`Ssd1306`]; [`Ssd1306::flush`] streams that
//! buffer to the panel over an [`Interface`] (I2C or four-wire SPI),
//! split into bursts the bus can carry.

extern crate alloc;

use core::convert::Infallible;

#[cfg(all(test, feature = "async"))]
macro_rules! run {
    ($e:expr) => {
        embassy_futures::block_on($e)
    };
}

#[cfg(all(test, not(feature = "async")))]
macro_rules! run {
    ($e:expr) => {
        $e
    };
}

pub mod canvas;
pub mod command;
pub mod driver;
pub mod framebuffer;
pub mod interface;

#[cfg(test)]
mod mock;

pub use canvas::{Canvas, CanvasState, Color, GlyphTable, Rotation};
pub use command::{Instruction, VccMode};
pub use driver::{Config, InitOptions, Ssd1306};
pub use interface::{BusClock, I2cInterface, Interface, Mode, NoClock, NoPin, SpiInterface};

#[derive(Debug)]
pub enum Error<E = ()> {
    /// Communication error
    Comm(E),
    /// Pin setting error
    Pin(Infallible),
    /// Framebuffer allocation failed
    OutOfMemory,
    /// Flush attempted before a successful init
    NotInitialized,
    /// Transport burst limit cannot carry a control byte plus payload
    BurstLimit,
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Comm(_) => defmt::write!(f, "Bus communication error"),
            Error::Pin(_) => defmt::write!(f, "Pin error"),
            Error::OutOfMemory => defmt::write!(f, "Framebuffer allocation failed"),
            Error::NotInitialized => defmt::write!(f, "Not initialized"),
            Error::BurstLimit => defmt::write!(f, "Burst limit below two bytes"),
        }
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Timer",),
    async(feature = "async", keep_self)
)]
/// Simplified timer trait for delay operations.
pub trait Timer {
    /// Delay for the specified number of milliseconds.
    async fn delay_ms(milliseconds: u64);
}

/// [`Timer`] backed by `embassy-time`.
#[cfg(feature = "embassy-time")]
pub struct EmbassyTimer;

#[cfg(all(feature = "embassy-time", feature = "async"))]
impl Timer for EmbassyTimer {
    async fn delay_ms(milliseconds: u64) {
        embassy_time::Timer::after_millis(milliseconds).await;
    }
}

#[cfg(all(feature = "embassy-time", not(feature = "async")))]
impl Timer for EmbassyTimer {
    fn delay_ms(milliseconds: u64) {
        embassy_time::block_for(embassy_time::Duration::from_millis(milliseconds));
    }
}
