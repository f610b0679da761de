//! Packed 1-bit framebuffer in SSD1306 page order.
//!
//! Byte `x + page * width` holds column `x` of the 8-row band `page`;
//! bit `y % 8` of that byte is pixel `(x, y)`. Coordinates here are
//! physical, rotation is applied by the caller.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use crate::canvas::Color;

pub struct Framebuffer {
    width: u8,
    height: u8,
    data: Vec<u8>,
}

impl Framebuffer {
    /// Describe a buffer for a `width` x `height` panel without allocating it.
    pub const fn new(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn page_count(&self) -> usize {
        (self.height as usize).div_ceil(8)
    }

    /// Byte length once allocated.
    pub fn len(&self) -> usize {
        self.width as usize * self.page_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty() || self.is_empty()
    }

    /// Reserve the backing storage. Only the first successful call
    /// allocates; later calls keep the existing storage.
    pub fn allocate(&mut self) -> Result<(), TryReserveError> {
        if self.data.len() == self.len() {
            return Ok(());
        }
        let len = self.len();
        self.data.try_reserve_exact(len)?;
        self.data.resize(len, 0);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.width as u32 || y >= self.height as u32 {
            return None;
        }
        let index = x as usize + (y as usize >> 3) * self.width as usize;
        Some((index, 1 << (y & 7)))
    }

    /// Apply `color` to the physical pixel `(x, y)`. Out-of-range
    /// coordinates and an unallocated buffer are ignored.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let Some((index, mask)) = self.locate(x, y) else {
            return;
        };
        if let Some(byte) = self.data.get_mut(index) {
            match color {
                Color::On => *byte |= mask,
                Color::Off => *byte &= !mask,
                Color::Invert => *byte ^= mask,
            }
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.locate(x, y)
            .and_then(|(index, mask)| self.data.get(index).map(|byte| byte & mask != 0))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_rounds_partial_pages_up() {
        assert_eq!(Framebuffer::new(128, 32).len(), 512);
        assert_eq!(Framebuffer::new(128, 64).len(), 1024);
        assert_eq!(Framebuffer::new(96, 17).len(), 96 * 3);
    }

    #[test]
    fn second_allocate_keeps_storage() {
        let mut fb = Framebuffer::new(128, 32);
        assert!(!fb.is_allocated());
        fb.allocate().unwrap();
        let first = fb.as_bytes().as_ptr();
        fb.set(3, 3, Color::On);
        fb.allocate().unwrap();
        assert_eq!(fb.as_bytes().as_ptr(), first);
        assert_eq!(fb.as_bytes().len(), 512);
        assert!(fb.get(3, 3));
    }

    #[test]
    fn pixels_land_in_page_major_bits() {
        let mut fb = Framebuffer::new(128, 32);
        fb.allocate().unwrap();

        for y in 0..32 {
            for x in 0..128 {
                fb.set(x, y, Color::On);
                let index = x as usize + (y as usize / 8) * 128;
                assert_eq!(fb.as_bytes()[index] & (1 << (y % 8)), 1 << (y % 8));

                fb.set(x, y, Color::Off);
                assert_eq!(fb.as_bytes()[index] & (1 << (y % 8)), 0);
            }
        }
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn invert_twice_restores() {
        let mut fb = Framebuffer::new(128, 32);
        fb.allocate().unwrap();
        fb.set(10, 9, Color::On);

        fb.set(10, 9, Color::Invert);
        assert!(!fb.get(10, 9));
        fb.set(10, 9, Color::Invert);
        assert!(fb.get(10, 9));
        assert_eq!(fb.as_bytes()[10 + 128], 0b0000_0010);
    }

    #[test]
    fn writes_before_allocation_or_out_of_range_are_ignored() {
        let mut fb = Framebuffer::new(128, 32);
        fb.set(0, 0, Color::On);
        assert!(!fb.get(0, 0));

        fb.allocate().unwrap();
        fb.set(128, 0, Color::On);
        fb.set(0, 32, Color::On);
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }
}
