// Per-dot rendering pipeline
//
// `update` advances the PPU by exactly one dot. On render scanlines the
// background pipeline runs an eight-dot fetch cycle (nametable, attribute,
// pattern low, pattern high) feeding a pair of 16-bit pattern shifters and
// a pair of 8-bit attribute shifters; `fine_x` selects the output bit.
//
// Sprites are evaluated into the staging buffer at dot 257 and their
// pattern rows fetched at dot 321, so the active buffer always describes
// the following scanline. Flips are applied at load time, which keeps the
// pixel loop a straight bit select.
//
// Scroll register updates follow the v/t split: horizontal bits copy at
// dot 257, vertical bits copy during dots 280-304 of the pre-render line,
// and the odd-frame skip drops the last pre-render dot when rendering is
// enabled.

use crate::bus::Bus;
use crate::display::palette::palette_to_rgb;

use super::constants::{
    LAST_DOT, LAST_VISIBLE_SCANLINE, OAM_ENTRY_SIZE, POSTRENDER_SCANLINE, PRERENDER_SCANLINE,
    SCREEN_WIDTH, SPRITES_PER_LINE, VBLANK_SCANLINE,
};
use super::{Ppu, PpuError, SpriteEntry};

impl Ppu {
    /// Advance the PPU by one dot
    ///
    /// Dispatches on the current scanline phase, then moves the
    /// `(scanline, dot)` counters forward:
    ///
    /// - visible lines run the fetch pipeline and emit one pixel
    /// - the post-render line hands the frame to the display at dot 0
    /// - scanline 241 raises the vertical blank flag (and NMI) at dot 1
    /// - the pre-render line clears flags and reloads vertical scroll
    pub fn update(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        match self.scanline {
            0..=LAST_VISIBLE_SCANLINE => self.update_visible(bus)?,
            POSTRENDER_SCANLINE => {
                if self.dot == 0 {
                    bus.display_update();
                }
            }
            VBLANK_SCANLINE => {
                if self.dot == 1 {
                    self.status |= 0x80;
                    if self.control & 0x80 != 0 {
                        bus.cpu_interrupt_non_maskable();
                    }
                }
            }
            PRERENDER_SCANLINE => self.update_prerender(bus)?,
            _ => {}
        }

        self.advance();
        Ok(())
    }

    fn update_visible(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        if self.rendering_enabled() {
            self.run_pipeline(bus)?;
            if self.dot == 257 {
                self.evaluate_sprites();
            }
            if self.dot == 321 {
                self.load_sprites(bus)?;
            }
            if self.dot == 260 {
                bus.mapper_interrupt()?;
            }
        }
        if self.dot < SCREEN_WIDTH {
            self.emit_pixel(bus);
        }
        Ok(())
    }

    fn update_prerender(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        if self.dot == 1 {
            self.status &= !0xE0;
            self.sprites = [SpriteEntry::default(); SPRITES_PER_LINE];
            self.sprite_count = 0;
            self.sprites_secondary = [SpriteEntry::default(); SPRITES_PER_LINE];
            self.sprite_count_secondary = 0;
        }
        if self.rendering_enabled() {
            self.run_pipeline(bus)?;
            if (280..=304).contains(&self.dot) {
                self.copy_vertical();
            }
            if self.dot == 260 {
                bus.mapper_interrupt()?;
            }
            // Odd frames drop the final pre-render dot
            if self.dot == 339 && self.frame_odd {
                self.dot = LAST_DOT;
            }
        }
        Ok(())
    }

    /// Move the `(scanline, dot)` counters one step forward
    fn advance(&mut self) {
        self.dot += 1;
        if self.dot > LAST_DOT {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline > PRERENDER_SCANLINE {
                self.scanline = 0;
                self.frame_odd = !self.frame_odd;
            }
        }
    }

    /// Background fetch pipeline for one dot of a render scanline
    ///
    /// The eight-dot cycle is keyed on `(dot - 1) % 8`: reload and
    /// nametable fetch, attribute fetch, pattern low, pattern high, then
    /// the horizontal increment on the last step. Dots 321-336 prefetch
    /// the first two tiles of the next line.
    fn run_pipeline(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        let dot = self.dot;

        if (1..=256).contains(&dot) || (321..=337).contains(&dot) {
            self.shift_background();
        }

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            match (dot - 1) % 8 {
                0 => {
                    self.reload_shifters();
                    self.fetch_nametable(bus)?;
                }
                2 => self.fetch_attribute(bus)?,
                4 => self.fetch_pattern_low(bus)?,
                6 => self.fetch_pattern_high(bus)?,
                7 => self.increment_horizontal(),
                _ => {}
            }
        }

        if dot == 256 {
            self.increment_vertical();
        }
        if dot == 257 {
            self.copy_horizontal();
        }
        // Throwaway nametable fetches at the end of the line
        if dot == 338 || dot == 340 {
            self.fetch_nametable(bus)?;
        }

        Ok(())
    }

    fn fetch_nametable(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        let address = 0x2000 | (self.address_vram & 0x0FFF);
        self.fetched_tile = self.read_memory(bus, address)?;
        Ok(())
    }

    /// Fetch the attribute byte and isolate this tile's two palette bits
    ///
    /// Each attribute byte covers a 4x4 tile area in 2x2 quadrants; the
    /// coarse coordinate parities pick the quadrant.
    fn fetch_attribute(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        let v = self.address_vram;
        let address = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let mut attribute = self.read_memory(bus, address)?;
        if v & 0x0040 != 0 {
            attribute >>= 4;
        }
        if v & 0x0002 != 0 {
            attribute >>= 2;
        }
        self.fetched_attribute = attribute & 0x03;
        Ok(())
    }

    fn fetch_pattern_low(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        self.fetched_pattern_low = self.read_memory(bus, self.pattern_address())?;
        Ok(())
    }

    fn fetch_pattern_high(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        self.fetched_pattern_high = self.read_memory(bus, self.pattern_address() + 8)?;
        Ok(())
    }

    fn pattern_address(&self) -> u16 {
        let table = if self.control & 0x10 != 0 { 0x1000 } else { 0 };
        let fine_y = (self.address_vram >> 12) & 0x07;
        table + (self.fetched_tile as u16) * 16 + fine_y
    }

    /// Load the fetched tile into the low bytes of the shifters
    fn reload_shifters(&mut self) {
        self.shift_pattern_low = (self.shift_pattern_low & 0xFF00) | self.fetched_pattern_low as u16;
        self.shift_pattern_high =
            (self.shift_pattern_high & 0xFF00) | self.fetched_pattern_high as u16;
        self.attribute_latch_low = self.fetched_attribute & 0x01;
        self.attribute_latch_high = (self.fetched_attribute >> 1) & 0x01;
    }

    /// Shift the background registers one bit; the attribute shifters
    /// refill from the latches
    fn shift_background(&mut self) {
        self.shift_pattern_low <<= 1;
        self.shift_pattern_high <<= 1;
        self.shift_attribute_low = (self.shift_attribute_low << 1) | self.attribute_latch_low;
        self.shift_attribute_high = (self.shift_attribute_high << 1) | self.attribute_latch_high;
    }

    /// Step coarse X, wrapping into the neighboring nametable
    fn increment_horizontal(&mut self) {
        if self.address_vram & 0x001F == 0x001F {
            self.address_vram &= !0x001F;
            self.address_vram ^= 0x0400;
        } else {
            self.address_vram += 1;
        }
    }

    /// Step fine Y, carrying into coarse Y; row 29 wraps into the lower
    /// nametable, row 31 wraps without switching (attribute rows)
    fn increment_vertical(&mut self) {
        if self.address_vram & 0x7000 != 0x7000 {
            self.address_vram += 0x1000;
        } else {
            self.address_vram &= !0x7000;
            let mut coarse_y = (self.address_vram & 0x03E0) >> 5;
            if coarse_y == 29 {
                coarse_y = 0;
                self.address_vram ^= 0x0800;
            } else if coarse_y == 31 {
                coarse_y = 0;
            } else {
                coarse_y += 1;
            }
            self.address_vram = (self.address_vram & !0x03E0) | (coarse_y << 5);
        }
    }

    /// Copy the horizontal bits (coarse X, nametable X) from t into v
    fn copy_horizontal(&mut self) {
        self.address_vram = (self.address_vram & !0x041F) | (self.address_temp & 0x041F);
    }

    /// Copy the vertical bits (fine Y, coarse Y, nametable Y) from t into v
    fn copy_vertical(&mut self) {
        self.address_vram = (self.address_vram & !0x7BE0) | (self.address_temp & 0x7BE0);
    }

    /// Scan OAM for sprites covering the next scanline
    ///
    /// The first eight land in the staging buffer; a ninth sets the
    /// overflow flag and stops the scan.
    fn evaluate_sprites(&mut self) {
        self.sprites_secondary = [SpriteEntry::default(); SPRITES_PER_LINE];
        self.sprite_count_secondary = 0;

        let height = if self.control & 0x20 != 0 { 16 } else { 8 };
        for index in 0..64u16 {
            let base = index * OAM_ENTRY_SIZE as u16;
            let position_y = self.oam.read(base);
            let row = self.scanline as i16 - position_y as i16;
            if row < 0 || row >= height {
                continue;
            }
            if (self.sprite_count_secondary as usize) >= SPRITES_PER_LINE {
                self.status |= 0x20;
                break;
            }
            self.sprites_secondary[self.sprite_count_secondary as usize] = SpriteEntry {
                id: index as u8,
                position_y,
                tile: self.oam.read(base + 1),
                attributes: self.oam.read(base + 2),
                position_x: self.oam.read(base + 3),
                data_low: 0,
                data_high: 0,
            };
            self.sprite_count_secondary += 1;
        }
    }

    /// Fetch pattern rows for the staged sprites and make them active
    ///
    /// Vertical flip picks the mirrored row; horizontal flip reverses the
    /// pattern bytes so the pixel loop always reads bit 7 first. In 8x16
    /// mode the tile's bit 0 selects the pattern table and the row picks
    /// the top or bottom half.
    fn load_sprites(&mut self, bus: &mut dyn Bus) -> Result<(), PpuError> {
        let tall = self.control & 0x20 != 0;
        let height: i16 = if tall { 16 } else { 8 };

        for slot in 0..self.sprite_count_secondary as usize {
            let mut sprite = self.sprites_secondary[slot];
            let mut row = self.scanline as i16 - sprite.position_y as i16;
            if sprite.attributes & 0x80 != 0 {
                row = height - 1 - row;
            }

            let address = if tall {
                let table = ((sprite.tile as u16) & 0x01) * 0x1000;
                let mut tile = (sprite.tile & 0xFE) as u16;
                if row >= 8 {
                    tile += 1;
                    row -= 8;
                }
                table + tile * 16 + row as u16
            } else {
                let table = if self.control & 0x08 != 0 { 0x1000 } else { 0 };
                table + (sprite.tile as u16) * 16 + row as u16
            };

            sprite.data_low = self.read_memory(bus, address)?;
            sprite.data_high = self.read_memory(bus, address + 8)?;
            if sprite.attributes & 0x40 != 0 {
                sprite.data_low = sprite.data_low.reverse_bits();
                sprite.data_high = sprite.data_high.reverse_bits();
            }
            self.sprites_secondary[slot] = sprite;
        }

        self.sprites = self.sprites_secondary;
        self.sprite_count = self.sprite_count_secondary;
        Ok(())
    }

    /// Composite and emit the pixel at `(dot, scanline)`
    ///
    /// Background and sprite pixels are resolved independently (with the
    /// left-column masks applied), then priority picks the winner: a
    /// transparent pixel loses, a front sprite beats the background, and
    /// both transparent falls through to the backdrop entry.
    fn emit_pixel(&mut self, bus: &mut dyn Bus) {
        let x = self.dot;

        let mut bg_pixel = 0u8;
        let mut bg_attribute = 0u8;
        if self.mask & 0x08 != 0 && !(x < 8 && self.mask & 0x02 == 0) {
            let bit = 15 - self.fine_x as u16;
            let low = ((self.shift_pattern_low >> bit) & 0x01) as u8;
            let high = ((self.shift_pattern_high >> bit) & 0x01) as u8;
            bg_pixel = (high << 1) | low;

            let attribute_bit = 7 - self.fine_x;
            let low = (self.shift_attribute_low >> attribute_bit) & 0x01;
            let high = (self.shift_attribute_high >> attribute_bit) & 0x01;
            bg_attribute = (high << 1) | low;
        }

        let mut sprite_pixel = 0u8;
        let mut sprite_palette = 0u8;
        let mut sprite_behind = false;
        let mut sprite_zero = false;
        if self.mask & 0x10 != 0 && !(x < 8 && self.mask & 0x04 == 0) {
            for slot in 0..self.sprite_count as usize {
                let sprite = &self.sprites[slot];
                let column = x as i16 - sprite.position_x as i16;
                if !(0..8).contains(&column) {
                    continue;
                }
                let bit = 7 - column;
                let low = (sprite.data_low >> bit) & 0x01;
                let high = (sprite.data_high >> bit) & 0x01;
                let pixel = (high << 1) | low;
                if pixel != 0 {
                    sprite_pixel = pixel;
                    sprite_palette = sprite.attributes & 0x03;
                    sprite_behind = sprite.attributes & 0x20 != 0;
                    sprite_zero = sprite.id == 0;
                    break;
                }
            }
        }

        let index = match (bg_pixel, sprite_pixel) {
            (0, 0) => 0,
            (0, _) => 0x10 | (sprite_palette << 2) | sprite_pixel,
            (_, 0) => (bg_attribute << 2) | bg_pixel,
            _ => {
                if sprite_zero && x != 255 && self.mask & 0x18 == 0x18 {
                    self.status |= 0x40;
                }
                if sprite_behind {
                    (bg_attribute << 2) | bg_pixel
                } else {
                    0x10 | (sprite_palette << 2) | sprite_pixel
                }
            }
        };

        let entry = self.palette.read(Self::fold_palette(index as u16));
        let mut rgb = palette_to_rgb(entry);
        if self.mask & 0x01 != 0 {
            let red = (rgb >> 16) & 0xFF;
            let green = (rgb >> 8) & 0xFF;
            let blue = rgb & 0xFF;
            let grey = (red + green + blue) / 3;
            rgb = (grey << 16) | (grey << 8) | grey;
        }

        bus.display_write(x as usize, self.scanline as usize, 0xFF00_0000 | rgb);
    }
}
