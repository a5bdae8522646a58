// PPU constants

/// Port address mask for register mirroring
///
/// The eight ports ($2000-$2007) repeat throughout $2000-$3FFF; masking
/// with this value yields the port number.
pub(super) const PORT_MASK: u16 = 0x0007;

/// Internal nametable memory size (two 1KB tables, addressed through 4KB)
pub(super) const NAMETABLE_MEMORY_SIZE: usize = 0x1000;

/// Size of one nametable in bytes (1KB)
pub(super) const NAMETABLE_SIZE: usize = 0x0400;

/// Size of palette RAM in bytes
pub(super) const PALETTE_SIZE: usize = 32;

/// Size of object attribute memory in bytes (64 sprites, 4 bytes each)
pub(super) const OAM_SIZE: usize = 256;

/// Bytes per OAM entry
pub(super) const OAM_ENTRY_SIZE: usize = 4;

/// Sprite slots available per scanline
pub(super) const SPRITES_PER_LINE: usize = 8;

/// Screen width in pixels
pub(super) const SCREEN_WIDTH: u16 = 256;

/// Screen height in pixels
pub(super) const SCREEN_HEIGHT: u16 = 240;

// ========================================
// Timing (NTSC)
// ========================================

/// Dots per scanline
pub(super) const DOTS_PER_SCANLINE: u16 = 341;

/// Scanlines per frame
pub(super) const SCANLINES_PER_FRAME: u16 = 262;

/// Dots per frame: 341 dots/scanline x 262 scanlines = 89,342 dots
#[allow(dead_code)]
pub(super) const DOTS_PER_FRAME: u32 = (DOTS_PER_SCANLINE as u32) * (SCANLINES_PER_FRAME as u32);

/// Last dot of a scanline
pub(super) const LAST_DOT: u16 = DOTS_PER_SCANLINE - 1;

/// Last visible scanline
pub(super) const LAST_VISIBLE_SCANLINE: u16 = 239;

/// Post-render scanline (the frame is handed off here)
pub(super) const POSTRENDER_SCANLINE: u16 = 240;

/// Scanline on which the vertical blank flag is raised
pub(super) const VBLANK_SCANLINE: u16 = 241;

/// Pre-render scanline (261, or -1 in some documentation)
pub(super) const PRERENDER_SCANLINE: u16 = SCANLINES_PER_FRAME - 1;
