// PPU module - Picture Processing Unit (2C02)
//
// The PPU is a state machine over `(scanline, dot)` pairs, advanced one dot
// per `update()` call. A frame is 262 scanlines of 341 dots:
//
// ```text
// Scanline 0-239:   visible (pixels composited and emitted)
// Scanline 240:     post-render (frame handed to the display at dot 0)
// Scanline 241-260: vertical blank (flag set and NMI raised at 241/1)
// Scanline 261:     pre-render (flags cleared, vertical scroll reloaded)
// ```
//
// The CPU reaches the PPU through eight ports at $2000-$2007 (mirrored
// through $3FFF); the PPU reaches the rest of the system through the `Bus`
// trait: pattern fetches, pixel output, frame completion, interrupt lines,
// and the mapper scanline hook.
//
// Submodules:
// - `constants`: timing and layout constants
// - `registers`: CPU-facing port reads/writes
// - `memory`: the PPU address space ($0000-$3FFF)
// - `rendering`: the per-dot fetch/composite pipeline

mod constants;
mod memory;
mod registers;
mod rendering;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::cartridge::MapperError;
use crate::memory::Memory;

use constants::{NAMETABLE_MEMORY_SIZE, OAM_SIZE, PALETTE_SIZE};

/// Errors raised by PPU port access
#[derive(Debug)]
pub enum PpuError {
    /// Port address outside the $2000-$3FFF window
    UnsupportedPort(u16),
    /// Pattern space access failed in the mapper
    Mapper(MapperError),
}

impl std::fmt::Display for PpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PpuError::UnsupportedPort(address) => {
                write!(f, "Unsupported PPU port address: ${:04X}", address)
            }
            PpuError::Mapper(err) => write!(f, "Mapper error: {}", err),
        }
    }
}

impl std::error::Error for PpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PpuError::Mapper(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MapperError> for PpuError {
    fn from(err: MapperError) -> Self {
        PpuError::Mapper(err)
    }
}

/// One sprite slot in the active or staging scanline buffer
///
/// `id` is the OAM index the entry came from (0xFF marks an empty slot);
/// `data_low`/`data_high` hold the pattern row after flips are applied.
#[derive(Debug, Clone, Copy)]
pub(super) struct SpriteEntry {
    pub id: u8,
    pub position_x: u8,
    pub position_y: u8,
    pub tile: u8,
    pub attributes: u8,
    pub data_low: u8,
    pub data_high: u8,
}

impl Default for SpriteEntry {
    fn default() -> Self {
        SpriteEntry {
            id: 0xFF,
            position_x: 0xFF,
            position_y: 0xFF,
            tile: 0,
            attributes: 0,
            data_low: 0,
            data_high: 0,
        }
    }
}

/// Serializable PPU register and memory snapshot
///
/// Pipeline latches and the sprite buffers are transient within a frame and
/// are rebuilt by the next pre-render line, so they are not captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpuState {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_address: u8,
    pub address_temp: u16,
    pub address_vram: u16,
    pub fine_x: u8,
    pub write_latch: bool,
    pub read_buffer: u8,
    pub open_bus: u8,
    pub scanline: u16,
    pub dot: u16,
    pub frame_odd: bool,
    pub nametables: Vec<u8>,
    pub palette: Vec<u8>,
    pub oam: Vec<u8>,
}

/// The 2C02 picture processor
pub struct Ppu {
    // CPU-visible ports
    control: u8,
    mask: u8,
    status: u8,
    oam_address: u8,

    // Internal scroll/address registers (Loopy t/v/x/w)
    address_temp: u16,
    address_vram: u16,
    fine_x: u8,
    write_latch: bool,

    // $2007 read buffer and the open-bus port shadow
    read_buffer: u8,
    open_bus: u8,

    // Position counters
    scanline: u16,
    dot: u16,
    frame_odd: bool,

    // Backing memories
    nametables: Memory,
    palette: Memory,
    oam: Memory,

    // Background fetch latches
    fetched_tile: u8,
    fetched_attribute: u8,
    fetched_pattern_low: u8,
    fetched_pattern_high: u8,

    // Background shift registers: 16-bit pattern pairs, 8-bit attribute
    // pairs refilled from the latch bits on every shift
    shift_pattern_low: u16,
    shift_pattern_high: u16,
    shift_attribute_low: u8,
    shift_attribute_high: u8,
    attribute_latch_low: u8,
    attribute_latch_high: u8,

    // Sprite scanline buffers
    sprites: [SpriteEntry; 8],
    sprite_count: u8,
    sprites_secondary: [SpriteEntry; 8],
    sprite_count_secondary: u8,
}

impl Ppu {
    /// Create a powered-off PPU with zeroed memories
    pub fn new() -> Self {
        Ppu {
            control: 0,
            mask: 0,
            status: 0,
            oam_address: 0,
            address_temp: 0,
            address_vram: 0,
            fine_x: 0,
            write_latch: false,
            read_buffer: 0,
            open_bus: 0,
            scanline: 0,
            dot: 0,
            frame_odd: false,
            nametables: Memory::new(NAMETABLE_MEMORY_SIZE),
            palette: Memory::new(PALETTE_SIZE),
            oam: Memory::new(OAM_SIZE),
            fetched_tile: 0,
            fetched_attribute: 0,
            fetched_pattern_low: 0,
            fetched_pattern_high: 0,
            shift_pattern_low: 0,
            shift_pattern_high: 0,
            shift_attribute_low: 0,
            shift_attribute_high: 0,
            attribute_latch_low: 0,
            attribute_latch_high: 0,
            sprites: [SpriteEntry::default(); 8],
            sprite_count: 0,
            sprites_secondary: [SpriteEntry::default(); 8],
            sprite_count_secondary: 0,
        }
    }

    /// Zero all registers, counters, and backing memories
    pub fn clear(&mut self) {
        *self = Ppu::new();
    }

    /// Power-on/reset state: identical to `clear` for this chip
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Current scanline (0-261)
    #[inline]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Current dot within the scanline (0-340)
    #[inline]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Frame parity; flips every time the scanline counter wraps
    #[inline]
    pub fn frame_odd(&self) -> bool {
        self.frame_odd
    }

    /// Whether background or sprite rendering is enabled in the mask
    #[inline]
    pub(super) fn rendering_enabled(&self) -> bool {
        self.mask & 0x18 != 0
    }

    /// Fill OAM from a 256-byte page, starting at the current OAM address
    ///
    /// This is the sprite DMA path: the CPU copies one page and the PPU
    /// stores it wrapping around the OAM address.
    pub fn oam_dma(&mut self, page: &[u8; 256]) {
        for (i, &value) in page.iter().enumerate() {
            let index = self.oam_address.wrapping_add(i as u8);
            self.oam.write(index as u16, value);
        }
    }

    /// Snapshot registers and memories for a save state
    pub fn state(&self) -> PpuState {
        PpuState {
            control: self.control,
            mask: self.mask,
            status: self.status,
            oam_address: self.oam_address,
            address_temp: self.address_temp,
            address_vram: self.address_vram,
            fine_x: self.fine_x,
            write_latch: self.write_latch,
            read_buffer: self.read_buffer,
            open_bus: self.open_bus,
            scanline: self.scanline,
            dot: self.dot,
            frame_odd: self.frame_odd,
            nametables: self.nametables.raw().to_vec(),
            palette: self.palette.raw().to_vec(),
            oam: self.oam.raw().to_vec(),
        }
    }

    /// Restore a register and memory snapshot
    ///
    /// Pipeline latches reset to zero; the next pre-render line refills
    /// them before any visible pixel depends on their contents.
    pub fn restore(&mut self, state: &PpuState) {
        self.clear();
        self.control = state.control;
        self.mask = state.mask;
        self.status = state.status;
        self.oam_address = state.oam_address;
        self.address_temp = state.address_temp;
        self.address_vram = state.address_vram;
        self.fine_x = state.fine_x;
        self.write_latch = state.write_latch;
        self.read_buffer = state.read_buffer;
        self.open_bus = state.open_bus;
        self.scanline = state.scanline;
        self.dot = state.dot;
        self.frame_odd = state.frame_odd;
        if state.nametables.len() == self.nametables.size() {
            self.nametables.raw_mut().copy_from_slice(&state.nametables);
        }
        if state.palette.len() == self.palette.size() {
            self.palette.raw_mut().copy_from_slice(&state.palette);
        }
        if state.oam.len() == self.oam.size() {
            self.oam.raw_mut().copy_from_slice(&state.oam);
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
