// PPU unit tests
//
// The harness drives a real mapper 0 cartridge with CHR-RAM behind a
// small bus double that records pixels, frame completions, and mapper
// scanline clocks.

use crate::bus::{Bus, BusSignals, SignalLines};
use crate::cartridge::{create_mapper, Cartridge, Mapper, MapperError, Mirroring};

use super::constants::DOTS_PER_FRAME;
use super::Ppu;

mod quirks;
mod registers;

/// PPU Control Register ($2000) - Write only
pub(crate) const PPUCTRL: u16 = 0x2000;
/// PPU Mask Register ($2001) - Write only
pub(crate) const PPUMASK: u16 = 0x2001;
/// PPU Status Register ($2002) - Read only
pub(crate) const PPUSTATUS: u16 = 0x2002;
/// OAM Address Port ($2003) - Write only
pub(crate) const OAMADDR: u16 = 0x2003;
/// OAM Data Port ($2004) - Read/Write
pub(crate) const OAMDATA: u16 = 0x2004;
/// Scroll Position Register ($2005) - Write x2
pub(crate) const PPUSCROLL: u16 = 0x2005;
/// PPU Address Register ($2006) - Write x2
pub(crate) const PPUADDR: u16 = 0x2006;
/// PPU Data Port ($2007) - Read/Write
pub(crate) const PPUDATA: u16 = 0x2007;

/// Bus double wired to a mapper 0 cartridge with CHR-RAM
pub(crate) struct TestBus {
    pub mapper: Box<dyn Mapper>,
    pub cartridge: Cartridge,
    pub signals: SignalLines,
    pub frame: Vec<u32>,
    pub presented: u32,
    pub mapper_clocks: u32,
}

impl TestBus {
    pub fn new() -> Self {
        let mut bytes = vec![0x4E, 0x45, 0x53, 0x1A, 1, 0];
        bytes.resize(16, 0);
        bytes.extend(std::iter::repeat(0).take(0x4000));
        let mut cartridge = Cartridge::new();
        cartridge.load_from_bytes(&bytes).unwrap();

        let mut mapper = create_mapper(0).unwrap();
        mapper.reset(&cartridge);

        TestBus {
            mapper,
            cartridge,
            signals: SignalLines::new(Mirroring::Horizontal),
            frame: vec![0; 256 * 240],
            presented: 0,
            mapper_clocks: 0,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.frame[y * 256 + x]
    }
}

impl BusSignals for TestBus {
    fn ppu_set_mirroring(&mut self, mode: Mirroring) {
        self.signals.ppu_set_mirroring(mode);
    }

    fn cpu_interrupt_maskable(&mut self) {
        self.signals.cpu_interrupt_maskable();
    }

    fn cpu_interrupt_non_maskable(&mut self) {
        self.signals.cpu_interrupt_non_maskable();
    }
}

impl Bus for TestBus {
    fn ppu_read(&mut self, address: u16) -> Result<u8, MapperError> {
        self.mapper.read_rom_character(&self.cartridge, address)
    }

    fn ppu_write(&mut self, address: u16, value: u8) -> Result<(), MapperError> {
        self.mapper
            .write_rom_character(&mut self.signals, &mut self.cartridge, address, value)
    }

    fn display_write(&mut self, x: usize, y: usize, argb: u32) {
        self.frame[y * 256 + x] = argb;
    }

    fn display_update(&mut self) {
        self.presented += 1;
    }

    fn mapper_interrupt(&mut self) -> Result<(), MapperError> {
        self.mapper_clocks += 1;
        self.mapper.signal_interrupt(&mut self.signals, &self.cartridge)
    }

    fn mirroring(&self) -> Mirroring {
        self.signals.mirroring()
    }
}

/// Step the PPU until it sits at the given position, with a three-frame
/// safety bound
pub(crate) fn advance_to(ppu: &mut Ppu, bus: &mut TestBus, scanline: u16, dot: u16) {
    for _ in 0..(3 * DOTS_PER_FRAME) {
        if ppu.scanline() == scanline && ppu.dot() == dot {
            return;
        }
        ppu.update(bus).unwrap();
    }
    panic!("PPU never reached ({}, {})", scanline, dot);
}

/// Run whole frames from the current position
pub(crate) fn run_frames(ppu: &mut Ppu, bus: &mut TestBus, frames: u32) {
    for _ in 0..frames {
        let scanline = ppu.scanline();
        let dot = ppu.dot();
        ppu.update(bus).unwrap();
        advance_to(ppu, bus, scanline, dot);
    }
}

/// Write a byte into the PPU address space through the $2006/$2007 ports
pub(crate) fn write_vram(ppu: &mut Ppu, bus: &mut TestBus, address: u16, value: u8) {
    ppu.write_port(bus, PPUADDR, (address >> 8) as u8).unwrap();
    ppu.write_port(bus, PPUADDR, (address & 0xFF) as u8).unwrap();
    ppu.write_port(bus, PPUDATA, value).unwrap();
}

/// Zero the scroll registers after VRAM setup left t pointing elsewhere
pub(crate) fn reset_scroll(ppu: &mut Ppu, bus: &mut TestBus) {
    ppu.write_port(bus, PPUCTRL, 0x00).unwrap();
    ppu.write_port(bus, PPUSCROLL, 0x00).unwrap();
    ppu.write_port(bus, PPUSCROLL, 0x00).unwrap();
}

/// Fill a CHR-RAM tile so every pixel reads back the given 2-bit value
pub(crate) fn fill_tile(bus: &mut TestBus, table: u16, tile: u16, pixel: u8) {
    let base = table * 0x1000 + tile * 16;
    let low = if pixel & 0x01 != 0 { 0xFF } else { 0x00 };
    let high = if pixel & 0x02 != 0 { 0xFF } else { 0x00 };
    for row in 0..8 {
        bus.ppu_write(base + row, low).unwrap();
        bus.ppu_write(base + row + 8, high).unwrap();
    }
}
