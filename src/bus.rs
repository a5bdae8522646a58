// Bus module - interconnect between PPU, mapper, and display
//
// This module defines the capability traits through which the PPU and the
// mapper chips reach the rest of the system, plus the concrete pieces the
// emulation session wires together for each tick.
//
// Two traits split the surface by consumer:
//
// ```text
// BusSignals  - what mappers see: mirroring updates, CPU interrupt lines
// Bus         - what the PPU sees: CHR space access, pixel output,
//               frame completion, the mapper scanline hook
// ```
//
// Interrupt lines are latched in `SignalLines` and drained by the CPU driver
// between ticks; nothing here calls into a CPU directly.

use crate::cartridge::{Cartridge, Mapper, MapperError, Mirroring};
use crate::display::FrameBuffer;

/// Signals a mapper can assert while handling a register write or a
/// scanline clock
pub trait BusSignals {
    /// Change the console-level nametable mirroring
    fn ppu_set_mirroring(&mut self, mode: Mirroring);

    /// Latch a maskable CPU interrupt (IRQ)
    fn cpu_interrupt_maskable(&mut self);

    /// Latch a non-maskable CPU interrupt (NMI)
    fn cpu_interrupt_non_maskable(&mut self);
}

/// Capabilities the PPU consumes while rendering
pub trait Bus: BusSignals {
    /// Read a byte from the CHR/pattern space ($0000-$1FFF)
    fn ppu_read(&mut self, address: u16) -> Result<u8, MapperError>;

    /// Write a byte into the CHR/pattern space (CHR-RAM boards)
    fn ppu_write(&mut self, address: u16, value: u8) -> Result<(), MapperError>;

    /// Emit one finished pixel
    fn display_write(&mut self, x: usize, y: usize, argb: u32);

    /// Mark the frame complete and hand it to the display
    fn display_update(&mut self);

    /// Clock the mapper's scanline counter
    fn mapper_interrupt(&mut self) -> Result<(), MapperError>;

    /// Current nametable mirroring
    fn mirroring(&self) -> Mirroring;
}

/// Latched interrupt lines and the live mirroring mode
///
/// The CPU driver drains the interrupt latches with the `take_*` methods;
/// reading a latch clears it.
#[derive(Debug, Clone)]
pub struct SignalLines {
    irq: bool,
    nmi: bool,
    mirroring: Mirroring,
}

impl SignalLines {
    /// Create signal lines with both interrupts clear
    ///
    /// # Arguments
    ///
    /// * `mirroring` - Initial mirroring mode (from the cartridge header)
    pub fn new(mirroring: Mirroring) -> Self {
        SignalLines {
            irq: false,
            nmi: false,
            mirroring,
        }
    }

    /// Drain the maskable interrupt latch
    pub fn take_interrupt_maskable(&mut self) -> bool {
        std::mem::take(&mut self.irq)
    }

    /// Drain the non-maskable interrupt latch
    pub fn take_interrupt_non_maskable(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    /// Current mirroring mode
    #[inline]
    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// Clear both latches and restore the given mirroring
    pub fn reset(&mut self, mirroring: Mirroring) {
        self.irq = false;
        self.nmi = false;
        self.mirroring = mirroring;
    }
}

impl BusSignals for SignalLines {
    fn ppu_set_mirroring(&mut self, mode: Mirroring) {
        self.mirroring = mode;
    }

    fn cpu_interrupt_maskable(&mut self) {
        self.irq = true;
    }

    fn cpu_interrupt_non_maskable(&mut self) {
        self.nmi = true;
    }
}

/// The per-tick bus view borrowed from the emulation session
///
/// Holds disjoint mutable borrows of the mapper, the cartridge, the signal
/// lines, and the framebuffer for the duration of one call chain. Nothing
/// outlives the tick, so no locking or shared ownership is needed.
pub struct SystemBus<'a> {
    mapper: &'a mut dyn Mapper,
    cartridge: &'a mut Cartridge,
    signals: &'a mut SignalLines,
    display: &'a mut FrameBuffer,
}

impl<'a> SystemBus<'a> {
    /// Assemble a bus view from the session's components
    pub fn new(
        mapper: &'a mut dyn Mapper,
        cartridge: &'a mut Cartridge,
        signals: &'a mut SignalLines,
        display: &'a mut FrameBuffer,
    ) -> Self {
        SystemBus {
            mapper,
            cartridge,
            signals,
            display,
        }
    }
}

impl BusSignals for SystemBus<'_> {
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

impl Bus for SystemBus<'_> {
    fn ppu_read(&mut self, address: u16) -> Result<u8, MapperError> {
        self.mapper.read_rom_character(self.cartridge, address)
    }

    fn ppu_write(&mut self, address: u16, value: u8) -> Result<(), MapperError> {
        self.mapper
            .write_rom_character(&mut *self.signals, &mut *self.cartridge, address, value)
    }

    fn display_write(&mut self, x: usize, y: usize, argb: u32) {
        self.display.write_pixel(x, y, argb);
    }

    fn display_update(&mut self) {
        self.display.present();
    }

    fn mapper_interrupt(&mut self) -> Result<(), MapperError> {
        self.mapper
            .signal_interrupt(&mut *self.signals, &*self.cartridge)
    }

    fn mirroring(&self) -> Mirroring {
        self.signals.mirroring()
    }
}
