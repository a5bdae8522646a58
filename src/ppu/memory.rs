// PPU address space ($0000-$3FFF)
//
// Three regions share the 14-bit space:
//
// ```text
// $0000-$1FFF  pattern tables, routed to the mapper through the bus
// $2000-$2FFF  nametables, folded into internal memory by mirroring
// $3000-$3EFF  nametable mirror of $2000-$2EFF
// $3F00-$3FFF  palette RAM, 32 bytes mirrored every $20
// ```
//
// Mirroring comes from the bus on every access; mappers can flip it
// mid-frame.

use crate::bus::Bus;
use crate::cartridge::Mirroring;

use super::constants::NAMETABLE_SIZE;
use super::{Ppu, PpuError};

impl Ppu {
    /// Fold a nametable address into the internal 4KB memory
    ///
    /// The address space exposes four 1KB tables; the fold picks which
    /// physical table each one lands on. Four-screen boards use all four.
    pub(super) fn fold_nametable(mirroring: Mirroring, address: u16) -> u16 {
        let address = address & 0x0FFF;
        let table = address / NAMETABLE_SIZE as u16;
        let offset = address % NAMETABLE_SIZE as u16;

        let folded = match mirroring {
            // $2000=$2400, $2800=$2C00
            Mirroring::Horizontal => table / 2,
            // $2000=$2800, $2400=$2C00
            Mirroring::Vertical => table % 2,
            Mirroring::OneScreenLower => 0,
            Mirroring::OneScreenUpper => 1,
            Mirroring::FourScreen => table,
        };

        folded * NAMETABLE_SIZE as u16 + offset
    }

    /// Fold a palette address into the 32-byte palette RAM
    ///
    /// Entry 0 of each sprite palette is shared with the corresponding
    /// background entry: $3F10/$3F14/$3F18/$3F1C map onto $3F00/$3F04/
    /// $3F08/$3F0C.
    pub(super) fn fold_palette(address: u16) -> u16 {
        let index = address & 0x001F;
        if index >= 0x10 && index % 4 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    /// Read a byte from the PPU address space
    pub(super) fn read_memory(&self, bus: &mut dyn Bus, address: u16) -> Result<u8, PpuError> {
        let address = address & 0x3FFF;

        match address {
            0x0000..=0x1FFF => Ok(bus.ppu_read(address)?),
            0x2000..=0x3EFF => {
                let folded = Self::fold_nametable(bus.mirroring(), address);
                Ok(self.nametables.read(folded))
            }
            _ => Ok(self.palette.read(Self::fold_palette(address))),
        }
    }

    /// Write a byte into the PPU address space
    pub(super) fn write_memory(
        &mut self,
        bus: &mut dyn Bus,
        address: u16,
        value: u8,
    ) -> Result<(), PpuError> {
        let address = address & 0x3FFF;

        match address {
            0x0000..=0x1FFF => Ok(bus.ppu_write(address, value)?),
            0x2000..=0x3EFF => {
                let folded = Self::fold_nametable(bus.mirroring(), address);
                self.nametables.write(folded, value);
                Ok(())
            }
            _ => {
                self.palette.write(Self::fold_palette(address), value);
                Ok(())
            }
        }
    }
}
