// Mapper 4 (MMC3) - Fine-grained banking with a scanline IRQ counter
//
// Memory Layout:
// - CPU $6000-$7FFF: 8KB PRG-RAM (optional, battery-backed in some games)
// - CPU $8000-$9FFF: 8KB PRG-ROM bank (switchable or fixed depending on mode)
// - CPU $A000-$BFFF: 8KB PRG-ROM bank (always switchable)
// - CPU $C000-$DFFF: 8KB PRG-ROM bank (switchable or fixed depending on mode)
// - CPU $E000-$FFFF: 8KB PRG-ROM bank (fixed to last bank)
// - PPU $0000-$1FFF: eight 1KB CHR windows (two pairs move as 2KB units)
//
// Register Interface (selected by address bit 0 and bits 13-14):
// - $8000 (even): Bank select
//   Bit 7: PRG mode (0 = $8000 switchable, 1 = $C000 switchable)
//   Bit 6: CHR inversion (0 = 2KB pairs at $0000, 1 = 2KB pairs at $1000)
//   Bits 0-2: Which bank register the next data write updates
// - $8001 (odd): Bank data for the selected register (R0-R7)
// - $A000 (even): Mirroring (bit 0: 0 = vertical, 1 = horizontal)
// - $A001 (odd): PRG-RAM protect (bit 7 enable, bit 6 write protect)
// - $C000 (even): IRQ latch (counter reload value)
// - $C001 (odd): IRQ reload (counter reloads on the next clock)
// - $E000 (even): IRQ disable and acknowledge
// - $E001 (odd): IRQ enable
//
// The IRQ counter is clocked once per rendered scanline; when it decrements
// to zero with IRQs enabled, the chip pulls the CPU IRQ line.
//
// Games using Mapper 4:
// - Super Mario Bros. 3
// - Kirby's Adventure
// - Mega Man 3

use super::{
    character_bank_count, character_is_ram, program_bank_count, BankWindow, Mapper, MapperError,
    MapperState,
};
use crate::bus::BusSignals;
use crate::cartridge::{Cartridge, Mirroring};

/// PRG window width (8KB)
const PRG_WINDOW_SIZE: usize = 0x2000;

/// PRG bank width on the cartridge (16KB)
const PRG_BANK_SIZE: usize = 0x4000;

/// CHR window width (1KB)
const CHR_WINDOW_SIZE: usize = 0x0400;

/// CHR bank width on the cartridge (8KB)
const CHR_BANK_SIZE: usize = 0x2000;

/// Mapper 4 implementation (MMC3)
///
/// Eight bank registers feed four PRG and eight CHR windows; the window
/// tables are rebuilt after every register write so reads stay a plain
/// table lookup.
pub struct Mapper4 {
    /// Bank select register: mode bits plus the target register index
    bank_select: u8,
    /// Bank registers R0-R7 (R0-R5 CHR, R6-R7 PRG)
    bank_registers: [u8; 8],
    /// PRG windows for $8000, $A000, $C000, $E000
    prg_windows: [BankWindow; 4],
    /// CHR windows, 1KB each, covering $0000-$1FFF
    chr_windows: [BankWindow; 8],
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
    /// Mirroring latched through the $A000 register
    mirroring: Mirroring,
    /// IRQ counter reload value
    irq_latch: u8,
    /// Live IRQ counter, decremented per scanline clock
    irq_counter: u8,
    /// Counter reloads from the latch on the next clock
    irq_reload: bool,
    /// Whether a zero counter pulls the IRQ line
    irq_enabled: bool,
}

impl Mapper4 {
    /// Create a cleared MMC3 mapper
    pub fn new() -> Self {
        Mapper4 {
            bank_select: 0,
            bank_registers: [0; 8],
            prg_windows: [BankWindow::default(); 4],
            chr_windows: [BankWindow::default(); 8],
            chr_writable: false,
            mirroring: Mirroring::Vertical,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
        }
    }

    /// Rebuild both window tables from the bank registers and mode bits
    fn apply_registers(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        let prg_slots = prg_count * (PRG_BANK_SIZE / PRG_WINDOW_SIZE);
        let r6 = self.bank_registers[6] as usize;
        let r7 = self.bank_registers[7] as usize;
        let slots = if self.bank_select & 0x40 == 0 {
            [r6, r7, prg_slots - 2, prg_slots - 1]
        } else {
            [prg_slots - 2, r7, r6, prg_slots - 1]
        };
        for (window, slot) in self.prg_windows.iter_mut().zip(slots) {
            *window = BankWindow::from_slot(slot, PRG_WINDOW_SIZE, PRG_BANK_SIZE, prg_count);
        }

        let chr_count = character_bank_count(cartridge);
        let r = &self.bank_registers;
        // 2KB registers drop their low bit and occupy two adjacent windows
        let pairs = [
            (r[0] & 0xFE) as usize,
            (r[0] | 0x01) as usize,
            (r[1] & 0xFE) as usize,
            (r[1] | 0x01) as usize,
        ];
        let singles = [r[2] as usize, r[3] as usize, r[4] as usize, r[5] as usize];
        let slots: [usize; 8] = if self.bank_select & 0x80 == 0 {
            [
                pairs[0], pairs[1], pairs[2], pairs[3], singles[0], singles[1], singles[2],
                singles[3],
            ]
        } else {
            [
                singles[0], singles[1], singles[2], singles[3], pairs[0], pairs[1], pairs[2],
                pairs[3],
            ]
        };
        for (window, slot) in self.chr_windows.iter_mut().zip(slots) {
            *window = BankWindow::from_slot(slot, CHR_WINDOW_SIZE, CHR_BANK_SIZE, chr_count);
        }
    }
}

impl Default for Mapper4 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper4 {
    fn clear(&mut self) {
        self.bank_select = 0;
        self.bank_registers = [0; 8];
        self.prg_windows = [BankWindow::default(); 4];
        self.chr_windows = [BankWindow::default(); 8];
        self.chr_writable = false;
        self.mirroring = Mirroring::Vertical;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        self.bank_select = 0;
        self.bank_registers = [0; 8];
        self.chr_writable = character_is_ram(cartridge);
        self.mirroring = cartridge.mirroring();
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.apply_registers(cartridge);
    }

    fn mirroring(&self, cartridge: &Cartridge) -> Mirroring {
        // Four-screen boards hardwire the nametable layout
        if cartridge.mirroring() == Mirroring::FourScreen {
            Mirroring::FourScreen
        } else {
            self.mirroring
        }
    }

    fn read_rom_program(&self, cartridge: &Cartridge, address: u16) -> Result<u8, MapperError> {
        let offset = address & 0x7FFF;
        let window = &self.prg_windows[(offset as usize) / PRG_WINDOW_SIZE];
        Ok(window.read_program(cartridge, offset % PRG_WINDOW_SIZE as u16)?)
    }

    fn write_rom_program(
        &mut self,
        bus: &mut dyn BusSignals,
        cartridge: &mut Cartridge,
        address: u16,
        value: u8,
    ) -> Result<(), MapperError> {
        if !(0x8000..=0xFFFF).contains(&address) {
            return Err(MapperError::UnsupportedAddress(address));
        }
        match address & 0xE001 {
            0x8000 => {
                self.bank_select = value;
                self.apply_registers(cartridge);
            }
            0x8001 => {
                self.bank_registers[(self.bank_select & 0x07) as usize] = value;
                self.apply_registers(cartridge);
            }
            0xA000 => {
                if cartridge.mirroring() != Mirroring::FourScreen {
                    self.mirroring = if value & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                    bus.ppu_set_mirroring(self.mirroring);
                }
            }
            0xA001 => {
                // RAM protect bits are accepted but not enforced
            }
            0xC000 => self.irq_latch = value,
            0xC001 => self.irq_reload = true,
            0xE000 => self.irq_enabled = false,
            _ => self.irq_enabled = true,
        }
        Ok(())
    }

    fn read_rom_character(&self, cartridge: &Cartridge, address: u16) -> Result<u8, MapperError> {
        match address {
            0x0000..=0x1FFF => {
                let window = &self.chr_windows[(address as usize) / CHR_WINDOW_SIZE];
                Ok(window.read_character(cartridge, address % CHR_WINDOW_SIZE as u16)?)
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn write_rom_character(
        &mut self,
        _bus: &mut dyn BusSignals,
        cartridge: &mut Cartridge,
        address: u16,
        value: u8,
    ) -> Result<(), MapperError> {
        match address {
            0x0000..=0x1FFF => {
                if self.chr_writable {
                    let window = &self.chr_windows[(address as usize) / CHR_WINDOW_SIZE];
                    window.write_character(cartridge, address % CHR_WINDOW_SIZE as u16, value)?;
                }
                Ok(())
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn signal_interrupt(
        &mut self,
        bus: &mut dyn BusSignals,
        _cartridge: &Cartridge,
    ) -> Result<(), MapperError> {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            bus.cpu_interrupt_maskable();
        }
        Ok(())
    }

    fn rom_program(&self, address: u16) -> Result<(usize, u16), MapperError> {
        let offset = address & 0x7FFF;
        let window = &self.prg_windows[(offset as usize) / PRG_WINDOW_SIZE];
        Ok((window.bank, window.offset + offset % PRG_WINDOW_SIZE as u16))
    }

    fn rom_character(&self, address: u16) -> Result<(usize, u16), MapperError> {
        match address {
            0x0000..=0x1FFF => {
                let window = &self.chr_windows[(address as usize) / CHR_WINDOW_SIZE];
                Ok((window.bank, window.offset + address % CHR_WINDOW_SIZE as u16))
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn state(&self) -> MapperState {
        let mut registers = vec![self.bank_select];
        registers.extend_from_slice(&self.bank_registers);
        registers.push(self.mirroring as u8);
        MapperState {
            registers,
            irq_counter: self.irq_counter,
            irq_period: self.irq_latch,
            irq_enabled: self.irq_enabled,
            irq_reload: self.irq_reload,
        }
    }

    fn restore(&mut self, cartridge: &Cartridge, state: &MapperState) {
        self.reset(cartridge);
        if state.registers.len() >= 10 {
            self.bank_select = state.registers[0];
            self.bank_registers.copy_from_slice(&state.registers[1..9]);
            self.mirroring = match state.registers[9] {
                0 => Mirroring::Horizontal,
                1 => Mirroring::Vertical,
                2 => Mirroring::OneScreenLower,
                3 => Mirroring::OneScreenUpper,
                _ => Mirroring::FourScreen,
            };
            self.irq_counter = state.irq_counter;
            self.irq_latch = state.irq_period;
            self.irq_enabled = state.irq_enabled;
            self.irq_reload = state.irq_reload;
            self.apply_registers(cartridge);
        }
    }
}
