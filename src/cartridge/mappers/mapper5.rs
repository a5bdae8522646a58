// Mapper 5 (ExROM) - Mode-driven banking subset of the MMC5
//
// Memory Layout:
// - CPU $5100-$51FF: configuration registers (subset below)
// - CPU $6000-$7FFF: 8KB switchable work RAM bank
// - CPU $8000-$FFFF: PRG-ROM, carved into windows by the PRG mode
// - PPU $0000-$1FFF: CHR, carved into windows by the CHR mode
//
// Register Interface (implemented subset):
// - $5100: PRG mode (0=32KB, 1=2x16KB, 2=16KB+2x8KB, 3=4x8KB)
// - $5101: CHR mode (0=8KB, 1=2x4KB, 2=4x2KB, 3=8x1KB)
// - $5105: Nametable mapping; the four recognized layouts translate to
//   the console mirroring modes
// - $5113: Work RAM bank select
// - $5114-$5117: PRG bank registers (8KB slot numbers; wider modes use
//   the high bits of the governing register)
// - $5120-$5127: CHR bank registers (1KB slot numbers, same scheme)
// Other $51xx registers are not implemented and report an unsupported
// address. Writes into $8000-$FFFF hit ROM and are ignored.
//
// Games using Mapper 5:
// - Castlevania III
// - Laser Invasion

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

/// Nametable layouts recognized in the $5105 register
const NAMETABLES_ONE_SCREEN_LOWER: u8 = 0x00;
const NAMETABLES_VERTICAL: u8 = 0x44;
const NAMETABLES_HORIZONTAL: u8 = 0x50;
const NAMETABLES_ONE_SCREEN_UPPER: u8 = 0x55;

/// Mapper 5 implementation (ExROM subset)
///
/// The banking core of the MMC5: mode registers choose how wide each
/// window is, bank registers choose what it shows. The expansion audio,
/// multiplier, split screen, and fill mode of the full chip are out of
/// scope here.
pub struct Mapper5 {
    /// PRG mode register ($5100, low 2 bits)
    prg_mode: u8,
    /// CHR mode register ($5101, low 2 bits)
    chr_mode: u8,
    /// Raw nametable mapping register ($5105)
    nametables: u8,
    /// Work RAM bank register ($5113)
    ram_select: u8,
    /// PRG bank registers $5114-$5117
    prg_registers: [u8; 4],
    /// CHR bank registers $5120-$5127
    chr_registers: [u8; 8],
    /// PRG windows for $8000, $A000, $C000, $E000
    prg_windows: [BankWindow; 4],
    /// CHR windows, 1KB each, covering $0000-$1FFF
    chr_windows: [BankWindow; 8],
    /// Work RAM bank shown at $6000-$7FFF
    ram_bank: usize,
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
}

impl Mapper5 {
    /// Create a cleared ExROM mapper
    pub fn new() -> Self {
        Mapper5 {
            prg_mode: 3,
            chr_mode: 3,
            nametables: NAMETABLES_ONE_SCREEN_LOWER,
            ram_select: 0,
            prg_registers: [0xFF; 4],
            chr_registers: [0; 8],
            prg_windows: [BankWindow::default(); 4],
            chr_windows: [BankWindow::default(); 8],
            ram_bank: 0,
            chr_writable: false,
        }
    }

    fn mirroring_mode(&self) -> Mirroring {
        match self.nametables {
            NAMETABLES_VERTICAL => Mirroring::Vertical,
            NAMETABLES_HORIZONTAL => Mirroring::Horizontal,
            NAMETABLES_ONE_SCREEN_UPPER => Mirroring::OneScreenUpper,
            _ => Mirroring::OneScreenLower,
        }
    }

    /// Rebuild the PRG window table for the current mode
    fn apply_prg(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        let r = &self.prg_registers;
        let slots: [usize; 4] = match self.prg_mode & 0x03 {
            0 => {
                let base = ((r[3] >> 2) as usize) * 4;
                [base, base + 1, base + 2, base + 3]
            }
            1 => {
                let low = ((r[1] >> 1) as usize) * 2;
                let high = ((r[3] >> 1) as usize) * 2;
                [low, low + 1, high, high + 1]
            }
            2 => {
                let low = ((r[1] >> 1) as usize) * 2;
                [low, low + 1, r[2] as usize, r[3] as usize]
            }
            _ => [r[0] as usize, r[1] as usize, r[2] as usize, r[3] as usize],
        };
        for (window, slot) in self.prg_windows.iter_mut().zip(slots) {
            *window = BankWindow::from_slot(slot, PRG_WINDOW_SIZE, PRG_BANK_SIZE, prg_count);
        }
    }

    /// Rebuild the CHR window table for the current mode
    fn apply_chr(&mut self, cartridge: &Cartridge) {
        let chr_count = character_bank_count(cartridge);
        let r = &self.chr_registers;
        let slots: [usize; 8] = match self.chr_mode & 0x03 {
            0 => {
                let base = ((r[7] >> 3) as usize) * 8;
                [
                    base,
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6,
                    base + 7,
                ]
            }
            1 => {
                let low = ((r[3] >> 2) as usize) * 4;
                let high = ((r[7] >> 2) as usize) * 4;
                [
                    low,
                    low + 1,
                    low + 2,
                    low + 3,
                    high,
                    high + 1,
                    high + 2,
                    high + 3,
                ]
            }
            2 => {
                let units = [
                    ((r[1] >> 1) as usize) * 2,
                    ((r[3] >> 1) as usize) * 2,
                    ((r[5] >> 1) as usize) * 2,
                    ((r[7] >> 1) as usize) * 2,
                ];
                [
                    units[0],
                    units[0] + 1,
                    units[1],
                    units[1] + 1,
                    units[2],
                    units[2] + 1,
                    units[3],
                    units[3] + 1,
                ]
            }
            _ => [
                r[0] as usize,
                r[1] as usize,
                r[2] as usize,
                r[3] as usize,
                r[4] as usize,
                r[5] as usize,
                r[6] as usize,
                r[7] as usize,
            ],
        };
        for (window, slot) in self.chr_windows.iter_mut().zip(slots) {
            *window = BankWindow::from_slot(slot, CHR_WINDOW_SIZE, CHR_BANK_SIZE, chr_count);
        }
    }
}

impl Default for Mapper5 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper5 {
    fn clear(&mut self) {
        *self = Mapper5::new();
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        self.prg_mode = 3;
        self.chr_mode = 3;
        self.nametables = NAMETABLES_ONE_SCREEN_LOWER;
        self.ram_select = 0;
        self.prg_registers = [0xFF; 4];
        self.chr_registers = [0; 8];
        self.ram_bank = 0;
        self.chr_writable = character_is_ram(cartridge);
        self.apply_prg(cartridge);
        self.apply_chr(cartridge);
    }

    fn mirroring(&self, _cartridge: &Cartridge) -> Mirroring {
        self.mirroring_mode()
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
        match address {
            0x5100 => {
                self.prg_mode = value & 0x03;
                self.apply_prg(cartridge);
            }
            0x5101 => {
                self.chr_mode = value & 0x03;
                self.apply_chr(cartridge);
            }
            0x5105 => {
                self.nametables = value;
                bus.ppu_set_mirroring(self.mirroring_mode());
            }
            0x5113 => {
                self.ram_select = value;
                self.ram_bank = (value as usize) % cartridge.ram_banks().max(1);
            }
            0x5114..=0x5117 => {
                self.prg_registers[(address - 0x5114) as usize] = value;
                self.apply_prg(cartridge);
            }
            0x5120..=0x5127 => {
                self.chr_registers[(address - 0x5120) as usize] = value;
                self.apply_chr(cartridge);
            }
            0x8000..=0xFFFF => {
                // ROM area, no registers behind it
            }
            _ => return Err(MapperError::UnsupportedAddress(address)),
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

    fn read_ram(&self, cartridge: &Cartridge, address: u16) -> Result<u8, MapperError> {
        Ok(cartridge.ram(self.ram_bank)?.read(address & 0x1FFF))
    }

    fn write_ram(
        &mut self,
        cartridge: &mut Cartridge,
        address: u16,
        value: u8,
    ) -> Result<(), MapperError> {
        cartridge
            .ram_mut(self.ram_bank)?
            .write(address & 0x1FFF, value);
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
        let mut registers = vec![self.prg_mode, self.chr_mode, self.nametables, self.ram_select];
        registers.extend_from_slice(&self.prg_registers);
        registers.extend_from_slice(&self.chr_registers);
        MapperState {
            registers,
            ..MapperState::default()
        }
    }

    fn restore(&mut self, cartridge: &Cartridge, state: &MapperState) {
        self.reset(cartridge);
        if state.registers.len() >= 16 {
            self.prg_mode = state.registers[0];
            self.chr_mode = state.registers[1];
            self.nametables = state.registers[2];
            self.ram_select = state.registers[3];
            self.prg_registers.copy_from_slice(&state.registers[4..8]);
            self.chr_registers.copy_from_slice(&state.registers[8..16]);
            self.ram_bank = (self.ram_select as usize) % cartridge.ram_banks().max(1);
            self.apply_prg(cartridge);
            self.apply_chr(cartridge);
        }
    }
}
