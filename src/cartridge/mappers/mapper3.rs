// Mapper 3 (CNROM) - Fixed PRG-ROM with switchable CHR-ROM
//
// Memory Layout:
// - CPU $8000-$BFFF: First 16KB PRG-ROM bank
// - CPU $C000-$FFFF: Last 16KB PRG-ROM bank (mirror of first if only one bank)
// - PPU $0000-$1FFF: 8KB switchable CHR-ROM bank
//
// Register Interface:
// - Any write to $8000-$FFFF selects the CHR bank shown at $0000-$1FFF
//   (low 2 bits of the value, reduced modulo the bank count)
//
// Games using Mapper 3:
// - Arkanoid
// - Paperboy
// - Q*bert

use super::{
    character_bank_count, character_is_ram, program_bank_count, BankWindow, Mapper, MapperError,
    MapperState,
};
use crate::bus::BusSignals;
use crate::cartridge::Cartridge;

/// PRG window width (16KB)
const PRG_WINDOW_SIZE: usize = 0x4000;

/// CHR window width (8KB)
const CHR_WINDOW_SIZE: usize = 0x2000;

/// Bank-select bits honored by the register
const CHR_SELECT_MASK: u8 = 0x03;

/// Mapper 3 implementation (CNROM)
///
/// The inverse of UxROM: both PRG windows are fixed while the single CHR
/// window switches among 8KB banks.
pub struct Mapper3 {
    /// Fixed PRG windows: low half and high half of $8000-$FFFF
    prg_windows: [BankWindow; 2],
    /// Switchable CHR window covering $0000-$1FFF
    chr_window: BankWindow,
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
    /// Last value latched into the bank-select register
    chr_select: u8,
}

impl Mapper3 {
    /// Create a cleared CNROM mapper
    pub fn new() -> Self {
        Mapper3 {
            prg_windows: [BankWindow::default(); 2],
            chr_window: BankWindow::default(),
            chr_writable: false,
            chr_select: 0,
        }
    }

    fn apply_select(&mut self, cartridge: &Cartridge) {
        self.chr_window = BankWindow::from_slot(
            (self.chr_select & CHR_SELECT_MASK) as usize,
            CHR_WINDOW_SIZE,
            CHR_WINDOW_SIZE,
            character_bank_count(cartridge),
        );
    }
}

impl Default for Mapper3 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper3 {
    fn clear(&mut self) {
        self.prg_windows = [BankWindow::default(); 2];
        self.chr_window = BankWindow::default();
        self.chr_writable = false;
        self.chr_select = 0;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        self.prg_windows[0] = BankWindow::from_slot(0, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.prg_windows[1] =
            BankWindow::from_slot(prg_count - 1, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.chr_select = 0;
        self.apply_select(cartridge);
        self.chr_writable = character_is_ram(cartridge);
    }

    fn read_rom_program(&self, cartridge: &Cartridge, address: u16) -> Result<u8, MapperError> {
        let offset = address & 0x7FFF;
        let window = &self.prg_windows[(offset as usize) / PRG_WINDOW_SIZE];
        Ok(window.read_program(cartridge, offset % PRG_WINDOW_SIZE as u16)?)
    }

    fn write_rom_program(
        &mut self,
        _bus: &mut dyn BusSignals,
        cartridge: &mut Cartridge,
        address: u16,
        value: u8,
    ) -> Result<(), MapperError> {
        match address {
            0x8000..=0xFFFF => {
                self.chr_select = value;
                self.apply_select(cartridge);
                Ok(())
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn read_rom_character(&self, cartridge: &Cartridge, address: u16) -> Result<u8, MapperError> {
        match address {
            0x0000..=0x1FFF => Ok(self.chr_window.read_character(cartridge, address)?),
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
                    self.chr_window.write_character(cartridge, address, value)?;
                }
                Ok(())
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn rom_program(&self, address: u16) -> Result<(usize, u16), MapperError> {
        let offset = address & 0x7FFF;
        let window = &self.prg_windows[(offset as usize) / PRG_WINDOW_SIZE];
        Ok((window.bank, window.offset + offset % PRG_WINDOW_SIZE as u16))
    }

    fn rom_character(&self, address: u16) -> Result<(usize, u16), MapperError> {
        match address {
            0x0000..=0x1FFF => Ok((self.chr_window.bank, self.chr_window.offset + address)),
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
    }

    fn state(&self) -> MapperState {
        MapperState {
            registers: vec![self.chr_select],
            ..MapperState::default()
        }
    }

    fn restore(&mut self, cartridge: &Cartridge, state: &MapperState) {
        self.reset(cartridge);
        if let Some(&select) = state.registers.first() {
            self.chr_select = select;
            self.apply_select(cartridge);
        }
    }
}
