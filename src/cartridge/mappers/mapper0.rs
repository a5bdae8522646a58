// Mapper 0 (NROM) - No bank switching
//
// Memory Layout:
// - CPU $8000-$BFFF: First 16KB PRG-ROM bank
// - CPU $C000-$FFFF: Last 16KB PRG-ROM bank (mirror of first if only one bank)
// - PPU $0000-$1FFF: 8KB CHR-ROM or CHR-RAM
//
// Features:
// - No bank switching
// - 16KB or 32KB PRG-ROM
// - 8KB CHR-ROM, or CHR-RAM when the cartridge carries none
// - No writable registers

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

/// Mapper 0 implementation (NROM)
///
/// The simplest board: both PRG windows and the CHR window are fixed at
/// reset and never change. Used by games like Super Mario Bros., Donkey
/// Kong, and Balloon Fight.
pub struct Mapper0 {
    /// Fixed PRG windows: low half and high half of $8000-$FFFF
    prg_windows: [BankWindow; 2],
    /// Fixed CHR window covering $0000-$1FFF
    chr_window: BankWindow,
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
}

impl Mapper0 {
    /// Create a cleared NROM mapper
    pub fn new() -> Self {
        Mapper0 {
            prg_windows: [BankWindow::default(); 2],
            chr_window: BankWindow::default(),
            chr_writable: false,
        }
    }
}

impl Default for Mapper0 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper0 {
    fn clear(&mut self) {
        self.prg_windows = [BankWindow::default(); 2];
        self.chr_window = BankWindow::default();
        self.chr_writable = false;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        self.prg_windows[0] = BankWindow::from_slot(0, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.prg_windows[1] =
            BankWindow::from_slot(prg_count - 1, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.chr_window = BankWindow::from_slot(
            0,
            CHR_WINDOW_SIZE,
            CHR_WINDOW_SIZE,
            character_bank_count(cartridge),
        );
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
        _cartridge: &mut Cartridge,
        address: u16,
        _value: u8,
    ) -> Result<(), MapperError> {
        // No registers; writes into the ROM window are ignored
        match address {
            0x8000..=0xFFFF => Ok(()),
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
        MapperState::default()
    }

    fn restore(&mut self, cartridge: &Cartridge, _state: &MapperState) {
        self.reset(cartridge);
    }
}
