// Mapper 6 (FFE F4) - Combined PRG and CHR switching in one register
//
// Memory Layout:
// - CPU $8000-$BFFF: 16KB switchable PRG-ROM bank
// - CPU $C000-$FFFF: 16KB fixed PRG-ROM bank (last bank)
// - PPU $0000-$1FFF: 8KB switchable CHR bank
//
// Register Interface:
// - Any write to $8000-$FFFF latches both selections:
//   Bits 2-5: PRG-ROM bank for $8000-$BFFF
//   Bits 0-1: CHR bank for $0000-$1FFF

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

/// Mapper 6 implementation (FFE F4)
///
/// One write moves both the PRG and the CHR window. The upper PRG window
/// stays pinned to the last bank like UxROM.
pub struct Mapper6 {
    /// PRG windows: [switchable, fixed-last]
    prg_windows: [BankWindow; 2],
    /// Switchable CHR window covering $0000-$1FFF
    chr_window: BankWindow,
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
    /// Last value latched into the register
    select: u8,
}

impl Mapper6 {
    /// Create a cleared mapper
    pub fn new() -> Self {
        Mapper6 {
            prg_windows: [BankWindow::default(); 2],
            chr_window: BankWindow::default(),
            chr_writable: false,
            select: 0,
        }
    }

    fn apply_select(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        self.prg_windows[0] = BankWindow::from_slot(
            ((self.select >> 2) & 0x0F) as usize,
            PRG_WINDOW_SIZE,
            PRG_WINDOW_SIZE,
            prg_count,
        );
        self.prg_windows[1] =
            BankWindow::from_slot(prg_count - 1, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.chr_window = BankWindow::from_slot(
            (self.select & 0x03) as usize,
            CHR_WINDOW_SIZE,
            CHR_WINDOW_SIZE,
            character_bank_count(cartridge),
        );
    }
}

impl Default for Mapper6 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper6 {
    fn clear(&mut self) {
        self.prg_windows = [BankWindow::default(); 2];
        self.chr_window = BankWindow::default();
        self.chr_writable = false;
        self.select = 0;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        self.select = 0;
        self.chr_writable = character_is_ram(cartridge);
        self.apply_select(cartridge);
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
                self.select = value;
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
            registers: vec![self.select],
            ..MapperState::default()
        }
    }

    fn restore(&mut self, cartridge: &Cartridge, state: &MapperState) {
        self.reset(cartridge);
        if let Some(&select) = state.registers.first() {
            self.select = select;
            self.apply_select(cartridge);
        }
    }
}
