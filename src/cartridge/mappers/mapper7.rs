// Mapper 7 (AxROM) - 32KB PRG banking with one-screen mirroring
//
// Memory Layout:
// - CPU $8000-$FFFF: 32KB switchable PRG-ROM bank
// - PPU $0000-$1FFF: 8KB CHR-ROM or CHR-RAM (fixed)
//
// Register Interface:
// - $8000-$FFFF (write): Bank select and mirroring
//   Bits 0-2: Select 32KB PRG-ROM bank
//   Bit 4: One-screen mirroring (0 = lower nametable, 1 = upper nametable)
//
// Games using Mapper 7:
// - Battletoads
// - Wizards & Warriors
// - Marble Madness

use super::{
    character_bank_count, character_is_ram, program_bank_count, BankWindow, Mapper, MapperError,
    MapperState,
};
use crate::bus::BusSignals;
use crate::cartridge::{Cartridge, Mirroring};

/// PRG window width (16KB); a 32KB selection spans two windows
const PRG_WINDOW_SIZE: usize = 0x4000;

/// CHR window width (8KB)
const CHR_WINDOW_SIZE: usize = 0x2000;

/// Bank-select bits honored by the register
const PRG_SELECT_MASK: u8 = 0x07;

/// One-screen nametable select bit
const MIRRORING_BIT: u8 = 0x10;

/// Mapper 7 implementation (AxROM)
///
/// The whole $8000-$FFFF range switches as one 32KB unit, expressed here
/// as a pair of adjacent 16KB windows. The same register also picks which
/// single nametable the console mirrors.
pub struct Mapper7 {
    /// PRG windows: low half and high half of the selected 32KB bank
    prg_windows: [BankWindow; 2],
    /// Fixed CHR window covering $0000-$1FFF
    chr_window: BankWindow,
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
    /// Last value latched into the register
    select: u8,
    /// Mirroring derived from the latched register
    mirroring: Mirroring,
}

impl Mapper7 {
    /// Create a cleared AxROM mapper
    pub fn new() -> Self {
        Mapper7 {
            prg_windows: [BankWindow::default(); 2],
            chr_window: BankWindow::default(),
            chr_writable: false,
            select: 0,
            mirroring: Mirroring::OneScreenLower,
        }
    }

    fn apply_select(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        let base = ((self.select & PRG_SELECT_MASK) as usize) * 2;
        self.prg_windows[0] =
            BankWindow::from_slot(base, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.prg_windows[1] =
            BankWindow::from_slot(base + 1, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
        self.mirroring = if self.select & MIRRORING_BIT != 0 {
            Mirroring::OneScreenUpper
        } else {
            Mirroring::OneScreenLower
        };
    }
}

impl Default for Mapper7 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper7 {
    fn clear(&mut self) {
        self.prg_windows = [BankWindow::default(); 2];
        self.chr_window = BankWindow::default();
        self.chr_writable = false;
        self.select = 0;
        self.mirroring = Mirroring::OneScreenLower;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        self.select = 0;
        self.apply_select(cartridge);
        self.chr_window = BankWindow::from_slot(
            0,
            CHR_WINDOW_SIZE,
            CHR_WINDOW_SIZE,
            character_bank_count(cartridge),
        );
        self.chr_writable = character_is_ram(cartridge);
    }

    fn mirroring(&self, _cartridge: &Cartridge) -> Mirroring {
        self.mirroring
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
            0x8000..=0xFFFF => {
                self.select = value;
                self.apply_select(cartridge);
                bus.ppu_set_mirroring(self.mirroring);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SignalLines;

    /// Build a loaded cartridge; PRG banks are filled with their bank
    /// number, CHR banks with `0x80 | bank`
    fn create_test_cartridge(prg_banks: u8, chr_banks: u8) -> Cartridge {
        let mut bytes = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks];
        bytes.resize(16, 0);
        for bank in 0..prg_banks {
            bytes.extend(std::iter::repeat(bank).take(0x4000));
        }
        for bank in 0..chr_banks {
            bytes.extend(std::iter::repeat(0x80 | bank).take(0x2000));
        }
        let mut cartridge = Cartridge::new();
        cartridge.load_from_bytes(&bytes).unwrap();
        cartridge
    }

    #[test]
    fn test_reset_selects_first_32k() {
        let cartridge = create_test_cartridge(8, 0);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 0);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 1);
        assert_eq!(mapper.mirroring(&cartridge), Mirroring::OneScreenLower);
    }

    #[test]
    fn test_32k_bank_switch() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0x8000, 2)
            .unwrap();

        // Bank 2 spans 16KB banks 4 and 5
        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 4);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 5);
    }

    #[test]
    fn test_mirroring_select() {
        let mut cartridge = create_test_cartridge(4, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0x8000, 0x10)
            .unwrap();
        assert_eq!(mapper.mirroring(&cartridge), Mirroring::OneScreenUpper);
        assert_eq!(signals.mirroring(), Mirroring::OneScreenUpper);

        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0x8000, 0x00)
            .unwrap();
        assert_eq!(mapper.mirroring(&cartridge), Mirroring::OneScreenLower);
        assert_eq!(signals.mirroring(), Mirroring::OneScreenLower);
    }

    #[test]
    fn test_select_wraps_modulo_bank_count() {
        let mut cartridge = create_test_cartridge(4, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        // 4 x 16KB banks hold two 32KB units; selecting unit 3 wraps to unit 1
        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0x8000, 3)
            .unwrap();
        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 2);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 3);
    }

    #[test]
    fn test_chr_ram_write() {
        let mut cartridge = create_test_cartridge(2, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        mapper
            .write_rom_character(&mut signals, &mut cartridge, 0x1000, 0x42)
            .unwrap();
        assert_eq!(mapper.read_rom_character(&cartridge, 0x1000).unwrap(), 0x42);
    }

    #[test]
    fn test_state_round_trip() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0x8000, 0x12)
            .unwrap();
        let state = mapper.state();

        let mut restored = Mapper7::new();
        restored.restore(&cartridge, &state);
        assert_eq!(restored.read_rom_program(&cartridge, 0x8000).unwrap(), 4);
        assert_eq!(restored.mirroring(&cartridge), Mirroring::OneScreenUpper);
    }

    #[test]
    fn test_unsupported_addresses() {
        let mut cartridge = create_test_cartridge(2, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper7::new();
        mapper.reset(&cartridge);

        assert!(matches!(
            mapper.write_rom_program(&mut signals, &mut cartridge, 0x7FFF, 1),
            Err(MapperError::UnsupportedAddress(0x7FFF))
        ));
        assert!(matches!(
            mapper.read_rom_character(&cartridge, 0x2400),
            Err(MapperError::UnsupportedAddress(0x2400))
        ));
    }
}
