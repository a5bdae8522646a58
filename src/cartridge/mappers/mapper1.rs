// Mapper 1 (MMC1) - Serial-loaded banking with mirroring control
//
// Memory Layout:
// - CPU $6000-$7FFF: 8KB PRG-RAM (optional, battery-backed)
// - CPU $8000-$BFFF: 16KB PRG-ROM bank (switchable or fixed depending on mode)
// - CPU $C000-$FFFF: 16KB PRG-ROM bank (switchable or fixed depending on mode)
// - PPU $0000-$0FFF: 4KB CHR bank 0 (switchable)
// - PPU $1000-$1FFF: 4KB CHR bank 1 (switchable)
//
// Register Interface:
// All writes to $8000-$FFFF feed a serial shift register:
// - Bit 7 set: Clear the shift register and force PRG mode 3
// - Bit 0: Data bit, shifted in LSB first
// - The 5th write commits the accumulated value to the register selected
//   by address bits 13-14
//
// Control Register ($8000-$9FFF):
//   Bits 0-1: Mirroring (0=one-screen lower, 1=one-screen upper,
//             2=vertical, 3=horizontal)
//   Bits 2-3: PRG bank mode (0/1=32KB, 2=fix first, 3=fix last)
//   Bit 4: CHR bank mode (0=8KB, 1=two 4KB)
//
// CHR Bank 0 ($A000-$BFFF), CHR Bank 1 ($C000-$DFFF):
//   Bits 0-4: 4KB CHR bank number (bank 1 ignored in 8KB mode)
//
// PRG Bank ($E000-$FFFF):
//   Bits 0-3: 16KB PRG bank number
//
// Games using Mapper 1:
// - The Legend of Zelda
// - Metroid
// - Mega Man 2

use super::{
    character_bank_count, character_is_ram, program_bank_count, BankWindow, Mapper, MapperError,
    MapperState,
};
use crate::bus::BusSignals;
use crate::cartridge::{Cartridge, Mirroring};

/// PRG window width (16KB)
const PRG_WINDOW_SIZE: usize = 0x4000;

/// CHR window width (4KB)
const CHR_WINDOW_SIZE: usize = 0x1000;

/// CHR bank width on the cartridge (8KB)
const CHR_BANK_SIZE: usize = 0x2000;

/// Control value after a reset write: PRG mode 3, fix last bank
const CONTROL_RESET_BITS: u8 = 0x0C;

/// The MMC1 serial load port
///
/// Five writes accumulate a 5-bit value LSB first; the fifth push returns
/// the completed value and leaves the register cleared.
#[derive(Debug, Clone, Copy, Default)]
struct ShiftRegister {
    value: u8,
    count: u8,
}

impl ShiftRegister {
    /// Shift one data bit in; returns the full value on the fifth push
    fn push(&mut self, bit: u8) -> Option<u8> {
        self.value = (self.value >> 1) | ((bit & 1) << 4);
        self.count += 1;
        if self.count == 5 {
            let value = self.value;
            *self = ShiftRegister::default();
            Some(value)
        } else {
            None
        }
    }

    fn clear(&mut self) {
        *self = ShiftRegister::default();
    }
}

/// Mapper 1 implementation (MMC1)
///
/// Bank selection is recomputed from the four latched registers whenever
/// one of them commits, so the window table always reflects the current
/// register file.
pub struct Mapper1 {
    /// Serial load port shared by all four registers
    shift: ShiftRegister,
    /// Control register: mirroring and banking modes
    control: u8,
    /// CHR bank 0 register
    chr_bank_0: u8,
    /// CHR bank 1 register
    chr_bank_1: u8,
    /// PRG bank register
    prg_bank: u8,
    /// PRG windows: low half and high half of $8000-$FFFF
    prg_windows: [BankWindow; 2],
    /// CHR windows: $0000-$0FFF and $1000-$1FFF
    chr_windows: [BankWindow; 2],
    /// Whether CHR writes go through (CHR-RAM board)
    chr_writable: bool,
}

impl Mapper1 {
    /// Create a cleared MMC1 mapper
    pub fn new() -> Self {
        Mapper1 {
            shift: ShiftRegister::default(),
            control: CONTROL_RESET_BITS,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            prg_windows: [BankWindow::default(); 2],
            chr_windows: [BankWindow::default(); 2],
            chr_writable: false,
        }
    }

    fn mirroring_mode(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    /// Rebuild both window tables from the latched registers
    fn apply_registers(&mut self, cartridge: &Cartridge) {
        let prg_count = program_bank_count(cartridge);
        let prg = (self.prg_bank & 0x0F) as usize;
        match (self.control >> 2) & 0x03 {
            0 | 1 => {
                // 32KB mode: low bit of the bank number is ignored
                let base = prg & !1;
                self.prg_windows[0] =
                    BankWindow::from_slot(base, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
                self.prg_windows[1] =
                    BankWindow::from_slot(base + 1, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
            }
            2 => {
                self.prg_windows[0] =
                    BankWindow::from_slot(0, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
                self.prg_windows[1] =
                    BankWindow::from_slot(prg, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
            }
            _ => {
                self.prg_windows[0] =
                    BankWindow::from_slot(prg, PRG_WINDOW_SIZE, PRG_WINDOW_SIZE, prg_count);
                self.prg_windows[1] = BankWindow::from_slot(
                    prg_count - 1,
                    PRG_WINDOW_SIZE,
                    PRG_WINDOW_SIZE,
                    prg_count,
                );
            }
        }

        let chr_count = character_bank_count(cartridge);
        if self.control & 0x10 == 0 {
            // 8KB mode: one bank covers both windows, low bit ignored
            let base = (self.chr_bank_0 & !1) as usize;
            self.chr_windows[0] =
                BankWindow::from_slot(base, CHR_WINDOW_SIZE, CHR_BANK_SIZE, chr_count);
            self.chr_windows[1] =
                BankWindow::from_slot(base + 1, CHR_WINDOW_SIZE, CHR_BANK_SIZE, chr_count);
        } else {
            self.chr_windows[0] = BankWindow::from_slot(
                self.chr_bank_0 as usize,
                CHR_WINDOW_SIZE,
                CHR_BANK_SIZE,
                chr_count,
            );
            self.chr_windows[1] = BankWindow::from_slot(
                self.chr_bank_1 as usize,
                CHR_WINDOW_SIZE,
                CHR_BANK_SIZE,
                chr_count,
            );
        }
    }

    /// Commit a completed shift value to the register picked by the address
    fn commit(&mut self, bus: &mut dyn BusSignals, cartridge: &Cartridge, address: u16, value: u8) {
        match (address >> 13) & 0x03 {
            0 => {
                self.control = value;
                bus.ppu_set_mirroring(self.mirroring_mode());
            }
            1 => self.chr_bank_0 = value,
            2 => self.chr_bank_1 = value,
            _ => self.prg_bank = value,
        }
        self.apply_registers(cartridge);
    }
}

impl Default for Mapper1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for Mapper1 {
    fn clear(&mut self) {
        self.shift.clear();
        self.control = CONTROL_RESET_BITS;
        self.chr_bank_0 = 0;
        self.chr_bank_1 = 0;
        self.prg_bank = 0;
        self.prg_windows = [BankWindow::default(); 2];
        self.chr_windows = [BankWindow::default(); 2];
        self.chr_writable = false;
    }

    fn reset(&mut self, cartridge: &Cartridge) {
        self.shift.clear();
        self.control = CONTROL_RESET_BITS;
        self.chr_bank_0 = 0;
        self.chr_bank_1 = 0;
        self.prg_bank = 0;
        self.chr_writable = character_is_ram(cartridge);
        self.apply_registers(cartridge);
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
            0x8000..=0xFFFF => {
                if value & 0x80 != 0 {
                    self.shift.clear();
                    self.control |= CONTROL_RESET_BITS;
                    self.apply_registers(cartridge);
                } else if let Some(loaded) = self.shift.push(value) {
                    self.commit(bus, cartridge, address, loaded);
                }
                Ok(())
            }
            _ => Err(MapperError::UnsupportedAddress(address)),
        }
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
        MapperState {
            registers: vec![
                self.control,
                self.chr_bank_0,
                self.chr_bank_1,
                self.prg_bank,
                self.shift.value,
                self.shift.count,
            ],
            ..MapperState::default()
        }
    }

    fn restore(&mut self, cartridge: &Cartridge, state: &MapperState) {
        self.reset(cartridge);
        if let [control, chr0, chr1, prg, shift_value, shift_count] = state.registers[..] {
            self.control = control;
            self.chr_bank_0 = chr0;
            self.chr_bank_1 = chr1;
            self.prg_bank = prg;
            self.shift = ShiftRegister {
                value: shift_value,
                count: shift_count,
            };
            self.apply_registers(cartridge);
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

    /// Serially load a 5-bit value into the register at `address`
    fn load_register(
        mapper: &mut Mapper1,
        signals: &mut SignalLines,
        cartridge: &mut Cartridge,
        address: u16,
        value: u8,
    ) {
        for i in 0..5 {
            mapper
                .write_rom_program(signals, cartridge, address, (value >> i) & 1)
                .unwrap();
        }
    }

    #[test]
    fn test_shift_register_loads_lsb_first() {
        let mut shift = ShiftRegister::default();
        assert_eq!(shift.push(1), None);
        assert_eq!(shift.push(0), None);
        assert_eq!(shift.push(1), None);
        assert_eq!(shift.push(0), None);
        assert_eq!(shift.push(1), Some(0b10101));

        // The fifth push leaves the register empty
        assert_eq!(shift.push(0), None);
    }

    #[test]
    fn test_reset_fixes_last_bank() {
        let cartridge = create_test_cartridge(8, 0);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 0);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 7);
    }

    #[test]
    fn test_prg_bank_load() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        load_register(&mut mapper, &mut signals, &mut cartridge, 0xE000, 5);
        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 5);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 7);
    }

    #[test]
    fn test_prg_mode_fix_first() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        // Control: mirroring 0, PRG mode 2, CHR mode 0
        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x08);
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xE000, 5);

        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 0);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 5);
    }

    #[test]
    fn test_prg_mode_32k() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        // Control: PRG mode 0 (32KB switching)
        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x00);
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xE000, 5);

        // Low bit ignored: bank 5 selects the 4/5 pair
        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 4);
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 5);
    }

    #[test]
    fn test_reset_bit_clears_shift_and_fixes_last() {
        let mut cartridge = create_test_cartridge(8, 0);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        // Switch to 32KB mode, then partially load the PRG register
        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x00);
        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0xE000, 1)
            .unwrap();
        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0xE000, 1)
            .unwrap();

        // Reset write discards the partial load and restores PRG mode 3
        mapper
            .write_rom_program(&mut signals, &mut cartridge, 0xE000, 0x80)
            .unwrap();
        assert_eq!(mapper.read_rom_program(&cartridge, 0xC000).unwrap(), 7);

        // Next full load starts from scratch
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xE000, 2);
        assert_eq!(mapper.read_rom_program(&cartridge, 0x8000).unwrap(), 2);
    }

    #[test]
    fn test_chr_4k_mode() {
        let mut cartridge = create_test_cartridge(1, 2);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        // Control: CHR mode 1 (two 4KB windows)
        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x10);
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xA000, 3);
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xC000, 0);

        // 4KB slot 3 is the upper half of 8KB bank 1
        assert_eq!(mapper.rom_character(0x0000).unwrap(), (1, 0x1000));
        assert_eq!(mapper.read_rom_character(&cartridge, 0x0000).unwrap(), 0x81);
        assert_eq!(mapper.read_rom_character(&cartridge, 0x1000).unwrap(), 0x80);
    }

    #[test]
    fn test_chr_8k_mode_ignores_low_bit() {
        let mut cartridge = create_test_cartridge(1, 2);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        // CHR mode 0: slot 3 rounds down to the 2/3 pair (8KB bank 1)
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xA000, 3);
        assert_eq!(mapper.read_rom_character(&cartridge, 0x0000).unwrap(), 0x81);
        assert_eq!(mapper.read_rom_character(&cartridge, 0x1000).unwrap(), 0x81);
    }

    #[test]
    fn test_mirroring_control() {
        let mut cartridge = create_test_cartridge(2, 1);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x02 | 0x0C);
        assert_eq!(mapper.mirroring(&cartridge), Mirroring::Vertical);
        assert_eq!(signals.mirroring(), Mirroring::Vertical);

        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x01 | 0x0C);
        assert_eq!(mapper.mirroring(&cartridge), Mirroring::OneScreenUpper);
        assert_eq!(signals.mirroring(), Mirroring::OneScreenUpper);
    }

    #[test]
    fn test_state_round_trip() {
        let mut cartridge = create_test_cartridge(8, 2);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        load_register(&mut mapper, &mut signals, &mut cartridge, 0x8000, 0x1E);
        load_register(&mut mapper, &mut signals, &mut cartridge, 0xE000, 5);
        let state = mapper.state();

        let mut restored = Mapper1::new();
        restored.restore(&cartridge, &state);
        assert_eq!(restored.read_rom_program(&cartridge, 0x8000).unwrap(), 5);
        assert_eq!(restored.mirroring(&cartridge), Mirroring::Vertical);
    }

    #[test]
    fn test_unsupported_addresses() {
        let mut cartridge = create_test_cartridge(2, 1);
        let mut signals = SignalLines::new(Mirroring::Horizontal);
        let mut mapper = Mapper1::new();
        mapper.reset(&cartridge);

        assert!(matches!(
            mapper.write_rom_program(&mut signals, &mut cartridge, 0x5000, 0),
            Err(MapperError::UnsupportedAddress(0x5000))
        ));
        assert!(matches!(
            mapper.read_rom_character(&cartridge, 0x2000),
            Err(MapperError::UnsupportedAddress(0x2000))
        ));
    }
}
