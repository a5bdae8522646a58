// Emulator module - Session coordinator
//
// This module provides the session object that owns the core components
// (cartridge, mapper, PPU, signal lines, framebuffer) and implements
// quality-of-life features like save states, screenshots, and
// configuration management.
//
// The session has no CPU of its own. An external driver calls `cpu_read` /
// `cpu_write` for the CPU-visible address map, `tick` (or `run_frame`) to
// advance the picture clock, and `take_interrupts` to drain the latched
// interrupt lines.

mod config;
mod save_state;
mod screenshot;

pub use config::{EmulatorConfig, LogConfig, SaveStateConfig, ScreenshotConfig, VideoConfig};
pub use save_state::{SaveState, SaveStateError};
pub use screenshot::{save_screenshot, ScreenshotError};

use crate::bus::{SignalLines, SystemBus};
use crate::cartridge::mappers::Mapper0;
use crate::cartridge::{
    create_mapper, Cartridge, CartridgeError, Mapper, MapperError, MapperState, Mirroring,
};
use crate::debug::{LogLevel, Logger};
use crate::display::FrameBuffer;
use crate::memory::Memory;
use crate::ppu::{Ppu, PpuError, PpuState};
use std::io;
use std::path::{Path, PathBuf};

/// Size of the console's internal work RAM
const RAM_SIZE: usize = 0x0800;

/// Top-level error for session operations
#[derive(Debug)]
pub enum EmulatorError {
    /// ROM image loading or bank access failed
    Cartridge(CartridgeError),

    /// Mapper selection or address translation failed
    Mapper(MapperError),

    /// PPU port access failed
    Ppu(PpuError),

    /// I/O error from configuration persistence
    Io(io::Error),
}

impl std::fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmulatorError::Cartridge(e) => write!(f, "{}", e),
            EmulatorError::Mapper(e) => write!(f, "{}", e),
            EmulatorError::Ppu(e) => write!(f, "{}", e),
            EmulatorError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EmulatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmulatorError::Cartridge(e) => Some(e),
            EmulatorError::Mapper(e) => Some(e),
            EmulatorError::Ppu(e) => Some(e),
            EmulatorError::Io(e) => Some(e),
        }
    }
}

impl From<CartridgeError> for EmulatorError {
    fn from(e: CartridgeError) -> Self {
        EmulatorError::Cartridge(e)
    }
}

impl From<MapperError> for EmulatorError {
    fn from(e: MapperError) -> Self {
        EmulatorError::Mapper(e)
    }
}

impl From<PpuError> for EmulatorError {
    fn from(e: PpuError) -> Self {
        EmulatorError::Ppu(e)
    }
}

impl From<io::Error> for EmulatorError {
    fn from(e: io::Error) -> Self {
        EmulatorError::Io(e)
    }
}

/// Emulation session
///
/// Owns the loaded cartridge, the selected mapper chip, the PPU, the
/// interrupt/mirroring signal lines, and the output framebuffer, and wires
/// them together through a fresh `SystemBus` on every access.
pub struct Emulator {
    /// Loaded ROM image and bank storage
    cartridge: Cartridge,

    /// Bank-switching chip selected from the cartridge header
    mapper: Box<dyn Mapper>,

    /// Picture processor
    ppu: Ppu,

    /// Latched interrupt lines and live mirroring mode
    signals: SignalLines,

    /// Composed frame output
    display: FrameBuffer,

    /// 2KB internal work RAM, mirrored through $1FFF
    ram: Memory,

    /// Configuration
    config: EmulatorConfig,

    /// Session logger
    logger: Logger,

    /// Currently loaded ROM path
    rom_path: Option<PathBuf>,
}

impl Emulator {
    /// Create a session with no ROM loaded
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration
    ///
    /// # Example
    ///
    /// ```
    /// use nes_core::emulator::{Emulator, EmulatorConfig};
    ///
    /// let mut session = Emulator::new(EmulatorConfig::default());
    /// assert!(!session.loaded());
    /// ```
    pub fn new(config: EmulatorConfig) -> Self {
        let mut logger = Logger::new();
        logger.set_log_level(config.log.level);
        logger.set_max_buffer_size(config.log.trace_buffer_size);
        if let Some(ref path) = config.log.output_file {
            let _ = logger.open_log_file(path);
        }

        Emulator {
            cartridge: Cartridge::new(),
            mapper: Box::new(Mapper0::new()),
            ppu: Ppu::new(),
            signals: SignalLines::new(Mirroring::Horizontal),
            display: FrameBuffer::new(),
            ram: Memory::new(RAM_SIZE),
            config,
            logger,
            rom_path: None,
        }
    }

    /// Load a ROM file
    ///
    /// Parses the image, selects the mapper named in its header, and resets
    /// every component to power-on state.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ROM file (.nes)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nes_core::emulator::{Emulator, EmulatorConfig};
    ///
    /// let mut session = Emulator::new(EmulatorConfig::default());
    /// session.load_rom("game.nes")?;
    /// # Ok::<(), nes_core::emulator::EmulatorError>(())
    /// ```
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EmulatorError> {
        let path = path.as_ref();
        self.cartridge.load(path)?;
        self.rom_path = Some(path.to_path_buf());
        self.attach()?;

        self.logger.log_message(
            LogLevel::Info,
            format!("Loaded ROM {}", path.display()),
        );
        Ok(())
    }

    /// Load a ROM image from memory
    ///
    /// # Arguments
    ///
    /// * `bytes` - Complete iNES image, header included
    pub fn load_rom_bytes(&mut self, bytes: &[u8]) -> Result<(), EmulatorError> {
        self.cartridge.load_from_bytes(bytes)?;
        self.rom_path = None;
        self.attach()?;
        Ok(())
    }

    /// Select the mapper for the loaded cartridge and reset all components
    fn attach(&mut self) -> Result<(), EmulatorError> {
        self.mapper = create_mapper(self.cartridge.mapper())?;
        self.reset();

        self.logger.log_message(
            LogLevel::Info,
            format!(
                "Mapper {}: {} PRG banks, {} CHR banks, {:?} mirroring",
                self.cartridge.mapper(),
                self.cartridge.rom_program_banks(),
                self.cartridge.rom_character_banks(),
                self.cartridge.mirroring()
            ),
        );
        Ok(())
    }

    /// Reset all components, as if pressing the reset button
    ///
    /// ROM and cartridge RAM contents survive; registers, counters, work
    /// RAM, and the framebuffer do not.
    pub fn reset(&mut self) {
        self.mapper.reset(&self.cartridge);
        self.signals
            .reset(self.mapper.mirroring(&self.cartridge));
        self.ppu.reset();
        self.ram.clear();
        self.display.clear();
        self.logger
            .log_message(LogLevel::Debug, "Reset".to_string());
    }

    /// Whether a ROM image is currently loaded
    pub fn loaded(&self) -> bool {
        self.cartridge.loaded()
    }

    /// Advance the PPU by one dot
    pub fn tick(&mut self) -> Result<(), EmulatorError> {
        let mut bus = SystemBus::new(
            self.mapper.as_mut(),
            &mut self.cartridge,
            &mut self.signals,
            &mut self.display,
        );
        self.ppu.update(&mut bus)?;
        Ok(())
    }

    /// Run until the next frame has been presented
    pub fn run_frame(&mut self) -> Result<(), EmulatorError> {
        let presented = self.display.frames();
        while self.display.frames() == presented {
            self.tick()?;
        }
        Ok(())
    }

    /// Drain the latched interrupt lines
    ///
    /// # Returns
    ///
    /// `(nmi, irq)`; reading clears both latches
    pub fn take_interrupts(&mut self) -> (bool, bool) {
        (
            self.signals.take_interrupt_non_maskable(),
            self.signals.take_interrupt_maskable(),
        )
    }

    /// Read a byte from the CPU-visible address map
    ///
    /// ```text
    /// $0000-$1FFF  2KB work RAM, mirrored every $0800
    /// $2000-$3FFF  PPU ports, mirrored every 8
    /// $4000-$401F  APU/input space, not modeled; reads as 0
    /// $4020-$5FFF  expansion space; reads as 0, register decoding is
    ///              write-side
    /// $6000-$7FFF  cartridge work RAM through the mapper
    /// $8000-$FFFF  PRG-ROM through the mapper
    /// ```
    pub fn cpu_read(&mut self, address: u16) -> Result<u8, EmulatorError> {
        match address {
            0x0000..=0x1FFF => Ok(self.ram.read(address)),
            0x2000..=0x3FFF => {
                let mut bus = SystemBus::new(
                    self.mapper.as_mut(),
                    &mut self.cartridge,
                    &mut self.signals,
                    &mut self.display,
                );
                let value = self.ppu.read_port(&mut bus, address)?;
                self.logger.log_port(address, value, false);
                Ok(value)
            }
            0x4000..=0x5FFF => Ok(0),
            0x6000..=0x7FFF => Ok(self.mapper.read_ram(&self.cartridge, address)?),
            0x8000..=0xFFFF => Ok(self.mapper.read_rom_program(&self.cartridge, address)?),
        }
    }

    /// Write a byte into the CPU-visible address map
    ///
    /// `$4014` triggers sprite DMA: one 256-byte page is copied from the
    /// written page number into OAM through the PPU's DMA path.
    pub fn cpu_write(&mut self, address: u16, value: u8) -> Result<(), EmulatorError> {
        match address {
            0x0000..=0x1FFF => {
                self.ram.write(address, value);
                Ok(())
            }
            0x2000..=0x3FFF => {
                let mut bus = SystemBus::new(
                    self.mapper.as_mut(),
                    &mut self.cartridge,
                    &mut self.signals,
                    &mut self.display,
                );
                self.ppu.write_port(&mut bus, address, value)?;
                self.logger.log_port(address, value, true);
                Ok(())
            }
            0x4014 => self.sprite_dma(value),
            0x4000..=0x401F => Ok(()),
            0x4020..=0x5FFF | 0x8000..=0xFFFF => {
                self.mapper.write_rom_program(
                    &mut self.signals,
                    &mut self.cartridge,
                    address,
                    value,
                )?;
                Ok(())
            }
            0x6000..=0x7FFF => {
                self.mapper.write_ram(&mut self.cartridge, address, value)?;
                Ok(())
            }
        }
    }

    /// Copy one CPU page into OAM
    fn sprite_dma(&mut self, page: u8) -> Result<(), EmulatorError> {
        let base = (page as u16) << 8;
        let mut buffer = [0u8; 256];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.cpu_read(base.wrapping_add(i as u16))?;
        }
        self.ppu.oam_dma(&buffer);
        Ok(())
    }

    /// Save state to a file slot
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    pub fn save_state(&self, slot: u8) -> Result<(), SaveStateError> {
        let save_state = SaveState::from_session(self)?;
        save_state.save_to_file(
            slot,
            &self.config.save_state.save_directory,
            self.rom_path.as_deref(),
        )
    }

    /// Load state from a file slot
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    pub fn load_state(&mut self, slot: u8) -> Result<(), SaveStateError> {
        let save_state = SaveState::load_from_file(
            slot,
            &self.config.save_state.save_directory,
            self.rom_path.as_deref(),
        )?;
        save_state.restore_to_session(self)
    }

    /// Take a screenshot of the last presented frame
    ///
    /// # Returns
    ///
    /// Result containing the path to the saved screenshot or an error
    pub fn screenshot(&self) -> Result<PathBuf, ScreenshotError> {
        screenshot::save_screenshot(
            &self.display,
            &self.config.screenshot.screenshot_directory,
            self.config.screenshot.include_timestamp,
            self.rom_path.as_deref(),
        )
    }

    /// Persist the current configuration
    pub fn save_config(&self) -> Result<(), EmulatorError> {
        self.config.save()?;
        Ok(())
    }

    /// Get reference to the loaded cartridge
    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    /// Get reference to the PPU
    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    /// Get reference to the output framebuffer
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.display
    }

    /// Get reference to configuration
    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Get mutable reference to configuration
    pub fn config_mut(&mut self) -> &mut EmulatorConfig {
        &mut self.config
    }

    /// Get reference to the session logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Get mutable reference to the session logger
    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    /// Get the currently loaded ROM path
    pub fn rom_path(&self) -> Option<&Path> {
        self.rom_path.as_deref()
    }

    /// Snapshot the mapper register file
    fn mapper_state(&self) -> MapperState {
        self.mapper.state()
    }

    /// Borrow the internal work RAM contents
    fn ram_contents(&self) -> &[u8] {
        self.ram.raw()
    }

    /// Apply the memory and register portions of a save state
    ///
    /// Blocks whose sizes do not match the loaded cartridge are skipped.
    fn restore_parts(
        &mut self,
        ppu_state: &PpuState,
        mapper_state: &MapperState,
        console_ram: &[u8],
        ram_banks: &[Vec<u8>],
        chr_ram: &[u8],
    ) {
        self.ppu.restore(ppu_state);
        self.mapper.restore(&self.cartridge, mapper_state);

        if console_ram.len() == self.ram.size() {
            self.ram.raw_mut().copy_from_slice(console_ram);
        }

        for (index, bytes) in ram_banks.iter().enumerate() {
            if let Ok(bank) = self.cartridge.ram_mut(index) {
                if bytes.len() == bank.size() {
                    bank.raw_mut().copy_from_slice(bytes);
                }
            }
        }

        let chr_bank = self.cartridge.rom_character_banks().saturating_sub(1);
        if let Ok(bank) = self.cartridge.rom_character_mut(chr_bank) {
            if chr_ram.len() == bank.size() {
                bank.raw_mut().copy_from_slice(chr_ram);
            }
        }

        self.signals
            .reset(self.mapper.mirroring(&self.cartridge));
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}
