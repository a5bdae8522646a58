// Save state functionality
//
// Implements serialization and deserialization of the complete core state
// to enable save states and quick save/load functionality.

use crate::cartridge::{CartridgeError, MapperState};
use crate::ppu::PpuState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during save state operations
#[derive(Debug)]
pub enum SaveStateError {
    /// I/O error
    Io(io::Error),

    /// Serialization/deserialization error
    Serialization(serde_json::Error),

    /// Save state version mismatch
    VersionMismatch { expected: u32, found: u32 },

    /// Save state was taken with a different mapper chip
    MapperMismatch { expected: u8, found: u8 },

    /// Cartridge bank access failed
    Cartridge(CartridgeError),

    /// No ROM loaded
    NoRomLoaded,
}

impl std::fmt::Display for SaveStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStateError::Io(e) => write!(f, "I/O error: {}", e),
            SaveStateError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SaveStateError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveStateError::MapperMismatch { expected, found } => {
                write!(
                    f,
                    "Mapper mismatch: cartridge uses mapper {}, state was taken on mapper {}",
                    expected, found
                )
            }
            SaveStateError::Cartridge(e) => write!(f, "{}", e),
            SaveStateError::NoRomLoaded => write!(f, "No ROM loaded"),
        }
    }
}

impl std::error::Error for SaveStateError {}

impl From<io::Error> for SaveStateError {
    fn from(e: io::Error) -> Self {
        SaveStateError::Io(e)
    }
}

impl From<serde_json::Error> for SaveStateError {
    fn from(e: serde_json::Error) -> Self {
        SaveStateError::Serialization(e)
    }
}

impl From<CartridgeError> for SaveStateError {
    fn from(e: CartridgeError) -> Self {
        SaveStateError::Cartridge(e)
    }
}

/// Current save state format version
const SAVE_STATE_VERSION: u32 = 1;

/// Complete core save state
///
/// Contains all the state needed to restore the core to an exact dot.
/// ROM banks are not captured; the state only applies on top of the same
/// loaded cartridge.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveState {
    /// Version number for compatibility checking
    version: u32,

    /// Timestamp when the save state was created
    timestamp: String,

    /// ROM identifier (file name for validation)
    rom_name: Option<String>,

    /// Mapper number the state was taken on
    mapper_id: u8,

    /// Mapper register file
    mapper_state: MapperState,

    /// PPU registers, counters, and backing memories
    ppu_state: PpuState,

    /// Internal 2KB work RAM contents
    console_ram: Vec<u8>,

    /// Cartridge RAM bank contents
    ram_banks: Vec<Vec<u8>>,

    /// Writable CHR bank contents
    chr_ram: Vec<u8>,
}

impl SaveState {
    /// Create a save state from the current session state
    ///
    /// # Arguments
    ///
    /// * `session` - Reference to the emulator session
    ///
    /// # Returns
    ///
    /// Result containing the save state or an error
    pub fn from_session(session: &super::Emulator) -> Result<Self, SaveStateError> {
        if !session.loaded() {
            return Err(SaveStateError::NoRomLoaded);
        }

        let rom_name = session
            .rom_path()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|s| s.to_string());

        let timestamp = chrono::Local::now().to_rfc3339();

        let cartridge = session.cartridge();
        let mut ram_banks = Vec::with_capacity(cartridge.ram_banks());
        for bank in 0..cartridge.ram_banks() {
            ram_banks.push(cartridge.ram(bank)?.raw().to_vec());
        }

        // The writable CHR bank sits after the ROM banks
        let chr_bank = cartridge.rom_character_banks().saturating_sub(1);
        let chr_ram = cartridge.rom_character(chr_bank)?.raw().to_vec();

        Ok(SaveState {
            version: SAVE_STATE_VERSION,
            timestamp,
            rom_name,
            mapper_id: cartridge.mapper(),
            mapper_state: session.mapper_state(),
            ppu_state: session.ppu().state(),
            console_ram: session.ram_contents().to_vec(),
            ram_banks,
            chr_ram,
        })
    }

    /// Restore session state from this save state
    ///
    /// The cartridge currently loaded must use the same mapper the state was
    /// taken on. Memory blocks whose sizes do not match the loaded cartridge
    /// are left untouched.
    ///
    /// # Arguments
    ///
    /// * `session` - Mutable reference to the emulator session
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn restore_to_session(&self, session: &mut super::Emulator) -> Result<(), SaveStateError> {
        if self.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                found: self.version,
            });
        }

        if !session.loaded() {
            return Err(SaveStateError::NoRomLoaded);
        }

        let found = session.cartridge().mapper();
        if found != self.mapper_id {
            return Err(SaveStateError::MapperMismatch {
                expected: found,
                found: self.mapper_id,
            });
        }

        session.restore_parts(
            &self.ppu_state,
            &self.mapper_state,
            &self.console_ram,
            &self.ram_banks,
            &self.chr_ram,
        );

        Ok(())
    }

    /// Save this save state to a file
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    /// * `save_directory` - Base save directory from the configuration
    /// * `rom_path` - Optional path to the currently loaded ROM (for naming)
    ///
    /// # Returns
    ///
    /// Result indicating success or error
    pub fn save_to_file(
        &self,
        slot: u8,
        save_directory: &Path,
        rom_path: Option<&Path>,
    ) -> Result<(), SaveStateError> {
        let save_dir = Self::slot_directory(save_directory, rom_path);
        fs::create_dir_all(&save_dir)?;

        let file_path = save_dir.join(format!("slot_{}.state", slot));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(file_path, json)?;

        Ok(())
    }

    /// Load a save state from a file
    ///
    /// # Arguments
    ///
    /// * `slot` - Save slot number (0-9)
    /// * `save_directory` - Base save directory from the configuration
    /// * `rom_path` - Optional path to the currently loaded ROM (for naming)
    ///
    /// # Returns
    ///
    /// Result containing the save state or an error
    pub fn load_from_file(
        slot: u8,
        save_directory: &Path,
        rom_path: Option<&Path>,
    ) -> Result<Self, SaveStateError> {
        let save_dir = Self::slot_directory(save_directory, rom_path);
        let file_path = save_dir.join(format!("slot_{}.state", slot));

        let json = fs::read_to_string(file_path)?;
        let save_state: SaveState = serde_json::from_str(&json)?;

        Ok(save_state)
    }

    /// Get the per-ROM slot directory
    ///
    /// Creates a directory structure like: <save_directory>/<rom_name>/
    fn slot_directory(save_directory: &Path, rom_path: Option<&Path>) -> PathBuf {
        if let Some(rom_path) = rom_path {
            if let Some(rom_name) = rom_path.file_stem() {
                return save_directory.join(rom_name);
            }
        }

        save_directory.join("default")
    }
}
