// NES Core Library
// Dot-accurate PPU, cartridge, and mapper core for NES emulation

// Public modules
pub mod bus;
pub mod cartridge;
pub mod debug;
pub mod display;
pub mod emulator;
pub mod memory;
pub mod ppu;

// Re-export main types for convenience
pub use bus::{Bus, BusSignals, SignalLines, SystemBus};
pub use cartridge::{
    create_mapper, Cartridge, CartridgeError, Mapper, MapperError, MapperState, Mirroring,
    TvSystem,
};
pub use debug::{LogLevel, Logger, TraceEntry};
pub use display::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use emulator::{Emulator, EmulatorConfig, EmulatorError, SaveState, SaveStateError};
pub use memory::Memory;
pub use ppu::{Ppu, PpuError, PpuState};
