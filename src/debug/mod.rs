// Debug module - Diagnostics for the emulation core
//
// This module provides the leveled logger used by the session layer for
// cartridge load, mapper selection, and interrupt events, plus optional
// PPU port tracing.
//
// All debugging features are optional and designed to have minimal
// performance impact when disabled.

pub mod logger;

pub use logger::{LogLevel, Logger, TraceEntry};
