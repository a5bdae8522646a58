// NES Core - Main Entry Point
//
// Headless driver: loads a ROM, runs the frame loop for a number of
// frames, and writes a screenshot of the last presented frame.

use nes_core::emulator::{Emulator, EmulatorConfig};
use std::env;
use std::process;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("NES Core (nes-core) v0.1.0");
    println!("==========================");
    println!();

    let rom_path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: nes-core <rom.nes> [frames]");
            process::exit(1);
        }
    };

    let frames: u64 = match env::args().nth(2) {
        Some(arg) => arg.parse()?,
        None => 60,
    };

    // Load or create emulator configuration
    let config = EmulatorConfig::load_or_default();
    println!("Configuration loaded (scale {}x, {} FPS)", config.video.scale, config.video.fps);
    println!();

    let mut session = Emulator::new(config);
    session.load_rom(&rom_path)?;
    println!(
        "Loaded '{}' (mapper {}, {} PRG banks, {} CHR banks)",
        rom_path,
        session.cartridge().mapper(),
        session.cartridge().rom_program_banks(),
        session.cartridge().rom_character_banks()
    );

    for _ in 0..frames {
        session.run_frame()?;
        // No CPU is attached; drain the interrupt lines each frame
        let (_nmi, _irq) = session.take_interrupts();
    }
    println!("Ran {} frames", frames);

    let screenshot_path = session.screenshot()?;
    println!("Screenshot saved to '{}'", screenshot_path.display());

    Ok(())
}
