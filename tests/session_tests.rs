// Session integration tests
//
// These tests drive the emulator session end to end: mapper register
// writes through the CPU-visible map, the frame loop with mapper IRQs,
// and save-state/screenshot persistence to disk.

mod common;

use common::new_session;
use std::fs;
use std::path::PathBuf;

/// Per-test scratch directory under the system temp dir
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nes_core_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_uxrom_bank_switch_through_cpu_map() {
    let mut session = new_session(2, 8, 0);

    assert_eq!(session.cpu_read(0x8000).unwrap(), 0);
    assert_eq!(session.cpu_read(0xC000).unwrap(), 7);

    session.cpu_write(0x8000, 3).unwrap();
    assert_eq!(session.cpu_read(0x8000).unwrap(), 3);
    assert_eq!(session.cpu_read(0xC000).unwrap(), 7);
}

#[test]
fn test_mmc1_serial_load_through_cpu_map() {
    let mut session = new_session(1, 8, 0);

    // Load PRG bank 5 one bit at a time, LSB first
    for i in 0..5 {
        session.cpu_write(0xE000, (5 >> i) & 1).unwrap();
    }

    assert_eq!(session.cpu_read(0x8000).unwrap(), 5);
    assert_eq!(session.cpu_read(0xC000).unwrap(), 7);
}

#[test]
fn test_mmc3_scanline_irq_reaches_the_session() {
    let mut session = new_session(4, 8, 2);

    // Enable rendering so the scanline counter is clocked
    session.cpu_write(0x2001, 0x1E).unwrap();

    // Short IRQ period, reload, enable
    session.cpu_write(0xC000, 2).unwrap();
    session.cpu_write(0xC001, 0).unwrap();
    session.cpu_write(0xE001, 0).unwrap();

    session.run_frame().unwrap();
    let (_nmi, irq) = session.take_interrupts();
    assert!(irq, "scanline counter should raise an IRQ within one frame");
}

#[test]
fn test_mmc3_irq_disable_acknowledges() {
    let mut session = new_session(4, 8, 2);

    session.cpu_write(0x2001, 0x1E).unwrap();
    session.cpu_write(0xC000, 2).unwrap();
    session.cpu_write(0xC001, 0).unwrap();

    // Counter runs but interrupts are never enabled
    session.run_frame().unwrap();
    let (_nmi, irq) = session.take_interrupts();
    assert!(!irq);
}

#[test]
fn test_frame_counter_advances_per_run_frame() {
    let mut session = new_session(0, 1, 1);

    assert_eq!(session.frame_buffer().frames(), 0);
    session.run_frame().unwrap();
    assert_eq!(session.frame_buffer().frames(), 1);
    session.run_frame().unwrap();
    assert_eq!(session.frame_buffer().frames(), 2);
}

#[test]
fn test_nametable_write_read_through_cpu_map() {
    let mut session = new_session(0, 1, 1);

    session.cpu_write(0x2006, 0x24).unwrap();
    session.cpu_write(0x2006, 0x00).unwrap();
    session.cpu_write(0x2007, 0x5A).unwrap();

    session.cpu_write(0x2006, 0x24).unwrap();
    session.cpu_write(0x2006, 0x00).unwrap();
    let _stale = session.cpu_read(0x2007).unwrap();
    assert_eq!(session.cpu_read(0x2007).unwrap(), 0x5A);
}

#[test]
fn test_save_state_file_round_trip() {
    let dir = scratch_dir("saves");
    let mut session = new_session(0, 2, 1);
    session.config_mut().save_state.save_directory = dir.clone();

    session.cpu_write(0x0000, 0xAB).unwrap();
    session.cpu_write(0x6000, 0xCD).unwrap();
    session.save_state(3).unwrap();

    session.cpu_write(0x0000, 0x00).unwrap();
    session.cpu_write(0x6000, 0x00).unwrap();

    session.load_state(3).unwrap();
    assert_eq!(session.cpu_read(0x0000).unwrap(), 0xAB);
    assert_eq!(session.cpu_read(0x6000).unwrap(), 0xCD);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_save_state_restores_vram() {
    let dir = scratch_dir("vram_saves");
    let mut session = new_session(0, 1, 1);
    session.config_mut().save_state.save_directory = dir.clone();

    session.cpu_write(0x2006, 0x24).unwrap();
    session.cpu_write(0x2006, 0x10).unwrap();
    session.cpu_write(0x2007, 0x77).unwrap();
    session.save_state(0).unwrap();

    session.cpu_write(0x2006, 0x24).unwrap();
    session.cpu_write(0x2006, 0x10).unwrap();
    session.cpu_write(0x2007, 0x00).unwrap();

    session.load_state(0).unwrap();
    session.cpu_write(0x2006, 0x24).unwrap();
    session.cpu_write(0x2006, 0x10).unwrap();
    let _stale = session.cpu_read(0x2007).unwrap();
    assert_eq!(session.cpu_read(0x2007).unwrap(), 0x77);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_save_slot_errors() {
    let dir = scratch_dir("empty_saves");
    let mut session = new_session(0, 1, 1);
    session.config_mut().save_state.save_directory = dir.clone();

    assert!(session.load_state(9).is_err());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_screenshot_writes_png() {
    let dir = scratch_dir("shots");
    let mut session = new_session(0, 1, 1);
    session.config_mut().screenshot.screenshot_directory = dir.clone();
    session.config_mut().screenshot.include_timestamp = false;

    session.run_frame().unwrap();
    let path = session.screenshot().unwrap();

    assert!(path.exists());
    let bytes = fs::read(&path).unwrap();
    // PNG signature
    assert_eq!(&bytes[0..4], &[0x89, b'P', b'N', b'G']);

    let _ = fs::remove_dir_all(&dir);
}
