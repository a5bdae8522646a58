// Edge cases games depend on

use super::*;

#[test]
fn test_oam_dma_wraps_around_oam_address() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    let mut page = [0u8; 256];
    for (i, value) in page.iter_mut().enumerate() {
        *value = i as u8;
    }

    ppu.write_port(&mut bus, OAMADDR, 0xF0).unwrap();
    ppu.oam_dma(&page);

    // Byte 0x10 of the page landed at OAM 0x00
    ppu.write_port(&mut bus, OAMADDR, 0x00).unwrap();
    assert_eq!(ppu.read_port(&mut bus, OAMDATA).unwrap(), 0x10);
    ppu.write_port(&mut bus, OAMADDR, 0xF0).unwrap();
    assert_eq!(ppu.read_port(&mut bus, OAMDATA).unwrap(), 0x00);
}

#[test]
fn test_sprites_below_the_screen_never_show() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    fill_tile(&mut bus, 0, 2, 3);
    write_vram(&mut ppu, &mut bus, 0x3F00, 0x0F);
    write_vram(&mut ppu, &mut bus, 0x3F13, 0x27);
    ppu.write_port(&mut bus, OAMADDR, 0x00).unwrap();
    for value in [0xF0, 2, 0x00, 20] {
        ppu.write_port(&mut bus, OAMDATA, value).unwrap();
    }
    reset_scroll(&mut ppu, &mut bus);
    ppu.write_port(&mut bus, PPUMASK, 0x14).unwrap();

    run_frames(&mut ppu, &mut bus, 2);

    for y in 0..240 {
        assert_eq!(bus.pixel(20, y), 0xFF00_0000);
    }
}

#[test]
fn test_no_sprites_on_the_first_scanline() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    fill_tile(&mut bus, 0, 2, 3);
    write_vram(&mut ppu, &mut bus, 0x3F00, 0x0F);
    write_vram(&mut ppu, &mut bus, 0x3F13, 0x27);
    ppu.write_port(&mut bus, OAMADDR, 0x00).unwrap();
    for value in [0, 2, 0x00, 20] {
        ppu.write_port(&mut bus, OAMDATA, value).unwrap();
    }
    reset_scroll(&mut ppu, &mut bus);
    ppu.write_port(&mut bus, PPUMASK, 0x14).unwrap();

    run_frames(&mut ppu, &mut bus, 2);

    // Evaluation runs a line ahead, so line 0 can never carry sprites
    let backdrop = 0xFF00_0000 | crate::display::palette::NES_PALETTE[0x0F];
    assert_eq!(bus.pixel(20, 0), backdrop);
    assert_ne!(bus.pixel(20, 1), backdrop);
}

#[test]
fn test_state_round_trip() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    write_vram(&mut ppu, &mut bus, 0x2105, 0x42);
    write_vram(&mut ppu, &mut bus, 0x3F05, 0x17);
    ppu.write_port(&mut bus, OAMADDR, 0x04).unwrap();
    ppu.write_port(&mut bus, OAMDATA, 0x99).unwrap();
    ppu.write_port(&mut bus, PPUCTRL, 0x88).unwrap();
    advance_to(&mut ppu, &mut bus, 100, 170);

    let state = ppu.state();

    let mut restored = Ppu::new();
    restored.restore(&state);
    assert_eq!(restored.scanline(), 100);
    assert_eq!(restored.dot(), 170);
    assert_eq!(restored.control, 0x88);
    assert_eq!(restored.oam.read(0x04), 0x99);
    assert_eq!(restored.read_memory(&mut bus, 0x2105).unwrap(), 0x42);
    assert_eq!(restored.read_memory(&mut bus, 0x3F05).unwrap(), 0x17);
}

#[test]
fn test_state_serializes() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    write_vram(&mut ppu, &mut bus, 0x2105, 0x42);
    advance_to(&mut ppu, &mut bus, 50, 12);

    let encoded = serde_json::to_string(&ppu.state()).unwrap();
    let decoded: crate::ppu::PpuState = serde_json::from_str(&encoded).unwrap();

    let mut restored = Ppu::new();
    restored.restore(&decoded);
    assert_eq!(restored.scanline(), 50);
    assert_eq!(restored.dot(), 12);
    assert_eq!(restored.read_memory(&mut bus, 0x2105).unwrap(), 0x42);
}

#[test]
fn test_clear_zeroes_everything() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    write_vram(&mut ppu, &mut bus, 0x2105, 0x42);
    ppu.write_port(&mut bus, PPUCTRL, 0xFF).unwrap();
    advance_to(&mut ppu, &mut bus, 10, 10);

    ppu.clear();
    assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));
    assert_eq!(ppu.control, 0);
    assert_eq!(ppu.read_memory(&mut bus, 0x2105).unwrap(), 0);
}
