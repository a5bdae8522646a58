// Port behavior: the write latch, the read buffer, open bus

use super::*;

#[test]
fn test_scroll_writes_update_temp_and_fine_x() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, PPUSCROLL, 0x7D).unwrap();
    assert_eq!(ppu.address_temp & 0x001F, 0x0F);
    assert_eq!(ppu.fine_x, 0x05);
    assert!(ppu.write_latch);

    ppu.write_port(&mut bus, PPUSCROLL, 0x5E).unwrap();
    assert_eq!(ppu.address_temp, 0x616F);
    assert!(!ppu.write_latch);
}

#[test]
fn test_address_writes_load_vram_address() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, PPUADDR, 0x3F).unwrap();
    assert!(ppu.write_latch);
    ppu.write_port(&mut bus, PPUADDR, 0x21).unwrap();

    assert_eq!(ppu.address_temp, 0x3F21);
    assert_eq!(ppu.address_vram, 0x3F21);
    assert!(!ppu.write_latch);
}

#[test]
fn test_control_write_sets_nametable_bits() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, PPUCTRL, 0x03).unwrap();
    assert_eq!(ppu.address_temp & 0x0C00, 0x0C00);

    ppu.write_port(&mut bus, PPUCTRL, 0x00).unwrap();
    assert_eq!(ppu.address_temp & 0x0C00, 0x0000);
}

#[test]
fn test_status_read_clears_vblank_and_latch() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();
    ppu.status = 0x80;
    ppu.write_port(&mut bus, PPUADDR, 0x21).unwrap();
    assert!(ppu.write_latch);

    let status = ppu.read_port(&mut bus, PPUSTATUS).unwrap();
    assert_eq!(status & 0x80, 0x80);
    assert_eq!(ppu.status & 0x80, 0);
    assert!(!ppu.write_latch);

    // The latch reset realigns the next $2006 pair
    ppu.write_port(&mut bus, PPUADDR, 0x21).unwrap();
    ppu.write_port(&mut bus, PPUADDR, 0x00).unwrap();
    assert_eq!(ppu.address_vram, 0x2100);
}

#[test]
fn test_status_low_bits_come_from_open_bus() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();
    ppu.status = 0x80;

    ppu.write_port(&mut bus, PPUMASK, 0x1F).unwrap();
    let status = ppu.read_port(&mut bus, PPUSTATUS).unwrap();
    assert_eq!(status, 0x9F);
}

#[test]
fn test_write_only_ports_read_back_open_bus() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, PPUCTRL, 0x3C).unwrap();
    assert_eq!(ppu.read_port(&mut bus, PPUCTRL).unwrap(), 0x3C);
    assert_eq!(ppu.read_port(&mut bus, PPUSCROLL).unwrap(), 0x3C);
}

#[test]
fn test_data_reads_are_buffered() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    write_vram(&mut ppu, &mut bus, 0x2400, 0x55);

    ppu.write_port(&mut bus, PPUADDR, 0x24).unwrap();
    ppu.write_port(&mut bus, PPUADDR, 0x00).unwrap();

    // First read returns the stale buffer, second the actual byte
    let first = ppu.read_port(&mut bus, PPUDATA).unwrap();
    let second = ppu.read_port(&mut bus, PPUDATA).unwrap();
    assert_ne!(first, 0x55);
    assert_eq!(second, 0x55);
}

#[test]
fn test_palette_reads_bypass_buffer() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    write_vram(&mut ppu, &mut bus, 0x2F00, 0x33);
    write_vram(&mut ppu, &mut bus, 0x3F00, 0x2A);

    ppu.write_port(&mut bus, PPUADDR, 0x3F).unwrap();
    ppu.write_port(&mut bus, PPUADDR, 0x00).unwrap();

    assert_eq!(ppu.read_port(&mut bus, PPUDATA).unwrap(), 0x2A);
    // The buffer picked up the nametable byte underneath
    assert_eq!(ppu.read_buffer, 0x33);
}

#[test]
fn test_data_access_increments_by_one_or_thirty_two() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, PPUADDR, 0x20).unwrap();
    ppu.write_port(&mut bus, PPUADDR, 0x00).unwrap();
    ppu.write_port(&mut bus, PPUDATA, 0x01).unwrap();
    assert_eq!(ppu.address_vram, 0x2001);

    ppu.write_port(&mut bus, PPUCTRL, 0x04).unwrap();
    ppu.write_port(&mut bus, PPUDATA, 0x02).unwrap();
    assert_eq!(ppu.address_vram, 0x2021);
}

#[test]
fn test_oam_port_roundtrip() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, OAMADDR, 0x10).unwrap();
    ppu.write_port(&mut bus, OAMDATA, 0xAB).unwrap();
    ppu.write_port(&mut bus, OAMDATA, 0xCD).unwrap();

    // Writes advanced the address; reads do not
    ppu.write_port(&mut bus, OAMADDR, 0x10).unwrap();
    assert_eq!(ppu.read_port(&mut bus, OAMDATA).unwrap(), 0xAB);
    assert_eq!(ppu.read_port(&mut bus, OAMDATA).unwrap(), 0xAB);

    ppu.write_port(&mut bus, OAMADDR, 0x11).unwrap();
    assert_eq!(ppu.read_port(&mut bus, OAMDATA).unwrap(), 0xCD);
}

#[test]
fn test_ports_are_mirrored_through_3fff() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    ppu.write_port(&mut bus, 0x3456, 0x21).unwrap();
    ppu.write_port(&mut bus, 0x2FFE, 0x00).unwrap();
    assert_eq!(ppu.address_vram, 0x2100);
}

#[test]
fn test_out_of_range_ports_are_rejected() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();

    assert!(matches!(
        ppu.read_port(&mut bus, 0x4000),
        Err(crate::ppu::PpuError::UnsupportedPort(0x4000))
    ));
    assert!(matches!(
        ppu.write_port(&mut bus, 0x1FFF, 0x00),
        Err(crate::ppu::PpuError::UnsupportedPort(0x1FFF))
    ));
}

#[test]
fn test_enabling_nmi_during_vblank_raises_it_immediately() {
    let mut ppu = Ppu::new();
    let mut bus = TestBus::new();
    ppu.status = 0x80;

    ppu.write_port(&mut bus, PPUCTRL, 0x80).unwrap();
    assert!(bus.signals.take_interrupt_non_maskable());

    // Writing again with the bit already set does not retrigger
    ppu.write_port(&mut bus, PPUCTRL, 0x80).unwrap();
    assert!(!bus.signals.take_interrupt_non_maskable());
}
