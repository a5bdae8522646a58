// Display module - Frame composition output
//
// This module provides:
// - NES color palette (52 unique colors)
// - Double-buffered frame store (256×240 pixels)

pub mod framebuffer;
pub mod palette;

pub use framebuffer::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use palette::{palette_to_rgb, NES_PALETTE};
