// Screenshot functionality
//
// Captures the presented frame buffer and saves it as a PNG file.

use crate::display::framebuffer::{FrameBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur during screenshot operations
#[derive(Debug)]
pub enum ScreenshotError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),
}

impl std::fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenshotError::Io(e) => write!(f, "I/O error: {}", e),
            ScreenshotError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
        }
    }
}

impl std::error::Error for ScreenshotError {}

impl From<io::Error> for ScreenshotError {
    fn from(e: io::Error) -> Self {
        ScreenshotError::Io(e)
    }
}

impl From<png::EncodingError> for ScreenshotError {
    fn from(e: png::EncodingError) -> Self {
        ScreenshotError::PngEncoding(e)
    }
}

/// Save a screenshot of the presented frame
///
/// # Arguments
///
/// * `frame` - The frame buffer (256x240 ARGB pixels)
/// * `directory` - Base screenshot directory from the configuration
/// * `include_timestamp` - Whether the filename carries a timestamp
/// * `rom_path` - Optional path to the currently loaded ROM (for naming)
///
/// # Returns
///
/// Result containing the path to the saved screenshot or an error
pub fn save_screenshot(
    frame: &FrameBuffer,
    directory: &Path,
    include_timestamp: bool,
    rom_path: Option<&Path>,
) -> Result<PathBuf, ScreenshotError> {
    let screenshots_dir = screenshot_directory(directory, rom_path);
    fs::create_dir_all(&screenshots_dir)?;

    let filename = if include_timestamp {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        format!("screenshot_{}.png", timestamp)
    } else {
        "screenshot.png".to_string()
    };
    let file_path = screenshots_dir.join(filename);

    let rgb_data = frame_to_rgb(frame);
    save_png(&file_path, &rgb_data, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)?;

    Ok(file_path)
}

/// Get the screenshot directory for the current ROM
///
/// Creates a directory structure like: <directory>/<rom_name>/
fn screenshot_directory(directory: &Path, rom_path: Option<&Path>) -> PathBuf {
    if let Some(rom_path) = rom_path {
        if let Some(rom_name) = rom_path.file_stem() {
            return directory.join(rom_name);
        }
    }

    directory.join("default")
}

/// Convert the presented ARGB frame to RGB888 bytes
fn frame_to_rgb(frame: &FrameBuffer) -> Vec<u8> {
    let pixels = frame.as_slice();
    let mut rgb_data = Vec::with_capacity(pixels.len() * 3);

    for &argb in pixels {
        rgb_data.push((argb >> 16) as u8); // R
        rgb_data.push((argb >> 8) as u8); // G
        rgb_data.push(argb as u8); // B
    }

    rgb_data
}

/// Save RGB data as a PNG file
///
/// # Arguments
///
/// * `path` - Path to save the PNG file
/// * `data` - RGB data (width × height × 3 bytes)
/// * `width` - Image width
/// * `height` - Image height
///
/// # Returns
///
/// Result indicating success or error
fn save_png(path: &Path, data: &[u8], width: u32, height: u32) -> Result<(), ScreenshotError> {
    let file = fs::File::create(path)?;
    let w = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;

    Ok(())
}
