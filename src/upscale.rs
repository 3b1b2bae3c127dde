use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::pixel::{as_pixels, as_pixels_mut};

/// Factor used for preview images when nothing else is configured.
pub const DEFAULT_FACTOR: u32 = 8;

fn fill_block<T: Copy>(
    destination: &mut [T],
    row_length: usize,
    value: T,
    block_width: usize,
    block_height: usize,
) {
    let i_range = (0..(block_height * row_length)).step_by(row_length);
    for i in i_range {
        for cell in &mut destination[i..i + block_width] {
            *cell = value;
        }
    }
}

/// Nearest-neighbour upscale of a flat RGBA8 buffer by an integer factor.
///
/// The `source` is ordered left to right, then top to bottom, 4 bytes per pixel.
/// The returned buffer has dimensions `src_width * factor` by `src_height * factor`
/// and every source pixel is replicated into a `factor`×`factor` block, alpha included.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `factor` is zero, either dimension is zero, the
/// `source` length is not exactly `src_width * src_height * 4`, or the output
/// buffer would overflow or cannot be allocated.
pub fn scale_rgba(
    source: &[u8],
    src_width: usize,
    src_height: usize,
    factor: usize,
) -> Result<Vec<u8>> {
    if factor == 0 {
        return Err(Error::invalid("upscale factor must be at least 1"));
    }
    if src_width == 0 || src_height == 0 {
        return Err(Error::invalid(format!(
            "cannot upscale an empty image ({src_width}x{src_height})"
        )));
    }

    let expected_len = src_width
        .checked_mul(src_height)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| Error::invalid("source dimensions overflow"))?;
    if source.len() != expected_len {
        return Err(Error::invalid(format!(
            "source buffer is {} bytes, expected {expected_len} for {src_width}x{src_height}",
            source.len()
        )));
    }

    let dest_len = src_width
        .checked_mul(factor)
        .and_then(|w| w.checked_mul(src_height))
        .and_then(|wh| wh.checked_mul(factor))
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| Error::invalid(format!("upscaling by {factor} overflows")))?;
    let dest_width = src_width * factor;

    let src = as_pixels(source).ok_or_else(|| Error::invalid("source is not RGBA8"))?;
    let mut destination = Vec::new();
    destination.try_reserve_exact(dest_len).map_err(|e| {
        Error::invalid(format!("cannot allocate {dest_len} bytes for the upscaled image: {e}"))
    })?;
    destination.resize(dest_len, 0u8);
    let dst = as_pixels_mut(&mut destination)
        .ok_or_else(|| Error::invalid("destination is not RGBA8"))?;

    // one source row maps onto `factor` full output rows
    dst.par_chunks_mut(dest_width * factor)
        .zip(src.par_chunks(src_width))
        .for_each(|(band, row)| {
            for (x, &pixel) in row.iter().enumerate() {
                fill_block(&mut band[x * factor..], dest_width, pixel, factor, factor);
            }
        });

    Ok(destination)
}

/// Nearest-neighbour upscale of an RGBA image.
///
/// Output pixel `(x, y)` is input pixel `(x / factor, y / factor)`.
pub fn upscale(image: &RgbaImage, factor: u32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let (out_width, out_height) = width
        .checked_mul(factor)
        .zip(height.checked_mul(factor))
        .ok_or_else(|| {
            Error::invalid(format!("{width}x{height} upscaled by {factor} overflows"))
        })?;

    let buffer = scale_rgba(image.as_raw(), width as usize, height as usize, factor as usize)?;
    RgbaImage::from_raw(out_width, out_height, buffer)
        .ok_or_else(|| Error::invalid("upscaled buffer does not match its dimensions"))
}

/// [`upscale`] for any colour type; the result is always RGBA8.
pub fn upscale_dynamic(image: &DynamicImage, factor: u32) -> Result<DynamicImage> {
    let rgba = match image {
        DynamicImage::ImageRgba8(rgba) => upscale(rgba, factor)?,
        other => upscale(&other.to_rgba8(), factor)?,
    };
    Ok(DynamicImage::ImageRgba8(rgba))
}
