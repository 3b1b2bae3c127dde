use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{Error, Result};

/// Extensions accepted as inputs, and the ones the writer can produce.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Extension of the lossless format every main output is written in.
pub const LOSSLESS_EXTENSION: &str = "png";

/// Lowercased extension of `path`, if it is valid UTF-8.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| is_supported_extension(&ext))
}

/// Decode the image at `path`. The format is sniffed from the file contents,
/// the extension is only a fallback.
pub fn load(path: &Path) -> Result<DynamicImage> {
    let decode = || -> image::ImageResult<DynamicImage> {
        ImageReader::open(path)?.with_guessed_format()?.decode()
    };
    decode().map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode `image` to `path`, choosing the format from the extension.
///
/// JPEG has no alpha channel, so images headed there are flattened to RGB8.
pub fn save(image: &DynamicImage, path: &Path) -> Result<()> {
    let encode_error = |source| Error::Encode {
        path: path.to_path_buf(),
        source,
    };
    let format = ImageFormat::from_path(path).map_err(encode_error)?;

    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .save_with_format(path, format)
            .map_err(encode_error),
        _ => image.save_with_format(path, format).map_err(encode_error),
    }
}
