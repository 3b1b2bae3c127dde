//! Fixed palettes handed to the reducer.
//!
//! The file format is plain text with one hex colour per line, `#RRGGBB` or
//! `#RRGGBBAA`. Blank lines are skipped, as are comment lines starting with
//! `//` or `;`.

use std::fmt::{Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("'{s}' does not start with '#'"))?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("'{s}' contains non-hex characters"));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        match hex.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            n => Err(format!("'{s}' has {n} hex digits, expected 6 or 8")),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// An ordered list of colours. Order is preserved as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette(Vec<Color>);

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse palette text. Errors carry the 1-based line number and the
    /// message; use [`Palette::load`] to get an [`Error`] naming the file.
    pub fn parse(text: &str) -> std::result::Result<Self, (usize, String)> {
        let mut colors = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") || line.starts_with(';') {
                continue;
            }
            let color = line.parse::<Color>().map_err(|message| (index + 1, message))?;
            colors.push(color);
        }
        Ok(Self(colors))
    }

    /// Read a palette file.
    ///
    /// An empty palette is returned as `Ok(None)` with a warning, since an
    /// empty fixed palette cannot constrain anything.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = fs::read_to_string(path).map_err(|source| Error::PaletteIo {
            path: path.to_path_buf(),
            source,
        })?;
        let palette = Self::parse(&text).map_err(|(line, message)| Error::Palette {
            path: path.to_path_buf(),
            line,
            message,
        })?;

        if palette.is_empty() {
            log::warn!(
                "No colours found in palette file '{}'; ignoring it",
                path.display()
            );
            return Ok(None);
        }
        log::info!("Loaded palette with {} colours from '{}'", palette.len(), path.display());
        Ok(Some(palette))
    }

    /// Write the palette back out in the file format [`Palette::parse`] reads.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for color in &self.0 {
            writeln!(writer, "{color}")?;
        }
        Ok(())
    }
}
