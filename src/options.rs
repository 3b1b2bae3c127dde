use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::palette::Palette;

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let valid: Vec<_> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown value '{s}' (valid: {})", valid.join(", "))
                    })
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum! {
    /// How the reducer detects the size of the pixel grid.
    DetectMethod {
        Auto => "auto",
        Runs => "runs",
        Edge => "edge",
    }
}

named_enum! {
    /// How the reducer picks one colour for each grid cell.
    DownscaleMethod {
        Dominant => "dominant",
        Median => "median",
        Mode => "mode",
        Mean => "mean",
        Nearest => "nearest",
        ContentAdaptive => "content-adaptive",
        Hybrid => "hybrid",
    }
}

/// Cleanup passes run by the reducer after downscaling.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Cleanup {
    pub morph: bool,
    pub jaggy: bool,
}

impl Cleanup {
    /// Parse a comma-separated list such as `"morph,jaggy"`.
    ///
    /// Unknown entries are returned alongside instead of failing, so callers
    /// can warn about them and carry on.
    pub fn parse_list(list: &str) -> (Self, Vec<String>) {
        let mut cleanup = Self::default();
        let mut unknown = Vec::new();
        for entry in list.split(',').map(|e| e.trim().to_ascii_lowercase()) {
            match entry.as_str() {
                "" => {}
                "morph" => cleanup.morph = true,
                "jaggy" => cleanup.jaggy = true,
                _ => unknown.push(entry),
            }
        }
        (cleanup, unknown)
    }

    pub fn is_empty(&self) -> bool {
        !self.morph && !self.jaggy
    }
}

impl Display for Cleanup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = [(self.morph, "morph"), (self.jaggy, "jaggy")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        f.write_str(&names.join(","))
    }
}

/// Parameters forwarded to the reducer for every file of a batch.
///
/// Built once, checked once with [`ProcessingOptions::validate`], then only
/// ever borrowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Upper bound on the number of colours; `None` lets the reducer decide.
    pub max_colors: Option<u32>,
    pub auto_colors: bool,
    /// Known pixel scale of the input; `None` means detect it.
    pub scale: Option<u32>,
    pub detect: DetectMethod,
    pub downscale: DownscaleMethod,
    /// Minimum share of a cell a colour needs to count as dominant.
    pub dominant_threshold: f32,
    pub iterations: u32,
    pub cleanup: Cleanup,
    pub palette: Option<Palette>,
    /// Alpha values below this become fully transparent, the rest opaque.
    pub alpha_threshold: u8,
    pub snap_grid: bool,
    pub pre_filter: bool,
    pub edge_preserve: bool,
    pub post_sharpen: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            max_colors: None,
            auto_colors: false,
            scale: None,
            detect: DetectMethod::Auto,
            downscale: DownscaleMethod::Dominant,
            dominant_threshold: 0.05,
            iterations: 1,
            cleanup: Cleanup::default(),
            palette: None,
            alpha_threshold: 128,
            snap_grid: true,
            pre_filter: false,
            edge_preserve: false,
            post_sharpen: false,
        }
    }
}

impl ProcessingOptions {
    pub const MAX_COLORS: u32 = 256;

    pub fn validate(&self) -> Result<()> {
        if !self.dominant_threshold.is_finite() || !(0.0..=1.0).contains(&self.dominant_threshold) {
            return Err(Error::config(format!(
                "dominant colour threshold must be between 0 and 1, got {}",
                self.dominant_threshold
            )));
        }
        if self.iterations < 1 {
            return Err(Error::config("iteration count must be at least 1"));
        }
        if let Some(colors) = self.max_colors {
            if !(2..=Self::MAX_COLORS).contains(&colors) {
                return Err(Error::config(format!(
                    "colour count must be between 2 and {}, got {colors}",
                    Self::MAX_COLORS
                )));
            }
        }
        if self.scale == Some(0) {
            return Err(Error::config("scale override must be at least 1"));
        }
        Ok(())
    }
}
