//! The pixel-art reduction step.
//!
//! Reduction (grid detection, colour quantisation, cleanup) is not done by this
//! crate. It sits behind the [`Reducer`] trait; [`CommandReducer`] drives an
//! external `unfake`-compatible command-line tool.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};
use crate::options::ProcessingOptions;

#[derive(Debug, thiserror::Error)]
pub enum ReductionError {
    #[error("could not start '{}'", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' exited with {status}: {stderr}", .program.display())]
    Failed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("scratch file I/O failed")]
    Scratch(#[source] io::Error),

    #[error("could not hand the image to the reducer")]
    Input(#[source] image::ImageError),

    #[error("could not read the reduced image")]
    Output(#[source] image::ImageError),

    #[error("'{}' exited successfully but wrote no image", .program.display())]
    NoOutput { program: PathBuf },
}

/// Turns an arbitrary image into clean pixel art.
///
/// Implementations are shared between worker threads and must not keep
/// per-call state.
pub trait Reducer: Send + Sync {
    fn reduce(&self, image: &DynamicImage, options: &ProcessingOptions)
        -> std::result::Result<DynamicImage, ReductionError>;
}

/// Runs an external reduction tool once per image.
///
/// The tool is invoked as `<program> [args…] <input.png> -o <output.png> [flags…]`
/// inside a scratch directory that is removed afterwards.
#[derive(Debug, Clone)]
pub struct CommandReducer {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandReducer {
    pub const DEFAULT_PROGRAM: &'static str = "unfake";

    /// Use `program` as given, without checking that it exists.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Resolve `program` through `PATH` (or as a path) up front.
    ///
    /// A missing tool is a configuration problem, better reported once than
    /// as a failure for every file.
    pub fn locate(program: impl AsRef<OsStr>) -> Result<Self> {
        let program = program.as_ref();
        let resolved = which::which(program).map_err(|e| {
            Error::config(format!(
                "reducer program '{}' not found: {e}",
                program.to_string_lossy()
            ))
        })?;
        log::debug!("Using reducer '{}'", resolved.display());
        Ok(Self::new(resolved))
    }

    /// Arguments passed before the input path, e.g. `-m unfake` for a Python launcher.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argument list for one run. Unset options are left out so the tool
    /// falls back to its own defaults.
    pub fn arguments(
        &self,
        input: &Path,
        output: &Path,
        palette: Option<&Path>,
        options: &ProcessingOptions,
    ) -> Vec<OsString> {
        let mut args = self.args.clone();
        args.push(input.into());
        args.push("-o".into());
        args.push(output.into());

        let mut flag = |name: &str, value: Option<String>| {
            args.push(name.into());
            if let Some(value) = value {
                args.push(value.into());
            }
        };

        if let Some(colors) = options.max_colors {
            flag("-c", Some(colors.to_string()));
        }
        if options.auto_colors {
            flag("--auto-colors", None);
        }
        if let Some(scale) = options.scale {
            flag("-s", Some(scale.to_string()));
        }
        flag("-d", Some(options.detect.to_string()));
        flag("-m", Some(options.downscale.to_string()));
        flag("--threshold", Some(options.dominant_threshold.to_string()));
        if options.iterations != 1 {
            flag("--iterations", Some(options.iterations.to_string()));
        }
        if !options.cleanup.is_empty() {
            flag("--cleanup", Some(options.cleanup.to_string()));
        }
        if let Some(palette) = palette {
            flag("--palette", Some(palette.display().to_string()));
        }
        flag("--alpha-threshold", Some(options.alpha_threshold.to_string()));
        if !options.snap_grid {
            flag("--no-snap", None);
        }
        if options.pre_filter {
            flag("--pre-filter", None);
        }
        if options.edge_preserve {
            flag("--edge-preserve", None);
        }
        if options.post_sharpen {
            flag("--post-sharpen", None);
        }
        args
    }
}

impl Reducer for CommandReducer {
    fn reduce(
        &self,
        image: &DynamicImage,
        options: &ProcessingOptions,
    ) -> std::result::Result<DynamicImage, ReductionError> {
        let scratch = tempfile::Builder::new()
            .prefix("unfake-batch-")
            .tempdir()
            .map_err(ReductionError::Scratch)?;
        let input = scratch.path().join("input.png");
        let output = scratch.path().join("output.png");

        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(ReductionError::Input)?;

        let palette = match &options.palette {
            Some(palette) => {
                let path = scratch.path().join("palette.txt");
                let file = File::create(&path).map_err(ReductionError::Scratch)?;
                let mut writer = BufWriter::new(file);
                palette.write_to(&mut writer).map_err(ReductionError::Scratch)?;
                writer.flush().map_err(ReductionError::Scratch)?;
                Some(path)
            }
            None => None,
        };

        let args = self.arguments(&input, &output, palette.as_deref(), options);
        log::debug!("Running {} {:?}", self.program.display(), args);

        let run = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ReductionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !run.status.success() {
            return Err(ReductionError::Failed {
                program: self.program.clone(),
                status: run.status,
                stderr: String::from_utf8_lossy(&run.stderr).trim().to_string(),
            });
        }
        if !run.stdout.is_empty() {
            log::debug!("{}", String::from_utf8_lossy(&run.stdout).trim_end());
        }

        if !output.is_file() {
            return Err(ReductionError::NoOutput {
                program: self.program.clone(),
            });
        }
        image::open(&output).map_err(ReductionError::Output)
    }
}
