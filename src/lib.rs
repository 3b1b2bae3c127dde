//! Batch front end for pixel-art reduction.
//!
//! Every image under an input path is handed to a [`Reducer`] (normally an
//! external tool run through [`CommandReducer`]), the result is written as a
//! lossless PNG, and a nearest-neighbour upscaled preview is written next to it.
//!
//! ```no_run
//! use std::path::Path;
//! use unfake_batch::{CommandReducer, Dispatcher, OutputConfig, ProcessingOptions};
//!
//! # fn main() -> unfake_batch::Result<()> {
//! let reducer = CommandReducer::locate("unfake")?;
//! let options = ProcessingOptions { max_colors: Some(16), ..Default::default() };
//! options.validate()?;
//! let output = OutputConfig::default();
//!
//! let result = Dispatcher::new(&reducer, &options, &output).run(Path::new("sprites/"))?;
//! println!("{}/{} done", result.succeeded(), result.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod codec;
mod error;
pub mod naming;
pub mod options;
pub mod palette;
mod pixel;
pub mod reduce;
pub mod upscale;

pub use crate::batch::{
    collect_inputs, BatchResult, Dispatcher, FileReport, OutputConfig, OutputKind, Written,
};
pub use crate::error::{Chain, Error, ErrorKind, Result};
pub use crate::naming::{OutputNaming, OutputPlan};
pub use crate::options::{Cleanup, DetectMethod, DownscaleMethod, ProcessingOptions};
pub use crate::palette::{Color, Palette};
pub use crate::reduce::{CommandReducer, Reducer, ReductionError};
pub use crate::upscale::{scale_rgba, upscale, upscale_dynamic, DEFAULT_FACTOR};
