//! Runs the reduce / upscale / write pipeline over a file or a directory.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use rayon::prelude::*;

use crate::codec;
use crate::error::{Error, Result};
use crate::naming::{OutputNaming, OutputPlan};
use crate::options::ProcessingOptions;
use crate::reduce::Reducer;
use crate::upscale::upscale_dynamic;

/// Which outputs to produce and how to name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub naming: OutputNaming,
    pub save_main: bool,
    pub save_upscaled: bool,
    /// Skip reduction and only write an upscaled copy of the original.
    pub upscale_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            naming: OutputNaming::default(),
            save_main: true,
            save_upscaled: true,
            upscale_only: false,
        }
    }
}

impl OutputConfig {
    fn main_enabled(&self) -> bool {
        self.save_main && !self.upscale_only
    }

    pub fn validate(&self) -> Result<()> {
        if self.naming.factor == 0 {
            return Err(Error::config("upscale factor must be at least 1"));
        }
        if !self.main_enabled() && !self.save_upscaled {
            let reason = if self.upscale_only {
                "upscale-only mode with the upscaled output disabled"
            } else {
                "both the main and the upscaled output are disabled"
            };
            return Err(Error::config(format!("{reason}, nothing would be written")));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Main,
    Upscaled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub kind: OutputKind,
    pub path: PathBuf,
}

/// What happened to one input file.
#[derive(Debug)]
pub struct FileReport {
    pub input: PathBuf,
    /// Outputs that landed on disk.
    pub written: Vec<Written>,
    /// Every failure for this file. A failed write does not stop the other one.
    pub errors: Vec<Error>,
}

impl FileReport {
    fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            written: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn failed(input: &Path, error: Error) -> Self {
        let mut report = Self::new(input);
        report.errors.push(error);
        report
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn written_path(&self, kind: OutputKind) -> Option<&Path> {
        self.written
            .iter()
            .find(|w| w.kind == kind)
            .map(|w| w.path.as_path())
    }
}

/// Per-file reports, in the order the inputs were enumerated.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub reports: Vec<FileReport>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Resolve `input` into the image files to process.
///
/// A file is taken as-is if its extension is supported. A directory yields
/// its direct entries with a supported extension, sorted by path; sub
/// directories are not entered.
///
/// # Errors
///
/// Fatal if `input` does not exist, cannot be read, or the directory cannot be listed.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(input).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::MissingInput(input.to_path_buf()),
        _ => Error::Io {
            path: input.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        if codec::is_supported(input) {
            return Ok(vec![input.to_path_buf()]);
        }
        log::warn!(
            "'{}' does not have a supported image extension ({}), skipping",
            input.display(),
            codec::SUPPORTED_EXTENSIONS.join(", ")
        );
        return Ok(Vec::new());
    }

    let io_error = |source| Error::Io {
        path: input.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(input).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        if path.is_file() && codec::is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Applies one set of options to every image under an input path.
pub struct Dispatcher<'a> {
    reducer: &'a dyn Reducer,
    options: &'a ProcessingOptions,
    output: &'a OutputConfig,
    jobs: Option<usize>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        reducer: &'a dyn Reducer,
        options: &'a ProcessingOptions,
        output: &'a OutputConfig,
    ) -> Self {
        Self {
            reducer,
            options,
            output,
            jobs: Some(1),
        }
    }

    /// Number of files processed at once. `None` uses rayon's global pool,
    /// `Some(1)` (the default) processes files one after another.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Process every image under `input`.
    ///
    /// Only configuration problems are returned as `Err`; those are detected
    /// before any file is read. Failures of individual files are collected in
    /// the [`BatchResult`].
    pub fn run(&self, input: &Path) -> Result<BatchResult> {
        self.output.validate()?;
        let files = collect_inputs(input)?;
        if files.is_empty() {
            log::warn!("No image files found in '{}'", input.display());
            return Ok(BatchResult::default());
        }
        log::info!("Found {} image file(s) to process", files.len());
        let work = self.plan_outputs(&files);

        let reports: Vec<FileReport> = match self.jobs {
            Some(1) => work
                .into_iter()
                .map(|(file, plan)| self.process_file(file, plan))
                .collect(),
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("unfake-batch-{i}"))
                    .build()
                    .map_err(|e| {
                        Error::config(format!("could not start {threads} worker threads: {e}"))
                    })?;
                pool.install(|| self.process_parallel(work))
            }
            None => self.process_parallel(work),
        };

        let result = BatchResult { reports };
        log::info!(
            "Successfully processed {}/{} file(s)",
            result.succeeded(),
            result.len()
        );
        Ok(result)
    }

    /// Output paths for every file, planned in enumeration order so that no
    /// output lands on another input or on an output planned before it.
    fn plan_outputs<'f>(&self, files: &'f [PathBuf]) -> Vec<(&'f Path, Result<OutputPlan>)> {
        let mut taken: HashSet<PathBuf> = files.iter().cloned().collect();
        files
            .iter()
            .map(|file| {
                let plan = self.output.naming.plan(
                    file,
                    self.output.main_enabled(),
                    self.output.save_upscaled,
                    &taken,
                );
                if let Ok(plan) = &plan {
                    taken.extend(plan.main.iter().chain(&plan.upscaled).cloned());
                }
                (file.as_path(), plan)
            })
            .collect()
    }

    fn process_parallel(&self, work: Vec<(&Path, Result<OutputPlan>)>) -> Vec<FileReport> {
        // indexed collect keeps enumeration order
        work.into_par_iter()
            .map(|(file, plan)| self.process_file(file, plan))
            .collect()
    }

    fn process_file(&self, input: &Path, plan: Result<OutputPlan>) -> FileReport {
        log::info!("Processing '{}'", input.display());
        let report = self.try_process_file(input, plan);
        for error in &report.errors {
            log::warn!("Failed to process '{}': {}", input.display(), error.chain());
        }
        report
    }

    fn try_process_file(&self, input: &Path, plan: Result<OutputPlan>) -> FileReport {
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => return FileReport::failed(input, e),
        };
        let original = match codec::load(input) {
            Ok(image) => image,
            Err(e) => return FileReport::failed(input, e),
        };

        let processed = if self.output.upscale_only {
            log::debug!("Upscale-only mode, skipping reduction");
            original
        } else {
            log::debug!("Reducing '{}' with {:?}", input.display(), self.options);
            match self.reducer.reduce(&original, self.options) {
                Ok(image) => image,
                Err(source) => {
                    let error = Error::Reduction {
                        path: input.to_path_buf(),
                        source,
                    };
                    return FileReport::failed(input, error);
                }
            }
        };

        let mut report = FileReport::new(input);
        self.write_outputs(&processed, &plan, &mut report);
        report
    }

    fn write_outputs(&self, image: &DynamicImage, plan: &OutputPlan, report: &mut FileReport) {
        if let Some(path) = &plan.main {
            match codec::save(image, path) {
                Ok(()) => {
                    log::info!("Saved reduced image to '{}'", path.display());
                    report.written.push(Written {
                        kind: OutputKind::Main,
                        path: path.clone(),
                    });
                }
                Err(e) => report.errors.push(e),
            }
        }

        if let Some(path) = &plan.upscaled {
            let factor = self.output.naming.factor;
            let saved =
                upscale_dynamic(image, factor).and_then(|upscaled| codec::save(&upscaled, path));
            match saved {
                Ok(()) => {
                    log::info!("Saved {factor}x upscaled image to '{}'", path.display());
                    report.written.push(Written {
                        kind: OutputKind::Upscaled,
                        path: path.clone(),
                    });
                }
                Err(e) => report.errors.push(e),
            }
        }
    }
}
