use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use unfake_batch::{
    Cleanup, CommandReducer, DetectMethod, DownscaleMethod, OutputConfig, OutputNaming, Palette,
    ProcessingOptions, Result, DEFAULT_FACTOR,
};

/// Turn images into clean pixel art with an external reducer, and write
/// nearest-neighbour upscaled previews of the result.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input image file or directory (directories are not searched recursively)
    #[arg()]
    pub input: PathBuf,

    /// Prefix for output file names
    #[arg(short = 'o', long, default_value = "pixelart_")]
    pub output_prefix: String,

    /// Suffix for the upscaled output file name
    #[arg(short = 'u', long, default_value = "_8x")]
    pub upscaled_suffix: String,

    /// Factor of the nearest-neighbour upscale
    #[arg(
        long,
        default_value_t = DEFAULT_FACTOR,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub upscale_factor: u32,

    /// Skip reduction, only write an upscaled copy of each original
    #[arg(long)]
    pub upscale_only: bool,

    /// Do not save the reduced image
    #[arg(long)]
    pub no_save_main: bool,

    /// Do not save the upscaled image
    #[arg(long)]
    pub no_save_upscaled: bool,

    /// Maximum number of colours (default: reducer decides)
    #[arg(short = 'c', long)]
    pub colors: Option<u32>,

    /// Auto-detect the optimal colour count
    #[arg(long)]
    pub auto_colors: bool,

    /// Manual pixel scale override
    #[arg(short, long)]
    pub scale: Option<u32>,

    /// Scale detection method: auto, runs, edge
    #[arg(short, long, default_value_t = DetectMethod::Auto)]
    pub detect: DetectMethod,

    /// Downscaling method: dominant, median, mode, mean, nearest, content-adaptive, hybrid
    #[arg(short, long, default_value_t = DownscaleMethod::Dominant)]
    pub method: DownscaleMethod,

    /// Dominant colour threshold, between 0 and 1
    #[arg(long, default_value_t = 0.05)]
    pub threshold: f32,

    /// Refinement iterations
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,

    /// Cleanup passes: morph,jaggy (comma-separated)
    #[arg(long)]
    pub cleanup: Option<String>,

    /// Fixed palette file (hex colours, one per line)
    #[arg(long)]
    pub palette: Option<PathBuf>,

    /// Alpha binarization threshold
    #[arg(long, default_value_t = 128)]
    pub alpha_threshold: u8,

    /// Disable grid snapping
    #[arg(long)]
    pub no_snap: bool,

    /// Denoise the input before reduction
    #[arg(long)]
    pub pre_filter: bool,

    /// Preserve edges while downscaling
    #[arg(long)]
    pub edge_preserve: bool,

    /// Sharpen the reduced image
    #[arg(long)]
    pub post_sharpen: bool,

    /// Reduction program to run for each image
    #[arg(long, env = "UNFAKE_BIN", default_value = CommandReducer::DEFAULT_PROGRAM)]
    pub reducer: OsString,

    /// Extra argument placed before the input path when running the reducer (repeatable)
    #[arg(long = "reducer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub reducer_args: Vec<OsString>,

    /// Number of files processed at once, 0 for one per CPU core
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Only print errors and the final summary
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print debug output and full error details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn jobs(&self) -> Option<usize> {
        match self.jobs {
            0 => None,
            n => Some(n),
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            naming: OutputNaming {
                prefix: self.output_prefix.clone(),
                suffix: self.upscaled_suffix.clone(),
                factor: self.upscale_factor,
            },
            save_main: !self.no_save_main,
            save_upscaled: !self.no_save_upscaled,
            upscale_only: self.upscale_only,
        }
    }

    /// Build and validate the reduction options, loading the palette file if given.
    pub fn processing_options(&self) -> Result<ProcessingOptions> {
        let cleanup = match &self.cleanup {
            Some(list) => {
                let (cleanup, unknown) = Cleanup::parse_list(list);
                for option in unknown {
                    log::warn!("Unknown cleanup option '{option}'");
                }
                cleanup
            }
            None => Cleanup::default(),
        };

        let palette = match &self.palette {
            Some(path) => Palette::load(path)?,
            None => None,
        };

        let options = ProcessingOptions {
            max_colors: self.colors,
            auto_colors: self.auto_colors,
            scale: self.scale,
            detect: self.detect,
            downscale: self.method,
            dominant_threshold: self.threshold,
            iterations: self.iterations,
            cleanup,
            palette,
            alpha_threshold: self.alpha_threshold,
            snap_grid: !self.no_snap,
            pre_filter: self.pre_filter,
            edge_preserve: self.edge_preserve,
            post_sharpen: self.post_sharpen,
        };
        options.validate()?;
        Ok(options)
    }

    /// The reducer is only looked up when it will actually run.
    pub fn reducer(&self) -> Result<CommandReducer> {
        let reducer = if self.upscale_only {
            CommandReducer::new(&self.reducer)
        } else {
            CommandReducer::locate(&self.reducer)?
        };
        Ok(reducer.with_args(&self.reducer_args))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use unfake_batch::Color;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("unfake-batch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["sprites"]);
        assert_eq!(args.input, PathBuf::from("sprites"));
        assert_eq!(args.log_level(), LevelFilter::Info);
        assert_eq!(args.jobs(), Some(1));

        let output = args.output_config();
        assert_eq!(output, OutputConfig::default());

        let options = args.processing_options().unwrap();
        assert_eq!(options, ProcessingOptions::default());
    }

    #[test]
    fn reduction_flags() {
        let args = parse(&[
            "in.png", "-c", "16", "--auto-colors", "-s", "4", "-d", "edge",
            "-m", "content-adaptive",
            "--threshold", "0.2", "--iterations", "3", "--cleanup", "morph,JAGGY,blur",
            "--alpha-threshold", "10", "--no-snap", "--pre-filter", "--edge-preserve",
            "--post-sharpen",
        ]);
        let options = args.processing_options().unwrap();
        assert_eq!(options.max_colors, Some(16));
        assert!(options.auto_colors);
        assert_eq!(options.scale, Some(4));
        assert_eq!(options.detect, DetectMethod::Edge);
        assert_eq!(options.downscale, DownscaleMethod::ContentAdaptive);
        assert_eq!(options.dominant_threshold, 0.2);
        assert_eq!(options.iterations, 3);
        assert_eq!(options.cleanup, Cleanup { morph: true, jaggy: true });
        assert_eq!(options.alpha_threshold, 10);
        assert!(!options.snap_grid);
        assert!(options.pre_filter && options.edge_preserve && options.post_sharpen);
    }

    #[test]
    fn output_flags() {
        let args = parse(&[
            "in", "-o", "px_", "-u", "_big", "--upscale-factor", "4", "--no-save-main",
        ]);
        let output = args.output_config();
        assert_eq!(output.naming.prefix, "px_");
        assert_eq!(output.naming.suffix, "_big");
        assert_eq!(output.naming.factor, 4);
        assert!(!output.save_main);
        assert!(output.save_upscaled);
    }

    #[test]
    fn both_outputs_disabled_fails_validation() {
        let args = parse(&["in", "--no-save-main", "--no-save-upscaled"]);
        assert!(args.output_config().validate().unwrap_err().is_fatal());
    }

    #[rstest]
    #[case(&["in", "-q", "-v"])]
    #[case(&["in", "-d", "diagonal"])]
    #[case(&["in", "-m", "bicubic"])]
    #[case(&["in", "--alpha-threshold", "256"])]
    #[case(&["in", "--upscale-factor", "0"])]
    #[case(&[])]
    fn rejected_command_lines(#[case] args: &[&str]) {
        let argv = std::iter::once("unfake-batch").chain(args.iter().copied());
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[rstest]
    #[case(&["in", "-q"], LevelFilter::Error)]
    #[case(&["in", "--verbose"], LevelFilter::Debug)]
    fn verbosity(#[case] args: &[&str], #[case] expected: LevelFilter) {
        assert_eq!(parse(args).log_level(), expected);
    }

    #[test]
    fn jobs_zero_means_all_cores() {
        assert_eq!(parse(&["in", "-j", "0"]).jobs(), None);
        assert_eq!(parse(&["in", "--jobs", "4"]).jobs(), Some(4));
    }

    #[test]
    fn invalid_threshold_is_fatal() {
        let args = parse(&["in", "--threshold", "2.5"]);
        assert!(args.processing_options().unwrap_err().is_fatal());
    }

    #[test]
    fn palette_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pal.txt");
        fs::write(&path, "#000000\n\n#ffffff\n").unwrap();

        let args = parse(&["in", "--palette", path.to_str().unwrap()]);
        let palette = args.processing_options().unwrap().palette.unwrap();
        assert_eq!(palette.colors(), &[Color::rgb(0, 0, 0), Color::rgb(255, 255, 255)]);
    }

    #[test]
    fn missing_palette_is_fatal() {
        let args = parse(&["in", "--palette", "/nonexistent/palette.txt"]);
        assert!(args.processing_options().unwrap_err().is_fatal());
    }

    #[test]
    fn reducer_args_accept_hyphens() {
        let args = parse(&[
            "in", "--reducer", "python3", "--reducer-arg", "-m", "--reducer-arg", "unfake",
        ]);
        assert_eq!(args.reducer, OsString::from("python3"));
        assert_eq!(args.reducer_args, [OsString::from("-m"), OsString::from("unfake")]);
    }

    #[test]
    fn upscale_only_does_not_need_the_reducer() {
        let args = parse(&["in", "--upscale-only", "--reducer", "definitely-not-installed-3b9c"]);
        assert!(args.reducer().is_ok());

        let args = parse(&["in", "--reducer", "definitely-not-installed-3b9c"]);
        assert!(args.reducer().unwrap_err().is_fatal());
    }
}
