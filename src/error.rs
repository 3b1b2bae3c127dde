use std::error::Error as _;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::reduce::ReductionError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure this crate reports, batch-fatal or per-file.
///
/// Use [`Error::kind`] to decide how to surface it; the dispatcher only ever
/// lets [`ErrorKind::FatalConfiguration`] escape a batch run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input path '{}' does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("palette '{}', line {line}: {message}", .path.display())]
    Palette {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("could not read palette '{}'", .path.display())]
    PaletteIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode '{}'", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("reduction of '{}' failed", .path.display())]
    Reduction {
        path: PathBuf,
        #[source]
        source: ReductionError,
    },

    #[error("could not write '{}'", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Aborts before any file is processed.
    FatalConfiguration,
    Decode,
    Reduction,
    Encode,
    /// Contract violation by a caller; not reachable from the command line.
    InvalidArgument,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput(_)
            | Self::Configuration(_)
            | Self::Palette { .. }
            | Self::PaletteIo { .. }
            | Self::Io { .. } => ErrorKind::FatalConfiguration,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Reduction { .. } => ErrorKind::Reduction,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::FatalConfiguration
    }

    /// Displays the error followed by each of its sources, `: `-separated.
    pub fn chain(&self) -> Chain<'_> {
        Chain(self)
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub struct Chain<'a>(&'a Error);

impl Display for Chain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FatalConfiguration => "configuration",
            Self::Decode => "decode",
            Self::Reduction => "reduction",
            Self::Encode => "encode",
            Self::InvalidArgument => "invalid argument",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds() {
        assert!(Error::MissingInput(PathBuf::from("nope")).is_fatal());
        assert!(Error::config("both outputs disabled").is_fatal());
        assert!(!Error::invalid("factor").is_fatal());
    }

    #[test]
    fn messages_name_the_path() {
        let err = Error::MissingInput(PathBuf::from("art/missing.png"));
        assert_eq!(err.to_string(), "input path 'art/missing.png' does not exist");

        let err = Error::Palette {
            path: PathBuf::from("pal.txt"),
            line: 3,
            message: "bad hex".to_string(),
        };
        assert_eq!(err.to_string(), "palette 'pal.txt', line 3: bad hex");
    }

    #[test]
    fn chain_includes_sources() {
        let err = Error::Reduction {
            path: PathBuf::from("a.png"),
            source: ReductionError::NoOutput {
                program: PathBuf::from("unfake"),
            },
        };
        assert_eq!(
            err.chain().to_string(),
            "reduction of 'a.png' failed: 'unfake' exited successfully but wrote no image"
        );
    }
}
