use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::codec::{self, LOSSLESS_EXTENSION};
use crate::error::{Error, Result};
use crate::upscale::DEFAULT_FACTOR;

/// Appended to the main output's stem when it would otherwise overwrite its source.
const MAIN_COLLISION_TAG: &str = "_reduced";

/// How output files are named relative to their input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pub prefix: String,
    /// Added after the stem of the upscaled output only.
    pub suffix: String,
    /// Upscale factor, also used to tag colliding upscaled names.
    pub factor: u32,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            prefix: "pixelart_".to_string(),
            suffix: format!("_{DEFAULT_FACTOR}x"),
            factor: DEFAULT_FACTOR,
        }
    }
}

/// Destination paths for one input; `None` means that output is not written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPlan {
    pub main: Option<PathBuf>,
    pub upscaled: Option<PathBuf>,
}

fn file_name(parts: &[&OsStr], extension: &str) -> OsString {
    let mut name = OsString::new();
    for part in parts {
        name.push(part);
    }
    name.push(".");
    name.push(extension);
    name
}

/// `parts` joined under `parent`, or, if that path is taken, the same name with
/// `tag` appended to the stem (and a counter after it if that is taken too).
fn free_path(
    parent: &Path,
    parts: &[&OsStr],
    tag: &str,
    extension: &str,
    is_taken: impl Fn(&Path) -> bool,
) -> PathBuf {
    let path = parent.join(file_name(parts, extension));
    if !is_taken(&path) {
        return path;
    }

    let mut tagged: Vec<&OsStr> = parts.to_vec();
    tagged.push(OsStr::new(tag));
    let mut path = parent.join(file_name(&tagged, extension));
    let mut counter = 1u64;
    while is_taken(&path) {
        counter += 1;
        let numbered = format!("_{counter}");
        let mut parts = tagged.clone();
        parts.push(OsStr::new(&numbered));
        path = parent.join(file_name(&parts, extension));
    }
    path
}

impl OutputNaming {
    /// Work out where the outputs for `input` go.
    ///
    /// Outputs land next to the input. The main output is always PNG; the
    /// upscaled output keeps the input's extension when it can be encoded and
    /// falls back to PNG otherwise.
    ///
    /// `taken` holds paths that must not be written: the other inputs of the
    /// batch and outputs already planned for them. A name that is taken, equal
    /// to `input`, or (for the upscaled output) equal to the main output gets
    /// a `_reduced` or `_{factor}x` tag.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if both outputs are disabled, and
    /// [`Error::InvalidArgument`] if `input` has no file name.
    pub fn plan(
        &self,
        input: &Path,
        main_enabled: bool,
        upscaled_enabled: bool,
        taken: &HashSet<PathBuf>,
    ) -> Result<OutputPlan> {
        if !main_enabled && !upscaled_enabled {
            return Err(Error::config(
                "both the main and the upscaled output are disabled, nothing would be written",
            ));
        }

        let stem = input
            .file_stem()
            .ok_or_else(|| Error::invalid(format!("'{}' has no file name", input.display())))?;
        let parent = input.parent().unwrap_or_else(|| Path::new(""));
        let prefix = OsStr::new(&self.prefix);

        let main = free_path(
            parent,
            &[prefix, stem],
            MAIN_COLLISION_TAG,
            LOSSLESS_EXTENSION,
            |path| path == input || taken.contains(path),
        );

        let extension = codec::extension(input)
            .filter(|ext| codec::is_supported_extension(ext))
            .unwrap_or_else(|| LOSSLESS_EXTENSION.to_string());
        let suffix = OsStr::new(&self.suffix);
        let upscaled = free_path(
            parent,
            &[prefix, stem, suffix],
            &format!("_{}x", self.factor),
            &extension,
            |path| path == input || path == main.as_path() || taken.contains(path),
        );

        Ok(OutputPlan {
            main: main_enabled.then_some(main),
            upscaled: upscaled_enabled.then_some(upscaled),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::ErrorKind;

    fn naming(prefix: &str, suffix: &str) -> OutputNaming {
        OutputNaming {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            factor: 8,
        }
    }

    fn plan(naming: &OutputNaming, input: &str, main: bool, upscaled: bool) -> Result<OutputPlan> {
        naming.plan(Path::new(input), main, upscaled, &HashSet::new())
    }

    #[test]
    fn jpeg_input_keeps_extension_for_upscaled() {
        let plan = plan(&naming("pixelart_", "_8x"), "photo.jpg", true, true).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("pixelart_photo.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("pixelart_photo_8x.jpg")));
    }

    #[test]
    fn defaults_match_command_line_defaults() {
        let plan = plan(&OutputNaming::default(), "art/hero.png", true, true).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("art/pixelart_hero.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("art/pixelart_hero_8x.png")));
    }

    #[rstest]
    #[case("a/sprite.PNG", "a/p_sprite_up.png")]
    #[case("a/sprite.tif", "a/p_sprite_up.tif")]
    #[case("a/sprite.webp", "a/p_sprite_up.webp")]
    #[case("a/sprite.gif", "a/p_sprite_up.png")]
    #[case("a/sprite", "a/p_sprite_up.png")]
    fn upscaled_extension(#[case] input: &str, #[case] expected: &str) {
        let plan = plan(&naming("p_", "_up"), input, false, true).unwrap();
        assert_eq!(plan.main, None);
        assert_eq!(plan.upscaled, Some(PathBuf::from(expected)));
    }

    #[test]
    fn main_only() {
        let plan = plan(&naming("p_", "_up"), "x.bmp", true, false).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("p_x.png")));
        assert_eq!(plan.upscaled, None);
    }

    #[test]
    fn both_disabled_is_configuration_error() {
        let err = plan(&naming("p_", "_up"), "x.png", false, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FatalConfiguration);
    }

    #[test]
    fn empty_prefix_and_suffix_never_overwrite_source() {
        let plan = plan(&naming("", ""), "dir/icon.png", true, true).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("dir/icon_reduced.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("dir/icon_8x.png")));
    }

    #[test]
    fn empty_suffix_does_not_collide_with_main() {
        let plan = plan(&naming("p_", ""), "icon.png", true, true).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("p_icon.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("p_icon_8x.png")));
    }

    #[test]
    fn empty_prefix_on_lossy_input() {
        let plan = plan(&naming("", ""), "shot.jpg", true, true).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("shot.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("shot_8x.jpg")));
    }

    #[test]
    fn sibling_input_is_not_overwritten() {
        let taken = HashSet::from([PathBuf::from("art/a.png")]);
        let plan = naming("", "")
            .plan(Path::new("art/a.jpg"), true, true, &taken)
            .unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("art/a_reduced.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("art/a_8x.jpg")));
    }

    #[test]
    fn tagged_name_taken_too_gets_a_counter() {
        let taken = HashSet::from([
            PathBuf::from("a.png"),
            PathBuf::from("a_reduced.png"),
            PathBuf::from("a_reduced_2.png"),
            PathBuf::from("a_8x.jpg"),
        ]);
        let plan = naming("", "").plan(Path::new("a.jpg"), true, true, &taken).unwrap();
        assert_eq!(plan.main, Some(PathBuf::from("a_reduced_3.png")));
        assert_eq!(plan.upscaled, Some(PathBuf::from("a_8x_2.jpg")));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let err = plan(&naming("p_", "_up"), "/", true, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
