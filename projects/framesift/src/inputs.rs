// Local file collection for the command-line front end.

use anyhow::{Context, Result};
use framesift::config::ALLOWED_IMAGE_EXTENSIONS;
use framesift::photos::ImageInput;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| {
            let ext = s.to_lowercase();
            ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Image files under `root`, in file name order.
pub fn list_images(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| has_image_extension(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Read every image named by `paths`.
///
/// Files are taken as given. Directories are walked and only files with an
/// accepted image extension are kept; those are named by their path relative
/// to the directory so sub-folders survive into a sorted archive.
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<ImageInput>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for file in list_images(path) {
                let name = file
                    .strip_prefix(path)
                    .unwrap_or(&file)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                inputs.push(read_input(&file, name)?);
            }
        } else {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            inputs.push(read_input(path, name)?);
        }
    }
    Ok(inputs)
}

fn read_input(path: &Path, name: String) -> Result<ImageInput> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    Ok(ImageInput::new(name, bytes))
}
