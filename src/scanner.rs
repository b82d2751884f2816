//! Image directory scanner.
//!
//! Lists the image directory (one level, no recursion), keeps the front
//! faces of recipe cards, and drops the ones the store already holds.
//!
//! Store keys are written relative to the directory holding the store
//! file, so `./images`, `images` and `/srv/cards/images` all record
//! `images/<file>` for a store at `/srv/cards/data.json`. When the image
//! directory is not under the store's directory, or there is no store
//! directory, the configured form is kept with `.` components removed.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ImagesConfig;

/// A front image that has not been extracted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Bare file name, e.g. `hf_chicken-katsu_front.webp`.
    pub file_name: String,
    /// Store key and `image_front` value, e.g. `images/hf_chicken-katsu_front.webp`.
    pub image_front: String,
    /// Derived `image_back` value. Not checked for existence.
    pub image_back: String,
    /// On-disk location of the front image.
    pub front_path: PathBuf,
    /// On-disk location the back image would have.
    pub back_path: PathBuf,
}

/// Output of a directory scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Pending candidates, sorted by `image_front`.
    pub candidates: Vec<Candidate>,
    /// Front images skipped because the store already has them.
    pub already_processed: usize,
}

/// Scans `images.dir` for front images not present in `processed`.
///
/// `key_root` is the directory store keys are made relative to (see the
/// module docs). A missing or unreadable directory is an error; individual
/// entries that cannot be inspected are skipped.
pub fn scan_images(
    images: &ImagesConfig,
    processed: &HashSet<String>,
    key_root: Option<&Path>,
) -> Result<ScanResult> {
    let dir = &images.dir;
    // Surface a missing or unreadable directory here, not as an empty scan.
    std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list image directory: {}", dir.display()))?;

    let key_prefix = key_dir(dir, key_root);
    let mut result = ScanResult::default();

    let walker = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true);
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !file_name.ends_with(&images.front_suffix) {
            continue;
        }

        let candidate = build_candidate(dir, &key_prefix, &file_name, images);
        if processed.contains(&candidate.image_front) {
            result.already_processed += 1;
            continue;
        }
        result.candidates.push(candidate);
    }

    // Sort for deterministic ordering
    result
        .candidates
        .sort_by(|a, b| a.image_front.cmp(&b.image_front));

    Ok(result)
}

fn build_candidate(
    dir: &Path,
    key_dir: &Path,
    file_name: &str,
    images: &ImagesConfig,
) -> Candidate {
    let back_name = back_file_name(file_name, &images.front_suffix, &images.back_suffix);
    let image_front = store_path(key_dir, file_name);
    let image_back = image_front.replacen(&images.front_suffix, &images.back_suffix, 1);
    Candidate {
        file_name: file_name.to_string(),
        image_front,
        image_back,
        front_path: dir.join(file_name),
        back_path: dir.join(back_name),
    }
}

/// Sibling back-face file name: the first front suffix swapped for the back suffix.
pub fn back_file_name(front_name: &str, front_suffix: &str, back_suffix: &str) -> String {
    front_name.replacen(front_suffix, back_suffix, 1)
}

/// Directory prefix used for store keys: `dir` relative to `key_root` when
/// it lies inside it, otherwise `dir` as configured.
pub fn key_dir(dir: &Path, key_root: Option<&Path>) -> PathBuf {
    let relative = key_root.and_then(|root| {
        let root = std::fs::canonicalize(root).ok()?;
        let dir = std::fs::canonicalize(dir).ok()?;
        dir.strip_prefix(&root).ok().map(Path::to_path_buf)
    });
    relative.unwrap_or_else(|| dir.to_path_buf())
}

/// Path recorded in the store: `dir/name` with `.` components removed, so
/// `./images` and `images` produce the same key.
pub fn store_path(dir: &Path, file_name: &str) -> String {
    let cleaned: PathBuf = dir
        .join(file_name)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    cleaned.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn images_config(dir: &Path) -> ImagesConfig {
        ImagesConfig {
            dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"RIFF").unwrap();
    }

    #[test]
    fn test_store_path_drops_current_dir() {
        assert_eq!(
            store_path(Path::new("./images"), "g_1_front.webp"),
            "images/g_1_front.webp"
        );
        assert_eq!(
            store_path(Path::new("images"), "g_1_front.webp"),
            "images/g_1_front.webp"
        );
    }

    #[test]
    fn test_back_file_name_replaces_first_suffix_only() {
        assert_eq!(
            back_file_name("hf_x_front.webp", "_front.webp", "_back.webp"),
            "hf_x_back.webp"
        );
        assert_eq!(
            back_file_name("a_front.webp_front.webp", "_front.webp", "_back.webp"),
            "a_back.webp_front.webp"
        );
    }

    #[test]
    fn test_scan_keeps_only_front_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "g_zeta_front.webp");
        touch(dir, "g_zeta_back.webp");
        touch(dir, "hf_alpha_front.webp");
        touch(dir, "notes.txt");
        std::fs::create_dir(dir.join("sub_front.webp")).unwrap();
        std::fs::create_dir(dir.join("nested")).unwrap();
        touch(&dir.join("nested"), "g_deep_front.webp");

        let result = scan_images(&images_config(dir), &HashSet::new(), None).unwrap();
        let names: Vec<_> = result.candidates.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["g_zeta_front.webp", "hf_alpha_front.webp"]);
        assert_eq!(result.already_processed, 0);
    }

    #[test]
    fn test_scan_skips_processed() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "g_a_front.webp");
        touch(dir, "g_b_front.webp");

        let processed: HashSet<String> = [store_path(dir, "g_a_front.webp")].into_iter().collect();
        let result = scan_images(&images_config(dir), &processed, None).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].file_name, "g_b_front.webp");
        assert_eq!(result.already_processed, 1);
    }

    #[test]
    fn test_candidate_paths() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        touch(dir, "hf_katsu_front.webp");

        let result = scan_images(&images_config(dir), &HashSet::new(), None).unwrap();
        let c = &result.candidates[0];
        assert!(c.image_front.ends_with("/hf_katsu_front.webp"));
        assert!(c.image_back.ends_with("/hf_katsu_back.webp"));
        assert_eq!(c.back_path, dir.join("hf_katsu_back.webp"));
        assert_eq!(c.front_path, dir.join("hf_katsu_front.webp"));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_images(&images_config(&tmp.path().join("nope")), &HashSet::new(), None)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to list image directory"));
    }

    #[test]
    fn test_keys_are_relative_to_store_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir(root.join("images")).unwrap();
        touch(&root.join("images"), "g_a_front.webp");

        for dir in [root.join("images"), root.join("images").join("..").join("images")] {
            let result = scan_images(&images_config(&dir), &HashSet::new(), Some(root)).unwrap();
            let c = &result.candidates[0];
            assert_eq!(c.image_front, "images/g_a_front.webp", "dir {:?}", dir);
            assert_eq!(c.image_back, "images/g_a_back.webp");
            assert_eq!(c.front_path, dir.join("g_a_front.webp"));
        }
    }

    #[test]
    fn test_keys_fall_back_outside_store_directory() {
        let images = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        touch(images.path(), "g_a_front.webp");

        let result =
            scan_images(&images_config(images.path()), &HashSet::new(), Some(store.path())).unwrap();
        assert_eq!(
            result.candidates[0].image_front,
            store_path(images.path(), "g_a_front.webp")
        );
    }

    #[test]
    fn test_images_in_store_directory_use_bare_names() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "g_a_front.webp");
        let result =
            scan_images(&images_config(tmp.path()), &HashSet::new(), Some(tmp.path())).unwrap();
        assert_eq!(result.candidates[0].image_front, "g_a_front.webp");
    }
}
