// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Read-only options governing destination layout and move behavior.
/// Owned by the caller; a batch run never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Root directory the show/season tree is built under
    pub destination_root: PathBuf,

    /// Filename template. Substitution tokens:
    /// `%S` show name, `%s` season, `%0s` zero-padded season,
    /// `%e` episode (ranges joined with `-`), `%0e` zero-padded
    /// episode, `%t` episode title, `%d` air date (YYYY-MM-DD).
    pub rename_template: String,

    /// Prefix of the per-season folder ("Season " gives "Season 7")
    pub season_folder_prefix: String,

    /// Zero-pad the season number in the season folder name
    pub zero_pad_season_folder: bool,

    /// Relocate files into the destination tree
    pub move_enabled: bool,

    /// Rewrite filenames from the template
    pub rename_enabled: bool,

    /// Delete a source directory left empty by a successful move
    pub remove_empty_source_dirs: bool,

    /// Replace an existing destination file representing the same
    /// episode instead of writing a versioned name
    pub always_overwrite: bool,

    /// Keep the source file's modification time on the moved file.
    /// Disabling this stamps the move time instead.
    pub preserve_timestamp: bool,

    /// Scan destination directories for other copies of a just-moved
    /// episode and report them as deletion candidates
    pub detect_duplicates: bool,

    /// Upper bound on concurrently executing movers in a batch
    pub max_parallel_moves: usize,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::new(),
            rename_template: "S%0sE%0e %t".to_string(),
            season_folder_prefix: "Season ".to_string(),
            zero_pad_season_folder: false,
            move_enabled: true,
            rename_enabled: true,
            remove_empty_source_dirs: false,
            always_overwrite: false,
            preserve_timestamp: true,
            detect_duplicates: false,
            max_parallel_moves: 4,
        }
    }
}

impl RenameConfig {
    /// Convenience for tests and embedders: defaults with a root
    pub fn with_destination(root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: root.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_behavior() {
        let config = RenameConfig::default();
        assert_eq!(config.rename_template, "S%0sE%0e %t");
        assert_eq!(config.season_folder_prefix, "Season ");
        assert!(config.preserve_timestamp);
        assert!(!config.always_overwrite);
        assert!(config.move_enabled && config.rename_enabled);
        assert_eq!(config.max_parallel_moves, 4);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: RenameConfig =
            serde_json::from_str(r#"{"destination_root": "/library/tv", "always_overwrite": true}"#)
                .unwrap();
        assert_eq!(config.destination_root, PathBuf::from("/library/tv"));
        assert!(config.always_overwrite);
        assert_eq!(config.rename_template, "S%0sE%0e %t");
    }
}
