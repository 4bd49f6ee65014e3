// src/services/move_types.rs
//
// Value types and small machines supporting the move engine:
// failure taxonomy, destination planning, the per-batch directory
// probe cache, and the end-of-batch report.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::RenameConfig;
use crate::domain::{DomainError, EpisodePlacement, EpisodeRecord};
use crate::error::{AppError, AppResult};
use crate::text::sanitize_for_filename;

// ============================================================================
// MOVE FAILURE
// ============================================================================

/// Why a single move failed. Per-file and isolated: one file's failure
/// never aborts the rest of the batch. The `Display` string becomes
/// the record's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MoveFailure {
    #[error("not writable: {0}")]
    NotWritable(String),

    #[error("destination conflict: {0}")]
    DestinationConflict(String),

    #[error("io error: {0}")]
    IoError(String),
}

// ============================================================================
// DESTINATION PLANNING
// ============================================================================

/// Compute the destination path for a record that has a resolved show,
/// placement and episode title, from the configured layout:
/// root / show folder / season folder / rendered filename.
///
/// With moving disabled the file stays in its source directory; with
/// renaming disabled it keeps its original name.
pub fn plan_destination(record: &EpisodeRecord, config: &RenameConfig) -> AppResult<PathBuf> {
    let show = record
        .resolved_show
        .as_ref()
        .ok_or(AppError::Domain(DomainError::MissingResolvedShow))?;
    let placement = record
        .placement
        .as_ref()
        .ok_or(AppError::Domain(DomainError::MissingPlacement))?;

    let directory = if config.move_enabled {
        let season_number = if config.zero_pad_season_folder {
            format!("{:02}", placement.season)
        } else {
            placement.season.to_string()
        };
        config
            .destination_root
            .join(sanitize_for_filename(show.display_name()))
            .join(format!("{}{}", config.season_folder_prefix, season_number))
    } else {
        record
            .source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    };

    let file_name = if config.rename_enabled {
        let stem = sanitize_for_filename(&render_template(
            &config.rename_template,
            &TemplateContext {
                show_name: show.display_name(),
                placement,
                title: record.episode_title.as_deref().unwrap_or(""),
                air_date: record.air_date,
            },
        ));
        match record.suffix.as_deref() {
            Some(suffix) => format!("{}.{}", stem, suffix),
            None => stem,
        }
    } else {
        record.source_file_name()
    };

    Ok(directory.join(file_name))
}

/// Everything a filename template can substitute
pub struct TemplateContext<'a> {
    pub show_name: &'a str,
    pub placement: &'a EpisodePlacement,
    pub title: &'a str,
    pub air_date: Option<chrono::NaiveDate>,
}

/// Render a filename template. Tokens: `%S` show name, `%s` season,
/// `%0s` zero-padded season, `%e` episode numbers (ranges joined with
/// `-`), `%0e` zero-padded episodes, `%t` title, `%d` air date
/// (YYYY-MM-DD, empty when unknown). Unknown tokens pass through.
pub fn render_template(template: &str, ctx: &TemplateContext<'_>) -> String {
    let join = |pad: bool| -> String {
        ctx.placement
            .episodes
            .iter()
            .map(|e| {
                if pad {
                    format!("{:02}", e)
                } else {
                    e.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    };

    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('0') => {
                chars.next();
                match chars.next() {
                    Some('s') => out.push_str(&format!("{:02}", ctx.placement.season)),
                    Some('e') => out.push_str(&join(true)),
                    Some(other) => {
                        out.push('%');
                        out.push('0');
                        out.push(other);
                    }
                    None => out.push_str("%0"),
                }
            }
            Some('S') => {
                chars.next();
                out.push_str(ctx.show_name);
            }
            Some('s') => {
                chars.next();
                out.push_str(&ctx.placement.season.to_string());
            }
            Some('e') => {
                chars.next();
                out.push_str(&join(false));
            }
            Some('t') => {
                chars.next();
                out.push_str(ctx.title);
            }
            Some('d') => {
                chars.next();
                if let Some(date) = ctx.air_date {
                    out.push_str(&date.format("%Y-%m-%d").to_string());
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

/// A non-colliding sibling of `destination`: "name (1).mkv",
/// "name (2).mkv", ... The attempt cap turns a pathological directory
/// into an explicit conflict instead of an endless probe.
pub fn versioned_destination(destination: &Path) -> Result<PathBuf, MoveFailure> {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = destination.extension().map(|s| s.to_string_lossy().into_owned());
    let parent = destination.parent().map(Path::to_path_buf).unwrap_or_default();

    for n in 1..=99u32 {
        let name = match &suffix {
            Some(suffix) => format!("{} ({}).{}", stem, n, suffix),
            None => format!("{} ({})", stem, n),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(MoveFailure::DestinationConflict(format!(
        "no free versioned name for {}",
        destination.display()
    )))
}

// ============================================================================
// DIRECTORY PROBE CACHE
// ============================================================================

/// Per-batch cache of verified destination directories. Each distinct
/// directory is checked and created at most once per batch; concurrent
/// movers targeting the same new directory serialize here, so exactly
/// one creates it and the rest observe readiness. Constructed fresh
/// for every batch run.
#[derive(Debug, Default)]
pub struct DirectoryProber {
    /// dir -> topmost path component this batch had to create, when
    /// the directory did not pre-exist
    verified: Mutex<HashMap<PathBuf, Option<PathBuf>>>,
}

impl DirectoryProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the directory exists, creating it if needed. Later calls
    /// for the same directory are cache hits with no filesystem round
    /// trip.
    pub fn ensure(&self, dir: &Path) -> io::Result<()> {
        let mut verified = self.verified.lock().unwrap();
        if verified.contains_key(dir) {
            return Ok(());
        }

        if dir.is_dir() {
            verified.insert(dir.to_path_buf(), None);
            return Ok(());
        }

        let topmost_created = first_missing_ancestor(dir);
        match std::fs::create_dir_all(dir) {
            Ok(()) => {}
            // Lost a race against something outside the batch: the
            // directory exists, which is all we wanted
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
        verified.insert(dir.to_path_buf(), topmost_created);
        Ok(())
    }

    /// Number of directories verified so far (for tests and reporting)
    pub fn verified_count(&self) -> usize {
        self.verified.lock().unwrap().len()
    }

    /// Remove a directory chain this batch created, when a failed move
    /// left it empty. Pre-existing directories are never touched, and
    /// the cache entry is dropped so a later mover can recreate it.
    pub fn rollback_if_created(&self, dir: &Path) {
        let mut verified = self.verified.lock().unwrap();
        let Some(Some(topmost)) = verified.get(dir).cloned() else {
            return;
        };

        // remove_dir refuses non-empty directories, which is exactly
        // the guarantee needed: stop at the first one in use
        let mut current = dir.to_path_buf();
        loop {
            if std::fs::remove_dir(&current).is_err() {
                break;
            }
            if current == topmost {
                break;
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        if !dir.exists() {
            verified.remove(dir);
        }
    }
}

fn first_missing_ancestor(dir: &Path) -> Option<PathBuf> {
    let mut topmost = None;
    let mut current = Some(dir);
    while let Some(path) = current {
        if path.exists() {
            break;
        }
        topmost = Some(path.to_path_buf());
        current = path.parent();
    }
    topmost
}

// ============================================================================
// DUPLICATES & BATCH REPORT
// ============================================================================

/// How a duplicate-cleanup candidate was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMatch {
    /// Same season/episode numbers, any notation
    EpisodeIdentity,
    /// Same base filename, different suffix or copy
    BaseName,
}

/// Another video file in a destination directory that appears to hold
/// an episode a batch just moved. Presented for user-confirmed
/// deletion; never deleted automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub record_id: Uuid,
    pub path: PathBuf,
    pub matched_by: DuplicateMatch,
}

/// Outcome of one batch run: every record terminal, every non-success
/// carrying a diagnostic, plus the aggregate counts the presentation
/// layer reports.
#[derive(Debug)]
pub struct MoveBatchReport {
    pub records: Vec<EpisodeRecord>,
    pub moved: usize,
    pub failed: usize,
    /// Records skipped because they were already terminal
    pub skipped: usize,
    pub stopped_early: bool,
    pub duration_ms: u64,
    pub duplicates: Vec<DuplicateCandidate>,
}

impl MoveBatchReport {
    /// (source path, diagnostic) for every record that did not move
    pub fn failures(&self) -> impl Iterator<Item = (&EpisodeRecord, &str)> {
        self.records.iter().filter_map(|r| {
            r.last_diagnostic
                .as_deref()
                .map(|diagnostic| (r, diagnostic))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShowCandidate;
    use chrono::NaiveDate;

    fn ready_record() -> EpisodeRecord {
        let mut record = EpisodeRecord::new("D:/incoming/7x04.Rebel.Appliance.mp4");
        record
            .mark_parsed(
                "Robot Chicken",
                EpisodePlacement::new(7, 4),
                Some("mp4".into()),
            )
            .unwrap();
        record
            .mark_show_resolved(ShowCandidate::new("75734", "Robot Chicken"))
            .unwrap();
        record
            .mark_episode_resolved("Rebel Appliance", NaiveDate::from_ymd_opt(2014, 4, 13))
            .unwrap();
        record
    }

    #[test]
    fn test_plan_destination_builds_show_season_tree() {
        let record = ready_record();
        let config = RenameConfig::with_destination("D:/TV");

        let destination = plan_destination(&record, &config).unwrap();
        assert_eq!(
            destination,
            PathBuf::from("D:/TV/Robot Chicken/Season 7/S07E04 Rebel Appliance.mp4")
        );
    }

    #[test]
    fn test_plan_destination_rename_only_keeps_directory() {
        let record = ready_record();
        let mut config = RenameConfig::with_destination("D:/TV");
        config.move_enabled = false;

        let destination = plan_destination(&record, &config).unwrap();
        assert_eq!(
            destination,
            PathBuf::from("D:/incoming/S07E04 Rebel Appliance.mp4")
        );
    }

    #[test]
    fn test_plan_destination_move_only_keeps_name() {
        let record = ready_record();
        let mut config = RenameConfig::with_destination("D:/TV");
        config.rename_enabled = false;

        let destination = plan_destination(&record, &config).unwrap();
        assert_eq!(
            destination,
            PathBuf::from("D:/TV/Robot Chicken/Season 7/7x04.Rebel.Appliance.mp4")
        );
    }

    #[test]
    fn test_plan_destination_sanitizes_show_and_title() {
        let mut record = EpisodeRecord::new("/in/show 1x01.mkv");
        record
            .mark_parsed("show", EpisodePlacement::new(1, 1), Some("mkv".into()))
            .unwrap();
        record
            .mark_show_resolved(ShowCandidate::new("1", "Marvel's Agents of S.H.I.E.L.D."))
            .unwrap();
        record.mark_episode_resolved("What? A: Title", None).unwrap();

        let config = RenameConfig::with_destination("/tv");
        let destination = plan_destination(&record, &config).unwrap();
        assert_eq!(
            destination,
            PathBuf::from("/tv/Marvel's Agents of S.H.I.E.L.D./Season 1/S01E01 What A- Title.mkv")
        );
    }

    #[test]
    fn test_render_template_tokens() {
        let placement = EpisodePlacement::range(7, 4, 5);
        let ctx = TemplateContext {
            show_name: "Robot Chicken",
            placement: &placement,
            title: "Rebel Appliance",
            air_date: NaiveDate::from_ymd_opt(2014, 4, 13),
        };

        assert_eq!(
            render_template("%S - %sx%e - %t", &ctx),
            "Robot Chicken - 7x4-5 - Rebel Appliance"
        );
        assert_eq!(
            render_template("S%0sE%0e %t (%d)", &ctx),
            "S07E04-05 Rebel Appliance (2014-04-13)"
        );
        // Unknown tokens pass through untouched
        assert_eq!(render_template("%q %", &ctx), "%q %");
    }

    #[test]
    fn test_zero_padded_season_folder() {
        let record = ready_record();
        let mut config = RenameConfig::with_destination("D:/TV");
        config.zero_pad_season_folder = true;

        let destination = plan_destination(&record, &config).unwrap();
        assert!(destination.starts_with("D:/TV/Robot Chicken/Season 07"));
    }

    #[test]
    fn test_versioned_destination_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("S01E01 Pilot.mkv");
        std::fs::write(&base, b"x").unwrap();
        std::fs::write(dir.path().join("S01E01 Pilot (1).mkv"), b"x").unwrap();

        let versioned = versioned_destination(&base).unwrap();
        assert_eq!(versioned, dir.path().join("S01E01 Pilot (2).mkv"));
    }

    #[test]
    fn test_prober_verifies_each_directory_once() {
        let root = tempfile::tempdir().unwrap();
        let prober = DirectoryProber::new();
        let dir = root.path().join("Show/Season 1");

        prober.ensure(&dir).unwrap();
        prober.ensure(&dir).unwrap();
        prober.ensure(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(prober.verified_count(), 1);
    }

    #[test]
    fn test_prober_rollback_removes_only_created_dirs() {
        let root = tempfile::tempdir().unwrap();
        let pre_existing = root.path().join("Show");
        std::fs::create_dir(&pre_existing).unwrap();

        let prober = DirectoryProber::new();
        let dir = pre_existing.join("Season 2/extras");
        prober.ensure(&dir).unwrap();
        assert!(dir.is_dir());

        prober.rollback_if_created(&dir);
        assert!(!dir.exists());
        assert!(!pre_existing.join("Season 2").exists());
        assert!(pre_existing.is_dir());
    }

    #[test]
    fn test_prober_rollback_spares_occupied_dirs() {
        let root = tempfile::tempdir().unwrap();
        let prober = DirectoryProber::new();
        let dir = root.path().join("Show/Season 1");
        prober.ensure(&dir).unwrap();
        std::fs::write(dir.join("keeper.mkv"), b"x").unwrap();

        prober.rollback_if_created(&dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_prober_rollback_ignores_pre_existing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("already/there");
        std::fs::create_dir_all(&dir).unwrap();

        let prober = DirectoryProber::new();
        prober.ensure(&dir).unwrap();
        prober.rollback_if_created(&dir);

        assert!(dir.is_dir());
    }
}
