// src/services/move_service.rs
//
// Move Engine
//
// Executes filesystem relocation for resolved records: one mover per
// file, a bounded-concurrency batch runner on top. A single move
// either completes fully (source gone, destination present and
// correct) or fails fully (source intact, no partial destination
// artifact); one file's failure never touches the rest of the batch.

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tokio::sync::Semaphore;
use walkdir::WalkDir;

use crate::config::RenameConfig;
use crate::domain::{EpisodeRecord, LifecycleState};
use crate::error::AppResult;
use crate::events::{
    DuplicatesDetected, EventBus, FileMoveFinished, FileMoveProgressed, FileMoveStarted,
    MoveBatchCompleted,
};
use crate::parser::{FilenameParser, VIDEO_SUFFIXES};
use crate::services::move_types::{
    versioned_destination, DirectoryProber, DuplicateCandidate, DuplicateMatch, MoveBatchReport,
    MoveFailure,
};

/// Copy-fallback progress is reported at most once per this many bytes
const PROGRESS_CHUNK: u64 = 8 * 1024 * 1024;

// ============================================================================
// SINGLE MOVER
// ============================================================================

/// Moves one record's file to its computed destination. The mover owns
/// the record only for the duration of `attempt_move` and never
/// retains it.
pub struct FileMover {
    config: Arc<RenameConfig>,
    parser: Arc<FilenameParser>,
    event_bus: Arc<EventBus>,
}

impl FileMover {
    pub fn new(
        config: Arc<RenameConfig>,
        parser: Arc<FilenameParser>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            parser,
            event_bus,
        }
    }

    /// Attempt the move, mutating the record's lifecycle state and
    /// diagnostic. Observers receive, in order, one FileMoveStarted,
    /// zero or more FileMoveProgressed, and exactly one
    /// FileMoveFinished carrying the success flag, whatever the
    /// outcome. Unexpected faults inside the filesystem section are
    /// caught and reported as an ordinary IoError failure.
    pub fn attempt_move(&self, record: &mut EpisodeRecord, prober: &DirectoryProber) -> bool {
        if record.state() != LifecycleState::ReadyToMove {
            log::warn!(
                "mover skipping record {} in state {}",
                record.id,
                record.state()
            );
            return false;
        }

        let max = fs::metadata(&record.source_path).map(|m| m.len()).unwrap_or(0);
        self.event_bus.emit(FileMoveStarted::new(
            record.id,
            record.source_path.clone(),
            max,
        ));

        let destination_dir = record
            .destination_path
            .as_ref()
            .and_then(|d| d.parent())
            .map(Path::to_path_buf);

        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(record, prober)))
            .unwrap_or_else(|_| {
                Err(MoveFailure::IoError(
                    "unexpected fault during move".to_string(),
                ))
            });

        match outcome {
            Ok(final_destination) => {
                if let Err(e) = record
                    .set_destination(final_destination.clone())
                    .and_then(|_| record.mark_moved())
                {
                    log::error!("record {} refused moved state: {}", record.id, e);
                }
                log::info!(
                    "moved {} -> {}",
                    record.source_file_name(),
                    final_destination.display()
                );
                self.event_bus.emit(FileMoveFinished::new(
                    record.id,
                    true,
                    Some(final_destination),
                ));
                true
            }
            Err(failure) => {
                if let Some(dir) = destination_dir {
                    prober.rollback_if_created(&dir);
                }
                log::warn!("move failed for {}: {}", record.source_path.display(), failure);
                if let Err(e) = record.mark_move_failed(failure.to_string()) {
                    log::error!("record {} refused failed state: {}", record.id, e);
                }
                self.event_bus
                    .emit(FileMoveFinished::new(record.id, false, None));
                false
            }
        }
    }

    /// The filesystem section. Returns the final destination path,
    /// which differs from the planned one when a conflict forced a
    /// versioned name. Performs no record mutation.
    fn execute(
        &self,
        record: &EpisodeRecord,
        prober: &DirectoryProber,
    ) -> Result<PathBuf, MoveFailure> {
        let source = &record.source_path;
        let mut destination = record
            .destination_path
            .clone()
            .ok_or_else(|| MoveFailure::IoError("record has no destination".to_string()))?;

        // Already where it belongs: nothing to do
        if destination == *source {
            return Ok(destination);
        }

        let metadata = fs::metadata(source)
            .map_err(|e| MoveFailure::IoError(format!("{}: {}", source.display(), e)))?;

        // Writability gate, before any mutation
        if metadata.permissions().readonly() {
            return Err(MoveFailure::NotWritable(source.display().to_string()));
        }
        if let Some(parent) = source.parent() {
            let parent_readonly = fs::metadata(parent)
                .map(|m| m.permissions().readonly())
                .unwrap_or(false);
            if parent_readonly {
                return Err(MoveFailure::NotWritable(parent.display().to_string()));
            }
        }

        let destination_dir = destination
            .parent()
            .ok_or_else(|| MoveFailure::IoError("destination has no parent".to_string()))?
            .to_path_buf();
        prober
            .ensure(&destination_dir)
            .map_err(|e| MoveFailure::IoError(format!("{}: {}", destination_dir.display(), e)))?;

        if destination.exists() {
            destination = self.settle_conflict(record, destination)?;
        }

        let original_mtime = metadata.modified().ok();

        if fs::rename(source, &destination).is_err() {
            // Cross-device move (or a filesystem that refuses rename):
            // stage a hidden partial file next to the destination and
            // rename it into place, so no half-written file under the
            // final name is ever visible
            self.copy_then_swap(record, source, &destination, metadata.len())?;
            if let Err(e) = fs::remove_file(source) {
                // Keep the all-or-nothing contract: a source that will
                // not go means the move did not happen
                let _ = fs::remove_file(&destination);
                return Err(MoveFailure::IoError(format!(
                    "source not removable after copy: {}",
                    e
                )));
            }
        }

        // The file is in place; a timestamp hiccup must not undo that
        self.apply_timestamp(&destination, original_mtime);

        if self.config.remove_empty_source_dirs {
            if let Some(parent) = source.parent() {
                remove_dir_if_empty(parent);
            }
        }

        Ok(destination)
    }

    /// The destination path already holds a file. Same episode with
    /// always-overwrite replaces it; anything else gets a versioned
    /// non-colliding name - nothing is ever silently clobbered.
    fn settle_conflict(
        &self,
        record: &EpisodeRecord,
        destination: PathBuf,
    ) -> Result<PathBuf, MoveFailure> {
        let existing_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let same_episode = match (&record.placement, self.parser.episode_identity(&existing_name)) {
            (Some(ours), Some(theirs)) => ours.same_episode(&theirs),
            _ => false,
        };

        if same_episode && self.config.always_overwrite {
            fs::remove_file(&destination)
                .map_err(|e| MoveFailure::IoError(format!("replacing {}: {}", existing_name, e)))?;
            return Ok(destination);
        }

        versioned_destination(&destination)
    }

    fn copy_then_swap(
        &self,
        record: &EpisodeRecord,
        source: &Path,
        destination: &Path,
        total: u64,
    ) -> Result<(), MoveFailure> {
        let partial_name = destination
            .file_name()
            .map(|n| format!(".{}.partial", n.to_string_lossy()))
            .unwrap_or_else(|| ".move.partial".to_string());
        let partial = destination.with_file_name(partial_name);

        let result = (|| -> std::io::Result<()> {
            let mut reader = fs::File::open(source)?;
            let mut writer = fs::File::create(&partial)?;
            let mut buffer = vec![0u8; 64 * 1024];
            let mut copied: u64 = 0;
            let mut last_reported: u64 = 0;
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                writer.write_all(&buffer[..n])?;
                copied += n as u64;
                if copied - last_reported >= PROGRESS_CHUNK {
                    last_reported = copied;
                    self.event_bus.emit(FileMoveProgressed::new(
                        record.id,
                        copied,
                        Some(format!("{} / {} bytes", copied, total)),
                    ));
                }
            }
            writer.sync_all()?;
            drop(writer);
            fs::rename(&partial, destination)?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(MoveFailure::IoError(e.to_string()));
        }
        Ok(())
    }

    fn apply_timestamp(&self, destination: &Path, original_mtime: Option<SystemTime>) {
        let wanted = if self.config.preserve_timestamp {
            original_mtime
        } else {
            // Resetting to "now" is the explicit opt-in
            Some(SystemTime::now())
        };
        let Some(wanted) = wanted else {
            return;
        };

        let result = fs::File::options()
            .write(true)
            .open(destination)
            .and_then(|file| file.set_modified(wanted));
        if let Err(e) = result {
            log::warn!("could not set mtime on {}: {}", destination.display(), e);
        }
    }
}

fn remove_dir_if_empty(dir: &Path) {
    let is_empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        let _ = fs::remove_dir(dir);
    }
}

// ============================================================================
// BATCH RUNNER
// ============================================================================

/// Executes a list of movers as one batch on a bounded worker pool.
/// Construct one runner per batch run: the directory-probe cache and
/// the stop flag are per-batch state.
pub struct MoveBatchRunner {
    config: Arc<RenameConfig>,
    parser: Arc<FilenameParser>,
    event_bus: Arc<EventBus>,
    stop: Arc<AtomicBool>,
}

impl MoveBatchRunner {
    pub fn new(config: RenameConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            config: Arc::new(config),
            parser: Arc::new(FilenameParser::new()),
            event_bus,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Movers already past the stop check finish
    /// their file completely; records not yet started stay untouched.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Run the batch. Records already in a terminal state are skipped
    /// without re-running or double-counting progress. Completion
    /// order across files is unconstrained; per file the progress
    /// notifications stay strictly ordered because each record is
    /// owned by exactly one mover.
    pub async fn run(&self, records: Vec<EpisodeRecord>) -> MoveBatchReport {
        let started = Instant::now();
        let total = records.len();
        let prober = Arc::new(DirectoryProber::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_moves.max(1)));
        let mover = Arc::new(FileMover::new(
            Arc::clone(&self.config),
            Arc::clone(&self.parser),
            Arc::clone(&self.event_bus),
        ));

        let mut slots: Vec<Option<(EpisodeRecord, MoveOutcome)>> =
            (0..total).map(|_| None).collect();
        let mut handles = Vec::new();

        for (index, mut record) in records.into_iter().enumerate() {
            if record.is_terminal() {
                slots[index] = Some((record, MoveOutcome::Skipped));
                continue;
            }
            if record.state() != LifecycleState::ReadyToMove {
                log::debug!(
                    "batch skipping record {} in state {}",
                    record.id,
                    record.state()
                );
                slots[index] = Some((record, MoveOutcome::Skipped));
                continue;
            }

            let semaphore = Arc::clone(&semaphore);
            let mover = Arc::clone(&mover);
            let prober = Arc::clone(&prober);
            let stop = Arc::clone(&self.stop);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");

                // Cancellation happens between files, never inside one
                if stop.load(Ordering::SeqCst) {
                    return (index, record, MoveOutcome::Cancelled);
                }

                let (record, success) = tokio::task::spawn_blocking(move || {
                    let success = mover.attempt_move(&mut record, &prober);
                    (record, success)
                })
                .await
                .expect("mover does not panic");

                let outcome = if success {
                    MoveOutcome::Moved
                } else {
                    MoveOutcome::Failed
                };
                (index, record, outcome)
            }));
        }

        for handle in handles {
            let (index, record, outcome) = handle.await.expect("mover task does not panic");
            slots[index] = Some((record, outcome));
        }

        let mut report_records = Vec::with_capacity(total);
        let (mut moved, mut failed, mut skipped, mut cancelled) = (0usize, 0usize, 0usize, 0usize);
        for slot in slots {
            let (record, outcome) = slot.expect("every record gets a slot");
            match outcome {
                MoveOutcome::Moved => moved += 1,
                MoveOutcome::Failed => failed += 1,
                MoveOutcome::Skipped => skipped += 1,
                MoveOutcome::Cancelled => cancelled += 1,
            }
            report_records.push(record);
        }

        let duplicates = if self.config.detect_duplicates {
            self.collect_duplicates(&report_records)
        } else {
            Vec::new()
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        self.event_bus.emit(MoveBatchCompleted::new(
            total,
            moved,
            failed,
            skipped + cancelled,
            duration_ms,
        ));
        log::info!(
            "batch done: {} moved, {} failed, {} skipped in {} ms",
            moved,
            failed,
            skipped + cancelled,
            duration_ms
        );

        MoveBatchReport {
            records: report_records,
            moved,
            failed,
            skipped: skipped + cancelled,
            stopped_early: cancelled > 0,
            duration_ms,
            duplicates,
        }
    }

    /// Scan the destination directory of every file this batch moved
    /// for other video files holding the same episode, by fuzzy
    /// identity or by base filename. Files the batch itself moved are
    /// never candidates.
    fn collect_duplicates(&self, records: &[EpisodeRecord]) -> Vec<DuplicateCandidate> {
        let moved: Vec<&EpisodeRecord> = records
            .iter()
            .filter(|r| r.state() == LifecycleState::Moved)
            .collect();
        let moved_paths: HashSet<&Path> = moved
            .iter()
            .filter_map(|r| r.destination_path.as_deref())
            .collect();

        let mut duplicates = Vec::new();
        for record in &moved {
            let Some(destination) = record.destination_path.as_deref() else {
                continue;
            };
            let Some(dir) = destination.parent() else {
                continue;
            };
            let own_stem = destination
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut found_for_record = Vec::new();
            for entry in WalkDir::new(dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path == destination
                    || moved_paths.contains(path)
                {
                    continue;
                }
                let is_video = path
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| VIDEO_SUFFIXES.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false);
                if !is_video {
                    continue;
                }

                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let matched_by = match (&record.placement, self.parser.episode_identity(&name)) {
                    (Some(ours), Some(theirs)) if ours.same_episode(&theirs) => {
                        Some(DuplicateMatch::EpisodeIdentity)
                    }
                    _ => {
                        let stem = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        (stem == own_stem).then_some(DuplicateMatch::BaseName)
                    }
                };

                if let Some(matched_by) = matched_by {
                    found_for_record.push(DuplicateCandidate {
                        record_id: record.id,
                        path: path.to_path_buf(),
                        matched_by,
                    });
                }
            }

            if !found_for_record.is_empty() {
                log::debug!(
                    "{} duplicate(s) next to record {}",
                    found_for_record.len(),
                    record.id
                );
                self.event_bus.emit(DuplicatesDetected::new(
                    record.id,
                    found_for_record.iter().map(|d| d.path.clone()).collect(),
                ));
                duplicates.extend(found_for_record);
            }
        }
        duplicates
    }
}

/// Delete a duplicate the user confirmed. Separate from detection so
/// nothing is ever removed without an explicit decision.
pub fn remove_duplicate(candidate: &DuplicateCandidate) -> AppResult<()> {
    fs::remove_file(&candidate.path)?;
    log::info!("removed duplicate {}", candidate.path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveOutcome {
    Moved,
    Failed,
    Skipped,
    Cancelled,
}
