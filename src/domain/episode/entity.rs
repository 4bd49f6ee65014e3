// src/domain/episode/entity.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::invariants::transition_allowed;
use crate::domain::show::ShowCandidate;
use crate::domain::{DomainError, DomainResult};

/// Season and episode numbers extracted from a filename.
/// Supports multi-episode files ("S01E02E03"); `episodes` is non-empty
/// and ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodePlacement {
    pub season: u32,
    pub episodes: Vec<u32>,
}

impl EpisodePlacement {
    pub fn new(season: u32, episode: u32) -> Self {
        Self {
            season,
            episodes: vec![episode],
        }
    }

    pub fn range(season: u32, start: u32, end: u32) -> Self {
        Self {
            season,
            episodes: (start.min(end)..=start.max(end)).collect(),
        }
    }

    pub fn first_episode(&self) -> u32 {
        self.episodes[0]
    }

    /// Episode identity independent of the notation the numbers were
    /// written in: same season, same episode numbers.
    pub fn same_episode(&self, other: &EpisodePlacement) -> bool {
        self.season == other.season && self.episodes == other.episodes
    }
}

impl std::fmt::Display for EpisodePlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.first_episode())?;
        if let Some(last) = self.episodes.last().filter(|_| self.episodes.len() > 1) {
            write!(f, "-E{:02}", last)?;
        }
        Ok(())
    }
}

/// Where in its journey from raw filename to final disposition a
/// record currently is. Transitions are one-directional; the only
/// re-entries are the explicit move retry and re-resolution after an
/// ambiguous or empty lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unparsed,
    ParseFailed,
    Parsed,
    ShowResolved,
    ShowAmbiguous,
    ShowNotFound,
    EpisodeResolved,
    ReadyToMove,
    Moved,
    MoveFailed,
}

impl LifecycleState {
    /// Terminal states are never re-processed by a batch run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::ParseFailed | LifecycleState::Moved | LifecycleState::MoveFailed
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Unparsed => "unparsed",
            LifecycleState::ParseFailed => "parse_failed",
            LifecycleState::Parsed => "parsed",
            LifecycleState::ShowResolved => "show_resolved",
            LifecycleState::ShowAmbiguous => "show_ambiguous",
            LifecycleState::ShowNotFound => "show_not_found",
            LifecycleState::EpisodeResolved => "episode_resolved",
            LifecycleState::ReadyToMove => "ready_to_move",
            LifecycleState::Moved => "moved",
            LifecycleState::MoveFailed => "move_failed",
        };
        write!(f, "{}", name)
    }
}

/// The unit of work flowing through the pipeline: one video file's
/// journey from raw name to final disposition.
///
/// The lifecycle state is private; every mutation goes through a
/// guarded `mark_*` method so that illegal states (a moved record with
/// no resolved show, a destination without a placement) cannot be
/// constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Where the file currently lives
    pub source_path: PathBuf,

    /// Show-name text extracted from the filename
    pub extracted_show_name: Option<String>,

    /// Season/episode numbers extracted from the filename
    pub placement: Option<EpisodePlacement>,

    /// File suffix without the dot ("mkv", "mp4")
    pub suffix: Option<String>,

    /// The show this file belongs to, once resolution decided
    pub resolved_show: Option<ShowCandidate>,

    /// Episode title, once the provider supplied it
    pub episode_title: Option<String>,

    /// First-air date, once the provider supplied it
    pub air_date: Option<NaiveDate>,

    /// Computed destination, once the record is ready to move
    pub destination_path: Option<PathBuf>,

    state: LifecycleState,

    /// Parse-failure or move-failure reason for the end-of-batch report
    pub last_diagnostic: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EpisodeRecord {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_path: source_path.into(),
            extracted_show_name: None,
            placement: None,
            suffix: None,
            resolved_show: None,
            episode_title: None,
            air_date: None,
            destination_path: None,
            state: LifecycleState::Unparsed,
            last_diagnostic: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Filename portion of the source path
    pub fn source_file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Guarded lifecycle transitions
    // ------------------------------------------------------------------

    pub fn mark_parsed(
        &mut self,
        show_name: impl Into<String>,
        placement: EpisodePlacement,
        suffix: Option<String>,
    ) -> DomainResult<()> {
        self.transition(LifecycleState::Parsed)?;
        self.extracted_show_name = Some(show_name.into());
        self.placement = Some(placement);
        self.suffix = suffix;
        Ok(())
    }

    pub fn mark_parse_failed(&mut self, diagnostic: impl Into<String>) -> DomainResult<()> {
        self.transition(LifecycleState::ParseFailed)?;
        self.last_diagnostic = Some(diagnostic.into());
        Ok(())
    }

    pub fn mark_show_resolved(&mut self, show: ShowCandidate) -> DomainResult<()> {
        self.transition(LifecycleState::ShowResolved)?;
        self.resolved_show = Some(show);
        Ok(())
    }

    pub fn mark_show_ambiguous(&mut self) -> DomainResult<()> {
        self.transition(LifecycleState::ShowAmbiguous)
    }

    pub fn mark_show_not_found(&mut self) -> DomainResult<()> {
        self.transition(LifecycleState::ShowNotFound)
    }

    pub fn mark_episode_resolved(
        &mut self,
        title: impl Into<String>,
        air_date: Option<NaiveDate>,
    ) -> DomainResult<()> {
        self.transition(LifecycleState::EpisodeResolved)?;
        self.episode_title = Some(title.into());
        self.air_date = air_date;
        Ok(())
    }

    pub fn mark_ready_to_move(&mut self, destination: impl Into<PathBuf>) -> DomainResult<()> {
        if self.resolved_show.is_none() {
            return Err(DomainError::MissingResolvedShow);
        }
        if self.placement.is_none() {
            return Err(DomainError::MissingPlacement);
        }
        self.transition(LifecycleState::ReadyToMove)?;
        self.destination_path = Some(destination.into());
        Ok(())
    }

    pub fn mark_moved(&mut self) -> DomainResult<()> {
        if self.destination_path.is_none() {
            return Err(DomainError::MissingDestination);
        }
        self.transition(LifecycleState::Moved)?;
        self.last_diagnostic = None;
        Ok(())
    }

    pub fn mark_move_failed(&mut self, diagnostic: impl Into<String>) -> DomainResult<()> {
        self.transition(LifecycleState::MoveFailed)?;
        self.last_diagnostic = Some(diagnostic.into());
        Ok(())
    }

    /// Explicit retry: the same record goes back to the move queue.
    /// No new record is created for a retry.
    pub fn retry_move(&mut self) -> DomainResult<()> {
        self.transition(LifecycleState::ReadyToMove)?;
        self.last_diagnostic = None;
        Ok(())
    }

    /// Update the destination of a record that is already ready to
    /// move, used when a conflict forces a versioned name.
    pub fn set_destination(&mut self, destination: impl Into<PathBuf>) -> DomainResult<()> {
        if self.state != LifecycleState::ReadyToMove {
            return Err(DomainError::IllegalTransition {
                from: self.state.to_string(),
                to: LifecycleState::ReadyToMove.to_string(),
            });
        }
        self.destination_path = Some(destination.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    fn transition(&mut self, to: LifecycleState) -> DomainResult<()> {
        if !transition_allowed(self.state, to) {
            return Err(DomainError::IllegalTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
