// src/parser/mod.rs
//
// Filename parsing: turns a video file path into the initial
// EpisodeRecord, or records why it could not. Also home of the
// episode-identity extraction the move engine uses to recognize two
// notations of the same episode ("S02E01" vs "2x01").

use std::path::Path;

use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

use crate::domain::{EpisodePlacement, EpisodeRecord, LifecycleState};

/// File suffixes treated as video for scanning and duplicate detection
pub const VIDEO_SUFFIXES: [&str; 11] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts",
];

/// Why a filename could not be parsed. Diagnostic only: the file is
/// excluded from further processing, never silently dropped, and the
/// reasons are aggregated for the end-of-batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no show name found")]
    NoShowName,

    #[error("no season/episode pattern found")]
    NoSeasonEpisodePattern,

    #[error("unparsable file name")]
    Other,
}

/// Deterministic filename parser. All patterns are explicit and
/// ordered; the first match by position in the name wins.
pub struct FilenameParser {
    /// S01E02, S01E02E03, S01E02-E03, s1e2
    season_episode: Regex,
    /// 1x02, 7x04
    season_x_episode: Regex,
    /// Leading release-group tag, "[Group] Show ..."
    group_tag: Regex,
}

impl Default for FilenameParser {
    fn default() -> Self {
        Self {
            season_episode: Regex::new(
                r"(?i)\bs(\d{1,2})[ ._-]?e(\d{1,3})(?:[ ._-]*e(\d{1,3}))?",
            )
            .unwrap(),
            season_x_episode: Regex::new(r"\b(\d{1,2})x(\d{1,3})\b").unwrap(),
            group_tag: Regex::new(r"^\[.+?\]\s*").unwrap(),
        }
    }
}

impl FilenameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one file path into a record. The record comes back either
    /// `Parsed` or `ParseFailed` with its diagnostic set; the guarded
    /// transitions cannot fail from the `Unparsed` starting state.
    pub fn parse(&self, path: impl AsRef<Path>) -> EpisodeRecord {
        let path = path.as_ref();
        let mut record = EpisodeRecord::new(path);

        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => {
                record
                    .mark_parse_failed(ParseFailure::Other.to_string())
                    .expect("fresh record accepts parse failure");
                return record;
            }
        };

        let suffix = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let (placement, match_start) = match self.find_placement(&stem) {
            Some(found) => found,
            None => {
                record
                    .mark_parse_failed(ParseFailure::NoSeasonEpisodePattern.to_string())
                    .expect("fresh record accepts parse failure");
                return record;
            }
        };

        let show_name = self.clean_show_name(&stem[..match_start]);
        if show_name.is_empty() {
            record
                .mark_parse_failed(ParseFailure::NoShowName.to_string())
                .expect("fresh record accepts parse failure");
            return record;
        }

        record
            .mark_parsed(show_name, placement, suffix)
            .expect("fresh record accepts parse success");
        record
    }

    /// Walk a directory tree and parse every video file found,
    /// returning one record per file (parsed or diagnosed).
    pub fn scan_directory(&self, directory: impl AsRef<Path>) -> Vec<EpisodeRecord> {
        let mut records = Vec::new();
        for entry in WalkDir::new(directory.as_ref())
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let is_video = entry
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| VIDEO_SUFFIXES.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if is_video {
                records.push(self.parse(entry.path()));
            }
        }
        records
    }

    /// Season/episode numbers of a filename, independent of notation
    /// style and surrounding text. This is the fuzzy episode identity:
    /// "S02E01" and "2x01" extract the same placement.
    pub fn episode_identity(&self, file_name: &str) -> Option<EpisodePlacement> {
        self.find_placement(file_name).map(|(placement, _)| placement)
    }

    /// True when both filenames carry the same season and episode
    /// numbers, whatever notation each uses
    pub fn same_episode(&self, a: &str, b: &str) -> bool {
        match (self.episode_identity(a), self.episode_identity(b)) {
            (Some(pa), Some(pb)) => pa.same_episode(&pb),
            _ => false,
        }
    }

    fn find_placement(&self, text: &str) -> Option<(EpisodePlacement, usize)> {
        let se = self.season_episode.captures(text);
        let x = self.season_x_episode.captures(text);

        // Prefer whichever notation appears first in the name
        let captures = match (&se, &x) {
            (Some(a), Some(b)) => {
                let a_start = a.get(0).unwrap().start();
                let b_start = b.get(0).unwrap().start();
                if a_start <= b_start { se.as_ref() } else { x.as_ref() }
            }
            (Some(_), None) => se.as_ref(),
            (None, Some(_)) => x.as_ref(),
            (None, None) => return None,
        }?;

        let season: u32 = captures.get(1)?.as_str().parse().ok()?;
        let first: u32 = captures.get(2)?.as_str().parse().ok()?;
        let placement = match captures.get(3).and_then(|m| m.as_str().parse::<u32>().ok()) {
            Some(last) => EpisodePlacement::range(season, first, last),
            None => EpisodePlacement::new(season, first),
        };
        Some((placement, captures.get(0).unwrap().start()))
    }

    fn clean_show_name(&self, raw: &str) -> String {
        let without_group = self.group_tag.replace(raw, "");
        without_group
            .replace(['.', '_'], " ")
            .trim_matches(|c: char| c.is_whitespace() || c == '-')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Aggregated parse diagnostics for the post-batch summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub parsed: usize,
    pub no_show_name: usize,
    pub no_season_episode_pattern: usize,
    pub other: usize,
}

impl ParseSummary {
    /// Tally the records a parse pass produced
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a EpisodeRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            if record.state() != LifecycleState::ParseFailed {
                summary.parsed += 1;
                continue;
            }
            match record.last_diagnostic.as_deref() {
                Some(d) if d == ParseFailure::NoShowName.to_string() => summary.no_show_name += 1,
                Some(d) if d == ParseFailure::NoSeasonEpisodePattern.to_string() => {
                    summary.no_season_episode_pattern += 1
                }
                _ => summary.other += 1,
            }
        }
        summary
    }

    pub fn failed(&self) -> usize {
        self.no_show_name + self.no_season_episode_pattern + self.other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_notation() {
        let parser = FilenameParser::new();
        let record = parser.parse("/incoming/Show.Name.S01E02.Some.Title.mkv");

        assert_eq!(record.state(), LifecycleState::Parsed);
        assert_eq!(record.extracted_show_name.as_deref(), Some("Show Name"));
        assert_eq!(record.placement, Some(EpisodePlacement::new(1, 2)));
        assert_eq!(record.suffix.as_deref(), Some("mkv"));
    }

    #[test]
    fn test_parse_x_notation() {
        let parser = FilenameParser::new();
        let record = parser.parse("/incoming/Show Name - 1x02 - Title.avi");

        assert_eq!(record.state(), LifecycleState::Parsed);
        assert_eq!(record.extracted_show_name.as_deref(), Some("Show Name"));
        assert_eq!(record.placement, Some(EpisodePlacement::new(1, 2)));
    }

    #[test]
    fn test_parse_multi_episode_range() {
        let parser = FilenameParser::new();

        let record = parser.parse("/incoming/Show S02E01E02.mkv");
        assert_eq!(record.placement, Some(EpisodePlacement::range(2, 1, 2)));

        let record = parser.parse("/incoming/Show S02E01-E03.mkv");
        assert_eq!(record.placement, Some(EpisodePlacement::range(2, 1, 3)));
    }

    #[test]
    fn test_parse_strips_group_tag() {
        let parser = FilenameParser::new();
        let record = parser.parse("/incoming/[Group] Show Name S01E05 [1080p].mkv");

        assert_eq!(record.extracted_show_name.as_deref(), Some("Show Name"));
    }

    #[test]
    fn test_no_pattern_diagnostic() {
        let parser = FilenameParser::new();
        let record = parser.parse("/incoming/holiday video.mp4");

        assert_eq!(record.state(), LifecycleState::ParseFailed);
        assert_eq!(
            record.last_diagnostic.as_deref(),
            Some("no season/episode pattern found")
        );
    }

    #[test]
    fn test_no_show_name_diagnostic() {
        let parser = FilenameParser::new();
        let record = parser.parse("/incoming/7x04.Rebel.Appliance.mp4");

        assert_eq!(record.state(), LifecycleState::ParseFailed);
        assert_eq!(record.last_diagnostic.as_deref(), Some("no show name found"));
    }

    #[test]
    fn test_episode_identity_across_notations() {
        let parser = FilenameParser::new();

        assert!(parser.same_episode("Show.S02E01.mkv", "show 2x01 [final].mkv"));
        assert!(parser.same_episode("7x04.Rebel.Appliance.mp4", "S07E04 Rebel Appliance.mp4"));
        assert!(!parser.same_episode("Show.S02E01.mkv", "Show.S02E02.mkv"));
        assert!(!parser.same_episode("Show.S02E01.mkv", "Show.S03E01.mkv"));
        assert!(!parser.same_episode("Show.S02E01.mkv", "no numbers here.mkv"));
    }

    #[test]
    fn test_summary_tally() {
        let parser = FilenameParser::new();
        let records = vec![
            parser.parse("/in/Show S01E01.mkv"),
            parser.parse("/in/7x04.Title.mp4"),
            parser.parse("/in/nothing to see.mp4"),
            parser.parse("/in/Other Show 2x09.mkv"),
        ];

        let summary = ParseSummary::tally(&records);
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.no_show_name, 1);
        assert_eq!(summary.no_season_episode_pattern, 1);
        assert_eq!(summary.failed(), 2);
    }
}
