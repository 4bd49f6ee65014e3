// src/services/resolution_service.rs
//
// Resolution Engine
//
// Decides, from an extracted (often noisy or abbreviated) show-name
// string plus a provider candidate list, which single show a file
// belongs to. The decision cascade is an ordered list of rules; the
// first rule that yields a confident answer wins, and anything short
// of confidence falls through to the next rule.
//
// `evaluate` is a pure function: no shared state, no I/O, identical
// arguments always produce the identical decision. It is safe to call
// from any number of threads at once.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{
    EpisodeRecord, LifecycleState, ResolutionDecision, ResolutionReason, ScoredCandidate,
    ShowCandidate,
};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, ShowPinned};
use crate::provider::SelectionStore;
use crate::text::normalize_for_query;

/// Minimum top score for fuzzy auto-selection
const FUZZY_AUTO_SELECT_MIN: u8 = 80;

/// Minimum lead over the runner-up for fuzzy auto-selection
const FUZZY_AUTO_SELECT_GAP: u8 = 10;

// ============================================================================
// PURE DECISION FUNCTION
// ============================================================================

/// Evaluate the decision cascade.
///
/// Rules, in order: pinned identifier, exact name, normalized name,
/// alias, base-title-over-variants, token set, year tolerance, fuzzy
/// similarity, unique-remaining fallback. A non-matching pinned
/// identifier never short-circuits; a single-candidate input always
/// resolves.
pub fn evaluate(
    extracted_name: &str,
    candidates: &[ShowCandidate],
    pinned_id: Option<&str>,
) -> ResolutionDecision {
    // Rule 1: nothing to choose from
    if candidates.is_empty() {
        return ResolutionDecision::NotFound;
    }

    // Rule 2: a remembered identifier beats all textual matching
    if let Some(pin) = pinned_id.map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(chosen) = single_match(candidates, |c| c.id == pin) {
            return resolved(chosen, ResolutionReason::Pinned);
        }
    }

    let wanted = extracted_name.trim();
    let wanted_lower = wanted.to_lowercase();
    let wanted_norm = normalize_for_query(wanted);

    // Rule 3: exact display-name equality, case-insensitive.
    // Two candidates sharing the identical name keep this rule silent.
    if let Some(chosen) = single_match(candidates, |c| exact_name_matches(c, &wanted_lower)) {
        return resolved(chosen, ResolutionReason::ExactName);
    }

    // Rule 4: equality after punctuation-insensitive normalization,
    // so "Marvels Agents of SHIELD" meets "Marvel's Agents of S.H.I.E.L.D."
    if !wanted_norm.is_empty() {
        if let Some(chosen) = single_match(candidates, |c| normalized_name_matches(c, &wanted_norm))
        {
            return resolved(chosen, ResolutionReason::NormalizedName);
        }
    }

    // Rule 5: aliases join the hunt. Name matches strictly dominate:
    // a unique name match resolved above, so reaching this rule with a
    // unique name-or-alias match means the alias decided it.
    if let Some(chosen) = single_match(candidates, |c| {
        exact_name_matches(c, &wanted_lower)
            || normalized_name_matches(c, &wanted_norm)
            || alias_matches(c, &wanted_lower)
    }) {
        return resolved(chosen, ResolutionReason::Alias);
    }

    // Rule 6: "The Night Manager" vs "The Night Manager (IN)" - the
    // base title wins over its parenthetical variants, but only when a
    // base candidate actually exists.
    if let Some(chosen) = base_title_tie_break(candidates, &wanted_norm) {
        return resolved(chosen, ResolutionReason::BaseTitle);
    }

    // Rule 7: same words, any order, trailing qualifiers ignored
    let wanted_tokens = token_set(wanted);
    if !wanted_tokens.is_empty() {
        if let Some(chosen) = single_match(candidates, |c| {
            c.name
                .as_deref()
                .map(|n| token_set(n) == wanted_tokens)
                .unwrap_or(false)
        }) {
            return resolved(chosen, ResolutionReason::TokenSet);
        }
    }

    // Rule 8: a trailing year in the query singles out one candidate
    if let Some(year) = trailing_year(wanted) {
        if let Some(chosen) = single_match(candidates, |c| {
            c.year.map(|y| (y - year).abs() <= 1).unwrap_or(false)
        }) {
            return resolved(chosen, ResolutionReason::YearTolerance);
        }
    }

    // Rule 9: fuzzy similarity, auto-selected only with a strong score
    // and a clear lead over the runner-up
    let scored = score_candidates(wanted, candidates);
    if let Some(top) = scored.first() {
        let runner_up = scored.get(1).map(|s| s.score).unwrap_or(0);
        if top.score >= FUZZY_AUTO_SELECT_MIN && top.score - runner_up >= FUZZY_AUTO_SELECT_GAP {
            return resolved(&top.candidate, ResolutionReason::Fuzzy);
        }
    }

    // Rule 10: a single candidate always resolves, textual match or not
    if candidates.len() == 1 {
        return resolved(&candidates[0], ResolutionReason::OnlyOption);
    }

    // Rule 11: hand the scored list to the caller for a user decision
    ResolutionDecision::Ambiguous { scored }
}

/// Best similarity score per candidate across its name and aliases,
/// sorted descending (stable on the input order for ties)
pub fn score_candidates(extracted_name: &str, candidates: &[ShowCandidate]) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| ScoredCandidate::new(c.clone(), best_similarity(extracted_name, c)))
        .collect();
    scored.sort_by_key(|s| std::cmp::Reverse(s.score));
    scored
}

/// Similarity of two strings in [0, 100], from normalized edit
/// distance over the lower-cased, trimmed inputs
pub fn similarity(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u8
}

fn best_similarity(extracted_name: &str, candidate: &ShowCandidate) -> u8 {
    candidate
        .name
        .iter()
        .chain(candidate.aliases.iter())
        .map(|s| similarity(extracted_name, s))
        .max()
        .unwrap_or(0)
}

fn resolved(chosen: &ShowCandidate, reason: ResolutionReason) -> ResolutionDecision {
    ResolutionDecision::Resolved {
        chosen: chosen.clone(),
        reason,
    }
}

/// The candidate satisfying `pred`, if exactly one does
fn single_match<'a, F>(candidates: &'a [ShowCandidate], pred: F) -> Option<&'a ShowCandidate>
where
    F: Fn(&ShowCandidate) -> bool,
{
    let mut found = None;
    for candidate in candidates.iter().filter(|c| pred(c)) {
        if found.is_some() {
            return None;
        }
        found = Some(candidate);
    }
    found
}

fn exact_name_matches(candidate: &ShowCandidate, wanted_lower: &str) -> bool {
    candidate
        .name
        .as_deref()
        .map(|n| n.trim().to_lowercase() == wanted_lower)
        .unwrap_or(false)
}

fn normalized_name_matches(candidate: &ShowCandidate, wanted_norm: &str) -> bool {
    !wanted_norm.is_empty()
        && candidate
            .name
            .as_deref()
            .map(|n| normalize_for_query(n) == wanted_norm)
            .unwrap_or(false)
}

fn alias_matches(candidate: &ShowCandidate, wanted_lower: &str) -> bool {
    candidate
        .aliases
        .iter()
        .any(|a| a.trim().to_lowercase() == wanted_lower)
}

/// Rule 6. Variants share the base's title followed by a parenthetical
/// qualifier; the query must match the base title itself, and exactly
/// one base candidate must exist.
fn base_title_tie_break<'a>(
    candidates: &'a [ShowCandidate],
    wanted_norm: &str,
) -> Option<&'a ShowCandidate> {
    if wanted_norm.is_empty() {
        return None;
    }

    let mut base = None;
    let mut base_count = 0;
    let mut variant_count = 0;

    for candidate in candidates {
        let Some(name) = candidate.name.as_deref() else {
            continue;
        };
        let stripped = strip_parenthetical(name);
        if normalize_for_query(stripped) != wanted_norm {
            continue;
        }
        if stripped == name.trim() {
            base = Some(candidate);
            base_count += 1;
        } else {
            variant_count += 1;
        }
    }

    // No base candidate among the variants: nothing to prefer
    if base_count == 1 && variant_count > 0 {
        base
    } else {
        None
    }
}

/// "The Night Manager (IN)" -> "The Night Manager"
fn strip_parenthetical(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind(" (") {
            return trimmed[..open].trim_end();
        }
    }
    trimmed
}

/// Unordered lower-cased word tokens, trailing parenthetical
/// qualifiers ignored
fn token_set(name: &str) -> BTreeSet<String> {
    normalize_for_query(strip_parenthetical(name))
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches(|c| c == '(' || c == ')').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// A 4-digit year as the final token, bare or parenthesized:
/// "Some Show 2013" or "Some Show (2013)"
fn trailing_year(name: &str) -> Option<i32> {
    let last = name.split_whitespace().last()?;
    let digits = last
        .trim_start_matches('(')
        .trim_end_matches(')');
    if digits.len() == 4
        && (digits.starts_with("19") || digits.starts_with("20"))
        && digits.chars().all(|c| c.is_ascii_digit())
    {
        digits.parse().ok()
    } else {
        None
    }
}

// ============================================================================
// RESOLUTION SERVICE
// ============================================================================

/// Wraps the pure cascade with the remembered-selection store and the
/// record lifecycle: looks up the pin for a record's query, evaluates,
/// and applies the outcome to the record's state.
pub struct ResolutionService {
    store: Arc<dyn SelectionStore>,
    event_bus: Arc<EventBus>,
}

impl ResolutionService {
    pub fn new(store: Arc<dyn SelectionStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }

    /// Resolve one parsed record against a provider candidate list.
    /// The record moves to ShowResolved, ShowAmbiguous or ShowNotFound;
    /// the decision is returned for presentation.
    pub fn resolve_record(
        &self,
        record: &mut EpisodeRecord,
        candidates: &[ShowCandidate],
    ) -> AppResult<ResolutionDecision> {
        let resolvable = matches!(
            record.state(),
            LifecycleState::Parsed | LifecycleState::ShowAmbiguous | LifecycleState::ShowNotFound
        );
        if !resolvable {
            return Err(AppError::Other(format!(
                "record {} is not awaiting resolution (state: {})",
                record.id,
                record.state()
            )));
        }

        let name = record
            .extracted_show_name
            .clone()
            .ok_or_else(|| AppError::Other("parsed record without show name".to_string()))?;

        let pinned = self.store.pinned_for(&name);
        let decision = evaluate(&name, candidates, pinned.as_deref());

        match &decision {
            ResolutionDecision::Resolved { chosen, reason } => {
                log::debug!("resolved '{}' to {} ({})", name, chosen, reason);
                record.mark_show_resolved(chosen.clone())?;
            }
            ResolutionDecision::Ambiguous { scored } => {
                log::debug!("'{}' ambiguous among {} candidates", name, scored.len());
                record.mark_show_ambiguous()?;
            }
            ResolutionDecision::NotFound => {
                log::debug!("'{}' matched no candidates", name);
                record.mark_show_not_found()?;
            }
        }

        Ok(decision)
    }

    /// Apply the user's pick for an ambiguous record and remember it
    /// for every future resolution of the same query
    pub fn confirm_selection(
        &self,
        record: &mut EpisodeRecord,
        chosen: ShowCandidate,
    ) -> AppResult<()> {
        let query = record
            .extracted_show_name
            .clone()
            .ok_or_else(|| AppError::Other("record without show name".to_string()))?;
        record.mark_show_resolved(chosen.clone())?;
        self.pin_selection(&query, &chosen.id);
        Ok(())
    }

    /// Remember a query -> identifier pin without touching a record
    pub fn pin_selection(&self, query: &str, show_id: &str) {
        self.store.remember(query, show_id);
        self.event_bus
            .emit(ShowPinned::new(query.to_string(), show_id.to_string()));
    }
}
