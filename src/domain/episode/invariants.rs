use super::entity::{EpisodeRecord, LifecycleState};
use crate::domain::{DomainError, DomainResult};

/// The legal lifecycle edges. Everything not listed is rejected.
///
/// 1. A record is parsed exactly once; parse failure is terminal
/// 2. Resolution outcomes come only from a parsed record, and an
///    ambiguous or empty outcome may be re-resolved once the user or a
///    fresh candidate list settles it
/// 3. Moving requires the full chain show -> episode -> destination
/// 4. Moved is terminal; a failed move may be retried in place
pub fn transition_allowed(from: LifecycleState, to: LifecycleState) -> bool {
    use LifecycleState::*;
    matches!(
        (from, to),
        (Unparsed, Parsed)
            | (Unparsed, ParseFailed)
            | (Parsed, ShowResolved)
            | (Parsed, ShowAmbiguous)
            | (Parsed, ShowNotFound)
            | (ShowAmbiguous, ShowResolved)
            | (ShowAmbiguous, ShowAmbiguous)
            | (ShowAmbiguous, ShowNotFound)
            | (ShowNotFound, ShowResolved)
            | (ShowNotFound, ShowAmbiguous)
            | (ShowNotFound, ShowNotFound)
            | (ShowResolved, EpisodeResolved)
            | (EpisodeResolved, ReadyToMove)
            | (ReadyToMove, Moved)
            | (ReadyToMove, MoveFailed)
            | (MoveFailed, ReadyToMove)
    )
}

/// Validates that a record's data matches its lifecycle state.
/// The guarded mutators uphold this by construction; this check exists
/// for records that crossed a serialization boundary.
pub fn validate_record(record: &EpisodeRecord) -> DomainResult<()> {
    use LifecycleState::*;
    let state = record.state();

    let parsed_states = [
        Parsed,
        ShowResolved,
        ShowAmbiguous,
        ShowNotFound,
        EpisodeResolved,
        ReadyToMove,
        Moved,
        MoveFailed,
    ];
    if parsed_states.contains(&state) {
        if record.extracted_show_name.is_none() {
            return Err(DomainError::InvariantViolation(format!(
                "{} record without extracted show name",
                state
            )));
        }
        if record.placement.is_none() {
            return Err(DomainError::MissingPlacement);
        }
    }

    let resolved_states = [ShowResolved, EpisodeResolved, ReadyToMove, Moved, MoveFailed];
    if resolved_states.contains(&state) && record.resolved_show.is_none() {
        return Err(DomainError::MissingResolvedShow);
    }

    let movable_states = [ReadyToMove, Moved, MoveFailed];
    if movable_states.contains(&state) && record.destination_path.is_none() {
        return Err(DomainError::MissingDestination);
    }

    if state == ParseFailed && record.last_diagnostic.is_none() {
        return Err(DomainError::InvariantViolation(
            "parse failure without a diagnostic".to_string(),
        ));
    }

    Ok(())
}
