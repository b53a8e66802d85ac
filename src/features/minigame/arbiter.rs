// Answer arbitration: exactly one winner per challenge

use std::sync::{Mutex, PoisonError};

use poise::serenity_prelude as serenity;

use crate::models::challenge::{ChallengePhase, ChallengeState, ClaimOutcome};

/// Resolve one answer attempt. The whole check-and-set runs under the
/// challenge lock, and the lock is never held across an await, so two
/// concurrent correct answers can never both observe an empty winner slot.
pub fn try_claim(
    challenge: &Mutex<ChallengeState>,
    participant: serenity::UserId,
    chosen_index: usize,
) -> ClaimOutcome {
    let mut state = challenge.lock().unwrap_or_else(PoisonError::into_inner);
    claim(&mut state, participant, chosen_index)
}

/// Claim steps on an already locked challenge
pub fn claim(
    state: &mut ChallengeState,
    participant: serenity::UserId,
    chosen_index: usize,
) -> ClaimOutcome {
    if !state.record_respondent(participant) {
        return ClaimOutcome::AlreadyAnswered;
    }

    if state.phase() == ChallengePhase::Expired {
        return ClaimOutcome::Closed;
    }

    if chosen_index != state.correct_index() {
        return ClaimOutcome::WrongAnswer;
    }

    if let Some(winner) = state.winner() {
        return ClaimOutcome::TooLateWinnerExists(winner);
    }

    state.resolve(participant);
    // Cancelled inside the critical section so the timeout cannot also resolve
    state.timeout.cancel();
    ClaimOutcome::Won
}
