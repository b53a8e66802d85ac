// In-flight challenge data model

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use tokio_util::sync::CancellationToken;

/// A multiple-choice question from the prompt bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub question: &'static str,
    pub answers: &'static [&'static str],
    /// Index of the correct entry in `answers`
    pub correct: usize,
}

impl Prompt {
    pub fn correct_answer(&self) -> &'static str {
        self.answers.get(self.correct).copied().unwrap_or_default()
    }
}

/// Lifecycle of a challenge. `Resolved` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePhase {
    Open,
    Resolved(serenity::UserId),
    Expired,
}

/// Result of one answer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The participant already made an attempt on this challenge
    AlreadyAnswered,
    WrongAnswer,
    /// Correct answer, but someone else claimed the win first
    TooLateWinnerExists(serenity::UserId),
    Won,
    /// No challenge is running, or it already expired
    Closed,
}

/// One spawned challenge. Lives in the active-challenge arena until it is
/// resolved or expires.
#[derive(Debug)]
pub struct ChallengeState {
    pub community: serenity::GuildId,
    pub channel: serenity::ChannelId,
    pub prompt: Prompt,
    pub opened_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    /// Cancelled when a winner is claimed before the deadline
    pub timeout: CancellationToken,
    respondents: HashSet<serenity::UserId>,
    phase: ChallengePhase,
}

impl ChallengeState {
    pub fn new(
        community: serenity::GuildId,
        channel: serenity::ChannelId,
        prompt: Prompt,
        opened_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
        timeout: CancellationToken,
    ) -> Self {
        Self {
            community,
            channel,
            prompt,
            opened_at,
            deadline_at,
            timeout,
            respondents: HashSet::new(),
            phase: ChallengePhase::Open,
        }
    }

    pub fn correct_index(&self) -> usize {
        self.prompt.correct
    }

    pub fn phase(&self) -> ChallengePhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == ChallengePhase::Open
    }

    pub fn winner(&self) -> Option<serenity::UserId> {
        match self.phase {
            ChallengePhase::Resolved(winner) => Some(winner),
            _ => None,
        }
    }

    /// Returns false if the participant was already recorded
    pub fn record_respondent(&mut self, participant: serenity::UserId) -> bool {
        self.respondents.insert(participant)
    }

    pub fn respondent_count(&self) -> usize {
        self.respondents.len()
    }

    /// `Open` -> `Resolved(winner)`. No-op from a terminal phase.
    pub fn resolve(&mut self, winner: serenity::UserId) -> bool {
        if !self.is_open() {
            return false;
        }
        self.phase = ChallengePhase::Resolved(winner);
        true
    }

    /// `Open` -> `Expired`. No-op from a terminal phase.
    pub fn expire(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.phase = ChallengePhase::Expired;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: Prompt = Prompt {
        question: "Which number is even?",
        answers: &["1", "2", "3"],
        correct: 1,
    };

    fn challenge() -> ChallengeState {
        let now = Utc::now();
        ChallengeState::new(
            serenity::GuildId::new(1),
            serenity::ChannelId::new(2),
            PROMPT,
            now,
            now + chrono::Duration::seconds(30),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_starts_open() {
        let state = challenge();
        assert!(state.is_open());
        assert_eq!(state.winner(), None);
        assert_eq!(state.correct_index(), 1);
        assert_eq!(state.prompt.correct_answer(), "2");
    }

    #[test]
    fn test_resolved_is_terminal() {
        let mut state = challenge();
        let first = serenity::UserId::new(10);
        assert!(state.resolve(first));
        assert!(!state.resolve(serenity::UserId::new(11)));
        assert!(!state.expire());
        assert_eq!(state.phase(), ChallengePhase::Resolved(first));
    }

    #[test]
    fn test_expired_is_terminal() {
        let mut state = challenge();
        assert!(state.expire());
        assert!(!state.resolve(serenity::UserId::new(10)));
        assert_eq!(state.phase(), ChallengePhase::Expired);
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_respondents_do_not_change_phase() {
        let mut state = challenge();
        let user = serenity::UserId::new(10);
        assert!(state.record_respondent(user));
        assert!(!state.record_respondent(user));
        assert_eq!(state.respondent_count(), 1);
        assert!(state.is_open());
    }
}
