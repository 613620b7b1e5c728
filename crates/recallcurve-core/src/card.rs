//! Flashcard learning state.
//!
//! A [`Card`] is a value: the scheduler never mutates one in place, it hands
//! back a replacement after every review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Learning phase of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    New,
    Learning,
    Review,
    Relearning,
}

impl State {
    /// Every variant, in lifecycle order.
    pub const ALL: [State; 4] = [State::New, State::Learning, State::Review, State::Relearning];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::New => "New",
            State::Learning => "Learning",
            State::Review => "Review",
            State::Relearning => "Relearning",
        }
    }

    /// Whether cards in this state walk through sub-day steps.
    pub fn is_stepped(&self) -> bool {
        matches!(self, State::Learning | State::Relearning)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Review outcome reported by the learner.
///
/// Again is a recall failure; Hard, Good and Easy are successes with
/// increasing confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Numeric grade (1-4) used by the FSRS formulas.
    pub fn value(&self) -> f64 {
        match self {
            Rating::Again => 1.0,
            Rating::Hard => 2.0,
            Rating::Good => 3.0,
            Rating::Easy => 4.0,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Rating::Again)
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" | "1" => Ok(Rating::Again),
            "hard" | "2" => Ok(Rating::Hard),
            "good" | "3" => Ok(Rating::Good),
            "easy" | "4" => Ok(Rating::Easy),
            other => Err(format!("unknown rating: {other}")),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        };
        f.pad(name)
    }
}

/// One flashcard's learning state.
///
/// Invariants kept by the review flow:
/// - `stability` is set iff the card has been reviewed at least once
/// - `step` is set only while the card is Learning or Relearning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub state: State,
    /// Sub-step index within Learning/Relearning.
    #[serde(default)]
    pub step: Option<usize>,
    /// Memory strength in days.
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    #[serde(default)]
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// A fresh, never-reviewed card that is due at `due`.
    pub fn new(due: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: State::New,
            step: None,
            stability: None,
            difficulty: None,
            due,
            last_review: None,
        }
    }

    /// Whole days from the last review until due, truncated toward zero.
    ///
    /// `None` for cards that were never reviewed.
    pub fn scheduled_days(&self) -> Option<i64> {
        self.last_review.map(|last| (self.due - last).num_days())
    }
}
