//! High score and local leaderboard
//!
//! Tracks the best score ever plus the top 10 runs.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, HIGH_SCORE_KEY, KeyValueStore, LEADERBOARD_KEY, StoreError};
use crate::sim::state::RunMode;

/// Maximum number of leaderboard entries to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    pub mode: RunMode,
    pub theme: String,
    /// ISO date (YYYY-MM-DD)
    pub date: String,
}

/// High score plus leaderboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighScores {
    pub best: u64,
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score qualifies for the leaderboard. Every finished run
    /// counts while the board has room, zero included.
    pub fn qualifies(&self, score: u64) -> bool {
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Raise the best score during a run. Returns true if it changed.
    pub fn raise_best(&mut self, score: u64) -> bool {
        if score <= self.best {
            return false;
        }
        self.best = score;
        true
    }

    /// Record a finished run. Returns the leaderboard rank (1-indexed) or None
    /// if it didn't qualify. The best score is updated either way.
    pub fn add_score(&mut self, score: u64, mode: RunMode, theme: &str, date: &str) -> Option<usize> {
        self.best = self.best.max(score);
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            score,
            mode,
            theme: theme.to_string(),
            date: date.to_string(),
        };

        // Sorted descending; ties keep the older run first
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        let best: u64 = persistence::load_json(store, HIGH_SCORE_KEY);
        let mut entries: Vec<HighScoreEntry> = persistence::load_json(store, LEADERBOARD_KEY);
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_HIGH_SCORES);
        let best = best.max(entries.first().map(|e| e.score).unwrap_or(0));
        log::info!("Loaded {} leaderboard entries, best {}", entries.len(), best);
        Self { best, entries }
    }

    /// Persist only the best score
    pub fn save_best(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        persistence::save_json(store, HIGH_SCORE_KEY, &self.best)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        persistence::save_json(store, HIGH_SCORE_KEY, &self.best)?;
        persistence::save_json(store, LEADERBOARD_KEY, &self.entries)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_ranking_and_cap() {
        let mut scores = HighScores::new();
        // A scoreless run still makes an empty board
        assert_eq!(scores.add_score(0, RunMode::Classic, "nebula", "2024-01-01"), Some(1));
        for s in 1..=12 {
            scores.add_score(s * 10, RunMode::Classic, "nebula", "2024-01-01");
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries[0].score, 120);
        assert_eq!(scores.best, 120);
        assert!(!scores.qualifies(20));
        assert_eq!(scores.add_score(55, RunMode::Classic, "nebula", "2024-01-01"), Some(8));
        assert_eq!(scores.add_score(125, RunMode::Rush, "nebula", "2024-01-02"), Some(1));
    }

    #[test]
    fn test_save_load() {
        let mut store = MemoryStore::new();
        let mut scores = HighScores::new();
        scores.add_score(33, RunMode::Daily, "aurora", "2024-03-09");
        scores.save(&mut store).unwrap();

        let loaded = HighScores::load(&store);
        assert_eq!(loaded, scores);
        assert_eq!(loaded.entries[0].mode, RunMode::Daily);
    }

    #[test]
    fn test_corrupt_leaderboard_falls_back() {
        let mut store = MemoryStore::new();
        store.set(LEADERBOARD_KEY, "{{{").unwrap();
        store.set(HIGH_SCORE_KEY, "17").unwrap();
        let loaded = HighScores::load(&store);
        assert!(loaded.entries.is_empty());
        assert_eq!(loaded.best, 17);
    }

    #[test]
    fn test_raise_best_persists_alone() {
        let mut store = MemoryStore::new();
        let mut scores = HighScores::new();
        assert!(scores.raise_best(9));
        assert!(!scores.raise_best(9));
        assert!(!scores.raise_best(4));
        scores.save_best(&mut store).unwrap();

        let loaded = HighScores::load(&store);
        assert_eq!(loaded.best, 9);
        assert!(loaded.entries.is_empty());
    }
}
