//! Best-time-per-name leaderboards, one table per puzzle.
//!
//! Names are matched case-insensitively but shown with the casing they were
//! first submitted with. A player's entry only ever moves to a strictly
//! faster time.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::error::PuzzleResult;
use crate::store::{leaderboard_key, read_json_list, write_json, KeyValueStore};

pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const LEADERBOARD_DISPLAY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub best_time_ms: u64,
    pub last_updated_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Inserted,
    Improved { previous_ms: u64 },
    Unchanged { best_ms: u64 },
}

pub fn normalize_player_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn display_player_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sorts fastest first; equal times keep the earlier achiever ahead.
pub fn sort_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        a.best_time_ms
            .cmp(&b.best_time_ms)
            .then(a.last_updated_at.cmp(&b.last_updated_at))
    });
}

pub struct LeaderboardStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    clock: &'a dyn Clock,
}

impl<'a, S: KeyValueStore + ?Sized> LeaderboardStore<'a, S> {
    pub fn new(store: &'a mut S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    fn load(&self, puzzle_id: &str) -> PuzzleResult<Vec<LeaderboardEntry>> {
        read_json_list(&*self.store, &leaderboard_key(puzzle_id))
    }

    pub fn submit(
        &mut self,
        puzzle_id: &str,
        player_name: &str,
        time_ms: u64,
    ) -> PuzzleResult<SubmitOutcome> {
        let name = display_player_name(player_name);
        let key = normalize_player_name(&name);
        let mut entries = self.load(puzzle_id)?;
        let existing = entries
            .iter_mut()
            .find(|entry| normalize_player_name(&entry.player_name) == key);
        let outcome = match existing {
            Some(entry) if time_ms < entry.best_time_ms => {
                let previous_ms = entry.best_time_ms;
                entry.best_time_ms = time_ms;
                entry.last_updated_at = self.clock.now_ms();
                SubmitOutcome::Improved { previous_ms }
            }
            Some(entry) => {
                return Ok(SubmitOutcome::Unchanged {
                    best_ms: entry.best_time_ms,
                })
            }
            None => {
                entries.push(LeaderboardEntry {
                    player_name: name.clone(),
                    best_time_ms: time_ms,
                    last_updated_at: self.clock.now_ms(),
                });
                SubmitOutcome::Inserted
            }
        };
        sort_entries(&mut entries);
        write_json(&mut *self.store, &leaderboard_key(puzzle_id), &entries)?;
        info!(puzzle_id, player = %name, time_ms, ?outcome, "leaderboard updated");
        Ok(outcome)
    }

    pub fn list(&self, puzzle_id: &str) -> PuzzleResult<Vec<LeaderboardEntry>> {
        let mut entries = self.load(puzzle_id)?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    pub fn top(&self, puzzle_id: &str, limit: usize) -> PuzzleResult<Vec<LeaderboardEntry>> {
        let mut entries = self.list(puzzle_id)?;
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn clear(&mut self, puzzle_id: &str) -> PuzzleResult<()> {
        self.store.remove(&leaderboard_key(puzzle_id))
    }
}
