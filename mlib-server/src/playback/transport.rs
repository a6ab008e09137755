//! Playlist playback transport
//!
//! The queue always starts with `current` after a shuffle transition, and
//! next/previous wrap around at either end. When `current` is no longer in
//! the queue (the playlist was edited underneath the session) next and
//! previous leave the state unchanged.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// Start requested on a playlist with no visible items
    #[error("Playlist {0} has no playable items")]
    EmptyPlaylist(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    Normal,
    Shuffled,
}

/// Per-session playback state for one playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub playlist_id: i64,
    pub mode: PlaybackMode,
    pub queue: Vec<i64>,
    pub current: i64,
}

impl PlaybackState {
    /// Start playback from the playlist's item order, at its first item
    pub fn start(playlist_id: i64, order: Vec<i64>) -> Result<Self, PlaybackError> {
        let Some(&first) = order.first() else {
            return Err(PlaybackError::EmptyPlaylist(playlist_id));
        };

        Ok(Self {
            playlist_id,
            mode: PlaybackMode::Normal,
            queue: order,
            current: first,
        })
    }

    fn position(&self) -> Option<usize> {
        self.queue.iter().position(|&id| id == self.current)
    }

    /// Advance to the next item, wrapping to the start
    ///
    /// Returns false when `current` is not in the queue.
    pub fn next(&mut self) -> bool {
        let Some(index) = self.position() else {
            return false;
        };
        self.current = self.queue[(index + 1) % self.queue.len()];
        true
    }

    /// Step back to the previous item, wrapping to the end
    ///
    /// Returns false when `current` is not in the queue.
    pub fn previous(&mut self) -> bool {
        let Some(index) = self.position() else {
            return false;
        };
        let len = self.queue.len();
        self.current = self.queue[(index + len - 1) % len];
        true
    }

    /// Randomly permute everything except `current`, which moves to the front
    pub fn shuffle_on<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut rest: Vec<i64> = self
            .queue
            .iter()
            .copied()
            .filter(|&id| id != self.current)
            .collect();
        rest.shuffle(rng);

        self.queue = Self::with_current_first(self.current, rest);
        self.mode = PlaybackMode::Shuffled;
    }

    /// Rebuild the queue from the live playlist order with `current` in front
    pub fn shuffle_off(&mut self, live_order: Vec<i64>) {
        let rest: Vec<i64> = live_order
            .into_iter()
            .filter(|&id| id != self.current)
            .collect();

        self.queue = Self::with_current_first(self.current, rest);
        self.mode = PlaybackMode::Normal;
    }

    /// Flip between normal and shuffled order
    pub fn toggle_shuffle<R: Rng + ?Sized>(&mut self, live_order: Vec<i64>, rng: &mut R) {
        match self.mode {
            PlaybackMode::Normal => self.shuffle_on(rng),
            PlaybackMode::Shuffled => self.shuffle_off(live_order),
        }
    }

    fn with_current_first(current: i64, rest: Vec<i64>) -> Vec<i64> {
        let mut queue = Vec::with_capacity(rest.len() + 1);
        queue.push(current);
        queue.extend(rest);
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(queue: Vec<i64>, current: i64) -> PlaybackState {
        PlaybackState {
            playlist_id: 1,
            mode: PlaybackMode::Normal,
            queue,
            current,
        }
    }

    #[test]
    fn test_start_at_first_item() {
        let state = PlaybackState::start(4, vec![5, 7, 9]).unwrap();
        assert_eq!(state.current, 5);
        assert_eq!(state.mode, PlaybackMode::Normal);
    }

    #[test]
    fn test_start_empty_playlist() {
        assert_eq!(
            PlaybackState::start(4, vec![]),
            Err(PlaybackError::EmptyPlaylist(4))
        );
    }

    #[test]
    fn test_next_wraps_to_start() {
        let mut s = state(vec![5, 7, 9], 9);
        assert!(s.next());
        assert_eq!(s.current, 5);
    }

    #[test]
    fn test_previous_wraps_to_end() {
        let mut s = state(vec![5, 7, 9], 5);
        assert!(s.previous());
        assert_eq!(s.current, 9);
    }

    #[test]
    fn test_single_item_stays_put() {
        let mut s = state(vec![5], 5);
        assert!(s.next());
        assert_eq!(s.current, 5);
        assert!(s.previous());
        assert_eq!(s.current, 5);
    }

    #[test]
    fn test_stale_current_is_noop() {
        let mut s = state(vec![5, 7, 9], 42);
        let before = s.clone();
        assert!(!s.next());
        assert!(!s.previous());
        assert_eq!(s, before);
    }

    #[test]
    fn test_shuffle_on_keeps_current_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = state((1..=20).collect(), 13);
        s.shuffle_on(&mut rng);

        assert_eq!(s.mode, PlaybackMode::Shuffled);
        assert_eq!(s.current, 13);
        assert_eq!(s.queue[0], 13);

        let mut sorted = s.queue.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_off_uses_live_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = state(vec![5, 7, 9], 7);
        s.shuffle_on(&mut rng);

        // Playlist was edited while shuffled: 9 removed, 11 added
        s.shuffle_off(vec![5, 7, 11]);

        assert_eq!(s.mode, PlaybackMode::Normal);
        assert_eq!(s.current, 7);
        assert_eq!(s.queue, vec![7, 5, 11]);
    }

    #[test]
    fn test_toggle_shuffle_round_trip_mode() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = state(vec![5, 7, 9], 5);
        s.toggle_shuffle(vec![5, 7, 9], &mut rng);
        assert_eq!(s.mode, PlaybackMode::Shuffled);
        s.toggle_shuffle(vec![5, 7, 9], &mut rng);
        assert_eq!(s.mode, PlaybackMode::Normal);
        assert_eq!(s.queue, vec![5, 7, 9]);
    }
}
