use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const MAX_ENTRIES: usize = 50;

/// Watched player ids, most recent first; the oldest is evicted past the cap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct Watchlist {
    ids: VecDeque<u32>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the player was already watched.
    pub fn add(&mut self, id: u32) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push_front(id);
        self.ids.truncate(MAX_ENTRIES);
        true
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&w| w != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<u32>> for Watchlist {
    fn from(ids: Vec<u32>) -> Self {
        let mut ids: VecDeque<u32> = ids.into();
        ids.truncate(MAX_ENTRIES);
        Self { ids }
    }
}

impl From<Watchlist> for Vec<u32> {
    fn from(list: Watchlist) -> Self {
        list.ids.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_capped() {
        let mut list = Watchlist::new();
        for id in 1..=60 {
            list.add(id);
        }
        assert_eq!(list.len(), MAX_ENTRIES);
        assert_eq!(list.iter().next(), Some(60));
        assert!(!list.contains(10), "oldest ids are evicted");
        assert!(list.contains(11));
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let mut list = Watchlist::new();
        assert!(list.add(7));
        assert!(list.add(8));
        assert!(!list.add(7));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![8, 7]);
        assert!(list.remove(7));
        assert!(!list.remove(7));
    }
}
