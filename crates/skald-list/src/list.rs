//! The list state machine.
//!
//! A [`List`] maintains the playlist itself: the ordered items, the
//! selection, and the autoselection bookkeeping. It does not talk to the
//! environment and knows nothing about what is actually playing.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{AutoMode, Item, ListError};

/// An ordered sequence of items with a selection and an autoselection
/// policy.
///
/// # Invariants
///
/// - No two items share a hash.
/// - If there is a selection, it indexes an existing, selectable item.
/// - Entering [`AutoMode::Shuffle`] from any other mode clears the
///   used-hash set, starting a fresh shuffle cycle.
#[derive(Debug)]
pub struct List {
    items: Vec<Item>,

    /// The selected index, if any.
    selection: Option<usize>,

    autoselect: AutoMode,

    /// Hashes already picked in the current shuffle cycle.
    used_hashes: HashSet<String>,

    /// Random source for shuffle choices. Owned by the list, which itself
    /// is confined to its controller's task.
    rng: StdRng,
}

impl List {
    /// Creates an empty list: no selection, autoselection off, shuffle
    /// source seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates an empty list whose shuffle choices derive from `seed`.
    /// Same seed, same list operations, same shuffle order.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            selection: None,
            autoselect: AutoMode::Off,
            used_hashes: HashSet::new(),
            rng,
        }
    }

    /// Inserts `item` at `index`.
    ///
    /// Inserting at or before the current selection shifts the selection
    /// down by one, keeping it on the same item.
    ///
    /// # Errors
    ///
    /// [`ListError::DuplicateHash`] if another item already has this
    /// item's hash; [`ListError::InsertOutOfBounds`] if `index` is past
    /// the end.
    pub fn add(&mut self, item: Item, index: usize) -> Result<(), ListError> {
        if let Some((at, _)) = self.item_with_hash(item.hash()) {
            return Err(ListError::DuplicateHash {
                hash: item.hash().to_owned(),
                index: at,
            });
        }
        if index > self.items.len() {
            return Err(ListError::InsertOutOfBounds {
                index,
                len: self.items.len(),
            });
        }

        if let Some(selection) = self.selection {
            if index <= selection {
                self.selection = Some(selection + 1);
            }
        }
        self.items.insert(index, item);
        Ok(())
    }

    /// The number of items in the list.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// The current autoselection mode.
    #[must_use]
    pub fn auto_mode(&self) -> AutoMode {
        self.autoselect
    }

    /// Changes the autoselection mode, returning whether it changed.
    pub fn set_auto_mode(&mut self, mode: AutoMode) -> bool {
        if mode == self.autoselect {
            return false;
        }
        // A fresh shuffle mode starts a fresh cycle.
        if mode == AutoMode::Shuffle {
            self.used_hashes.clear();
        }
        self.autoselect = mode;
        true
    }

    /// The item at `index`, if there is one.
    #[must_use]
    pub fn item_at(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Finds the item with the given hash, returning its index too.
    #[must_use]
    pub fn item_with_hash(&self, hash: &str) -> Option<(usize, &Item)> {
        // O(n), but lists are short and hashes are checked rarely.
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.hash() == hash)
    }

    /// The current selection as an index/item pair, or `None` when nothing
    /// is selected.
    ///
    /// # Panics
    ///
    /// If the selection indexes a missing item. That cannot happen through
    /// this type's own methods; it indicates memory corruption or a bug
    /// here.
    #[must_use]
    pub fn selection(&self) -> Option<(usize, &Item)> {
        self.selection.map(|index| {
            let item = self
                .items
                .get(index)
                .expect("selection points at a missing item");
            (index, item)
        })
    }

    /// Selects the item at `index`, which must have the given hash.
    ///
    /// The hash is always validated, even when the index already holds the
    /// selection: it exists to catch selections racing list changes.
    /// Returns whether the selection actually changed.
    ///
    /// # Errors
    ///
    /// [`ListError::SelectOutOfBounds`], [`ListError::HashMismatch`], or
    /// [`ListError::NotSelectable`].
    pub fn select(&mut self, index: usize, hash: &str) -> Result<bool, ListError> {
        let item = self
            .item_at(index)
            .ok_or(ListError::SelectOutOfBounds(index as i64))?;

        if item.hash() != hash {
            return Err(ListError::HashMismatch {
                requested: hash.to_owned(),
                actual: item.hash().to_owned(),
            });
        }
        if !item.is_selectable() {
            return Err(ListError::NotSelectable);
        }

        let changed = self.selection != Some(index);
        self.selection = Some(index);
        Ok(changed)
    }

    /// Snapshots the list as an immutable sequence of items.
    #[must_use]
    pub fn freeze(&self) -> Vec<Item> {
        self.items.clone()
    }

    /// Advances the selection according to the autoselection mode.
    ///
    /// Returns the new selection and whether it changed. With nothing
    /// selected, only shuffle advances: it may pick any unused item;
    /// every other mode has no predecessor to move on from.
    pub fn next(&mut self) -> (Option<usize>, bool) {
        let previous_hash = self
            .selection
            .and_then(|i| self.items.get(i))
            .map(|item| item.hash().to_owned());

        if self.selection.is_none() && self.autoselect != AutoMode::Shuffle {
            return (None, false);
        }

        let next = match self.autoselect {
            AutoMode::Off => self.selection,
            AutoMode::Drop => None,
            AutoMode::Next => self
                .selection
                .map(|i| i + 1)
                .filter(|&i| i < self.items.len()),
            AutoMode::Shuffle => self.shuffle_choose(),
        };

        let next_hash = next.and_then(|i| self.items.get(i)).map(Item::hash);
        let changed = next_hash != previous_hash.as_deref();
        self.selection = next;
        (next, changed)
    }

    /// Picks a random item whose hash has not yet been used this cycle,
    /// marking it used. When every item has been used, clears the cycle
    /// and reports nothing picked; the next call starts afresh.
    fn shuffle_choose(&mut self) -> Option<usize> {
        // Gathering candidates up front is O(n) but guaranteed to
        // terminate; rejection sampling might never.
        let unpicked: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !self.used_hashes.contains(item.hash()))
            .map(|(i, _)| i)
            .collect();

        if unpicked.is_empty() {
            self.used_hashes.clear();
            return None;
        }

        let choice = unpicked[self.rng.gen_range(0..unpicked.len())];
        self.used_hashes
            .insert(self.items[choice].hash().to_owned());
        Some(choice)
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}
