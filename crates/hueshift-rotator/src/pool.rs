//! Asset pools and their selection policies

use hueshift_domain::{Asset, SelectionMode};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A pool shared between its rotation task and intake
///
/// Intake only appends. Selection and eviction run inside the task, each
/// within a single lock scope that never spans a suspension point.
pub type SharedPool = Arc<Mutex<AssetPool>>;

/// One draw from a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Position of the asset in the pool at draw time
    pub index: usize,

    /// The drawn asset
    pub asset: Asset,
}

/// Candidate set of one rotation plus its consumption policy
///
/// Invariants:
/// - `cursor` is `Some(i)` with `i < items.len()` in cursor mode when the
///   pool is non-empty, and `None` otherwise
/// - in shuffle-bag mode, `draw_order` holds distinct valid indices;
///   items appended mid-traversal join at the next regeneration
#[derive(Debug, Clone)]
pub struct AssetPool {
    items: Vec<Asset>,
    cursor: Option<usize>,
    mode: SelectionMode,
    draw_order: VecDeque<usize>,
}

impl AssetPool {
    /// Create a pool with the given policy
    pub fn new(mode: SelectionMode, items: Vec<Asset>) -> Self {
        let mut pool = Self {
            items,
            cursor: None,
            mode,
            draw_order: VecDeque::new(),
        };
        pool.normalize_cursor();
        pool
    }

    /// Ordered pool starting at the first item
    pub fn cursor(items: Vec<Asset>) -> Self {
        Self::new(SelectionMode::Cursor, items)
    }

    /// Pool drawing each item once per traversal
    pub fn shuffle_bag(items: Vec<Asset>) -> Self {
        Self::new(SelectionMode::ShuffleBag, items)
    }

    /// Pool drawing uniformly with replacement
    pub fn random_with_eviction(items: Vec<Asset>) -> Self {
        Self::new(SelectionMode::RandomWithEviction, items)
    }

    /// Wrap into a [`SharedPool`]
    pub fn shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    /// Consumption policy
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Current items, in insertion order
    pub fn items(&self) -> &[Asset] {
        &self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the pool has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `asset` is in the pool
    pub fn contains(&self, asset: &Asset) -> bool {
        self.items.contains(asset)
    }

    /// Index of the next item in cursor mode
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    /// Draws left before the shuffle bag regenerates
    pub fn pending_draws(&self) -> usize {
        self.draw_order.len()
    }

    /// Restore a persisted cursor, resetting it to 0 if the pool has shrunk
    /// below it. Returns the cursor now in effect.
    pub fn restore_cursor(&mut self, index: usize) -> Option<usize> {
        if self.mode != SelectionMode::Cursor || self.items.is_empty() {
            return self.cursor;
        }
        self.cursor = Some(if index < self.items.len() { index } else { 0 });
        self.cursor
    }

    /// Add an asset; duplicates are ignored. Returns whether it was added.
    ///
    /// Appending never invalidates the cursor or pending shuffle draws.
    pub fn append(&mut self, asset: Asset) -> bool {
        if self.items.contains(&asset) {
            return false;
        }
        self.items.push(asset);
        self.normalize_cursor();
        true
    }

    /// Draw the next asset according to the pool's mode
    ///
    /// Returns `None` for an empty pool.
    pub fn select(&mut self) -> Option<Selection> {
        self.select_with(&mut rand::rng())
    }

    /// [`AssetPool::select`] with a caller-provided random source
    pub fn select_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Selection> {
        if self.items.is_empty() {
            self.draw_order.clear();
            return None;
        }

        let index = match self.mode {
            SelectionMode::Cursor => {
                let index = self.cursor.filter(|&i| i < self.items.len()).unwrap_or(0);
                self.cursor = Some((index + 1) % self.items.len());
                index
            }
            SelectionMode::ShuffleBag => {
                if self.draw_order.is_empty() {
                    self.regenerate_draw_order(rng);
                }
                match self.draw_order.pop_front() {
                    Some(index) => index,
                    None => return None,
                }
            }
            SelectionMode::RandomWithEviction => rng.random_range(0..self.items.len()),
        };

        Some(Selection {
            index,
            asset: self.items[index].clone(),
        })
    }

    /// Permanently remove `asset`
    ///
    /// Idempotent: removing an absent asset is a no-op. Colors are never
    /// evicted. Returns whether the pool changed.
    pub fn evict(&mut self, asset: &Asset) -> bool {
        if !asset.is_evictable() {
            return false;
        }
        let Some(removed) = self.items.iter().position(|a| a == asset) else {
            return false;
        };
        self.items.remove(removed);

        self.draw_order.retain(|&i| i != removed);
        for i in self.draw_order.iter_mut() {
            if *i > removed {
                *i -= 1;
            }
        }

        if let Some(cursor) = self.cursor {
            if cursor > removed {
                self.cursor = Some(cursor - 1);
            }
        }
        self.normalize_cursor();
        true
    }

    /// Replace every item (e.g. after re-scanning storage)
    ///
    /// Pending shuffle draws are discarded and the cursor is re-validated.
    pub fn replace_items(&mut self, items: Vec<Asset>) {
        self.items = items;
        self.draw_order.clear();
        self.normalize_cursor();
    }

    fn regenerate_draw_order<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.shuffle(rng);
        self.draw_order = order.into();
    }

    fn normalize_cursor(&mut self) {
        self.cursor = match (self.mode, self.items.len()) {
            (SelectionMode::Cursor, 0) => None,
            (SelectionMode::Cursor, len) => Some(self.cursor.filter(|&i| i < len).unwrap_or(0)),
            _ => None,
        };
    }
}
