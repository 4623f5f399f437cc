use std::fs::File;
use std::io::Write;
use std::path::Path;

use bitvec::prelude::*;

use super::{Item, ItemIdx, KnapsackError, Profit, Weight};

/// A subset of items, stored as a bitset over *original* item indices so
/// that it stays valid while the instance permutes its item vector.
/// Weight, profit and cardinality are maintained incrementally.
#[derive(Clone, Debug)]
pub struct Solution {
    x: BitVec,
    item_number: usize,
    weight: Weight,
    profit: Profit,
}

impl Solution {
    pub fn new(n: usize) -> Self {
        Solution {
            x: bitvec![0; n],
            item_number: 0,
            weight: 0,
            profit: 0,
        }
    }

    /// Grow the bitset when items are added to the owning instance.
    pub fn resize(&mut self, n: usize) {
        if n > self.x.len() {
            self.x.resize(n, false);
        }
    }

    pub fn contains(&self, j: ItemIdx) -> bool {
        self.x[j]
    }

    /// Add or remove an item. A no-op when the item already has the
    /// requested value, so the running sums stay consistent.
    pub fn set(&mut self, item: &Item, value: bool) {
        if self.x[item.j] == value {
            return;
        }
        self.x.set(item.j, value);
        if value {
            self.item_number += 1;
            self.weight += item.w;
            self.profit += item.p;
        } else {
            self.item_number -= 1;
            self.weight -= item.w;
            self.profit -= item.p;
        }
    }

    pub fn clear(&mut self) {
        self.x.fill(false);
        self.item_number = 0;
        self.weight = 0;
        self.profit = 0;
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_number == 0
    }

    pub fn item_number(&self) -> usize {
        self.item_number
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn profit(&self) -> Profit {
        self.profit
    }

    /// Write the solution as a whitespace-separated 0/1 vector over
    /// original item indices, preserving input ordering.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), KnapsackError> {
        let mut file = File::create(path)?;
        let line = self
            .x
            .iter()
            .map(|b| if *b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
