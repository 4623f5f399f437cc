use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::part_sol::{PartSol, PartSolFactory};
use super::solution::Solution;
use super::{Item, ItemPos, KnapsackError, Profit, Weight};

/// Window size below which the partial sort switches to a plain sort.
pub const PARTIAL_SORT_LIMIT: usize = 128;

/// A contiguous range of item positions, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub f: ItemPos,
    pub l: ItemPos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortStatus {
    None,
    Partial,
    Full,
}

/// A 0/1 knapsack instance.
///
/// The item vector is permuted while solving. Items moved before `f` or
/// after `l` have their value fixed: positions `< f` (together with
/// `reduced_solution`) are taken, positions `> l` are left out. Inside the
/// window, positions `[s..t]` form the sorted core, ordered by
/// non-increasing efficiency around the break item `b`; the ranges still
/// waiting to be sorted are kept as intervals in `int_left` / `int_right`.
#[derive(Clone)]
pub struct Instance {
    items: Vec<Item>,
    capacity_orig: Weight,

    b: ItemPos,
    f: ItemPos,
    l: ItemPos,
    s: ItemPos,
    t: ItemPos,
    sort_status: SortStatus,
    int_left: Vec<Interval>,
    int_right: Vec<Interval>,

    // Prefix sums over positions, entry k holding the weight/profit of
    // items [0..k). Only maintained while fully sorted.
    isum: Vec<Item>,

    sol_red: Solution,
    sol_break: Option<Solution>,
    sol_opt: Option<Solution>,
}

impl Instance {
    pub fn new(capacity: Weight) -> Self {
        Instance {
            items: Vec::new(),
            capacity_orig: capacity,
            b: -1,
            f: 0,
            l: -1,
            s: -1,
            t: -1,
            sort_status: SortStatus::None,
            int_left: Vec::new(),
            int_right: Vec::new(),
            isum: Vec::new(),
            sol_red: Solution::new(0),
            sol_break: None,
            sol_opt: None,
        }
    }

    pub fn add_item(&mut self, w: Weight, p: Profit) -> Result<(), KnapsackError> {
        if w <= 0 {
            return Err(KnapsackError::InvalidItemWeight);
        }
        if p < 0 {
            return Err(KnapsackError::InvalidItemProfit);
        }
        let j = self.items.len();
        self.items.push(Item { j, w, p });
        self.l = j as ItemPos;
        self.sol_red.resize(j + 1);
        self.sol_break = None;
        self.sol_opt = None;
        self.b = -1;
        self.sort_status = SortStatus::None;
        Ok(())
    }

    pub fn add_items(&mut self, wp: &[(Weight, Profit)]) -> Result<(), KnapsackError> {
        for &(w, p) in wp {
            self.add_item(w, p)?;
        }
        Ok(())
    }

    pub fn set_capacity(&mut self, c: Weight) {
        self.capacity_orig = c;
    }

    /*
     * Getters
     */

    pub fn total_item_number(&self) -> usize {
        self.items.len()
    }

    pub fn total_capacity(&self) -> Weight {
        self.capacity_orig
    }

    pub fn item(&self, pos: ItemPos) -> &Item {
        &self.items[pos as usize]
    }

    /// Number of items still in the window `[f..l]`.
    pub fn item_number(&self) -> usize {
        if self.l < self.f {
            0
        } else {
            (self.l - self.f + 1) as usize
        }
    }

    pub fn first_item(&self) -> ItemPos {
        self.f
    }

    pub fn last_item(&self) -> ItemPos {
        self.l
    }

    pub fn first_sorted_item(&self) -> ItemPos {
        self.s
    }

    pub fn last_sorted_item(&self) -> ItemPos {
        self.t
    }

    pub fn int_left_size(&self) -> usize {
        self.int_left.len()
    }

    pub fn int_right_size(&self) -> usize {
        self.int_right.len()
    }

    /// Capacity left once the weight of the reduced solution is deducted.
    pub fn capacity(&self) -> Weight {
        self.capacity_orig - self.sol_red.weight()
    }

    pub fn is_fully_sorted(&self) -> bool {
        self.sort_status == SortStatus::Full
    }

    pub fn break_item_found(&self) -> bool {
        self.b >= 0
    }

    pub fn break_item(&self) -> ItemPos {
        self.b
    }

    pub fn reduced_solution(&self) -> &Solution {
        &self.sol_red
    }

    pub fn break_solution(&self) -> &Solution {
        self.sol_break
            .as_ref()
            .expect("break solution not computed")
    }

    /// Profit of the break prefix, reduced solution excluded.
    pub fn break_profit(&self) -> Profit {
        self.break_solution().profit() - self.sol_red.profit()
    }

    /// Weight of the break prefix, reduced solution excluded.
    pub fn break_weight(&self) -> Weight {
        self.break_solution().weight() - self.sol_red.weight()
    }

    /// Capacity left after filling the break solution.
    pub fn break_capacity(&self) -> Weight {
        self.capacity_orig - self.break_solution().weight()
    }

    pub fn optimal_solution(&self) -> Option<&Solution> {
        self.sol_opt.as_ref()
    }

    pub fn set_optimal_solution(&mut self, sol: Solution) {
        self.sol_opt = Some(sol);
    }

    pub fn optimum(&self) -> Option<Profit> {
        self.sol_opt.as_ref().map(|s| s.profit())
    }

    fn swap(&mut self, j: ItemPos, k: ItemPos) {
        self.items.swap(j as usize, k as usize);
    }

    fn sort_range(&mut self, from: ItemPos, to: ItemPos) {
        if from >= to {
            return;
        }
        self.items[from as usize..=to as usize].sort_by(|a, b| (b.p * a.w).cmp(&(a.p * b.w)));
    }

    /*
     * Sorting
     */

    /// Fully sort the window by non-increasing efficiency and rebuild the
    /// prefix sums.
    pub fn sort(&mut self) {
        if self.sort_status == SortStatus::Full {
            return;
        }
        self.sort_status = SortStatus::Full;
        if self.item_number() > 1 {
            let (f, l) = (self.f, self.l);
            self.sort_range(f, l);
        }
        self.int_left.clear();
        self.int_right.clear();
        self.compute_break_item();
        self.update_isum();
        self.s = self.f;
        self.t = self.l;
        self.assert_invariants();
    }

    fn update_isum(&mut self) {
        debug_assert!(self.sort_status == SortStatus::Full);
        self.isum.clear();
        self.isum.reserve(self.items.len() + 1);
        self.isum.push(Item { j: 0, w: 0, p: 0 });
        for k in 1..=self.items.len() {
            let prev = self.isum[k - 1];
            let it = self.items[k - 1];
            self.isum.push(Item {
                j: k,
                w: prev.w + it.w,
                p: prev.p + it.p,
            });
        }
    }

    fn isum(&self, k: ItemPos) -> &Item {
        &self.isum[k as usize]
    }

    /// Largest position `k` in the window whose prefix weight stays within
    /// `target`, found by binary search over the prefix sums; `l + 1` when
    /// every prefix fits.
    pub(crate) fn ub_item(&self, target: Weight) -> ItemPos {
        debug_assert!(self.sort_status == SortStatus::Full);
        let f = self.f as usize;
        let l = self.l as usize;
        let slice = &self.isum[f..=l];
        let idx = slice.partition_point(|e| e.w <= target);
        if idx == slice.len() {
            self.l + 1
        } else {
            (f + idx) as ItemPos - 1
        }
    }

    /// Recompute the break item, starting from the reduced solution and
    /// greedily filling the window prefix.
    fn compute_break_item(&mut self) {
        let mut sb = self.sol_red.clone();
        let mut b = self.f;
        while b <= self.l {
            let it = *self.item(b);
            if it.w > self.capacity_orig - sb.weight() {
                break;
            }
            sb.set(&it, true);
            b += 1;
        }
        self.b = b;
        self.sol_break = Some(sb);
    }

    fn partition(&mut self, f: ItemPos, l: ItemPos, rng: &mut ChaCha8Rng) -> ItemPos {
        let pivot = rng.gen_range(f + 1..=l);
        self.swap(pivot, l);
        let mut j = f;
        for k in f..l {
            if self.item(k).p * self.item(l).w <= self.item(l).p * self.item(k).w {
                continue;
            }
            self.swap(k, j);
            j += 1;
        }
        self.swap(j, l);
        j
    }

    /// Partial sort: partition around random pivots, descending only into
    /// the side containing the break item, until the remaining window is
    /// below `limit`. The untouched sides are recorded as pending
    /// intervals. The resulting break item is the one a full sort would
    /// produce.
    pub fn sort_partially(&mut self, limit: usize) {
        if self.break_item_found() {
            return;
        }
        self.int_left.clear();
        self.int_right.clear();
        if self.item_number() > 1 {
            let mut rng = ChaCha8Rng::seed_from_u64(self.items.len() as u64);
            let mut f = self.f;
            let mut l = self.l;
            let mut c = self.capacity();
            while f < l {
                if (l - f) < limit as ItemPos {
                    self.sort_range(f, l);
                    let mut b = f;
                    while b <= l {
                        if c < self.item(b).w {
                            break;
                        }
                        c -= self.item(b).w;
                        b += 1;
                    }
                    if f < b {
                        self.int_left.push(Interval { f, l: b - 1 });
                    }
                    if b < l {
                        self.int_right.push(Interval { f: b + 1, l });
                    }
                    break;
                }
                let j = self.partition(f, l, &mut rng);
                let w: Weight = (f..j).map(|k| self.item(k).w).sum();
                if w + self.item(j).w <= c {
                    c -= w + self.item(j).w;
                    self.int_left.push(Interval { f, l: j });
                    f = j + 1;
                } else if w > c {
                    self.int_right.push(Interval { f: j, l });
                    l = j - 1;
                } else {
                    // The pivot is the break item.
                    if f <= j - 1 {
                        self.int_left.push(Interval { f, l: j - 1 });
                    }
                    if j + 1 <= l {
                        self.int_right.push(Interval { f: j + 1, l });
                    }
                    break;
                }
            }
        }
        if self.sort_status != SortStatus::Full {
            self.sort_status = SortStatus::Partial;
        }
        self.compute_break_item();
        self.s = self.b;
        self.t = self.b;
        self.assert_invariants();
    }

    /// Admit the pending interval adjacent to the core on the right.
    /// Items whose forced-in bound stays below `lb` are left outside the
    /// core for good; the survivors are sorted into `[t+1..]`.
    pub fn sort_right(&mut self, lb: Profit) {
        let interval = match self.int_right.pop() {
            Some(i) => i,
            None => return,
        };
        let bpos = self.b;
        let mut k = self.t;
        for j in interval.f..=interval.l {
            let it = *self.item(j);
            let ub = self.break_solution().profit() + it.p
                + ((self.break_capacity() - it.w) * self.item(bpos).p) / self.item(bpos).w;
            if (it.w <= self.capacity() && ub > lb) || (k == self.t && j == interval.l) {
                k += 1;
                self.swap(k, j);
            }
        }
        let t = self.t;
        self.sort_range(t + 1, k);
        self.t = k;
        if self.int_right.is_empty() {
            self.l = self.t;
        }
        self.assert_invariants();
    }

    /// Mirror of `sort_right`: items whose forced-out bound stays below
    /// `lb` are fixed into the reduced solution, the rest are sorted into
    /// `[..s-1]`.
    pub fn sort_left(&mut self, lb: Profit) {
        let interval = match self.int_left.pop() {
            Some(i) => i,
            None => return,
        };
        let bpos = self.b;
        let mut k = self.s;
        for j in (interval.f..=interval.l).rev() {
            let it = *self.item(j);
            let ub = self.break_solution().profit() - it.p
                + ((self.break_capacity() + it.w) * self.item(bpos).p) / self.item(bpos).w;
            if (it.w <= self.capacity() && ub > lb) || (j == interval.f && k == self.s) {
                k -= 1;
                self.swap(k, j);
            } else {
                self.sol_red.set(&it, true);
            }
        }
        let s = self.s;
        self.sort_range(k, s - 1);
        self.s = k;
        if self.int_left.is_empty() {
            self.f = self.s;
        }
        self.assert_invariants();
    }

    /// Move items which no longer fit in the remaining capacity after
    /// `l`. May recompute the break item and the partial sort.
    pub fn remove_big_items(&mut self) {
        if self.sort_status == SortStatus::Full {
            let mut not_fixed: Vec<Item> = Vec::new();
            let mut fixed_0: Vec<Item> = Vec::new();
            for j in self.f..=self.l {
                let it = *self.item(j);
                if it.w > self.capacity() {
                    fixed_0.push(it);
                } else {
                    not_fixed.push(it);
                }
            }
            if !fixed_0.is_empty() {
                let n = not_fixed.len() as ItemPos;
                let mut pos = self.f;
                for it in not_fixed.into_iter().chain(fixed_0) {
                    self.items[pos as usize] = it;
                    pos += 1;
                }
                self.l = self.f + n - 1;
            }
        } else {
            let mut j = self.f;
            while j <= self.l {
                if self.item(j).w <= self.capacity() {
                    j += 1;
                    continue;
                }
                if j == self.b {
                    self.b = -1;
                }
                if self.b >= 0 && j < self.b {
                    // Break prefix items always fit alongside the reduced
                    // solution.
                    debug_assert!(false, "big item inside the break prefix");
                    j += 1;
                } else {
                    let lpos = self.l;
                    self.swap(j, lpos);
                    self.l -= 1;
                }
            }
            if self.b < 0 {
                self.sort_partially(PARTIAL_SORT_LIMIT);
            }
        }
    }

    /*
     * Variable reduction
     */

    /// Variable reduction with Dembo-style bounds; only needs a partial
    /// sort. Items provably in every optimum move into the reduced
    /// solution, items provably out move past `l`. Returns true when the
    /// remaining capacity went negative, in which case `lb` is optimal.
    pub fn reduce1(&mut self, lb: Profit) -> bool {
        debug_assert!(self.break_item_found());
        if self.b > self.l {
            return false;
        }
        let n_before = self.item_number();
        let bpos = self.b;
        let mut j = self.f;
        while j < self.b {
            let it = *self.item(j);
            let ub = self.break_solution().profit() - it.p
                + ((self.break_capacity() + it.w) * self.item(bpos).p) / self.item(bpos).w;
            if ub <= lb {
                self.sol_red.set(&it, true);
                if j != self.f {
                    let fpos = self.f;
                    self.swap(j, fpos);
                }
                self.f += 1;
                if self.capacity() < 0 {
                    return true;
                }
            }
            j += 1;
        }
        let mut j = self.l;
        while j > self.b {
            let it = *self.item(j);
            let ub = self.break_solution().profit() + it.p
                + ((self.break_capacity() - it.w) * self.item(bpos).p) / self.item(bpos).w;
            if ub <= lb {
                if j != self.l {
                    let lpos = self.l;
                    self.swap(j, lpos);
                }
                self.l -= 1;
            }
            j -= 1;
        }
        debug!(
            lb,
            n_before,
            n_after = self.item_number(),
            capacity = self.capacity(),
            "reduce1"
        );
        // The swaps above scrambled both the item order and the pending
        // intervals; rebuild the partial sort from scratch.
        self.b = -1;
        self.sort_status = SortStatus::None;
        self.int_left.clear();
        self.int_right.clear();
        self.remove_big_items();
        false
    }

    /// Variable reduction with Dantzig-style bounds computed through the
    /// prefix sums; requires a full sort. Tighter than `reduce1`.
    pub fn reduce2(&mut self, lb: Profit) -> bool {
        debug_assert!(self.sort_status == SortStatus::Full);
        self.remove_big_items();
        self.compute_break_item();
        self.update_isum();
        if self.item_number() <= 1 || self.b > self.l {
            return self.capacity() < 0;
        }
        let n_before = self.item_number();

        let mut fixed_1: Vec<Item> = Vec::new();
        let mut not_fixed: Vec<Item> = Vec::new();
        let mut fixed_0: Vec<Item> = Vec::new();
        let c = self.total_capacity();

        for j in self.f..=self.b {
            let it = *self.item(j);
            let bb = self.ub_item(c + it.w);
            let ub = if bb == self.l + 1 {
                self.isum(self.l + 1).p - it.p
            } else if bb == self.l {
                let ub1 = self.isum(bb).p - it.p;
                let ub2 = self.isum(bb + 1).p - it.p
                    + ((c + it.w - self.isum(bb + 1).w) * self.item(bb - 1).p + 1)
                        / self.item(bb - 1).w
                    - 1;
                ub1.max(ub2)
            } else {
                let ub1 = self.isum(bb).p - it.p
                    + ((c + it.w - self.isum(bb).w) * self.item(bb + 1).p) / self.item(bb + 1).w;
                let ub2 = self.isum(bb + 1).p - it.p
                    + ((c + it.w - self.isum(bb + 1).w) * self.item(bb - 1).p + 1)
                        / self.item(bb - 1).w
                    - 1;
                ub1.max(ub2)
            };
            if ub <= lb {
                self.sol_red.set(&it, true);
                fixed_1.push(it);
                if self.capacity() < 0 {
                    return true;
                }
            } else if j != self.b {
                not_fixed.push(it);
            }
        }
        for j in self.b..=self.l {
            let it = *self.item(j);
            if j == self.b && fixed_1.last().map_or(false, |last| last.j == it.j) {
                continue;
            }
            let bb = self.ub_item(c - it.w);
            let ub = if bb == self.l + 1 {
                self.isum(self.l + 1).p + it.p
            } else if bb == self.l {
                let ub1 = self.isum(bb).p + it.p;
                let ub2 = self.isum(bb + 1).p + it.p
                    + ((c - it.w - self.isum(bb + 1).w) * self.item(bb - 1).p + 1)
                        / self.item(bb - 1).w
                    - 1;
                ub1.max(ub2)
            } else if bb == 0 {
                ((c + it.w) * self.item(bb).p) / self.item(bb).w
            } else {
                let ub1 = self.isum(bb).p + it.p
                    + ((c - it.w - self.isum(bb).w) * self.item(bb + 1).p) / self.item(bb + 1).w;
                let ub2 = self.isum(bb + 1).p + it.p
                    + ((c - it.w - self.isum(bb + 1).w) * self.item(bb - 1).p + 1)
                        / self.item(bb - 1).w
                    - 1;
                ub1.max(ub2)
            };
            if ub <= lb {
                fixed_0.push(it);
            } else {
                not_fixed.push(it);
            }
        }

        let n1 = fixed_1.len() as ItemPos;
        let n0 = fixed_0.len() as ItemPos;
        let mut pos = self.f;
        for it in fixed_1.into_iter().chain(not_fixed).chain(fixed_0) {
            self.items[pos as usize] = it;
            pos += 1;
        }
        self.f += n1;
        self.l -= n0;

        self.remove_big_items();
        self.compute_break_item();
        self.update_isum();
        self.s = self.f;
        self.t = self.l;
        debug!(
            lb,
            n_before,
            n_after = self.item_number(),
            capacity = self.capacity(),
            "reduce2"
        );
        self.assert_invariants();
        self.capacity() < 0
    }

    /*
     * Window updates used by the solver recursion
     */

    /// Fix items `[f..k)` into the reduced solution and shrink the window
    /// from the left.
    pub fn set_first_item(&mut self, k: ItemPos) {
        debug_assert!(k >= self.f);
        for j in self.f..k {
            let it = *self.item(j);
            self.sol_red.set(&it, true);
        }
        self.f = k;
    }

    /// Fix items `(k..l]` out and shrink the window from the right.
    pub fn set_last_item(&mut self, k: ItemPos) {
        debug_assert!(k <= self.l);
        self.l = k;
    }

    /// Apply the remembered window of a partial solution: tracked items
    /// are fixed to their recorded decision, the rest of the window stays
    /// open. The break item and the sort bookkeeping are rebuilt.
    pub fn fix(&mut self, psolf: &PartSolFactory, sol: PartSol) {
        let decided: std::collections::HashMap<ItemPos, bool> =
            psolf.decisions(sol).into_iter().collect();
        let mut fixed_1: Vec<Item> = Vec::new();
        let mut not_fixed: Vec<Item> = Vec::new();
        let mut fixed_0: Vec<Item> = Vec::new();
        for j in self.f..=self.l {
            let it = *self.item(j);
            match decided.get(&j) {
                Some(true) => {
                    self.sol_red.set(&it, true);
                    fixed_1.push(it);
                }
                Some(false) => fixed_0.push(it),
                None => not_fixed.push(it),
            }
        }
        let n1 = fixed_1.len() as ItemPos;
        let n0 = fixed_0.len() as ItemPos;
        let mut pos = self.f;
        for it in fixed_1.into_iter().chain(not_fixed).chain(fixed_0) {
            self.items[pos as usize] = it;
            pos += 1;
        }
        self.f += n1;
        self.l -= n0;
        self.sol_break = None;
        self.int_left.clear();
        self.int_right.clear();
        if self.sort_status == SortStatus::Full {
            self.remove_big_items();
            self.compute_break_item();
            self.update_isum();
            self.s = self.f;
            self.t = self.l;
        } else {
            self.b = -1;
            self.sort_status = SortStatus::None;
            self.remove_big_items();
        }
    }

    /// Turn the instance into its surrogate relaxation: `multiplier` is
    /// added to every window item weight and `multiplier * bound` to the
    /// capacity. Items whose adjusted weight drops to zero or below are
    /// fixed in. The instance is re-sorted partially afterwards.
    pub fn surrogate(&mut self, multiplier: Weight, bound: i64) {
        self.sol_break = None;
        self.sol_opt = None;
        for j in self.f..=self.l {
            let it = *self.item(j);
            self.sol_red.set(&it, false);
        }
        let bound = bound - self.sol_red.item_number() as i64;
        let mut j = self.f;
        while j <= self.l {
            self.items[j as usize].w += multiplier;
            let it = *self.item(j);
            if it.w <= 0 {
                self.sol_red.set(&it, true);
                let fpos = self.f;
                self.swap(j, fpos);
                self.f += 1;
            }
            j += 1;
        }
        self.capacity_orig += multiplier * bound;
        self.sort_status = SortStatus::None;
        self.b = -1;
        self.int_left.clear();
        self.int_right.clear();
        self.sort_partially(PARTIAL_SORT_LIMIT);
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        if !self.break_item_found() {
            return;
        }
        debug_assert!(0 <= self.f);
        debug_assert!(self.l < self.items.len() as ItemPos);
        if self.b <= self.l {
            debug_assert!(self.f <= self.s, "f {} s {}", self.f, self.s);
            debug_assert!(self.s <= self.b && self.b <= self.t + 1);
            debug_assert!(self.t <= self.l);
            // Core sorted by non-increasing efficiency.
            for j in self.s..self.t {
                let (a, b) = (self.item(j), self.item(j + 1));
                debug_assert!(
                    a.p * b.w >= b.p * a.w,
                    "core not sorted at {} ({:?} < {:?})",
                    j,
                    a,
                    b
                );
            }
        }
    }

    #[cfg(not(debug_assertions))]
    fn assert_invariants(&self) {}
}

#[cfg(test)]
mod tests {
    use super::super::testing::{make_instance, random_instance};
    use super::*;

    #[test]
    fn break_item_on_a_small_instance() {
        // Sorted by efficiency: (2,6) (2,3) (4,6) (6,5) (5,4).
        let mut ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.sort();
        assert_eq!(ins.break_item(), 3);
        assert_eq!(ins.break_solution().weight(), 8);
        assert_eq!(ins.break_solution().profit(), 15);
        assert_eq!(ins.break_capacity(), 2);
    }

    #[test]
    fn partial_sort_finds_the_same_break_solution_as_full_sort() {
        for seed in 0..20 {
            let full = random_instance(seed, 400, 2_000, 50, 80);
            let mut partial = full.clone();
            let mut full = full;
            full.sort();
            partial.sort_partially(8);
            assert_eq!(
                full.break_solution().weight(),
                partial.break_solution().weight(),
                "seed {}",
                seed
            );
            assert_eq!(
                full.break_solution().profit(),
                partial.break_solution().profit(),
                "seed {}",
                seed
            );
        }
    }

    #[test]
    fn partial_sort_intervals_cover_the_window() {
        let mut ins = random_instance(7, 300, 1_500, 40, 60);
        ins.sort_partially(8);
        let b = ins.break_item();
        let mut covered: Vec<ItemPos> = vec![b];
        for i in 0..ins.int_left_size() {
            let iv = ins.int_left[i];
            covered.extend(iv.f..=iv.l);
        }
        for i in 0..ins.int_right_size() {
            let iv = ins.int_right[i];
            covered.extend(iv.f..=iv.l);
        }
        covered.sort_unstable();
        let expected: Vec<ItemPos> = (ins.first_item()..=ins.last_item()).collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn sort_right_extends_the_core_in_efficiency_order() {
        let mut ins = random_instance(11, 200, 1_000, 30, 50);
        ins.sort_partially(8);
        while ins.int_right_size() > 0 {
            ins.sort_right(0);
        }
        for j in ins.break_item()..ins.last_sorted_item() {
            let (a, b) = (*ins.item(j), *ins.item(j + 1));
            assert!(a.p * b.w >= b.p * a.w, "position {}", j);
        }
        assert_eq!(ins.last_item(), ins.last_sorted_item());
    }

    #[test]
    fn sort_left_extends_the_core_in_efficiency_order() {
        let mut ins = random_instance(13, 200, 1_000, 30, 50);
        ins.sort_partially(8);
        while ins.int_left_size() > 0 {
            ins.sort_left(0);
        }
        for j in ins.first_sorted_item()..ins.break_item() {
            let (a, b) = (*ins.item(j), *ins.item(j + 1));
            assert!(a.p * b.w >= b.p * a.w, "position {}", j);
        }
        assert_eq!(ins.first_item(), ins.first_sorted_item());
    }

    #[test]
    fn reduce1_fixes_efficient_items_in() {
        let mut ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.sort_partially(PARTIAL_SORT_LIMIT);
        let optimal = ins.reduce1(14);
        assert!(!optimal);
        // Items 0 and 4 are in every optimum; their Dembo bound when
        // forced out is 12 and 14.
        assert!(ins.reduced_solution().contains(0));
        assert!(ins.reduced_solution().contains(4));
    }

    #[test]
    fn reduce2_fixes_items_on_both_sides() {
        let mut ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.sort();
        let optimal = ins.reduce2(14);
        assert!(!optimal);
        assert!(ins.reduced_solution().contains(0));
        assert!(ins.reduced_solution().contains(4));
        // Items 2 and 3 are fixed out: they end up past the window.
        let out: Vec<usize> = ((ins.last_item() + 1) as usize..ins.total_item_number())
            .map(|pos| ins.item(pos as ItemPos).j)
            .collect();
        assert!(out.contains(&2));
        assert!(out.contains(&3));
        // Only item 1 stays undecided, and it fits entirely.
        assert_eq!(ins.item_number(), 1);
        assert_eq!(ins.item(ins.first_item()).j, 1);
        assert_eq!(ins.break_solution().profit(), 15);
    }

    #[test]
    fn remove_big_items_moves_them_past_the_window() {
        let mut ins = make_instance(6, &[(10, 100), (3, 4), (2, 3), (9, 50)]);
        ins.sort_partially(PARTIAL_SORT_LIMIT);
        ins.remove_big_items();
        for j in ins.first_item()..=ins.last_item() {
            assert!(ins.item(j).w <= ins.capacity());
        }
        let out: Vec<usize> = ((ins.last_item() + 1) as usize..ins.total_item_number())
            .map(|pos| ins.item(pos as ItemPos).j)
            .collect();
        assert!(out.contains(&0));
        assert!(out.contains(&3));
    }

    #[test]
    fn surrogate_shifts_weights_and_capacity() {
        let mut ins = make_instance(10, &[(2, 6), (3, 5), (4, 4)]);
        ins.sort_partially(PARTIAL_SORT_LIMIT);
        ins.surrogate(2, 2);
        assert_eq!(ins.total_capacity(), 14);
        let mut weights: Vec<Weight> = (0..ins.total_item_number())
            .map(|pos| ins.item(pos as ItemPos).w)
            .collect();
        weights.sort_unstable();
        assert_eq!(weights, vec![4, 5, 6]);
        assert!(ins.break_item_found());
    }

    #[test]
    fn rejects_inconsistent_items() {
        let mut ins = Instance::new(10);
        assert!(matches!(
            ins.add_item(0, 5),
            Err(KnapsackError::InvalidItemWeight)
        ));
        assert!(matches!(
            ins.add_item(3, -1),
            Err(KnapsackError::InvalidItemProfit)
        ));
        assert!(ins.add_item(3, 0).is_ok());
    }
}
