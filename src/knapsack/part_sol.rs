use super::ItemPos;

/// Compact partial solution: one bit per tracked item, relative to the
/// break solution. Bit set means the item is taken in the state, cleared
/// means it is left out, whatever side of the break item it sits on.
pub type PartSol = u64;

/// Sliding-window codec over the last `size` items touched by the
/// dynamic program (`size` <= 64, one bit per item). When an item beyond
/// the window is registered, the oldest slot is recycled and its decision
/// is forgotten; forgotten decisions are recovered by re-solving the
/// shrunken instance (see the solver recursion).
#[derive(Clone, Debug)]
pub struct PartSolFactory {
    size: usize,
    // Logical indices of the first and last tracked items; x2 < x1 while
    // nothing is tracked.
    x1: i64,
    x2: i64,
    positions: Vec<ItemPos>,
}

impl PartSolFactory {
    pub fn new(size: usize) -> Self {
        assert!(size >= 1 && size <= 64);
        PartSolFactory {
            size,
            x1: 0,
            x2: -1,
            positions: vec![-1; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn offset(&self, x: i64) -> usize {
        (x as usize) % self.size
    }

    /// Number of items currently tracked.
    pub fn tracked(&self) -> usize {
        (self.x2 - self.x1 + 1) as usize
    }

    /// Register that the item at `pos` is now tracked. Its bit starts
    /// cleared; `add`/`remove` set the actual decision per state.
    pub fn add_item(&mut self, pos: ItemPos) {
        self.x2 += 1;
        if self.x2 - self.x1 >= self.size as i64 {
            self.x1 += 1;
        }
        let off = self.offset(self.x2);
        self.positions[off] = pos;
    }

    /// Mark the newest tracked item as taken.
    pub fn add(&self, sol: PartSol) -> PartSol {
        sol | (1u64 << self.offset(self.x2))
    }

    /// Mark the newest tracked item as left out.
    pub fn remove(&self, sol: PartSol) -> PartSol {
        sol & !(1u64 << self.offset(self.x2))
    }

    /// Decode the window: item positions currently remembered, paired
    /// with their in/out decision in `sol`.
    pub fn decisions(&self, sol: PartSol) -> Vec<(ItemPos, bool)> {
        (self.x1..=self.x2)
            .map(|x| {
                let off = self.offset(x);
                (self.positions[off], sol & (1u64 << off) != 0)
            })
            .collect()
    }
}
