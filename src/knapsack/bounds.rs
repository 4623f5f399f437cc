use super::instance::Instance;
use super::{ItemPos, Profit};

/// Dantzig upper bound: break profit plus the fractional part of the
/// break item that still fits. Constant time once the break item is
/// known.
pub fn ub_dantzig(ins: &Instance) -> Profit {
    debug_assert!(ins.break_item_found());
    let b = ins.break_item();
    if b > ins.last_item() {
        return ins.break_solution().profit();
    }
    let it = ins.item(b);
    ins.break_solution().profit() + (ins.break_capacity() * it.p) / it.w
}

/// Take-everything bound; only useful when the instance is not sorted.
pub fn ub_trivial(ins: &Instance) -> Profit {
    let mut ub = ins.reduced_solution().profit();
    for j in ins.first_item()..=ins.last_item() {
        ub += ins.item(j).p;
    }
    ub
}

/// Dembo upper bound for a state with profit `p` and remaining capacity
/// `r >= 0`, completed fractionally with the item at `pos` (the next one
/// to be added on the right). Plain profit when no item is left.
pub fn ub_dembo(ins: &Instance, pos: ItemPos, p: Profit, r: Profit) -> Profit {
    if pos <= ins.last_item() {
        let it = ins.item(pos);
        p + (r * it.p) / it.w
    } else {
        p
    }
}

/// Reverse Dembo bound for an over-filled state, `r < 0`: the item at
/// `pos` (the next one removable on the left) is fractionally taken out.
/// Signed division truncates towards zero, which is the ceiling here.
pub fn ub_dembo_rev(ins: &Instance, pos: ItemPos, p: Profit, r: Profit) -> Profit {
    if pos >= ins.first_item() {
        let it = ins.item(pos);
        p + (r * it.p) / it.w
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::make_instance;
    use super::*;

    #[test]
    fn dantzig_bound_on_a_small_instance() {
        let mut ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.sort();
        // Break solution (2,6)(2,3)(4,6) = 15, residual 2 filled with 2/6
        // of item (6,5).
        assert_eq!(ub_dantzig(&ins), 15 + (2 * 5) / 6);
    }

    #[test]
    fn dantzig_is_the_profit_sum_when_everything_fits() {
        let mut ins = make_instance(100, &[(2, 6), (2, 3)]);
        ins.sort();
        assert_eq!(ub_dantzig(&ins), 9);
    }

    #[test]
    fn trivial_bound_takes_everything() {
        let mut ins = make_instance(5, &[(2, 6), (2, 3), (6, 5)]);
        ins.sort();
        assert_eq!(ub_trivial(&ins), 14);
    }

    #[test]
    fn dembo_bounds_round_in_the_safe_direction() {
        let mut ins = make_instance(10, &[(2, 6), (2, 3), (6, 5), (5, 4), (4, 6)]);
        ins.sort();
        // Forward: floor of the fractional completion.
        assert_eq!(ub_dembo(&ins, 3, 15, 2), 15 + 1);
        // No item left: the profit alone.
        assert_eq!(ub_dembo(&ins, ins.last_item() + 1, 15, 2), 15);
        // Reverse: truncation is the ceiling of a negative value,
        // -3 * 4 / 5 = -2.4 -> -2.
        assert_eq!(ub_dembo_rev(&ins, 4, 20, -3), 20 - 2);
    }
}
