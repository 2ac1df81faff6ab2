//! Gap-based ordering for explicitly ordered collections.
//!
//! Items in a board carry a sparse integer sort key (`position`). Appending
//! lands at `max + POSITION_STEP`, and inserting between neighbours takes the
//! midpoint of the surrounding gap, so a single drag-and-drop writes exactly
//! one row. When a gap closes (no integer strictly between the neighbours)
//! the planner reports [`Placement::RenumberRequired`] and the caller rewrites
//! the whole scope to evenly spaced keys before placing the new row.
//!
//! The functions here are pure; repositories own reading the current
//! positions and applying the resulting writes inside their transaction.

/// Spacing between positions after an append or a renumbering pass.
pub const POSITION_STEP: i64 = 1024;

/// Where a new or moved row should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Store the row at this position; no other row moves.
    At(i64),
    /// The surrounding gap is exhausted. Renumber the scope with
    /// [`renumbered_positions`], then plan again (guaranteed to yield `At`).
    RenumberRequired,
}

/// Clamp a caller-supplied index into `[0, len]`.
///
/// Out-of-range indexes are not an error; they mean "as far as possible in
/// that direction". `usize` already rules out negative input.
pub fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len)
}

/// Plan inserting a row at `index` within a scope whose current positions are
/// `positions` (sorted ascending, one entry per existing row).
///
/// Index 0 halves the gap below the first row, treating 0 as the virtual
/// lower bound. An index of `len` (or beyond, after clamping) appends.
pub fn plan_insertion(positions: &[i64], index: usize) -> Placement {
    debug_assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "positions must be strictly ascending"
    );

    let index = clamp_index(index, positions.len());

    if positions.is_empty() {
        return Placement::At(POSITION_STEP);
    }

    if index == 0 {
        let first = positions[0];
        if first > 1 {
            Placement::At(first / 2)
        } else {
            Placement::RenumberRequired
        }
    } else if index == positions.len() {
        match positions[positions.len() - 1].checked_add(POSITION_STEP) {
            Some(position) => Placement::At(position),
            None => Placement::RenumberRequired,
        }
    } else {
        let prev = positions[index - 1];
        let next = positions[index];
        if next - prev >= 2 {
            Placement::At(prev + (next - prev) / 2)
        } else {
            Placement::RenumberRequired
        }
    }
}

/// Plan appending a row at the end of the scope.
pub fn plan_append(positions: &[i64]) -> Placement {
    plan_insertion(positions, positions.len())
}

/// Plan moving the row currently at `from` so it ends up at index `to` in
/// the final sequence.
///
/// Returns `None` when the move is a no-op (the row already sits at the
/// target index after clamping). Otherwise the plan is computed over the
/// sequence with the moved row removed, which is exactly the state the
/// insertion sees.
pub fn plan_move(positions: &[i64], from: usize, to: usize) -> Option<Placement> {
    debug_assert!(from < positions.len());

    // The final sequence has the same length, so the largest meaningful
    // target index is len - 1.
    let to = clamp_index(to, positions.len().saturating_sub(1));
    if to == from {
        return None;
    }

    let mut remaining = Vec::with_capacity(positions.len() - 1);
    remaining.extend_from_slice(&positions[..from]);
    remaining.extend_from_slice(&positions[from + 1..]);
    Some(plan_insertion(&remaining, to))
}

/// Evenly spaced positions for a scope of `len` rows: `STEP, 2*STEP, ...`.
pub fn renumbered_positions(len: usize) -> Vec<i64> {
    (1..=len as i64).map(|i| i * POSITION_STEP).collect()
}
