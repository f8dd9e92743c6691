//! Puzzle generation, rotation, and verification.

use gatehouse_common::RotateDirection;
use rand::Rng;
use rand::seq::SliceRandom;

use super::{PuzzleSession, ROW_LEN, SYMBOL_POOL};

/// Generate a fresh puzzle session.
///
/// Picks the base symbol uniformly from the pool, samples both rows without
/// replacement from the remainder, then plants the base at a random slot in
/// each row. Retries until the two planted slots differ, so the puzzle is
/// never solved as issued. Total over the pool (no error path).
pub fn generate() -> PuzzleSession {
    let mut rng = rand::rng();

    let base = SYMBOL_POOL[rng.random_range(0..SYMBOL_POOL.len())];

    // 10 distinct fillers from the remaining pool, split 5/5
    let mut fillers: Vec<char> = SYMBOL_POOL.iter().copied().filter(|&c| c != base).collect();
    fillers.shuffle(&mut rng);

    loop {
        let mut back_row = [' '; ROW_LEN];
        let mut front_row = [' '; ROW_LEN];
        back_row.copy_from_slice(&fillers[..ROW_LEN]);
        front_row.copy_from_slice(&fillers[ROW_LEN..2 * ROW_LEN]);

        let back_slot = rng.random_range(0..ROW_LEN);
        let front_slot = rng.random_range(0..ROW_LEN);
        if back_slot == front_slot {
            continue;
        }

        back_row[back_slot] = base;
        front_row[front_slot] = base;

        return PuzzleSession {
            base,
            back_row,
            front_row,
        };
    }
}

/// Circularly shift the front row by one slot. Period is 5.
pub fn rotate(session: &mut PuzzleSession, direction: RotateDirection) {
    match direction {
        // last element to the front
        RotateDirection::Right => session.front_row.rotate_right(1),
        // first element to the back
        RotateDirection::Left => session.front_row.rotate_left(1),
    }
}

/// True iff the base symbol occupies the same slot in both rows.
pub fn is_correct(session: &PuzzleSession) -> bool {
    session.back_index() == session.front_index()
}
