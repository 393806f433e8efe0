//! Round-robin matchups.

/// Every unordered pair of `0..n`, in lexicographic order.
///
/// ```
/// use sternhalma_training::schedule::matchup_schedule;
///
/// assert_eq!(matchup_schedule(3), vec![(0, 1), (0, 2), (1, 2)]);
/// assert!(matchup_schedule(1).is_empty());
/// ```
#[must_use]
pub fn matchup_schedule(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect()
}

/// Seat assignment of game `game` of a matchup: even games put the first
/// individual in seat 0 (moving first), odd games the second.
#[must_use]
pub fn seat_order((i, j): (usize, usize), game: u32) -> [usize; 2] {
    if game % 2 == 0 { [i, j] } else { [j, i] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_size() {
        for n in 0..10 {
            let schedule = matchup_schedule(n);
            assert_eq!(schedule.len(), n * n.saturating_sub(1) / 2);
            assert!(schedule.iter().all(|&(i, j)| i < j && j < n));
            assert!(schedule.is_sorted());
        }
        assert_eq!(matchup_schedule(4).len(), 6);
    }

    #[test]
    fn test_seat_order_alternates() {
        assert_eq!(seat_order((1, 3), 0), [1, 3]);
        assert_eq!(seat_order((1, 3), 1), [3, 1]);
        assert_eq!(seat_order((1, 3), 2), [1, 3]);
    }
}
