use std::num::NonZeroUsize;

/// Adaptive symbol frequencies stored as a Fenwick tree
///
/// Every symbol starts with a count of one so that no symbol ever has a zero
/// probability. Counts only grow until [`FrequencyModel::reset`].
#[derive(Debug, Clone)]
pub struct FrequencyModel {
    /// One-based Fenwick tree over the symbol counts
    tree: Vec<u64>,
    n_symbols: usize,
    total: u64,
}

impl FrequencyModel {
    #[must_use]
    pub fn new(n_symbols: NonZeroUsize) -> Self {
        let n_symbols = n_symbols.get();
        let mut model = Self {
            tree: vec![0; n_symbols + 1],
            n_symbols,
            total: 0,
        };
        model.reset();
        model
    }

    /// Restores the uniform starting distribution
    pub fn reset(&mut self) {
        // with all counts at one each node covers exactly lowbit(i) symbols
        for (i, node) in self.tree.iter_mut().enumerate() {
            *node = (i & i.wrapping_neg()) as u64;
        }
        self.total = self.n_symbols as u64;
    }

    #[must_use]
    pub fn n_symbols(&self) -> usize {
        self.n_symbols
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Sum of the counts of all symbols strictly below `symbol`
    #[must_use]
    pub fn cumulative(&self, symbol: usize) -> u64 {
        let mut sum = 0;
        let mut i = symbol.min(self.n_symbols);
        while i > 0 {
            sum += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        sum
    }

    /// Adds one to the count of `symbol`
    pub fn increment(&mut self, symbol: usize) {
        let mut i = symbol + 1;
        while i <= self.n_symbols {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
        self.total += 1;
    }

    /// Finds the symbol `s` with `cumulative(s) <= target < cumulative(s + 1)`
    ///
    /// Targets at or beyond the total map to the last symbol.
    #[must_use]
    pub fn find(&self, target: u64) -> usize {
        let mut position = 0;
        let mut remaining = target;
        let mut step = 1usize << (usize::BITS - 1 - self.n_symbols.leading_zeros());
        while step > 0 {
            let next = position + step;
            if next <= self.n_symbols && self.tree[next] <= remaining {
                position = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }
        position.min(self.n_symbols - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(n_symbols: usize) -> FrequencyModel {
        FrequencyModel::new(NonZeroUsize::new(n_symbols).unwrap())
    }

    #[test]
    fn test_uniform_start() {
        let model = model(5);
        assert_eq!(model.total(), 5);
        for s in 0..=5 {
            assert_eq!(model.cumulative(s), s as u64);
        }
    }

    #[test]
    fn test_increment_updates_prefix_sums() {
        let mut model = model(7);
        model.increment(2);
        model.increment(2);
        model.increment(6);
        assert_eq!(model.total(), 10);
        assert_eq!(model.cumulative(2), 2);
        assert_eq!(model.cumulative(3), 5);
        assert_eq!(model.cumulative(6), 8);
        assert_eq!(model.cumulative(7), 10);
    }

    #[test]
    fn test_find_matches_linear_scan() {
        let mut model = model(13);
        for s in [0, 3, 3, 12, 7, 7, 7, 1] {
            model.increment(s);
        }
        for target in 0..model.total() {
            let expected = (0..13)
                .rev()
                .find(|&s| model.cumulative(s) <= target)
                .unwrap();
            assert_eq!(model.find(target), expected, "target {target}");
        }
        assert_eq!(model.find(model.total() + 10), 12);
    }

    #[test]
    fn test_single_symbol() {
        let mut model = model(1);
        model.increment(0);
        assert_eq!(model.find(0), 0);
        assert_eq!(model.find(1), 0);
    }

    #[test]
    fn test_reset() {
        let mut model = model(4);
        model.increment(1);
        model.reset();
        assert_eq!(model.total(), 4);
        assert_eq!(model.cumulative(2), 2);
    }
}
