//! Deterministic block-number to partition mapping.
//!
//! Maps a block number to its home partition with a plain modulo. Block
//! numbers are dense and sequential in practice, so the low bits already
//! spread neighboring blocks across partitions; a mixing hash would only
//! make the mapping harder to reason about in tests and crash dumps. The
//! device id deliberately does not participate: a block's home must be
//! computable from the number alone.
//!
//! ## Example Usage
//!
//! ```
//! use bufcache::ds::PartitionSelector;
//!
//! let selector = PartitionSelector::new(13);
//!
//! // Deterministic: same block -> same partition
//! let home = selector.partition_for(42);
//! assert_eq!(selector.partition_for(42), home);
//! assert!(home < 13);
//!
//! // Neighboring blocks land in different partitions
//! assert_ne!(selector.partition_for(7), selector.partition_for(8));
//! ```

/// Deterministic block -> partition index mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSelector {
    partitions: usize,
}

impl PartitionSelector {
    /// Creates a selector for `partitions` partitions.
    ///
    /// The partition count is clamped to at least 1.
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
        }
    }

    /// Returns the number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions
    }

    /// Maps a block number to a partition index in `[0, partitions)`.
    #[inline]
    pub fn partition_for(&self, block: u64) -> usize {
        (block % self.partitions as u64) as usize
    }
}

impl Default for PartitionSelector {
    /// Creates a single-partition selector.
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_deterministic() {
        let selector = PartitionSelector::new(8);

        let a = selector.partition_for(1234);
        let b = selector.partition_for(1234);
        assert_eq!(a, b);
        assert!(a < selector.partition_count());
    }

    #[test]
    fn consecutive_blocks_rotate_through_partitions() {
        let selector = PartitionSelector::new(4);
        let homes: Vec<_> = (0..8).map(|b| selector.partition_for(b)).collect();
        assert_eq!(homes, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn zero_partitions_clamps_to_one() {
        let selector = PartitionSelector::new(0);
        assert_eq!(selector.partition_count(), 1);
        assert_eq!(selector.partition_for(u64::MAX), 0);
    }
}
