//! Payload seam for replay storage.
//!
//! The replay buffer treats the stored record as opaque: it only needs to
//! copy records into sample batches and collate a drawn set of records into
//! a single aggregate of the same type, the way tensor nests stack along
//! the batch axis.

/// Record type stored in the replay buffer.
///
/// `pack` collates individual records into one aggregate record; `unpack`
/// is its inverse. Implementations should make `pack(unpack(b)) == b` hold
/// for any batch `b` produced by `pack`.
pub trait Batchable: Clone + Send + 'static {
    /// Collate a sequence of records into a single batch record.
    fn pack(items: Vec<Self>) -> Self;

    /// Split a batch record back into individual records.
    fn unpack(self) -> Vec<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Rows(Vec<u32>);

    impl Batchable for Rows {
        fn pack(items: Vec<Self>) -> Self {
            Rows(items.into_iter().flat_map(|r| r.0).collect())
        }

        fn unpack(self) -> Vec<Self> {
            self.0.into_iter().map(|x| Rows(vec![x])).collect()
        }
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let batch = Rows::pack(vec![Rows(vec![1]), Rows(vec![2]), Rows(vec![3])]);
        assert_eq!(batch, Rows(vec![1, 2, 3]));

        let items = batch.clone().unpack();
        assert_eq!(items.len(), 3);
        assert_eq!(Rows::pack(items), batch);
    }
}
