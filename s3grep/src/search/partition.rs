use std::num::NonZeroUsize;

use crate::store::ObjectRef;

/// Contiguous run of listed objects, owned by exactly one worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    objects: Vec<ObjectRef>,
}

impl Chunk {
    pub fn new(objects: Vec<ObjectRef>) -> Self {
        Self { objects }
    }

    pub fn objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl IntoIterator for Chunk {
    type Item = ObjectRef;
    type IntoIter = std::vec::IntoIter<ObjectRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

/// Number of workers used when none is configured: one per CPU, minus one
/// left for the coordinator, never fewer than one.
pub fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get().saturating_sub(1)).unwrap_or(NonZeroUsize::MIN)
}

/// Splits `objects` into at most `n` contiguous chunks of `ceil(len / n)`
/// objects each, keeping listing order. The last chunk may be shorter, and an
/// empty listing yields no chunks.
pub fn partition(objects: Vec<ObjectRef>, n: NonZeroUsize) -> Vec<Chunk> {
    if objects.is_empty() {
        return Vec::new();
    }
    let chunk_size = objects.len().div_ceil(n.get());

    let mut chunks = Vec::with_capacity(objects.len().div_ceil(chunk_size));
    let mut remaining = objects.into_iter().peekable();
    while remaining.peek().is_some() {
        chunks.push(Chunk::new(remaining.by_ref().take(chunk_size).collect()));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects(count: usize) -> Vec<ObjectRef> {
        (0..count)
            .map(|i| ObjectRef::new(format!("key-{}", i)))
            .collect()
    }

    fn n(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).unwrap()
    }

    #[test]
    fn test_empty_listing() {
        assert!(partition(Vec::new(), n(4)).is_empty());
    }

    #[test]
    fn test_even_split() {
        let chunks = partition(objects(8), n(4));
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_last_chunk_shorter() {
        let chunks = partition(objects(10), n(3));
        let sizes: Vec<_> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_more_workers_than_objects() {
        let chunks = partition(objects(3), n(8));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_single_worker() {
        let chunks = partition(objects(5), n(1));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].objects(), &objects(5)[..]);
    }

    #[test]
    fn test_concatenation_preserves_order() {
        for count in [0, 1, 2, 7, 16, 33, 100] {
            for workers in 1..=12 {
                let input = objects(count);
                let chunks = partition(input.clone(), n(workers));
                assert!(chunks.len() <= workers);
                assert!(chunks.iter().all(|c| !c.is_empty()));
                let joined: Vec<_> = chunks.into_iter().flatten().collect();
                assert_eq!(joined, input, "count={} workers={}", count, workers);
            }
        }
    }

    #[test]
    fn test_default_worker_count() {
        let expected = num_cpus::get().saturating_sub(1).max(1);
        assert_eq!(default_worker_count().get(), expected);
    }
}
