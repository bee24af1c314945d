/// Contiguous slice of the input handed to one map unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk<T> {
    pub index: usize,
    /// Position of the first item within the whole input.
    pub offset: usize,
    pub items: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Splits `items` into `num_chunks` order-preserving chunks whose sizes
/// differ by at most one. The first `len % num_chunks` chunks take the extra
/// item. `num_chunks` of zero is treated as one.
pub fn split_even<T>(items: Vec<T>, num_chunks: usize) -> Vec<Chunk<T>> {
    let num_chunks = num_chunks.max(1);
    let base = items.len() / num_chunks;
    let extra = items.len() % num_chunks;

    let mut iter = items.into_iter();
    let mut offset = 0;
    (0..num_chunks)
        .map(|index| {
            let size = base + usize::from(index < extra);
            let chunk = Chunk {
                index,
                offset,
                items: iter.by_ref().take(size).collect(),
            };
            offset += size;
            chunk
        })
        .collect()
}
