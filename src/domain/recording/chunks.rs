//! Accumulator for opaque encoded chunks from the native recorder

/// Append-only, arrival-ordered list of opaque audio chunks.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks carry no audio and are skipped.
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate all chunks in arrival order into one audio object
    pub fn assemble(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_preserves_arrival_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(vec![1, 2]);
        buffer.push(vec![3]);
        buffer.push(vec![4, 5, 6]);
        assert_eq!(buffer.assemble(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_bytes(), 6);
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Vec::new());
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_resets_counters() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(vec![9; 10]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_bytes(), 0);
    }
}
