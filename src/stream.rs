//! One-element lookahead over single-pass iterators.
//!
//! [`Lookahead`] lets a caller inspect the first element of a
//! non-rewindable stream and then iterate the whole stream, inspected
//! element included, in the original order. It buffers at most one
//! element and never forces evaluation of the tail.

pub struct Lookahead<I: Iterator> {
    inner: I,
    buffered: Option<I::Item>,
}

impl<I: Iterator> Lookahead<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            buffered: None,
        }
    }

    /// Pull and cache the first element, or report an empty stream.
    ///
    /// Repeated calls return the same cached element without consuming
    /// anything further from the underlying iterator.
    pub fn peek_first(&mut self) -> Option<&I::Item> {
        if self.buffered.is_none() {
            self.buffered = self.inner.next();
        }
        self.buffered.as_ref()
    }
}

impl<I: Iterator> Iterator for Lookahead<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self.buffered.take() {
            Some(item) => Some(item),
            None => self.inner.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_then_drain_preserves_order_and_count() {
        let mut stream = Lookahead::new(vec![1, 2, 3].into_iter());
        assert_eq!(stream.peek_first(), Some(&1));
        assert_eq!(stream.collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn peek_is_idempotent() {
        let mut stream = Lookahead::new(vec![10, 20].into_iter());
        assert_eq!(stream.peek_first(), Some(&10));
        assert_eq!(stream.peek_first(), Some(&10));
        assert_eq!(stream.collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn empty_stream_peeks_none() {
        let mut stream = Lookahead::new(std::iter::empty::<i32>());
        assert_eq!(stream.peek_first(), None);
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn drain_without_peek_is_transparent() {
        let stream = Lookahead::new(vec!["a", "b"].into_iter());
        assert_eq!(stream.collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn underlying_iterator_is_pulled_lazily() {
        let mut pulled = 0;
        let counted = (0..5).inspect(|_| pulled += 1);
        let mut stream = Lookahead::new(counted);
        stream.peek_first();
        assert_eq!(stream.next(), Some(0));
        assert_eq!(stream.next(), Some(1));
        drop(stream);
        assert_eq!(pulled, 2);
    }
}
