//! A `std::vec::Vec`, but 1-indexed instead of 0-indexed.

use std::ops::Index;

/// Like a `std::vec::Vec`, but 1-indexed instead of 0-indexed. Index 0 is never valid, which
/// matches the numbering of class-file constant pools.
#[derive(Debug, Clone, Default)]
pub struct OneIndexedVec<T> {
    vec: Vec<T>,
}

impl<T> OneIndexedVec<T> {
    pub fn new() -> Self {
        OneIndexedVec { vec: vec![] }
    }

    /// Returns the element at the given index, or None if the index is 0 or out of bounds.
    pub fn get(&self, index: usize) -> Option<&T> {
        index.checked_sub(1).and_then(|i| self.vec.get(i))
    }

    /// Appends an element and returns the (1-based) index it now occupies.
    pub fn push(&mut self, value: T) -> usize {
        self.vec.push(value);
        self.vec.len()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}

impl<T> Index<usize> for OneIndexedVec<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        if index == 0 {
            panic!("index is 0");
        }
        &self.vec[index - 1]
    }
}
