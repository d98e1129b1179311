//! FIFO implemented using VecDeque, with ordered insertion for late arrivals.
use std::collections::vec_deque::{IntoIter, Iter};
use std::collections::VecDeque;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FIFO<A> {
    deq: VecDeque<A>,
}

impl<A> Default for FIFO<A> {
    fn default() -> Self {
        Self {
            deq: VecDeque::new(),
        }
    }
}

impl<A> FIFO<A> {
    pub fn new() -> Self {
        Self {
            deq: VecDeque::new(),
        }
    }
    pub fn iter(&self) -> Iter<'_, A> {
        self.deq.iter()
    }
    pub fn append_back(&mut self, e: A) {
        self.deq.push_back(e);
    }
    pub fn pop_front(&mut self) -> Option<A> {
        self.deq.pop_front()
    }
    pub fn push_front(&mut self, e: A) {
        // a LIFO thing, used for splits
        //   (intended sequence: pop; split -> (a,b); consume a; push_front b;)
        self.deq.push_front(e);
    }
    pub fn peek_front(&self) -> Option<&A> {
        self.deq.front()
    }
    pub fn len(&self) -> usize {
        self.deq.len()
    }
    pub fn is_empty(&self) -> bool {
        self.deq.is_empty()
    }

    /// Insert `e` after every element whose key is less than or equal to its own.
    ///
    /// A queue that was ordered by `key` stays ordered, and elements with equal keys keep their
    /// arrival order. In-order arrivals take the fast path of a plain `append_back`.
    pub fn insert_ordered_by_key<K, F>(&mut self, e: A, key: F)
    where
        K: Ord,
        F: Fn(&A) -> K,
    {
        let new_key = key(&e);
        match self.deq.back() {
            Some(last) if key(last) > new_key => {
                let index = self.deq.partition_point(|item| key(item) <= new_key);
                self.deq.insert(index, e);
            }
            _ => self.deq.push_back(e),
        }
    }

    /// Check that the queue is ordered by `key`.
    pub fn is_ordered_by_key<K, F>(&self, key: F) -> bool
    where
        K: Ord,
        F: Fn(&A) -> K,
    {
        self.deq
            .iter()
            .zip(self.deq.iter().skip(1))
            .all(|(a, b)| key(a) <= key(b))
    }
}

impl<A> FromIterator<A> for FIFO<A> {
    // see https://docs.rs/from_iter/latest/from_iter/trait.FromIterator.html
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        let iterator = iter.into_iter();
        let mut deq = FIFO::<A>::new();
        deq.extend(iterator);
        deq
    }
}

impl<A> IntoIterator for FIFO<A> {
    type Item = A;
    type IntoIter = IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.deq.into_iter()
    }
}

impl<'a, A> IntoIterator for &'a FIFO<A> {
    type Item = &'a A;
    type IntoIter = Iter<'a, A>;
    fn into_iter(self) -> Self::IntoIter {
        self.deq.iter()
    }
}

impl<A> Extend<A> for FIFO<A> {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        for item in iter.into_iter() {
            self.append_back(item);
        }
    }
}
