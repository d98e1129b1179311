pub mod fifo;
pub mod year_ext;

/// The two halves of a split: the part that is consumed and the part that stays behind.
pub struct HasSplit<A: Sized> {
    pub(crate) take: A,
    pub(crate) leave: A, // non-maybe.  consequence of split.
}
