//! Progress reporting hooks for chunked reads.

use crate::range::SubRange;

/// Observer for a chunked read.
///
/// `start` is called once with the number of sub-ranges before the first
/// chunk request, `advance` after each sub-range completes (empty ones
/// included) and `finish` when the read ends, successfully or not.
pub trait Progress: Send {
    fn start(&mut self, _label: &str, _total: usize) {}

    fn advance(&mut self, _range: &SubRange) {}

    fn finish(&mut self) {}
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

impl<P: Progress + ?Sized> Progress for Box<P> {
    fn start(&mut self, label: &str, total: usize) {
        (**self).start(label, total)
    }

    fn advance(&mut self, range: &SubRange) {
        (**self).advance(range)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}
