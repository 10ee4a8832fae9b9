//! Skip/limit window over a [`RowSource`].

use crate::error::ReaderResult;
use crate::types::Value;

use super::RowSource;

/// Applies `skip` and an optional `max` to a row source, pulling lazily.
///
/// The skip is performed once, on the first pull, through [`RowSource::skip_rows`] so formats
/// can pass over skipped content cheaply. A failed skip closes the window: the source position
/// inside the skipped region is unknown, so no row after it can be numbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationWindow {
    skip: usize,
    max: Option<usize>,
    skipped: bool,
    closed: bool,
    yielded: usize,
}

impl PaginationWindow {
    /// Window yielding source rows `skip, skip + 1, ...` up to `max` of them.
    pub fn new(skip: usize, max: Option<usize>) -> Self {
        Self {
            skip,
            max,
            skipped: false,
            closed: false,
            yielded: 0,
        }
    }

    /// Pull the next row inside the window, or `None` once the window or the source is exhausted.
    pub fn pull<S>(&mut self, source: &mut S) -> Option<ReaderResult<Vec<Value>>>
    where
        S: RowSource + ?Sized,
    {
        if self.closed || self.max.is_some_and(|max| self.yielded >= max) {
            return None;
        }
        if !self.skipped {
            if self.skip > 0 {
                if let Err(e) = source.skip_rows(self.skip) {
                    self.closed = true;
                    return Some(Err(e));
                }
            }
            self.skipped = true;
        }

        let row = source.next_row()?;
        if row.is_ok() {
            self.yielded += 1;
        }
        Some(row)
    }

    /// Rows yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Configured skip count.
    pub fn skip(&self) -> usize {
        self.skip
    }
}
