//! Lookahead pagination.
//!
//! A page asks for one row more than the batch size. Receiving that extra
//! row is the only "more records" signal; it is never emitted.

use crate::record::Record;
use crate::request::LoadSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    batch_size: Option<usize>,
    batch_number: usize,
}

impl Page {
    /// A zero batch size means no pagination.
    pub fn new(batch_size: Option<usize>, batch_number: usize) -> Self {
        Self {
            batch_size: batch_size.filter(|size| *size > 0),
            batch_number,
        }
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    pub fn batch_number(&self) -> usize {
        self.batch_number
    }

    pub fn is_paginated(&self) -> bool {
        self.batch_size.is_some()
    }

    /// Rows to request: batch size plus the lookahead row.
    pub fn fetch_limit(&self) -> Option<usize> {
        self.batch_size.map(|size| size + 1)
    }

    /// Rows to skip, when past the first batch.
    pub fn offset(&self) -> Option<usize> {
        match self.batch_size {
            Some(size) if self.batch_number > 0 => Some(size * self.batch_number),
            _ => None,
        }
    }

    /// Emit `rows` into `sink` in order, coercing each one. The row at
    /// index `batch_size` signals more records and stops processing.
    /// Returns the number of records emitted.
    pub fn assemble<R, I, F, S>(&self, rows: I, sink: &mut S, mut coerce: F) -> usize
    where
        I: IntoIterator<Item = R>,
        F: FnMut(R) -> Record,
        S: LoadSink + ?Sized,
    {
        let mut emitted = 0;
        for (index, row) in rows.into_iter().enumerate() {
            if Some(index) == self.batch_size {
                sink.set_has_more_records();
                break;
            }
            sink.add_record(coerce(row));
            emitted += 1;
        }
        emitted
    }
}
