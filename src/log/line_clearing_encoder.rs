//! The scenario progress bar redraws its line in place. A log record written over it would leave
//! the tail of the bar behind, so each record first clears the current terminal line.

use log::Record;
use log4rs::encode::{Encode, Write};

// Erase the whole line, then carriage return.
const CLEAR_LINE: &[u8] = b"\x1B[2K\r";

#[derive(Debug)]
pub struct LineClearingEncoder<E: Encode> {
    inner: E,
}

impl<E: Encode> LineClearingEncoder<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<E: Encode> Encode for LineClearingEncoder<E> {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        w.write_all(CLEAR_LINE)?;
        self.inner.encode(w, record)
    }
}
