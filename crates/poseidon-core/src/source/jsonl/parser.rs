use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::source::{DeviceEvent, EventSource, SourceError};

use super::error::JsonlSourceError;
use super::layout;
use super::reader::{parse_envelope, read_next_line};

/// Event source over a JSON-lines capture, one envelope per line.
pub struct JsonLinesEventSource<R = BufReader<File>> {
    reader: R,
    line_no: u64,
    buf: String,
}

impl JsonLinesEventSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        Ok(Self::from_reader(BufReader::with_capacity(
            layout::READER_BUFFER_SIZE,
            file,
        )))
    }
}

impl<R: BufRead> JsonLinesEventSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> EventSource for JsonLinesEventSource<R> {
    fn next_event(&mut self) -> Result<Option<DeviceEvent>, SourceError> {
        next_event(&mut self.reader, &mut self.line_no, &mut self.buf).map_err(SourceError::from)
    }
}

fn next_event<R: BufRead>(
    reader: &mut R,
    line_no: &mut u64,
    buf: &mut String,
) -> Result<Option<DeviceEvent>, JsonlSourceError> {
    if !read_next_line(reader, line_no, buf)? {
        return Ok(None);
    }
    parse_envelope(buf, *line_no).map(Some)
}
