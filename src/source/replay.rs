use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{DeserializeRecordsIntoIter, Reader};

use super::RecordGenerator;
use crate::error::FeedError;
use crate::record::Record;

/// Replays a recorded CSV file with `id,label,amount,timestamp` headers, one row per tick. Rows
/// keep the timestamp they were recorded with.
pub struct CsvReplay<R: Read> {
    rows: DeserializeRecordsIntoIter<R, Record>,
    //Data rows start after the header line
    line: u64,
}

impl CsvReplay<File> {
    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        let reader = Reader::from_path(path).map_err(|err| FeedError::Io { source: err.into() })?;
        Ok(Self::from_csv(reader))
    }
}

impl<R: Read> CsvReplay<R> {
    pub fn from_reader(reader: R) -> Self {
        Self::from_csv(Reader::from_reader(reader))
    }

    fn from_csv(reader: Reader<R>) -> Self {
        Self {
            rows: reader.into_deserialize(),
            line: 1,
        }
    }
}

impl<R: Read> RecordGenerator for CsvReplay<R> {
    fn generate(&mut self, _now: i64) -> Option<Result<Record, FeedError>> {
        let row = self.rows.next()?;
        self.line += 1;
        Some(row.map_err(|err| FeedError::Malformed {
            line: err.position().map(|pos| pos.line()).unwrap_or(self.line),
            reason: err.to_string(),
        }))
    }
}
