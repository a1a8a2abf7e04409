use crate::domain::command::{CommandRecord, LedgerCommand};
use crate::error::{LedgerError, Result};
use std::io::Read;

/// Reads ledger commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<LedgerCommand>`. It trims whitespace and accepts short rows, so
/// trailing empty columns may be omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses rows into commands. A malformed row yields an error
    /// item and reading continues with the next one.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(LedgerError::from)
                .and_then(|record: CommandRecord| LedgerCommand::try_from(record))
        })
    }
}
