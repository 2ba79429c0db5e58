use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::take;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use walker_core::{OutputRow, ProcessedSet};

use crate::persist::{ensure_output_dir, parent_dir, PersistError};

const SEP: char = ',';

/// Append-only CSV sink with a fixed four-column header.
#[derive(Debug, Clone)]
pub struct OutputStore {
    path: PathBuf,
}

impl OutputStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Category codes already recorded, read back from the store itself.
    pub fn load_processed_codes(&self) -> Result<ProcessedSet, PersistError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ProcessedSet::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = parse_records(&text);
        if !text.ends_with(['\n', '\r']) && records.len() > 1 {
            // The last append never finished; its category is not done.
            if let Some(fragment) = records.pop() {
                engine_warn!("Ignoring unfinished last line {:?}", fragment.join(","));
            }
        }
        let processed: ProcessedSet = records
            .into_iter()
            .skip(1)
            .filter(|record| {
                let complete = record.len() == OutputRow::HEADER.len();
                if !complete {
                    engine_warn!("Ignoring partial record {:?}", record.join(","));
                }
                complete
            })
            .filter_map(|record| record.into_iter().next())
            .collect();
        engine_info!(
            "{} categories already recorded in {:?}",
            processed.len(),
            self.path
        );
        Ok(processed)
    }

    /// Appends `rows` durably, writing the header first when the store is new
    /// or empty. Existing content is never rewritten.
    pub fn append_rows(&self, rows: &[OutputRow]) -> Result<(), PersistError> {
        if rows.is_empty() {
            return Ok(());
        }
        ensure_output_dir(&parent_dir(&self.path))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let mut buf: Vec<u8> = Vec::new();
        match trailing_state(&mut file)? {
            Tail::Empty => write_record(&mut buf, &OutputRow::HEADER)?,
            // A previous run died mid-line; keep its fragment on its own line.
            // Loading ignores it since it is short of a full record.
            Tail::Unterminated => buf.push(b'\n'),
            Tail::Terminated => {}
        }
        for row in rows {
            write_record(&mut buf, &row.fields())?;
        }

        file.write_all(&buf)?;
        file.flush()?;
        file.sync_data()?;
        engine_debug!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }
}

enum Tail {
    Empty,
    Terminated,
    Unterminated,
}

fn trailing_state(file: &mut File) -> io::Result<Tail> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Tail::Empty);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(if last[0] == b'\n' {
        Tail::Terminated
    } else {
        Tail::Unterminated
    })
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_record<W: Write>(mut w: W, fields: &[&str]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEP}")?;
        }
        if needs_quotes(field) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            write!(w, "{field}")?;
        }
    }
    writeln!(w)
}

/// Quote- and CRLF-tolerant record parser. Blank lines are dropped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == SEP && !in_quotes => record.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
