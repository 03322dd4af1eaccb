//! Turns the text output of the read buffer benchmark into CSV rows.
//!
//! The benchmark prints context lines announcing what is measured next,
//! followed by one result line per read buffer size:
//!
//! | line      | pattern                                                    | state change                                              |
//! |-----------|------------------------------------------------------------|-----------------------------------------------------------|
//! | file      | `use_buffer=B; /dev/NAME:`                                 | use_buffer=B, write_buffer_bytes=0, type=`file_/dev/NAME` |
//! | run type  | `use_buffer=B; write_buffer_bytes=N; type=T`               | use_buffer=B, write_buffer_bytes=N, type=T                |
//! | result    | `buf_size=N; duration=Xs; num_syscalls=N; X MiB/s; X syscalls/s; short_reads=N` | none, emits a [`LogRecord`]          |
//!
//! Anything else is skipped.

use std::{
    io::{self, BufRead, Write},
    str,
};

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, trace};

use crate::util::format_float;

pub const MACHINE_CONFIGURATION_HEADER: &str = "machine_configuration";
pub const USE_BUFFER_HEADER: &str = "use_buffer";
pub const WRITE_BUFFER_BYTES_HEADER: &str = "write_buffer_bytes";
pub const CONNECTION_TYPE_HEADER: &str = "connection_type";
pub const READ_BUFFER_BYTES_HEADER: &str = "read_buffer_bytes";
pub const DURATION_HEADER: &str = "duration_sec";
pub const NUM_SYSCALLS_HEADER: &str = "num_syscalls";
pub const SHORT_READS_HEADER: &str = "short_reads";
pub const THROUGHPUT_HEADER: &str = "throughput (MiB/s)";

pub const CSV_HEADER: [&str; 9] = [
    MACHINE_CONFIGURATION_HEADER,
    USE_BUFFER_HEADER,
    WRITE_BUFFER_BYTES_HEADER,
    CONNECTION_TYPE_HEADER,
    READ_BUFFER_BYTES_HEADER,
    DURATION_HEADER,
    NUM_SYSCALLS_HEADER,
    SHORT_READS_HEADER,
    THROUGHPUT_HEADER,
];

const NANOS_PER_SEC: u64 = 1_000_000_000;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Line {line}: invalid {field} value {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("Reading input: {0}")]
    Io(#[from] io::Error),
    #[error("Writing CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// What the most recent context line said about the measurements that follow.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseState {
    pub use_buffer: bool,
    pub write_buffer_bytes: u64,
    pub connection_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub machine_configuration: String,
    pub use_buffer: bool,
    pub write_buffer_bytes: u64,
    pub connection_type: String,
    pub read_buffer_bytes: u64,
    pub duration_sec: f64,
    pub num_syscalls: u64,
    pub short_reads: u64,
    pub throughput_mib_per_sec: f64,
}

impl LogRecord {
    /// Fields in [`CSV_HEADER`] order.
    pub fn to_fields(&self) -> [String; 9] {
        [
            self.machine_configuration.clone(),
            self.use_buffer.to_string(),
            self.write_buffer_bytes.to_string(),
            self.connection_type.clone(),
            self.read_buffer_bytes.to_string(),
            format_float(self.duration_sec),
            self.num_syscalls.to_string(),
            self.short_reads.to_string(),
            format_float(self.throughput_mib_per_sec),
        ]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseSummary {
    pub lines: usize,
    /// Context lines that changed the parse state.
    pub context_changes: usize,
    pub records: usize,
}

/// `1`/`0`, `t`/`f` and `true`/`false` in lower, upper or title case.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parses `1.234s` into seconds, keeping nanosecond precision.
fn parse_seconds(value: &str) -> Option<f64> {
    let (whole, fraction) = value.strip_suffix('s')?.split_once('.')?;
    let whole: u64 = whole.parse().ok()?;
    let mut nanos = 0;
    let mut scale = NANOS_PER_SEC;
    for digit in fraction.chars() {
        let digit = u64::from(digit.to_digit(10)?);
        scale /= 10;
        nanos += digit * scale;
    }
    let total = whole.checked_mul(NANOS_PER_SEC)?.checked_add(nanos)?;
    if total > i64::MAX as u64 {
        return None;
    }
    Some((total / NANOS_PER_SEC) as f64 + (total % NANOS_PER_SEC) as f64 / 1e9)
}

fn capture<T>(
    caps: &Captures<'_>,
    group: usize,
    line: usize,
    field: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, ParseError> {
    let value = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    parse(value).ok_or_else(|| ParseError::InvalidField {
        line,
        field,
        value: value.to_owned(),
    })
}

pub struct LogParser {
    machine_configuration: String,
    file_line: Regex,
    run_type_line: Regex,
    result_line: Regex,
}

impl LogParser {
    pub fn new(machine_configuration: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self {
            machine_configuration: machine_configuration.into(),
            file_line: Regex::new(r"^use_buffer=([^;]+); (/dev/[^:]+):")?,
            run_type_line: Regex::new(
                r"^use_buffer=([^;]+); write_buffer_bytes=(\d+); type=([a-zA-Z]+)",
            )?,
            result_line: Regex::new(
                r"^buf_size=(\d+); duration=(\d+\.\d+s); num_syscalls=(\d+); (\d+\.\d+) MiB/s; \d+\.\d+ syscalls/s; short_reads=(\d+)",
            )?,
        })
    }

    /// Applies one log line to `state`. Returns a record for result lines.
    /// `line_no` is only used for error messages.
    pub fn process_line(
        &self,
        state: &mut ParseState,
        line_no: usize,
        line: &str,
    ) -> Result<Option<LogRecord>, ParseError> {
        if let Some(caps) = self.file_line.captures(line) {
            state.use_buffer = capture(&caps, 1, line_no, USE_BUFFER_HEADER, parse_bool)?;
            state.write_buffer_bytes = 0;
            state.connection_type = format!("file_{}", &caps[2]);
            debug!("line {line_no}: context {state:?}");
            return Ok(None);
        }

        if let Some(caps) = self.run_type_line.captures(line) {
            state.use_buffer = capture(&caps, 1, line_no, USE_BUFFER_HEADER, parse_bool)?;
            state.write_buffer_bytes =
                capture(&caps, 2, line_no, WRITE_BUFFER_BYTES_HEADER, |v| v.parse().ok())?;
            state.connection_type = caps[3].to_owned();
            debug!("line {line_no}: context {state:?}");
            return Ok(None);
        }

        if let Some(caps) = self.result_line.captures(line) {
            return Ok(Some(LogRecord {
                machine_configuration: self.machine_configuration.clone(),
                use_buffer: state.use_buffer,
                write_buffer_bytes: state.write_buffer_bytes,
                connection_type: state.connection_type.clone(),
                read_buffer_bytes: capture(&caps, 1, line_no, READ_BUFFER_BYTES_HEADER, |v| {
                    v.parse().ok()
                })?,
                duration_sec: capture(&caps, 2, line_no, DURATION_HEADER, parse_seconds)?,
                num_syscalls: capture(&caps, 3, line_no, NUM_SYSCALLS_HEADER, |v| v.parse().ok())?,
                throughput_mib_per_sec: capture(&caps, 4, line_no, THROUGHPUT_HEADER, |v| {
                    v.parse().ok()
                })?,
                short_reads: capture(&caps, 5, line_no, SHORT_READS_HEADER, |v| v.parse().ok())?,
            }));
        }

        trace!("line {line_no}: skipped");
        Ok(None)
    }

    /// Reads a whole log and writes the CSV, header included, to `output`.
    /// Lines that are not UTF-8 cannot match any rule and are skipped.
    pub fn parse_log<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<ParseSummary, ParseError> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(CSV_HEADER)?;

        let mut state = ParseState::default();
        let mut summary = ParseSummary::default();
        for (i, bytes) in input.split(b'\n').enumerate() {
            let bytes = bytes?;
            summary.lines += 1;
            let Ok(line) = str::from_utf8(bytes.strip_suffix(b"\r").unwrap_or(&bytes)) else {
                trace!("line {}: skipped, not UTF-8", i + 1);
                continue;
            };
            let before = state.clone();
            if let Some(record) = self.process_line(&mut state, i + 1, line)? {
                writer.write_record(record.to_fields())?;
                summary.records += 1;
            } else if state != before {
                summary.context_changes += 1;
            }
        }
        writer.flush()?;
        Ok(summary)
    }
}
