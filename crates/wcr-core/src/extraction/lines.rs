//! Turn a blob of region text into raw records.
//!
//! Two heuristics, tried per line in order:
//! - `Key: value` lines become key-value pairs. Consecutive pairs accumulate
//!   into one record until a key repeats, which starts the next record.
//! - Lines with two or more wide whitespace gaps become table lines. A run of
//!   consecutive table lines is a table whose first line is the header.

use crate::model::RawRecord;

/// How a single line reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    KeyValue(&'a str, &'a str),
    Table(Vec<&'a str>),
    Other,
}

/// Classify one line.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Other;
    }

    if let Some((key, value)) = trimmed.split_once(':') {
        let key = key.trim();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() && split_by_whitespace_gaps(key).len() == 1 {
            return LineKind::KeyValue(key, value);
        }
    }

    let cells = split_by_whitespace_gaps(trimmed);
    if cells.len() >= 3 {
        return LineKind::Table(cells);
    }

    LineKind::Other
}

/// Parse region text into records: the key-value records first, in page
/// order, then one record per table data row.
pub fn parse_lines(text: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut kv = RawRecord::new();
    let mut table_records = Vec::new();
    let mut table: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        match classify_line(line) {
            LineKind::KeyValue(key, value) => {
                flush_table(&mut table, &mut table_records);
                if kv.contains_key(key) {
                    records.push(std::mem::take(&mut kv));
                }
                kv.insert(key.to_string(), value.to_string());
            }
            LineKind::Table(cells) => table.push(cells),
            LineKind::Other => flush_table(&mut table, &mut table_records),
        }
    }
    flush_table(&mut table, &mut table_records);

    if !kv.is_empty() {
        records.push(kv);
    }
    records.extend(table_records);
    records
}

fn flush_table<'a>(table: &mut Vec<Vec<&'a str>>, out: &mut Vec<RawRecord>) {
    match table.len() {
        0 => {}
        1 => {
            // A lone line has no header to key it by.
            let record: RawRecord = table[0]
                .iter()
                .enumerate()
                .map(|(i, cell)| (format!("field_{i}"), cell.to_string()))
                .collect();
            out.push(record);
        }
        _ => {
            let header = &table[0];
            for row in &table[1..] {
                let mut record = RawRecord::new();
                for (i, cell) in row.iter().enumerate() {
                    // Surplus cells and repeated header names are keyed by position.
                    let key = match header.get(i) {
                        Some(h) if !record.contains_key(*h) => h.to_string(),
                        _ => format!("field_{i}"),
                    };
                    record.entry(key).or_insert_with(|| cell.to_string());
                }
                if !record.is_empty() {
                    out.push(record);
                }
            }
        }
    }
    table.clear();
}

/// Split a line on gaps of 2+ whitespace characters or a tab.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    let mut gap_start = 0;
    let mut gap_len = 0;
    let mut gap_has_tab = false;

    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if gap_len == 0 {
                gap_start = i;
                gap_has_tab = false;
            }
            gap_len += 1;
            gap_has_tab |= c == '\t';
            if gap_len >= 2 || gap_has_tab {
                if let Some(s) = start.take() {
                    segments.push(&line[s..gap_start]);
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            gap_len = 0;
        }
    }

    if let Some(s) = start {
        segments.push(line[s..].trim_end());
    }

    segments
}
