//! Minimal CSV reading and writing.
//!
//! Handles what threat feeds and our own reports need: quoted fields,
//! doubled-quote escapes, embedded newlines inside quotes, CRLF line
//! endings and a leading byte order mark.

use std::borrow::Cow;

/// Splits CSV text into records of fields.
///
/// Blank lines are skipped. A `"` only opens a quoted section at the start
/// of a field; elsewhere it is kept literally.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                quoted = false;
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() || quoted {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}

/// Quotes a field if it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Joins fields into one CSV line, without the trailing newline.
pub fn format_record<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_fields() {
        let records = parse_records("a,b,c\n1,2,3\n");
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_parse_quoted_with_escapes() {
        let records = parse_records("\"@foo/bar\",\"npm\",\"[\"\"1.0.0||2.0.0\"\"]\",\"XRAY-1\"\n");
        assert_eq!(
            records,
            vec![vec!["@foo/bar", "npm", "[\"1.0.0||2.0.0\"]", "XRAY-1"]]
        );
    }

    #[test]
    fn test_parse_crlf_bom_and_blank_lines() {
        let records = parse_records("\u{feff}name,version\r\n\r\nleft-pad,1.0.0\r\n");
        assert_eq!(records, vec![vec!["name", "version"], vec!["left-pad", "1.0.0"]]);
    }

    #[test]
    fn test_parse_embedded_newline() {
        let records = parse_records("\"multi\nline\",x");
        assert_eq!(records, vec![vec!["multi\nline", "x"]]);
    }

    #[test]
    fn test_parse_no_trailing_newline_keeps_empty_last_field() {
        let records = parse_records("a,b,");
        assert_eq!(records, vec![vec!["a", "b", ""]]);
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_format_record_round_trips_through_parser() {
        let line = format_record(["@foo/bar", "1.0.0", "timed out, retrying", ""]);
        assert_eq!(line, "@foo/bar,1.0.0,\"timed out, retrying\",");
        assert_eq!(
            parse_records(&line),
            vec![vec!["@foo/bar", "1.0.0", "timed out, retrying", ""]]
        );
    }
}
