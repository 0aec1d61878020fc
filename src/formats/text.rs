//! Brace-nested text grammar parser.
//!
//! Documents are a sequence of ignored text and dataset blocks:
//!
//! ```text
//! Dataset ("ElectrostaticPotential") {
//!   function  = ElectrostaticPotential
//!   validity  = [ "BULK" ]
//!   Values (3) {
//!     0.1 0.5 0.9
//!   }
//! }
//! ```
//!
//! The scanner is a small state machine: it tracks whether it is inside a
//! double-quoted string and counts brace depth, so quoted braces are never
//! structural and a block ends at the `}` that returns its depth to zero.
//! A malformed block is recorded as an error and scanning resumes after it.

use crate::error::FieldError;
use crate::types::FieldSegment;
use memchr::{memchr, memchr2, memchr3};
use std::ops::Range;
use tracing::{debug, warn};

/// Keyword opening a dataset block.
pub const DATASET_KEYWORD: &str = "Dataset";

/// Attribute carrying the validity region.
pub const VALIDITY_KEYWORD: &str = "validity";

/// Sub-block carrying the numeric payload.
pub const VALUES_KEYWORD: &str = "Values";

/// Result of scanning one document.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    /// Well-formed segments in document order
    pub segments: Vec<FieldSegment>,
    /// Name of every block whose opener parsed, in document order
    pub inventory: Vec<String>,
    /// Segment-local failures, in document order
    pub errors: Vec<FieldError>,
}

impl ParsedDocument {
    /// Whether every block parsed cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse every dataset block of `text`.
pub fn parse_document(text: &str) -> ParsedDocument {
    let bytes = text.as_bytes();
    let mut doc = ParsedDocument::default();
    let mut pos = 0;

    while let Some(rel) = memchr2(b'"', b'D', &bytes[pos..]) {
        let at = pos + rel;

        if bytes[at] == b'"' {
            match skip_string(bytes, at) {
                Some(next) => pos = next,
                None => {
                    warn!(offset = at, "unterminated string outside dataset blocks");
                    doc.errors.push(FieldError::parse(text, at, "unterminated string"));
                    match memchr(b'\n', &bytes[at..]) {
                        Some(rel) => pos = at + rel + 1,
                        None => break,
                    }
                }
            }
            continue;
        }

        if !is_keyword_at(bytes, at, DATASET_KEYWORD) {
            pos = at + 1;
            continue;
        }

        let (name, open) = match parse_opener(bytes, at + DATASET_KEYWORD.len()) {
            Ok(found) => found,
            Err(message) => {
                let err = FieldError::parse(text, at, message);
                warn!(offset = at, "skipping malformed dataset opener: {}", err);
                doc.errors.push(err);
                pos = at + DATASET_KEYWORD.len();
                continue;
            }
        };
        doc.inventory.push(name.clone());

        let Some(close) = find_matching_brace(bytes, open) else {
            let err = FieldError::parse(text, at, format!("unterminated block \"{}\"", name));
            warn!(offset = at, name = %name, "unterminated dataset block");
            doc.errors.push(err);
            // Later blocks may still be intact inside the unterminated region.
            pos = open + 1;
            continue;
        };

        match parse_body(text, open + 1..close) {
            Ok(body) => match body.values {
                Some((declared_count, payload)) => {
                    debug!(
                        offset = at,
                        name = %name,
                        region = ?body.validity,
                        declared_count,
                        "parsed dataset block"
                    );
                    doc.segments.push(FieldSegment::text_stub(
                        doc.segments.len(),
                        name,
                        body.validity,
                        declared_count,
                        at,
                        payload,
                    ));
                }
                None => {
                    warn!(offset = at, name = %name, "dataset block without Values");
                    doc.errors.push(FieldError::MissingData { name, offset: at });
                }
            },
            Err(BodyError::Malformed(err)) => {
                warn!(offset = at, name = %name, "malformed dataset body: {}", err);
                doc.errors.push(err);
            }
            Err(BodyError::NestedDataset(nested)) => {
                // The block's own `}` is missing and an enclosing brace closed it.
                warn!(offset = at, name = %name, "dataset block runs into the next one");
                doc.errors.push(FieldError::parse(
                    text,
                    at,
                    format!("block \"{}\" is not closed before the next Dataset", name),
                ));
                pos = nested;
                continue;
            }
        }

        pos = close + 1;
    }

    debug!(
        blocks = doc.inventory.len(),
        segments = doc.segments.len(),
        errors = doc.errors.len(),
        "document scan complete"
    );
    doc
}

/// Attributes of interest found in a block body.
#[derive(Debug, Default)]
struct BlockBody {
    validity: Option<String>,
    /// Declared count and payload span
    values: Option<(usize, Range<usize>)>,
}

/// Why a block body could not be used.
#[derive(Debug)]
enum BodyError {
    Malformed(FieldError),
    /// A `Dataset` opener at body level, at this offset
    NestedDataset(usize),
}

impl From<FieldError> for BodyError {
    fn from(err: FieldError) -> Self {
        BodyError::Malformed(err)
    }
}

/// Scan the top level of a block body for `validity` and `Values`.
///
/// Nested sub-blocks other than `Values` are skipped whole. Dataset blocks
/// never nest, so a `Dataset` opener at body level means the block was left
/// open.
fn parse_body(text: &str, body: Range<usize>) -> Result<BlockBody, BodyError> {
    let bytes = text.as_bytes();
    let mut out = BlockBody::default();
    let mut pos = body.start;

    while pos < body.end {
        let b = bytes[pos];
        match b {
            b'"' => {
                pos = skip_string(bytes, pos)
                    .ok_or_else(|| FieldError::parse(text, pos, "unterminated string"))?;
            }
            b'{' => {
                let close = find_matching_brace(bytes, pos)
                    .ok_or_else(|| FieldError::parse(text, pos, "unterminated sub-block"))?;
                pos = close + 1;
            }
            b if is_ident_byte(b) => {
                let start = pos;
                while pos < body.end && is_ident_byte(bytes[pos]) {
                    pos += 1;
                }
                match &text[start..pos] {
                    VALIDITY_KEYWORD if out.validity.is_none() => {
                        let (region, next) = parse_validity(bytes, pos)
                            .map_err(|m| FieldError::parse(text, start, m))?;
                        out.validity = Some(region);
                        pos = next;
                    }
                    VALUES_KEYWORD if out.values.is_none() => {
                        let (count, payload) = parse_values_header(bytes, pos)
                            .map_err(|m| FieldError::parse(text, start, m))?;
                        pos = payload.end + 1;
                        out.values = Some((count, payload));
                    }
                    DATASET_KEYWORD if parse_opener(bytes, pos).is_ok() => {
                        return Err(BodyError::NestedDataset(start));
                    }
                    _ => {}
                }
            }
            _ => pos += 1,
        }
    }

    Ok(out)
}

/// Parse `= [ "<region>" ]` after the `validity` keyword.
fn parse_validity(bytes: &[u8], pos: usize) -> Result<(String, usize), String> {
    let pos = expect(bytes, pos, b'=')?;
    let pos = expect(bytes, pos, b'[')?;
    let open = skip_ws(bytes, pos);
    if bytes.get(open) != Some(&b'"') {
        return Err("expected quoted region name in validity".to_string());
    }
    let end = skip_string(bytes, open).ok_or("unterminated region name")?;
    let region = String::from_utf8_lossy(&bytes[open + 1..end - 1]).into_owned();
    let pos = expect(bytes, end, b']')?;
    Ok((region, pos))
}

/// Parse `( <count> ) {` after the `Values` keyword and match its payload.
fn parse_values_header(bytes: &[u8], pos: usize) -> Result<(usize, Range<usize>), String> {
    let pos = expect(bytes, pos, b'(')?;
    let start = skip_ws(bytes, pos);
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return Err("expected non-negative integer count in Values".to_string());
    }
    let count = std::str::from_utf8(&bytes[start..end])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or("Values count out of range")?;
    let pos = expect(bytes, end, b')')?;
    let open = skip_ws(bytes, pos);
    if bytes.get(open) != Some(&b'{') {
        return Err("expected '{' opening Values payload".to_string());
    }
    let close = find_matching_brace(bytes, open).ok_or("unterminated Values block")?;
    Ok((count, open + 1..close))
}

/// Parse `( "<name>" ) {` after the `Dataset` keyword.
///
/// Returns the name and the index of the opening brace.
fn parse_opener(bytes: &[u8], pos: usize) -> Result<(String, usize), String> {
    let pos = expect(bytes, pos, b'(')?;
    let open = skip_ws(bytes, pos);
    if bytes.get(open) != Some(&b'"') {
        return Err("expected quoted dataset name".to_string());
    }
    let end = skip_string(bytes, open).ok_or("unterminated dataset name")?;
    let name = String::from_utf8_lossy(&bytes[open + 1..end - 1]).into_owned();
    let pos = expect(bytes, end, b')')?;
    let brace = skip_ws(bytes, pos);
    if bytes.get(brace) != Some(&b'{') {
        return Err(format!("expected '{{' after Dataset (\"{}\")", name));
    }
    Ok((name, brace))
}

/// Index of the `}` closing the `{` at `open`, honoring quotes and nesting.
pub fn find_matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    debug_assert_eq!(bytes.get(open), Some(&b'{'));
    let mut depth = 0usize;
    let mut pos = open;

    while let Some(rel) = memchr3(b'{', b'}', b'"', &bytes[pos..]) {
        let at = pos + rel;
        match bytes[at] {
            b'"' => {
                pos = skip_string(bytes, at)?;
                continue;
            }
            b'{' => depth += 1,
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(at);
                }
            }
        }
        pos = at + 1;
    }
    None
}

/// Index just past the string opened by the `"` at `open`.
///
/// Backslash escapes the next byte. Strings never span lines; `None` if the
/// line or the input ends first.
fn skip_string(bytes: &[u8], open: usize) -> Option<usize> {
    let mut pos = open + 1;
    while let Some(rel) = memchr3(b'"', b'\\', b'\n', &bytes[pos..]) {
        let at = pos + rel;
        if bytes[at] == b'\n' {
            return None;
        }
        if bytes[at] == b'\\' {
            pos = at + 2;
            if pos > bytes.len() {
                return None;
            }
        } else {
            return Some(at + 1);
        }
    }
    None
}

fn expect(bytes: &[u8], pos: usize, want: u8) -> Result<usize, String> {
    let pos = skip_ws(bytes, pos);
    match bytes.get(pos) {
        Some(&b) if b == want => Ok(pos + 1),
        Some(&b) => Err(format!("expected '{}', found '{}'", want as char, b as char)),
        None => Err(format!("expected '{}', found end of input", want as char)),
    }
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_keyword_at(bytes: &[u8], at: usize, keyword: &str) -> bool {
    let kw = keyword.as_bytes();
    let end = at + kw.len();
    end <= bytes.len()
        && &bytes[at..end] == kw
        && (at == 0 || !is_ident_byte(bytes[at - 1]))
        && bytes.get(end).map_or(true, |&b| !is_ident_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload<'a>(text: &'a str, seg: &FieldSegment) -> &'a str {
        &text[seg.payload_span().unwrap()]
    }

    #[test]
    fn test_single_block() {
        let text = r#"Dataset ("F") { validity = [ "BULK" ] Values (3) { 0.1 0.5 0.9 } }"#;
        let doc = parse_document(text);
        assert!(doc.is_clean());
        assert_eq!(doc.segments.len(), 1);
        let seg = &doc.segments[0];
        assert_eq!(seg.name, "F");
        assert_eq!(seg.validity_region.as_deref(), Some("BULK"));
        assert_eq!(seg.declared_count, 3);
        assert_eq!(payload(text, seg).trim(), "0.1 0.5 0.9");
        assert_eq!(seg.offset, Some(0));
    }

    #[test]
    fn test_irregular_whitespace_and_attributes() {
        let text = "Data {\n  Dataset(\"ElectrostaticPotential\"){\n    function  = ElectrostaticPotential\n\
                    \ttype=scalar\n    dimension = 1\n    location  = vertex\n    validity=[\"Diamond_Region\"]\n\
                    \x20   Values(4){\n      0.0  1.0\n  0.5\n 0.25\n    }\n  }\n}\n";
        let doc = parse_document(text);
        assert!(doc.is_clean(), "{:?}", doc.errors);
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.segments[0].validity_region.as_deref(), Some("Diamond_Region"));
        assert_eq!(doc.segments[0].declared_count, 4);
    }

    #[test]
    fn test_quoted_braces_are_not_structural() {
        let text = r#"Dataset ("we{ird}") { note = "}}{" validity = [ "R}" ] Values (1) { 2.0 } }
Dataset ("G") { Values (0) { } }"#;
        let doc = parse_document(text);
        assert!(doc.is_clean(), "{:?}", doc.errors);
        assert_eq!(doc.inventory, vec!["we{ird}".to_string(), "G".to_string()]);
        assert_eq!(doc.segments[0].validity_region.as_deref(), Some("R}"));
        assert_eq!(payload(text, &doc.segments[0]).trim(), "2.0");
    }

    #[test]
    fn test_nested_sub_blocks() {
        let text = r#"Dataset ("F") {
  units { name = "V" scale { factor = 1 } }
  Values (2) { 0.3 0.4 }
}
Dataset ("F") { Values (1) { 0.7 } }"#;
        let doc = parse_document(text);
        assert!(doc.is_clean());
        assert_eq!(doc.segments.len(), 2);
        assert_eq!(payload(text, &doc.segments[0]).trim(), "0.3 0.4");
        assert_eq!(doc.segments[1].ordinal, 1);
    }

    #[test]
    fn test_missing_validity_is_legal() {
        let doc = parse_document(r#"Dataset ("F") { Values (1) { 1.0 } }"#);
        assert!(doc.is_clean());
        assert_eq!(doc.segments[0].validity_region, None);
    }

    #[test]
    fn test_empty_values_block() {
        let doc = parse_document(r#"Dataset ("F") { validity = [ "BULK" ] Values (0) { } }"#);
        assert!(doc.is_clean());
        assert_eq!(doc.segments[0].declared_count, 0);
        assert!(doc.segments[0].sample_complete);
    }

    #[test]
    fn test_malformed_third_block_keeps_first_two() {
        let text = r#"
Dataset ("ElectrostaticPotential") { validity = [ "BULK" ] Values (2) { 0.2 0.4 } }
Dataset ("ElectrostaticPotential") { validity = [ "Contact" ] Values (1) { 1.0 } }
Dataset ("ElectrostaticPotential") { validity = [ "Other" ] Values (2) { 0.1 0.2 }
"#;
        let doc = parse_document(text);
        assert_eq!(doc.segments.len(), 2);
        assert_eq!(doc.segments[0].validity_region.as_deref(), Some("BULK"));
        assert_eq!(doc.segments[1].validity_region.as_deref(), Some("Contact"));
        assert_eq!(doc.errors.len(), 1);
        assert!(matches!(doc.errors[0], FieldError::Parse { .. }));
        assert!(doc.errors[0].to_string().contains("unterminated"));
    }

    #[test]
    fn test_unterminated_block_does_not_hide_later_blocks() {
        let text = r#"Dataset ("A") { Values (1) { 0.5 }
Dataset ("B") { Values (1) { 0.6 } }"#;
        let doc = parse_document(text);
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.segments[0].name, "B");
        assert_eq!(doc.inventory, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_missing_values_is_recorded() {
        let text = r#"Dataset ("A") { validity = [ "BULK" ] }
Dataset ("B") { Values (1) { 0.6 } }"#;
        let doc = parse_document(text);
        assert_eq!(doc.segments.len(), 1);
        assert!(matches!(
            &doc.errors[0],
            FieldError::MissingData { name, offset: 0 } if name == "A"
        ));
    }

    #[test]
    fn test_malformed_opener_and_count() {
        let text = r#"Dataset "A" { }
Dataset ("B") { Values (-3) { 0.6 } }
Dataset ("C") { Values (1) { 0.6 } }"#;
        let doc = parse_document(text);
        assert_eq!(doc.errors.len(), 2);
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.segments[0].name, "C");
        assert_eq!(doc.segments[0].ordinal, 0);
    }

    #[test]
    fn test_keyword_boundaries_and_quoted_keyword() {
        let text = r#"Info { datasets = [ "Dataset" ] MyDataset = 1 Datasets = 2 }
Dataset ("F") { Values (1) { 0.1 } }"#;
        let doc = parse_document(text);
        assert!(doc.is_clean(), "{:?}", doc.errors);
        assert_eq!(doc.inventory, vec!["F".to_string()]);
    }

    #[test]
    fn test_stray_quote_outside_blocks() {
        let text = "Info { note = \"stray\n}\nDataset (\"A\") { Values (1) { 0.5 } }\n\
                    Dataset (\"B\") { Values (1) { 0.6 } }\n";
        let doc = parse_document(text);
        assert_eq!(doc.errors.len(), 1);
        assert!(doc.errors[0].to_string().contains("unterminated string"));
        assert_eq!(doc.inventory, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(doc.segments.len(), 2);
    }

    #[test]
    fn test_stray_quote_on_last_line() {
        let doc = parse_document("Dataset (\"A\") { Values (1) { 0.5 } }\nnote = \"open");
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.errors.len(), 1);
    }

    #[test]
    fn test_unclosed_block_inside_wrapper() {
        let text = "Data {\n  Dataset (\"A\") {\n    validity = [ \"BULK\" ]\n    Values (1) { 0.5 }\n\
                    \x20 Dataset (\"B\") {\n    validity = [ \"Oxide\" ]\n    Values (2) { 0.1 0.2 }\n  }\n}\n";
        let doc = parse_document(text);
        assert_eq!(doc.inventory, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.segments[0].name, "B");
        assert_eq!(doc.segments[0].validity_region.as_deref(), Some("Oxide"));
        assert_eq!(doc.errors.len(), 1);
        assert!(matches!(doc.errors[0], FieldError::Parse { offset, .. } if offset == text.find("Dataset").unwrap()));
    }

    #[test]
    fn test_find_matching_brace() {
        let bytes = b"{ a { b \"}\" } c }";
        assert_eq!(find_matching_brace(bytes, 0), Some(bytes.len() - 1));
        assert_eq!(find_matching_brace(b"{ { }", 0), None);
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_document("");
        assert!(doc.segments.is_empty());
        assert!(doc.is_clean());
    }
}
