//! Numeric payload extraction.
//!
//! Text payloads are whitespace- and newline-separated tokens, possibly
//! terminated by a `}`. Tokens that fail to parse are skipped and counted,
//! including stray brace-delimited tokens such as `{x}`. Payload lines are
//! consumed one at a time and never more than the sampling bound (or the
//! declared count, whichever is smaller) is held in memory.

use crate::error::Result;
use crate::formats::tree::{join_path, DatasetTree};
use crate::types::{DatasetTreeNode, FieldSegment, SamplePolicy};
use std::ops::ControlFlow;
use tracing::{debug, trace};

/// Values read from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Parsed values in source order
    pub values: Vec<f64>,
    /// Tokens that failed numeric parse
    pub malformed_tokens: usize,
    /// Values found beyond the declared count (not stored)
    pub excess_values: usize,
    /// Non-empty payload lines consumed
    pub lines_read: usize,
    /// Reading stopped because of the sampling bound
    pub truncated: bool,
}

impl Extraction {
    /// Whether every declared value was read.
    pub fn is_complete(&self, declared: usize) -> bool {
        self.values.len() == declared
    }
}

/// Accumulates tokens line by line under a sampling bound.
struct ValueCollector {
    declared: usize,
    /// Braces opened by stray tokens and not yet closed
    depth: usize,
    policy: SamplePolicy,
    out: Extraction,
}

impl ValueCollector {
    fn new(declared: usize, policy: &SamplePolicy) -> Self {
        Self {
            declared,
            depth: 0,
            policy: *policy,
            out: Extraction {
                values: Vec::with_capacity(policy.capacity_hint(declared)),
                ..Extraction::default()
            },
        }
    }

    fn at_value_bound(&self) -> bool {
        self.policy
            .max_values
            .is_some_and(|max| self.out.values.len() >= max)
    }

    /// Feed one line; `Break` once the payload ends or a bound is hit.
    fn feed_line(&mut self, line: &str) -> ControlFlow<()> {
        let line = line.trim();
        if line.is_empty() {
            return ControlFlow::Continue(());
        }
        if line.starts_with('}') && self.depth == 0 {
            return ControlFlow::Break(());
        }
        if self.policy.max_lines.is_some_and(|max| self.out.lines_read >= max) {
            self.out.truncated = true;
            return ControlFlow::Break(());
        }
        self.out.lines_read += 1;

        for token in line.split_whitespace() {
            if self.feed_token(token).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// `Break` on a `}` that closes the payload itself.
    fn feed_token(&mut self, token: &str) -> ControlFlow<()> {
        if token.contains('{') {
            trace!(token, "skipping structural token");
            self.out.malformed_tokens += 1;
            return self.track_braces(token);
        }
        let (value, rest) = token.split_at(token.find('}').unwrap_or(token.len()));
        if !value.is_empty() && self.push_token(value).is_break() {
            return ControlFlow::Break(());
        }
        self.track_braces(rest)
    }

    fn track_braces(&mut self, token: &str) -> ControlFlow<()> {
        for b in token.bytes() {
            match b {
                b'{' => self.depth += 1,
                b'}' if self.depth == 0 => return ControlFlow::Break(()),
                b'}' => self.depth -= 1,
                _ => {}
            }
        }
        ControlFlow::Continue(())
    }

    fn push_token(&mut self, token: &str) -> ControlFlow<()> {
        if self.at_value_bound() {
            self.out.truncated = true;
            return ControlFlow::Break(());
        }
        match token.parse::<f64>() {
            Ok(value) if self.out.values.len() < self.declared => self.out.values.push(value),
            Ok(_) => self.out.excess_values += 1,
            Err(_) => {
                trace!(token, "skipping malformed token");
                self.out.malformed_tokens += 1;
            }
        }
        ControlFlow::Continue(())
    }

    fn finish(self) -> Extraction {
        self.out
    }
}

/// Extract values from a payload already held in memory.
pub fn extract_text(payload: &str, declared: usize, policy: &SamplePolicy) -> Extraction {
    let mut collector = ValueCollector::new(declared, policy);
    for line in payload.lines() {
        if collector.feed_line(line).is_break() {
            break;
        }
    }
    collector.finish()
}

/// Fill a text segment from the document it was parsed from.
///
/// The values move into the segment; the returned extraction keeps the
/// counters so the caller can report malformed and excess tokens.
pub fn fill_text_segment(
    segment: &mut FieldSegment,
    document: &str,
    policy: &SamplePolicy,
) -> Extraction {
    let payload = segment
        .payload_span()
        .and_then(|span| document.get(span))
        .unwrap_or("");
    let mut extraction = extract_text(payload, segment.declared_count, policy);
    debug!(
        name = %segment.name,
        ordinal = segment.ordinal,
        declared = segment.declared_count,
        read = extraction.values.len(),
        malformed = extraction.malformed_tokens,
        "extracted text payload"
    );
    segment.fill(std::mem::take(&mut extraction.values), extraction.malformed_tokens);
    extraction
}

/// Read a binary leaf into its segment.
///
/// Binary reads are typed and complete unless the policy bounds the number
/// of values; the line bound does not apply.
pub fn fill_binary_segment<T: DatasetTree + ?Sized>(
    segment: &mut FieldSegment,
    tree: &T,
    state_path: &str,
    node: &DatasetTreeNode,
    policy: &SamplePolicy,
) -> Result<()> {
    let path = join_path(state_path, &node.path);
    let limit = policy.max_values.map(|max| max.min(node.size));
    let values = tree.read_array(&path, limit)?;
    debug!(path = %path, read = values.len(), size = node.size, "read binary leaf");
    segment.fill(values, 0);
    Ok(())
}
