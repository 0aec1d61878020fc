//! Output formatters for analysis reports.
//!
//! The analysis entry points return structured [`DocumentReport`]s and
//! [`ComparisonReport`]s; this module renders them for people (human),
//! machines (JSON) or line-oriented tools (short).

use crate::compare::{ComparisonReport, FileSide, MatchedSegment};
use crate::types::{
    ClassificationResult, DocumentReport, Note, NoteLevel, SegmentSummary, SourceKind, TreeReport,
};

/// Trait for formatting analysis reports.
///
/// Implementors render each section of a report, plus the complete report.
pub trait ReportFormatter {
    /// Format the file header.
    fn format_file(&self, file: &str, source_kind: SourceKind) -> String;

    /// Format the dataset inventory.
    fn format_inventory(&self, inventory: &[String]) -> Option<String>;

    /// Format segments with their verdicts.
    fn format_segments(
        &self,
        segments: &[SegmentSummary],
        classifications: &[ClassificationResult],
    ) -> Option<String>;

    /// Format hierarchy walk results.
    fn format_trees(&self, trees: &[TreeReport]) -> Option<String>;

    /// Format analysis notes.
    fn format_notes(&self, notes: &[Note]) -> Option<String>;

    /// Format the complete report.
    ///
    /// Default implementation concatenates all section outputs.
    fn format_report(&self, report: &DocumentReport) -> String {
        let mut parts = vec![self.format_file(&report.file, report.source_kind)];
        parts.extend(self.format_inventory(&report.inventory));
        parts.extend(self.format_segments(&report.segments, &report.classifications));
        parts.extend(self.format_trees(&report.trees));
        parts.extend(self.format_notes(&report.notes));
        parts.join("")
    }

    /// Format a cross-file comparison.
    fn format_comparison(&self, comparison: &ComparisonReport) -> String;
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Show metrics, snapshots and info notes
    pub verbose: bool,
    /// One line per classified segment
    pub quiet: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            quiet: false,
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }

    fn format_verdict(&self, result: &ClassificationResult) -> String {
        let mut s = format!("      Verdict:  {}\n", result);
        if let Some(alert) = &result.alert {
            s.push_str(&format!("      ALERT:    {}\n", alert));
        }
        if !self.verbose {
            return s;
        }
        if let Some(checks) = &result.checks {
            s.push_str(&format!(
                "      Checks:   gradient={} electrode={} noise_ok={}\n",
                mark(checks.gradient_present),
                mark(checks.electrode_present),
                mark(checks.noise_acceptable)
            ));
        }
        if let Some(m) = &result.metrics {
            s.push_str(&format!(
                "      Range:    [{:.6e}, {:.6e}] median={:.6} std={:.6}\n",
                m.min, m.max, m.median, m.std_dev
            ));
            let b = &m.bands;
            s.push_str(&format!(
                "      Bands:    noise={} very_small={} small={} mid={} near_one={} above_one={} negative={}\n",
                b.noise, b.very_small, b.small, b.mid, b.near_one, b.above_one, b.negative
            ));
            let hist: Vec<String> = m.unit_histogram.iter().map(|c| c.to_string()).collect();
            s.push_str(&format!("      Deciles:  {}\n", hist.join(" ")));
            if let Some(bin) = &m.dominant_bin {
                s.push_str(&format!(
                    "      Dominant: [{:.4e}, {:.4e}] x{}\n",
                    bin.low, bin.high, bin.count
                ));
            }
        }
        s
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "yes"
    } else {
        "no"
    }
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.4e}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_match(m: &MatchedSegment) -> String {
    let label = m
        .label
        .map_or_else(|| "unclassified".to_string(), |l| l.to_string());
    let provisional = if m.sample_complete { "" } else { " (provisional)" };
    format!(
        "#{} [{}] {}{}",
        m.ordinal,
        m.validity_region.as_deref().unwrap_or("-"),
        label,
        provisional
    )
}

fn describe_side(side: &FileSide) -> String {
    format!(
        "  {}: {} matching / {} segments / {} blocks\n",
        side.file, side.matched_count, side.total_segments, side.total_blocks
    )
}

impl ReportFormatter for HumanFormatter {
    fn format_file(&self, file: &str, source_kind: SourceKind) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {} ({})\n", file, source_kind)
        }
    }

    fn format_inventory(&self, inventory: &[String]) -> Option<String> {
        if inventory.is_empty() || self.quiet {
            return None;
        }
        let mut s = format!("  Datasets:   {}\n", inventory.len());
        if self.verbose {
            for (i, name) in inventory.iter().enumerate() {
                s.push_str(&format!("    {:3}. {}\n", i, name));
            }
        }
        Some(s)
    }

    fn format_segments(
        &self,
        segments: &[SegmentSummary],
        classifications: &[ClassificationResult],
    ) -> Option<String> {
        if segments.is_empty() {
            return None;
        }

        let mut s = String::new();
        for seg in segments {
            let verdict = classifications.iter().find(|c| c.segment == seg.ordinal);
            if self.quiet {
                if let Some(result) = verdict {
                    s.push_str(&format!("{}#{}: {}\n", seg.name, seg.ordinal, result.label));
                }
                continue;
            }

            s.push_str(&format!(
                "  [{}] {} region={} declared={} read={} at {}\n",
                seg.ordinal,
                seg.name,
                seg.validity_region.as_deref().unwrap_or("-"),
                seg.declared_count,
                seg.extracted,
                seg.location
            ));
            if seg.malformed_tokens > 0 {
                s.push_str(&format!("      Skipped:  {} malformed tokens\n", seg.malformed_tokens));
            }
            if let Some(result) = verdict {
                s.push_str(&self.format_verdict(result));
            }
            if self.verbose {
                if let Some(snap) = &seg.snapshot {
                    s.push_str(&format!("      Head:     {}\n", format_values(&snap.head)));
                    s.push_str(&format!("      Middle:   {}\n", format_values(&snap.middle)));
                    s.push_str(&format!("      Tail:     {}\n", format_values(&snap.tail)));
                }
            }
        }
        Some(s)
    }

    fn format_trees(&self, trees: &[TreeReport]) -> Option<String> {
        if trees.is_empty() || self.quiet {
            return None;
        }

        let mut s = String::new();
        for tree in trees {
            s.push_str(&format!("  State: {}\n", tree.state_path));
            let limit = if self.verbose { tree.ranking.len() } else { 5 };
            for (i, node) in tree.ranking.iter().take(limit).enumerate() {
                s.push_str(&format!(
                    "    {}. {} ({} x {})\n",
                    i + 1,
                    node.path,
                    node.size,
                    node.element_kind
                ));
            }
            let tied: Vec<&str> = tree.tied_max.iter().map(|n| n.path.as_str()).collect();
            if !tied.is_empty() {
                s.push_str(&format!("    Largest:  {}\n", tied.join(", ")));
            }
            match (tree.vertex_count, tree.coverage) {
                (Some(vertices), Some(coverage)) => {
                    s.push_str(&format!("    Vertices: {} ({})\n", vertices, coverage));
                }
                _ => s.push_str("    Vertices: unknown\n"),
            }
        }
        Some(s)
    }

    fn format_notes(&self, notes: &[Note]) -> Option<String> {
        // Only show warnings/errors unless verbose
        let to_show: Vec<_> = notes
            .iter()
            .filter(|n| self.verbose || n.level != NoteLevel::Info)
            .collect();
        if to_show.is_empty() {
            return None;
        }

        let mut s = String::new();
        for note in to_show {
            let prefix = match note.level {
                NoteLevel::Info => "  [info]",
                NoteLevel::Warning => "  [warn]",
                NoteLevel::Error => "  [error]",
            };
            match &note.context {
                Some(ctx) => s.push_str(&format!("{} {} ({})\n", prefix, note.message, ctx)),
                None => s.push_str(&format!("{} {}\n", prefix, note.message)),
            }
        }
        Some(s)
    }

    fn format_report(&self, report: &DocumentReport) -> String {
        let mut parts = vec![self.format_file(&report.file, report.source_kind)];
        parts.extend(self.format_inventory(&report.inventory));
        parts.extend(self.format_segments(&report.segments, &report.classifications));
        parts.extend(self.format_trees(&report.trees));
        parts.extend(self.format_notes(&report.notes));
        if !self.quiet {
            parts.push(String::from("\n"));
        }
        parts.join("")
    }

    fn format_comparison(&self, comparison: &ComparisonReport) -> String {
        let mut s = format!("Comparison of \"{}\"\n", comparison.filter);
        s.push_str(&describe_side(&comparison.left));
        s.push_str(&describe_side(&comparison.right));
        if !comparison.counts_match() {
            s.push_str(&format!(
                "  Count difference: {:+}\n",
                comparison.count_difference
            ));
        }
        s.push_str("  Pairs (positional, not semantic):\n");
        for pair in &comparison.pairs {
            let left = pair.left.as_ref().map_or_else(|| "-".to_string(), describe_match);
            let right = pair.right.as_ref().map_or_else(|| "-".to_string(), describe_match);
            let changed = if pair.label_changed() { "  *" } else { "" };
            s.push_str(&format!("    {}: {} | {}{}\n", pair.index, left, right, changed));
        }
        s
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> String {
        let out = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        out.unwrap_or_else(|_| "{}".to_string())
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_file(&self, _file: &str, _source_kind: SourceKind) -> String {
        String::new() // Handled in format_report
    }

    fn format_inventory(&self, _inventory: &[String]) -> Option<String> {
        None
    }

    fn format_segments(
        &self,
        _segments: &[SegmentSummary],
        _classifications: &[ClassificationResult],
    ) -> Option<String> {
        None
    }

    fn format_trees(&self, _trees: &[TreeReport]) -> Option<String> {
        None
    }

    fn format_notes(&self, _notes: &[Note]) -> Option<String> {
        None
    }

    fn format_report(&self, report: &DocumentReport) -> String {
        self.render(report)
    }

    fn format_comparison(&self, comparison: &ComparisonReport) -> String {
        self.render(comparison)
    }
}

/// Tab-separated line per classified segment.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for ShortFormatter {
    fn format_file(&self, _file: &str, _source_kind: SourceKind) -> String {
        String::new() // Handled in format_report
    }

    fn format_inventory(&self, _inventory: &[String]) -> Option<String> {
        None
    }

    fn format_segments(
        &self,
        _segments: &[SegmentSummary],
        _classifications: &[ClassificationResult],
    ) -> Option<String> {
        None
    }

    fn format_trees(&self, _trees: &[TreeReport]) -> Option<String> {
        None
    }

    fn format_notes(&self, _notes: &[Note]) -> Option<String> {
        None
    }

    fn format_report(&self, report: &DocumentReport) -> String {
        let mut s = String::new();
        for seg in &report.segments {
            let Some(result) = report.classification_for(seg.ordinal) else {
                continue;
            };
            let noise = result
                .metrics
                .as_ref()
                .map_or_else(|| "-".to_string(), |m| format!("{:.1}%", m.noise_fraction * 100.0));
            s.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}{}\n",
                report.file,
                seg.ordinal,
                seg.name,
                seg.validity_region.as_deref().unwrap_or("-"),
                result.label,
                noise,
                if result.sample_complete { "" } else { "\tprovisional" }
            ));
        }
        s
    }

    fn format_comparison(&self, comparison: &ComparisonReport) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\n",
            comparison.filter,
            comparison.left.file,
            comparison.left.matched_count,
            comparison.right.file,
            comparison.right.matched_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::types::ClassifierOptions;
    use crate::analyze_text;

    const DOC: &str = r#"
Dataset ("ElectrostaticPotential") {
  validity = [ "BULK" ]
  Values (4) { 0 0.25 0.75 1 }
}
Dataset ("ElectrostaticPotential") {
  validity = [ "BULK" ]
  Values (3) { 1e-13 2e-13 3e-13 }
}
"#;

    fn sample_report() -> DocumentReport {
        analyze_text("nominal.dat", DOC, &ClassifierOptions::new()).unwrap()
    }

    #[test]
    fn test_human_formatter() {
        let output = HumanFormatter::new().format_report(&sample_report());
        assert!(output.contains("File: nominal.dat (TEXT)"));
        assert!(output.contains("region=BULK"));
        assert!(output.contains("VALID_WEIGHTING_POTENTIAL"));
        assert!(output.contains("ALERT:"));
    }

    #[test]
    fn test_human_formatter_verbose() {
        let output = HumanFormatter::verbose().format_report(&sample_report());
        assert!(output.contains("Checks:"));
        assert!(output.contains("Head:"));
        assert!(output.contains("Deciles:"));
    }

    #[test]
    fn test_human_formatter_quiet() {
        let output = HumanFormatter::quiet().format_report(&sample_report());
        assert!(output.contains("ElectrostaticPotential#1: NOISE"));
        assert!(!output.contains("File:"));
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter::compact().format_report(&sample_report());
        assert!(output.contains("\"file\":\"nominal.dat\""));
        assert!(output.contains("\"label\":\"NOISE\""));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["segments"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_short_formatter() {
        let output = ShortFormatter::new().format_report(&sample_report());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("nominal.dat\t0\tElectrostaticPotential\tBULK\tVALID_WEIGHTING_POTENTIAL"));
        assert!(lines[1].contains("NOISE"));
    }

    #[test]
    fn test_comparison_formatting() {
        let left = sample_report();
        let right = analyze_text("other.dat", "", &ClassifierOptions::new()).unwrap();
        let comparison = compare(&left, &right, "ElectrostaticPotential");

        let human = HumanFormatter::new().format_comparison(&comparison);
        assert!(human.contains("positional, not semantic"));
        assert!(human.contains("Count difference: -2"));

        let short = ShortFormatter::new().format_comparison(&comparison);
        assert_eq!(short, "ElectrostaticPotential\tnominal.dat\t2\tother.dat\t0\n");
    }
}
