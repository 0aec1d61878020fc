//! Core types for the field classifier.
//!
//! This module defines the in-memory model shared by both source kinds:
//! field segments, dataset tree nodes, classification results with their
//! metrics, the options and thresholds that drive classification, and the
//! structured report objects handed to presentation adapters.

use crate::error::{FieldError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Which representation a segment was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// Brace-nested text grammar (`Dataset ("name") { ... }`)
    Text,
    /// Indexed binary dataset hierarchy
    Binary,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Text => write!(f, "TEXT"),
            SourceKind::Binary => write!(f, "BINARY"),
        }
    }
}

/// Element type of a leaf array in the binary hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// IEEE 754 double
    Float64,
    /// IEEE 754 single
    Float32,
    /// Signed 64-bit integer
    Int64,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned byte
    UInt8,
    /// Anything the container reports that we do not decode
    Other(String),
}

impl ElementKind {
    /// Size in bytes of one element, if the kind is decodable.
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            ElementKind::Float64 | ElementKind::Int64 => Some(8),
            ElementKind::Float32 | ElementKind::Int32 => Some(4),
            ElementKind::UInt8 => Some(1),
            ElementKind::Other(_) => None,
        }
    }

    /// Whether values of this kind can be read as a numeric sequence.
    pub fn is_numeric(&self) -> bool {
        self.byte_width().is_some()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Float64 => write!(f, "float64"),
            ElementKind::Float32 => write!(f, "float32"),
            ElementKind::Int64 => write!(f, "int64"),
            ElementKind::Int32 => write!(f, "int32"),
            ElementKind::UInt8 => write!(f, "uint8"),
            ElementKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One leaf array found while walking the binary hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetTreeNode {
    /// Index `i` of the enclosing `dataset_i` group
    pub group_index: usize,
    /// Name of the leaf array inside the group
    pub leaf_name: String,
    /// Full path of the leaf, from the walked state group
    pub path: String,
    /// Total element count
    pub size: usize,
    /// Array shape as reported by the container
    pub shape: Vec<usize>,
    /// Element type
    pub element_kind: ElementKind,
}

/// One named block of field data.
///
/// Built in two steps: the parser or walker creates a stub carrying the
/// structure, then [`FieldSegment::fill`] attaches the extracted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSegment {
    /// Position of the segment in its source stream
    pub ordinal: usize,
    /// Reported field name
    pub name: String,
    /// Spatial validity tag, verbatim from the source
    pub validity_region: Option<String>,
    /// Number of values the source claims to hold
    pub declared_count: usize,
    /// Extracted values (possibly a prefix under a sampling bound)
    pub values: Vec<f64>,
    /// True only when `values.len() == declared_count`
    pub sample_complete: bool,
    /// Representation the segment came from
    pub source_kind: SourceKind,
    /// Byte offset of the block opener (text sources)
    pub offset: Option<usize>,
    /// Leaf path (binary sources)
    pub path: Option<String>,
    /// Payload tokens that failed numeric parse
    pub malformed_tokens: usize,
    /// Byte span of the `Values` payload inside the document
    #[serde(skip)]
    pub(crate) payload: Option<Range<usize>>,
}

impl FieldSegment {
    /// Create a stub for a text-format dataset block.
    pub fn text_stub(
        ordinal: usize,
        name: impl Into<String>,
        validity_region: Option<String>,
        declared_count: usize,
        offset: usize,
        payload: Range<usize>,
    ) -> Self {
        Self {
            ordinal,
            name: name.into(),
            validity_region,
            declared_count,
            values: Vec::new(),
            sample_complete: declared_count == 0,
            source_kind: SourceKind::Text,
            offset: Some(offset),
            path: None,
            malformed_tokens: 0,
            payload: Some(payload),
        }
    }

    /// Create a stub for a leaf array of the binary hierarchy.
    ///
    /// The binary hierarchy has no validity regions.
    pub fn binary_stub(ordinal: usize, node: &DatasetTreeNode) -> Self {
        Self {
            ordinal,
            name: node.leaf_name.clone(),
            validity_region: None,
            declared_count: node.size,
            values: Vec::new(),
            sample_complete: node.size == 0,
            source_kind: SourceKind::Binary,
            offset: None,
            path: Some(node.path.clone()),
            malformed_tokens: 0,
            payload: None,
        }
    }

    /// Attach extracted values.
    ///
    /// Values beyond `declared_count` are dropped; the returned count says how
    /// many were dropped so the caller can report it.
    pub fn fill(&mut self, mut values: Vec<f64>, malformed_tokens: usize) -> usize {
        let excess = values.len().saturating_sub(self.declared_count);
        values.truncate(self.declared_count);
        self.sample_complete = values.len() == self.declared_count;
        self.values = values;
        self.malformed_tokens = malformed_tokens;
        excess
    }

    /// Byte span of the `Values` payload, for text segments.
    pub fn payload_span(&self) -> Option<Range<usize>> {
        self.payload.clone()
    }

    /// Whether this segment's name matches a field filter.
    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |f| self.name == f)
    }

    /// Location string: byte offset for text, leaf path for binary.
    pub fn location(&self) -> String {
        match (&self.path, self.offset) {
            (Some(path), _) => path.clone(),
            (None, Some(offset)) => format!("byte {}", offset),
            (None, None) => String::new(),
        }
    }

    /// Summarize the segment for reporting.
    pub fn summary(&self) -> SegmentSummary {
        SegmentSummary {
            ordinal: self.ordinal,
            name: self.name.clone(),
            validity_region: self.validity_region.clone(),
            declared_count: self.declared_count,
            extracted: self.values.len(),
            sample_complete: self.sample_complete,
            malformed_tokens: self.malformed_tokens,
            source_kind: self.source_kind,
            location: self.location(),
            snapshot: SampleSnapshot::of(&self.values, SampleSnapshot::DEFAULT_WIDTH),
        }
    }
}

/// Quality verdict for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityLabel {
    /// Sample is mostly effectively zero
    Noise,
    /// Distribution consistent with a weighting potential
    ValidWeightingPotential,
    /// All values equal
    Constant,
    /// None of the rules matched, or there was no data
    Unknown,
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLabel::Noise => write!(f, "NOISE"),
            QualityLabel::ValidWeightingPotential => write!(f, "VALID_WEIGHTING_POTENTIAL"),
            QualityLabel::Constant => write!(f, "CONSTANT"),
            QualityLabel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Counts in the fine value bands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandBreakdown {
    /// |v| < noise epsilon
    pub noise: usize,
    /// noise epsilon <= |v| < 1e-6
    pub very_small: usize,
    /// 1e-6 <= v < 0.1
    pub small: usize,
    /// 0.1 <= v < 0.9
    pub mid: usize,
    /// 0.9 <= v <= 1.1
    pub near_one: usize,
    /// v > 1.1
    pub above_one: usize,
    /// v < 0
    pub negative: usize,
}

/// One bin of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub low: f64,
    /// Upper edge
    pub high: f64,
    /// Values in the bin
    pub count: usize,
}

/// Bucketed statistics over a numeric sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionMetrics {
    /// Number of finite values the statistics were computed over
    pub sample_size: usize,
    /// Values skipped because they were NaN or infinite
    pub non_finite: usize,
    /// Share of values with |v| below the noise epsilon
    pub noise_fraction: f64,
    /// Share of values within the near-one tolerance of 1
    pub near_one_fraction: f64,
    /// Share of values in [0, 1]
    pub in_unit_range_fraction: f64,
    /// Share of values strictly inside the mid range
    pub mid_range_fraction: f64,
    /// Share of values below zero
    pub negative_fraction: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Smallest finite value
    pub min: f64,
    /// Largest finite value
    pub max: f64,
    /// Middle value; mean of the two middle values for even sizes
    pub median: f64,
    /// Values other than exactly zero
    pub non_zero: usize,
    /// Exclusive band counts
    pub bands: BandBreakdown,
    /// Ten equal bins over [0, 1]; the last bin is closed
    pub unit_histogram: [usize; 10],
    /// Most populated bin of a 20-bin histogram over [min, max]
    pub dominant_bin: Option<HistogramBin>,
}

/// Individual weighting-potential quality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityChecks {
    /// Enough mid-range values for a smooth gradient through the bulk
    pub gradient_present: bool,
    /// Enough values near 1 for the electrode boundary
    pub electrode_present: bool,
    /// Noise fraction below the valid-verdict ceiling
    pub noise_acceptable: bool,
}

impl QualityChecks {
    /// All checks pass.
    pub fn all_pass(&self) -> bool {
        self.gradient_present && self.electrode_present && self.noise_acceptable
    }
}

/// Alert raised from the region hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionAlert {
    /// A segment scoped to the critical region is numerical noise
    NoiseInCriticalRegion {
        /// Region tag as written in the source
        region: String,
    },
}

impl fmt::Display for RegionAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionAlert::NoiseInCriticalRegion { region } => {
                write!(f, "weighting potential in region {} is numerical noise", region)
            }
        }
    }
}

/// Classification verdict together with the metrics that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Ordinal of the classified segment in its document
    pub segment: usize,
    /// Verdict
    pub label: QualityLabel,
    /// `None` when there was no data to compute statistics over
    pub metrics: Option<DistributionMetrics>,
    /// Individual checks; `None` without metrics
    pub checks: Option<QualityChecks>,
    /// False when the verdict was computed from a partial sample
    pub sample_complete: bool,
    /// Raised from the region hint
    pub alert: Option<RegionAlert>,
}

impl ClassificationResult {
    /// Result for an input with nothing to classify.
    pub fn no_data(sample_complete: bool) -> Self {
        Self {
            segment: 0,
            label: QualityLabel::Unknown,
            metrics: None,
            checks: None,
            sample_complete,
            alert: None,
        }
    }

    /// Attach the ordinal of the segment this verdict belongs to.
    pub fn for_segment(mut self, ordinal: usize) -> Self {
        self.segment = ordinal;
        self
    }

    /// Verdict over a partial sample only.
    pub fn is_provisional(&self) -> bool {
        !self.sample_complete
    }

    /// Whether statistics were available.
    pub fn has_data(&self) -> bool {
        self.metrics.is_some()
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        if self.is_provisional() {
            write!(f, " (provisional)")?;
        }
        match &self.metrics {
            Some(m) => write!(
                f,
                " [n={}, mean={:.4}, noise={:.1}%, unit={:.1}%, mid={:.1}%, near1={:.1}%]",
                m.sample_size,
                m.mean,
                m.noise_fraction * 100.0,
                m.in_unit_range_fraction * 100.0,
                m.mid_range_fraction * 100.0,
                m.near_one_fraction * 100.0
            ),
            None => write!(f, " [no data]"),
        }
    }
}

/// Named thresholds for the distribution classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// |v| below this is effectively zero
    pub noise_epsilon: f64,
    /// max - min at or below this makes a sequence constant
    pub constant_tolerance: f64,
    /// Half-width of the band around 1 counted as near-one
    pub near_one_tolerance: f64,
    /// Exclusive lower bound of the mid range
    pub mid_range_low: f64,
    /// Exclusive upper bound of the mid range
    pub mid_range_high: f64,
    /// Noise fraction above which the sample is NOISE
    pub noise_majority: f64,
    /// In-unit-range fraction a valid potential must exceed
    pub min_unit_range: f64,
    /// Mid-range fraction a valid potential must reach
    pub min_mid_range: f64,
    /// Near-one fraction a valid potential must reach
    pub min_near_one: f64,
    /// Noise fraction a valid potential must stay below
    pub max_noise_for_valid: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::strict()
    }
}

impl Thresholds {
    /// The four-clause rule: unit range, gradient, electrode and low noise.
    pub fn strict() -> Self {
        Self {
            noise_epsilon: 1e-10,
            constant_tolerance: 1e-15,
            near_one_tolerance: 0.1,
            mid_range_low: 0.1,
            mid_range_high: 0.9,
            noise_majority: 0.8,
            min_unit_range: 0.8,
            min_mid_range: 0.1,
            min_near_one: 0.1,
            max_noise_for_valid: 0.5,
        }
    }

    /// The looser two-clause rule: unit range plus some values near 1.
    pub fn legacy() -> Self {
        Self {
            min_mid_range: 0.0,
            min_near_one: 0.05,
            max_noise_for_valid: 1.0,
            ..Self::strict()
        }
    }

    /// Reject thresholds that cannot describe a fraction or a tolerance.
    pub fn validate(&self) -> Result<()> {
        let fractions = [
            ("noise_majority", self.noise_majority),
            ("min_unit_range", self.min_unit_range),
            ("min_mid_range", self.min_mid_range),
            ("min_near_one", self.min_near_one),
            ("max_noise_for_valid", self.max_noise_for_valid),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(FieldError::Config {
                    message: format!("{} must be within [0, 1], got {}", name, value),
                });
            }
        }
        if !(self.noise_epsilon > 0.0) || !(self.near_one_tolerance > 0.0) {
            return Err(FieldError::Config {
                message: "noise_epsilon and near_one_tolerance must be positive".to_string(),
            });
        }
        if !(self.constant_tolerance >= 0.0) {
            return Err(FieldError::Config {
                message: "constant_tolerance must be non-negative".to_string(),
            });
        }
        if !(self.mid_range_low < self.mid_range_high) {
            return Err(FieldError::Config {
                message: format!(
                    "mid range ({}, {}) is empty",
                    self.mid_range_low, self.mid_range_high
                ),
            });
        }
        Ok(())
    }
}

/// How many payload values to read per segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePolicy {
    /// Stop after this many values
    pub max_values: Option<usize>,
    /// Stop after this many non-empty payload lines
    pub max_lines: Option<usize>,
}

impl SamplePolicy {
    /// Read everything.
    pub fn full() -> Self {
        Self::default()
    }

    /// Read at most `n` values.
    pub fn first_values(n: usize) -> Self {
        Self {
            max_values: Some(n),
            max_lines: None,
        }
    }

    /// Read at most `n` non-empty lines.
    pub fn first_lines(n: usize) -> Self {
        Self {
            max_values: None,
            max_lines: Some(n),
        }
    }

    /// Whether any bound is set.
    pub fn is_bounded(&self) -> bool {
        self.max_values.is_some() || self.max_lines.is_some()
    }

    /// Capacity hint for a payload declaring `declared` values.
    pub fn capacity_hint(&self, declared: usize) -> usize {
        // Avoid trusting huge declared counts for allocation.
        self.max_values.unwrap_or(declared).min(declared).min(1 << 20)
    }
}

/// Options for extraction and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Classification thresholds
    pub thresholds: Thresholds,
    /// Sampling bound for value extraction
    pub sample: SamplePolicy,
    /// Only segments with this name get values extracted and classified
    pub field_filter: Option<String>,
    /// Region marker whose noise verdicts raise an alert
    pub critical_region: String,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierOptions {
    /// Strict thresholds, full read, every segment classified.
    pub fn new() -> Self {
        Self {
            thresholds: Thresholds::strict(),
            sample: SamplePolicy::full(),
            field_filter: None,
            critical_region: "BULK".to_string(),
        }
    }

    /// Full read with strict thresholds.
    pub fn thorough() -> Self {
        Self::new()
    }

    /// Bounded sample of 1000 values from at most 100 lines per segment.
    pub fn fast() -> Self {
        Self {
            sample: SamplePolicy {
                max_values: Some(1000),
                max_lines: Some(100),
            },
            ..Self::new()
        }
    }

    /// Restrict extraction and classification to one field name.
    pub fn with_filter(mut self, name: impl Into<String>) -> Self {
        self.field_filter = Some(name.into());
        self
    }

    /// Replace the sampling policy.
    pub fn with_sample(mut self, sample: SamplePolicy) -> Self {
        self.sample = sample;
        self
    }

    /// Replace the thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Load options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json).map_err(|e| FieldError::Config {
            message: e.to_string(),
        })?;
        options.thresholds.validate()?;
        Ok(options)
    }
}

/// First, middle and last values of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSnapshot {
    /// Leading values
    pub head: Vec<f64>,
    /// Values from the midpoint on
    pub middle: Vec<f64>,
    /// Trailing values
    pub tail: Vec<f64>,
}

impl SampleSnapshot {
    /// Values per snapshot window.
    pub const DEFAULT_WIDTH: usize = 10;

    /// Snapshot `values`, or `None` when empty.
    pub fn of(values: &[f64], width: usize) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mid = values.len() / 2;
        Some(Self {
            head: values.iter().take(width).copied().collect(),
            middle: values[mid..].iter().take(width).copied().collect(),
            tail: values[values.len().saturating_sub(width)..].to_vec(),
        })
    }
}

/// Reporting view of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    /// Position in the source stream
    pub ordinal: usize,
    /// Dataset name
    pub name: String,
    /// Region tag, verbatim
    pub validity_region: Option<String>,
    /// Count declared by the source
    pub declared_count: usize,
    /// Values actually read
    pub extracted: usize,
    /// Whether every declared value was read
    pub sample_complete: bool,
    /// Tokens skipped during extraction
    pub malformed_tokens: usize,
    /// Text or binary
    pub source_kind: SourceKind,
    /// Byte offset or hierarchy path
    pub location: String,
    /// First, middle and last values
    pub snapshot: Option<SampleSnapshot>,
}

/// Cross-check of the largest field against the mesh vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshCoverage {
    /// Largest field size equals the vertex count
    WholeMesh,
    /// Sizes differ
    Mismatch {
        /// Field size minus vertex count
        difference: i64,
    },
}

impl fmt::Display for MeshCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshCoverage::WholeMesh => write!(f, "field spans the whole mesh"),
            MeshCoverage::Mismatch { difference } => {
                write!(f, "field size differs from vertex count by {:+}", difference)
            }
        }
    }
}

/// Walk result for one state group of the binary hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeReport {
    /// Path of the walked state group
    pub state_path: String,
    /// Leaves ordered by size, largest first
    pub ranking: Vec<DatasetTreeNode>,
    /// Every leaf sharing the maximum size
    pub tied_max: Vec<DatasetTreeNode>,
    /// Mesh vertex count, when a `vertex` array was found
    pub vertex_count: Option<usize>,
    /// Largest leaf size against the vertex count
    pub coverage: Option<MeshCoverage>,
}

impl TreeReport {
    /// Size of the largest leaf, if any.
    pub fn max_size(&self) -> Option<usize> {
        self.ranking.first().map(|n| n.size)
    }
}

/// Structured result for one source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// File identifier
    pub file: String,
    /// Text or binary
    pub source_kind: SourceKind,
    /// Every block name in source order (text sources)
    pub inventory: Vec<String>,
    /// Extracted segments in source order
    pub segments: Vec<SegmentSummary>,
    /// Verdicts, keyed by segment ordinal
    pub classifications: Vec<ClassificationResult>,
    /// Hierarchy walk results (binary sources)
    pub trees: Vec<TreeReport>,
    /// Segment-local errors and warnings
    pub notes: Vec<Note>,
}

impl DocumentReport {
    /// Empty report for a file.
    pub fn new(file: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            file: file.into(),
            source_kind,
            inventory: Vec::new(),
            segments: Vec::new(),
            classifications: Vec::new(),
            trees: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Segments whose name equals `name`, in source order.
    pub fn segments_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SegmentSummary> {
        self.segments.iter().filter(move |s| s.name == name)
    }

    /// Verdict for a segment ordinal.
    pub fn classification_for(&self, ordinal: usize) -> Option<&ClassificationResult> {
        self.classifications.iter().find(|c| c.segment == ordinal)
    }

    /// Notes at error level.
    pub fn errors(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.level == NoteLevel::Error)
    }

}

/// Analysis note or warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Severity level
    pub level: NoteLevel,
    /// Note message
    pub message: String,
    /// Optional context (e.g. "byte 1024")
    pub context: Option<String>,
}

impl Note {
    /// Create a warning note.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoteLevel::Warning,
            message: message.into(),
            context: None,
        }
    }

    /// Create an error note.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoteLevel::Error,
            message: message.into(),
            context: None,
        }
    }

    /// Record a collected error; the byte offset becomes the context.
    pub fn from_error(err: &FieldError) -> Self {
        let note = Self::error(err.to_string());
        match err.offset() {
            Some(offset) => note.with_context(format!("byte {}", offset)),
            None => note,
        }
    }

    /// Add context to the note.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Note severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    /// Informational
    Info,
    /// Warning (non-fatal issue)
    Warning,
    /// Error (segment-local failure handled gracefully)
    Error,
}
