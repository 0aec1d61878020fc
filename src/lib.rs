//! Weighting Classifier - TCAD Weighting-Potential Extraction and Validation
//!
//! This library extracts scalar field data written by semiconductor-device
//! simulators and judges whether each field's value distribution is
//! consistent with a valid weighting potential (the field whose gradient
//! gives the signal induced on a detector electrode by a moving charge).
//!
//! # Features
//!
//! - **Text Parsing**: Quote-aware, depth-tracking scanner for brace-nested
//!   `Dataset ("name") { ... }` documents; malformed blocks are recorded and
//!   skipped, never fatal
//! - **Binary Hierarchies**: Walker over `collection/geometry_g/state_s/dataset_i`
//!   trees behind the [`DatasetTree`] trait, with size ranking, tied-maximum
//!   isolation and a mesh vertex cross-check
//! - **Streaming Extraction**: Value- or line-bounded sampling of large payloads
//! - **Distribution Classification**: CONSTANT / NOISE / VALID / UNKNOWN
//!   verdicts from named, configurable thresholds
//! - **Comparison**: Positional comparison of same-named fields across files
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use weighting_classifier::{analyze_text_file, ClassifierOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClassifierOptions::fast().with_filter("ElectrostaticPotential");
//!     let report = analyze_text_file("wp_contact1_des.dat", &options)?;
//!     for result in &report.classifications {
//!         println!("segment {}: {}", result.segment, result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Classification
//!
//! ```rust
//! use weighting_classifier::{classify, QualityLabel, Thresholds};
//!
//! let result = classify(&[0.0; 100], &Thresholds::strict());
//! assert_eq!(result.label, QualityLabel::Constant);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]

pub mod compare;
pub mod error;
pub mod formats;
pub mod formatter;
pub mod heuristics;
#[cfg(feature = "logging")]
pub mod logging;
pub mod types;

pub use compare::{compare, ComparisonReport};
pub use error::{FieldError, Result, ResultExt};
pub use formats::memory::MemoryTree;
pub use formats::tree::DatasetTree;
pub use heuristics::{classify, classify_sample, classify_segment};
pub use types::{
    ClassificationResult, ClassifierOptions, DistributionMetrics, DocumentReport, FieldSegment,
    MeshCoverage, Note, QualityLabel, SamplePolicy, SourceKind, Thresholds, TreeReport,
};

use formats::tree::{self as walker, StateLocation};
use formats::values;
use std::path::Path;
use tracing::{debug, info_span, warn};

/// Analyze a text document held in memory.
///
/// Every dataset block becomes a segment summary; only segments matching
/// `options.field_filter` (all, when unset) get values extracted and
/// classified. Structural problems are reported as notes, not errors.
///
/// # Errors
///
/// Returns [`FieldError::Config`] if the thresholds are invalid.
///
/// # Example
///
/// ```rust
/// use weighting_classifier::{analyze_text, ClassifierOptions};
///
/// let text = r#"Dataset ("F") { validity = [ "BULK" ] Values (3) { 0.1 0.5 0.9 } }"#;
/// let report = analyze_text("inline", text, &ClassifierOptions::new())?;
/// assert_eq!(report.segments[0].validity_region.as_deref(), Some("BULK"));
/// # Ok::<(), weighting_classifier::FieldError>(())
/// ```
pub fn analyze_text(file: &str, text: &str, options: &ClassifierOptions) -> Result<DocumentReport> {
    options.thresholds.validate()?;
    let _span = info_span!("analyze_text", file).entered();

    let parsed = formats::text::parse_document(text);
    let mut report = DocumentReport::new(file, SourceKind::Text);
    report.notes.extend(parsed.errors.iter().map(Note::from_error));
    if parsed.inventory.is_empty() {
        report.notes.push(Note::warning("no dataset blocks found"));
    }
    report.inventory = parsed.inventory;

    let filter = options.field_filter.as_deref();
    for mut segment in parsed.segments {
        if segment.matches(filter) {
            let extraction = values::fill_text_segment(&mut segment, text, &options.sample);
            note_extraction(&mut report, &segment, &extraction);
            report.classifications.push(classify_segment(&segment, options));
        }
        report.segments.push(segment.summary());
    }

    debug!(
        segments = report.segments.len(),
        classified = report.classifications.len(),
        notes = report.notes.len(),
        "text analysis complete"
    );
    Ok(report)
}

fn note_extraction(report: &mut DocumentReport, segment: &FieldSegment, ex: &values::Extraction) {
    let location = segment.location();
    if ex.malformed_tokens > 0 {
        report.notes.push(
            Note::warning(format!(
                "{}: skipped {} malformed tokens",
                segment.name, ex.malformed_tokens
            ))
            .with_context(location.clone()),
        );
    }
    if ex.excess_values > 0 {
        warn!(name = %segment.name, excess = ex.excess_values, "values beyond declared count");
        report.notes.push(
            Note::warning(format!(
                "{}: {} values beyond declared count {} ignored",
                segment.name, ex.excess_values, segment.declared_count
            ))
            .with_context(location.clone()),
        );
    }
    if !ex.truncated && !segment.sample_complete {
        warn!(
            name = %segment.name,
            declared = segment.declared_count,
            found = segment.values.len(),
            "payload shorter than declared count"
        );
        report.notes.push(
            Note::warning(format!(
                "{}: declared {} values, found {}",
                segment.name,
                segment.declared_count,
                segment.values.len()
            ))
            .with_context(location),
        );
    }
}

/// Analyze a text document on disk.
///
/// # Errors
///
/// Returns [`FieldError::Access`] if the file cannot be read, or
/// [`FieldError::Config`] if the thresholds are invalid.
pub fn analyze_text_file<P: AsRef<Path>>(path: P, options: &ClassifierOptions) -> Result<DocumentReport> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path)
        .map_err(FieldError::from)
        .context(&label)?;
    analyze_text(&label, &text, options)
}

/// Analyze a file, detecting its representation.
///
/// Text documents go through [`analyze_text`]; JSON tree manifests load as a
/// [`MemoryTree`] and go through [`analyze_tree`]. Unrecognized content is
/// scanned as text.
///
/// # Errors
///
/// Returns [`FieldError::Access`] if the file cannot be read,
/// [`FieldError::Config`] for HDF5 containers (which need a caller-supplied
/// [`DatasetTree`]), or a structure error for an invalid manifest.
pub fn analyze_file<P: AsRef<Path>>(path: P, options: &ClassifierOptions) -> Result<DocumentReport> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let data = std::fs::read(path).map_err(FieldError::from).context(&label)?;

    match formats::detect_source(&data) {
        formats::DetectedSource::Hdf5 => Err(FieldError::Config {
            message: format!(
                "{}: HDF5 containers need a DatasetTree implementation; use analyze_tree",
                label
            ),
        }),
        formats::DetectedSource::TreeManifest => {
            let tree = MemoryTree::from_json(&String::from_utf8_lossy(&data))?;
            analyze_tree(&label, &tree, options)
        }
        formats::DetectedSource::Text | formats::DetectedSource::Unknown => {
            analyze_text(&label, &String::from_utf8_lossy(&data), options)
        }
    }
}

/// Analyze many text documents independently.
///
/// One result per path, in input order. An access error affects only the
/// entry for that path. With the `batch` feature, documents are processed
/// in parallel.
pub fn analyze_text_files<P>(paths: &[P], options: &ClassifierOptions) -> Vec<Result<DocumentReport>>
where
    P: AsRef<Path> + Sync,
{
    #[cfg(feature = "batch")]
    {
        use rayon::prelude::*;
        paths
            .par_iter()
            .map(|p| analyze_text_file(p, options))
            .collect()
    }
    #[cfg(not(feature = "batch"))]
    {
        paths.iter().map(|p| analyze_text_file(p, options)).collect()
    }
}

/// Analyze every `geometry_g/state_s` group under the root collection.
///
/// # Errors
///
/// Returns a structure error if the tree has no root collection, or
/// [`FieldError::Config`] if the thresholds are invalid. Problems inside a
/// state are reported as notes.
pub fn analyze_tree<T: DatasetTree + ?Sized>(
    file: &str,
    tree: &T,
    options: &ClassifierOptions,
) -> Result<DocumentReport> {
    options.thresholds.validate()?;
    let _span = info_span!("analyze_tree", file).entered();

    let states = walker::locate_states(tree, walker::COLLECTION)?;
    let mut report = DocumentReport::new(file, SourceKind::Binary);
    if states.is_empty() {
        report.notes.push(Note::warning("no geometry/state groups found"));
    }
    for location in &states {
        analyze_state_into(&mut report, tree, location, options)?;
    }
    Ok(report)
}

/// Analyze a single state group.
///
/// # Errors
///
/// Returns a structure error if `state_path` is not a group, or
/// [`FieldError::Config`] if the thresholds are invalid.
pub fn analyze_tree_state<T: DatasetTree + ?Sized>(
    file: &str,
    tree: &T,
    geometry_path: &str,
    state_path: &str,
    options: &ClassifierOptions,
) -> Result<DocumentReport> {
    options.thresholds.validate()?;
    let _span = info_span!("analyze_tree_state", file, state = state_path).entered();

    let mut report = DocumentReport::new(file, SourceKind::Binary);
    let location = StateLocation {
        geometry_path: geometry_path.to_string(),
        state_path: state_path.to_string(),
    };
    analyze_state_into(&mut report, tree, &location, options)?;
    Ok(report)
}

/// Walk one state, cross-check it against the mesh and classify its
/// largest leaves.
fn analyze_state_into<T: DatasetTree + ?Sized>(
    report: &mut DocumentReport,
    tree: &T,
    location: &StateLocation,
    options: &ClassifierOptions,
) -> Result<()> {
    let state_path = location.state_path.as_str();
    let walk = walker::walk_state(tree, state_path)?;
    report.notes.extend(walk.errors.iter().map(Note::from_error));
    report.inventory.extend(
        walk.nodes
            .iter()
            .map(|n| walker::join_path(state_path, &n.path)),
    );

    let ranking = walker::rank_by_size(&walk.nodes);
    let tied_max = walker::tied_max(&walk.nodes);
    let max_size = ranking.first().map(|n| n.size);

    let vertex_count = match walker::vertex_count(tree, &location.geometry_path) {
        Ok(count) => Some(count),
        Err(err) => {
            report.notes.push(Note::warning(err.to_string()));
            None
        }
    };
    let coverage = max_size
        .zip(vertex_count)
        .map(|(max, vertices)| walker::cross_check(max, vertices));
    if let Some(coverage @ MeshCoverage::Mismatch { .. }) = coverage {
        warn!(state = state_path, %coverage, "largest field does not span the mesh");
        report
            .notes
            .push(Note::warning(coverage.to_string()).with_context(state_path.to_string()));
    }

    for node in &tied_max {
        let mut segment = FieldSegment::binary_stub(report.segments.len(), node);
        if !node.element_kind.is_numeric() {
            report.notes.push(
                Note::warning(format!(
                    "{}: element type {} is not numeric",
                    node.path, node.element_kind
                ))
                .with_context(state_path.to_string()),
            );
        } else {
            match values::fill_binary_segment(&mut segment, tree, state_path, node, &options.sample) {
                Ok(()) => report.classifications.push(classify_segment(&segment, options)),
                Err(err) => report.notes.push(Note::from_error(&err).with_context(node.path.clone())),
            }
        }
        report.segments.push(segment.summary());
    }

    report.trees.push(TreeReport {
        state_path: state_path.to_string(),
        ranking,
        tied_max,
        vertex_count,
        coverage,
    });
    Ok(())
}

/// Compare the segments named `filter` in two analyzed documents.
///
/// Pairing is by position within each file's filtered subsequence only.
pub fn compare_documents(left: &DocumentReport, right: &DocumentReport, filter: &str) -> ComparisonReport {
    compare(left, right, filter)
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_single_block() {
        let text = r#"Dataset ("F") { validity = [ "BULK" ] Values (3) { 0.1 0.5 0.9 } }"#;
        let report = analyze_text("inline", text, &ClassifierOptions::new()).unwrap();
        assert_eq!(report.segments.len(), 1);
        let seg = &report.segments[0];
        assert_eq!(seg.name, "F");
        assert_eq!(seg.validity_region.as_deref(), Some("BULK"));
        assert_eq!(seg.declared_count, 3);
        assert_eq!(seg.snapshot.as_ref().unwrap().head, vec![0.1, 0.5, 0.9]);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_same_named_blocks_with_malformed_third() {
        let text = r#"
Dataset ("ElectrostaticPotential") { validity = [ "BULK" ] Values (4) { 0 0.25 0.75 1 } }
Dataset ("ElectrostaticPotential") { validity = [ "BULK" ] Values (2) { 0.5 0.5 } }
Dataset ("ElectrostaticPotential") { validity = [ "Other" ] Values (2) { 0.1 0.2 }
"#;
        let options = ClassifierOptions::new().with_filter("ElectrostaticPotential");
        let report = analyze_text("doc", text, &options).unwrap();
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.classifications.len(), 2);
        assert_eq!(report.classifications[0].segment, 0);
        assert_eq!(report.classifications[0].label, QualityLabel::ValidWeightingPotential);
        assert_eq!(report.classifications[1].label, QualityLabel::Constant);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.inventory.len(), 3);
    }

    #[test]
    fn test_filter_limits_classification() {
        let text = r#"
Dataset ("A") { Values (1) { 0.5 } }
Dataset ("B") { Values (2) { 0.5 x } }
"#;
        let options = ClassifierOptions::new().with_filter("B");
        let report = analyze_text("doc", text, &options).unwrap();
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.segments[0].extracted, 0);
        assert_eq!(report.classifications.len(), 1);
        assert_eq!(report.classifications[0].segment, 1);
        // One malformed token, one value short
        assert_eq!(report.notes.len(), 2);
    }

    #[test]
    fn test_bounded_sample_is_provisional() {
        let values: Vec<String> = (0..50).map(|i| format!("{}", i as f64 / 49.0)).collect();
        let text = format!(
            "Dataset (\"F\") {{ Values (50) {{\n{}\n}} }}",
            values.join("\n")
        );
        let options = ClassifierOptions::new().with_sample(SamplePolicy::first_values(10));
        let report = analyze_text("doc", &text, &options).unwrap();
        assert!(report.classifications[0].is_provisional());
        assert_eq!(report.segments[0].extracted, 10);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let options = ClassifierOptions::new().with_thresholds(Thresholds {
            noise_majority: -1.0,
            ..Thresholds::strict()
        });
        assert!(matches!(
            analyze_text("doc", "", &options),
            Err(FieldError::Config { .. })
        ));
    }

    #[test]
    fn test_text_file_and_access_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"Dataset ("F") {{ Values (2) {{ 0 1 }} }}"#).unwrap();
        let report = analyze_text_file(file.path(), &ClassifierOptions::new()).unwrap();
        assert_eq!(report.segments.len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.dat");
        let err = analyze_text_file(&missing, &ClassifierOptions::new()).unwrap_err();
        assert!(matches!(err, FieldError::Access(_)));
        assert!(err.to_string().contains("missing.dat"));
    }

    #[test]
    fn test_batch_isolates_access_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.dat");
        std::fs::write(&good, r#"Dataset ("F") { Values (1) { 0.5 } }"#).unwrap();
        let bad = dir.path().join("bad.dat");

        let results = analyze_text_files(&[good, bad], &ClassifierOptions::new());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    fn synthetic_tree() -> MemoryTree {
        let state = "collection/geometry_0/state_0";
        let mut tree = MemoryTree::new();
        for (i, size) in [10usize, 50, 50, 3].into_iter().enumerate() {
            let values: Vec<f64> = (0..size).map(|k| k as f64 / size as f64).collect();
            tree.insert_array(
                &format!("{}/dataset_{}/values", state, i),
                ElementKind::Float64,
                vec![size],
                values,
            )
            .unwrap();
        }
        tree.insert_array(
            "collection/geometry_0/vertex",
            ElementKind::Float64,
            vec![50, 3],
            vec![0.0; 150],
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_analyze_tree() {
        let report = analyze_tree("tree", &synthetic_tree(), &ClassifierOptions::new()).unwrap();
        assert_eq!(report.source_kind, SourceKind::Binary);
        assert_eq!(report.trees.len(), 1);
        let tree = &report.trees[0];
        let sizes: Vec<usize> = tree.ranking.iter().map(|n| n.size).collect();
        assert_eq!(sizes, vec![50, 50, 10, 3]);
        assert_eq!(tree.tied_max.len(), 2);
        assert_eq!(tree.coverage, Some(MeshCoverage::WholeMesh));
        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.classifications.len(), 2);
        assert!(report.classifications.iter().all(|c| c.sample_complete));
        assert_eq!(report.inventory.len(), 4);
    }

    #[test]
    fn test_analyze_tree_state_mismatch() {
        let mut tree = synthetic_tree();
        tree.insert_array(
            "collection/geometry_0/vertex",
            ElementKind::Float64,
            vec![60, 3],
            vec![0.0; 180],
        )
        .unwrap();
        let report = analyze_tree_state(
            "tree",
            &tree,
            "collection/geometry_0",
            "collection/geometry_0/state_0",
            &ClassifierOptions::new(),
        )
        .unwrap();
        assert_eq!(
            report.trees[0].coverage,
            Some(MeshCoverage::Mismatch { difference: -10 })
        );
        assert!(report.notes.iter().any(|n| n.message.contains("-10")));
    }

    #[test]
    fn test_analyze_file_detects_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, synthetic_tree().to_json().unwrap()).unwrap();
        let report = analyze_file(&path, &ClassifierOptions::new()).unwrap();
        assert_eq!(report.source_kind, SourceKind::Binary);
        assert_eq!(report.classifications.len(), 2);

        let hdf5 = dir.path().join("field.h5");
        std::fs::write(&hdf5, formats::magic::HDF5).unwrap();
        assert!(matches!(
            analyze_file(&hdf5, &ClassifierOptions::new()),
            Err(FieldError::Config { .. })
        ));
    }

    #[test]
    fn test_compare_documents() {
        let one = r#"Dataset ("F") { Values (1) { 0.5 } }"#;
        let three = r#"Dataset ("F") { Values (1) { 0.5 } }
Dataset ("F") { Values (1) { 0.5 } }
Dataset ("F") { Values (1) { 0.5 } }"#;
        let options = ClassifierOptions::new();
        let left = analyze_text("one", one, &options).unwrap();
        let right = analyze_text("three", three, &options).unwrap();
        let report = compare_documents(&left, &right, "F");
        assert_eq!(report.left.matched_count, 1);
        assert_eq!(report.right.matched_count, 3);
    }
}
