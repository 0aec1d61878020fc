//! Source format readers.
//!
//! This module provides the two front ends that turn raw sources into
//! [`FieldSegment`](crate::types::FieldSegment) stubs, and the extractor that
//! fills them:
//! - `text`: brace-nested `Dataset ("name") { ... }` documents
//! - `tree`: the indexed geometry/state/dataset hierarchy of binary sources
//! - `memory`: an in-memory [`tree::DatasetTree`] implementation
//! - `values`: numeric payload extraction under a sampling policy

pub mod memory;
pub mod text;
pub mod tree;
pub mod values;

/// Magic byte signatures for source detection.
pub mod magic {
    /// HDF5 superblock signature
    pub const HDF5: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

    /// First line of a DF-ISE text document
    pub const DF_ISE_TEXT: &[u8] = b"DF-ISE text";
}

/// Detected source representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedSource {
    /// Brace-nested text grammar
    Text,
    /// HDF5 container; needs an external [`tree::DatasetTree`] implementation
    Hdf5,
    /// JSON manifest of a dataset tree, loadable as [`memory::MemoryTree`]
    TreeManifest,
    /// Nothing recognizable
    Unknown,
}

/// Detect the source representation from its leading bytes.
pub fn detect_source(data: &[u8]) -> DetectedSource {
    if data.len() >= magic::HDF5.len() && data[..magic::HDF5.len()] == magic::HDF5 {
        return DetectedSource::Hdf5;
    }

    if data.starts_with(magic::DF_ISE_TEXT) {
        return DetectedSource::Text;
    }

    let first = data.iter().position(|b| !b.is_ascii_whitespace());
    match first.map(|i| data[i]) {
        Some(b'{') => DetectedSource::TreeManifest,
        Some(_) if memchr::memmem::find(data, text::DATASET_KEYWORD.as_bytes()).is_some() => {
            DetectedSource::Text
        }
        _ => DetectedSource::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hdf5() {
        let mut data = magic::HDF5.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(detect_source(&data), DetectedSource::Hdf5);
    }

    #[test]
    fn test_detect_text() {
        assert_eq!(detect_source(b"DF-ISE text\n\nInfo {\n}"), DetectedSource::Text);
        assert_eq!(
            detect_source(b"Data {\n Dataset (\"F\") { Values (0) { } }\n}"),
            DetectedSource::Text
        );
    }

    #[test]
    fn test_detect_manifest_and_unknown() {
        assert_eq!(detect_source(b"  \n{\"collection\": {}}"), DetectedSource::TreeManifest);
        assert_eq!(detect_source(b"plain words"), DetectedSource::Unknown);
        assert_eq!(detect_source(b""), DetectedSource::Unknown);
    }
}
