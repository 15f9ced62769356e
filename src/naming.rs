//! Artifact naming contract shared with the simulator.
//!
//! Every artifact holds one encoded frame and is named
//! `<prefix><index>.txt` with an unpadded decimal index starting at 0:
//!
//! | Artifact | Prefix | Written by |
//! |---|---|---|
//! | input frame | `input_frame_` | extractor |
//! | grayscale output | `output_gray_` | simulator |
//! | negative output | `output_neg_` | simulator |
//! | binary output | `output_bin_` | simulator |
//!
//! Because indices are not padded, a plain string sort misorders sequences
//! past nine frames (`10` sorts before `2`). [`discover_sequence`] therefore
//! parses every index and sorts numerically.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

use crate::{error::BridgeError, frame::ChannelKind};

/// File extension of every interchange artifact.
pub const ARTIFACT_EXTENSION: &str = "txt";

/// One of the three parallel simulator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Grayscale conversion of the input.
    Gray,
    /// `255 - gray`.
    Negative,
    /// Thresholded grayscale, stored as 0/1.
    Binary,
}

impl Channel {
    /// All channels in assembly order.
    pub const ALL: [Channel; 3] = [Channel::Gray, Channel::Negative, Channel::Binary];

    /// Short tag used in artifact names.
    pub fn tag(self) -> &'static str {
        match self {
            Channel::Gray => "gray",
            Channel::Negative => "neg",
            Channel::Binary => "bin",
        }
    }

    /// How this channel's artifacts are decoded.
    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::Gray | Channel::Negative => ChannelKind::Luma,
            Channel::Binary => ChannelKind::Binary,
        }
    }

    /// File name of the assembled video for this channel.
    pub fn video_file_name(self) -> &'static str {
        match self {
            Channel::Gray => "gray_output.mp4",
            Channel::Negative => "negative_output.mp4",
            Channel::Binary => "binary_output.mp4",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.tag())
    }
}

/// Which numbered sequence an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Frames staged for the simulator.
    Input,
    /// Frames produced by the simulator.
    Output(Channel),
}

impl ArtifactKind {
    /// Name prefix preceding the index.
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Input => "input_frame_",
            ArtifactKind::Output(Channel::Gray) => "output_gray_",
            ArtifactKind::Output(Channel::Negative) => "output_neg_",
            ArtifactKind::Output(Channel::Binary) => "output_bin_",
        }
    }

    /// File name of the artifact at `index`, e.g. `output_gray_12.txt`.
    pub fn file_name(self, index: u64) -> String {
        format!("{}{index}.{ARTIFACT_EXTENSION}", self.prefix())
    }

    /// Full path of the artifact at `index` inside `directory`.
    pub fn path_in(self, directory: &Path, index: u64) -> PathBuf {
        directory.join(self.file_name(index))
    }

    /// Extract the index from a file name belonging to this sequence.
    ///
    /// Only canonical unsigned decimals are accepted: ASCII digits, no sign,
    /// and no leading zeros other than `0` itself.
    pub fn parse_index(self, file_name: &str) -> Option<u64> {
        let digits = file_name
            .strip_prefix(self.prefix())?
            .strip_suffix(ARTIFACT_EXTENSION)?
            .strip_suffix('.')?;

        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok()
    }
}

/// Indices of one artifact sequence found on disk, in numeric order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSequence {
    kind: ArtifactKind,
    indices: Vec<u64>,
}

impl DiscoveredSequence {
    /// Build from arbitrary indices; they are sorted and deduplicated.
    pub fn from_indices(kind: ArtifactKind, mut indices: Vec<u64>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { kind, indices }
    }

    /// The sequence these indices belong to.
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Every discovered index, ascending.
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// Number of artifacts found, gaps included.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of frames usable from index 0 before the first gap.
    ///
    /// `{0, 1, 2, 5}` yields 3; `{1, 2}` yields 0.
    pub fn truncation_bound(&self) -> u64 {
        self.indices
            .iter()
            .zip(0u64..)
            .take_while(|(index, expected)| *index == expected)
            .count() as u64
    }

    /// Whether indices beyond the truncation bound exist.
    pub fn has_gap(&self) -> bool {
        self.truncation_bound() != self.indices.len() as u64
    }
}

/// List the artifacts of `kind` inside `directory`, sorted by numeric index.
///
/// A missing directory yields an empty sequence.
///
/// # Errors
///
/// Returns [`BridgeError::IoError`] if the directory exists but cannot be
/// read.
pub fn discover_sequence(
    directory: &Path,
    kind: ArtifactKind,
) -> Result<DiscoveredSequence, BridgeError> {
    if !directory.exists() {
        log::debug!("{} does not exist, no artifacts", directory.display());
        return Ok(DiscoveredSequence::from_indices(kind, Vec::new()));
    }

    let mut indices = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(index) = kind.parse_index(name) {
            indices.push(index);
        }
    }

    let sequence = DiscoveredSequence::from_indices(kind, indices);
    log::debug!(
        "Discovered {} '{}' artifacts in {}",
        sequence.len(),
        kind.prefix(),
        directory.display(),
    );
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_unpadded() {
        assert_eq!(ArtifactKind::Input.file_name(0), "input_frame_0.txt");
        assert_eq!(
            ArtifactKind::Output(Channel::Negative).file_name(42),
            "output_neg_42.txt"
        );
    }

    #[test]
    fn parse_index_rejects_foreign_names() {
        let gray = ArtifactKind::Output(Channel::Gray);
        assert_eq!(gray.parse_index("output_gray_7.txt"), Some(7));
        assert_eq!(gray.parse_index("output_gray_10.txt"), Some(10));
        assert_eq!(gray.parse_index("output_neg_7.txt"), None);
        assert_eq!(gray.parse_index("output_gray_.txt"), None);
        assert_eq!(gray.parse_index("output_gray_07.txt"), None);
        assert_eq!(gray.parse_index("output_gray_+7.txt"), None);
        assert_eq!(gray.parse_index("output_gray_7.txt.bak"), None);
        assert_eq!(gray.parse_index("output_gray_7txt"), None);
    }

    #[test]
    fn truncation_bound_stops_at_first_gap() {
        let kind = ArtifactKind::Output(Channel::Gray);
        let sequence = DiscoveredSequence::from_indices(kind, vec![5, 0, 2, 1]);
        assert_eq!(sequence.indices(), &[0, 1, 2, 5]);
        assert_eq!(sequence.truncation_bound(), 3);
        assert!(sequence.has_gap());

        let missing_zero = DiscoveredSequence::from_indices(kind, vec![1, 2]);
        assert_eq!(missing_zero.truncation_bound(), 0);
    }
}
