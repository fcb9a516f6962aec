//! Metadata service request/response types
//!
//! The playback engine does not parse file formats; it consumes a metadata
//! service that parses tags and serves raw audio payloads. These are the wire
//! shapes of that collaborator, kept here so the engine, tests, and any
//! transport layer agree on them.
//!
//! Directory listings deliberately mix per-file outcomes: a file the service
//! could not parse appears as an error entry alongside successfully parsed
//! siblings, rather than failing the whole listing.

use serde::{Deserialize, Serialize};

/// File extensions the metadata service recognizes as audio
pub const SUPPORTED_EXTENSIONS: [&str; 14] = [
    "mp3", "mp4", "m4a", "m4v", "aac", "flac", "ogg", "opus", "wav", "wma", "ape", "mpc", "wv",
    "tta",
];

/// Check whether a file name carries a supported audio extension
///
/// Comparison is case-insensitive; files without an extension are rejected.
///
/// # Examples
///
/// ```
/// use spindle_common::metadata::has_supported_extension;
///
/// assert!(has_supported_extension("track01.flac"));
/// assert!(has_supported_extension("LOUD.MP3"));
/// assert!(!has_supported_extension("cover.jpg"));
/// assert!(!has_supported_extension("README"));
/// ```
pub fn has_supported_extension(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

// ========================================
// Audio Payload Types
// ========================================

/// Response to `getAudioData(path)`
///
/// Carries the encoded audio payload as base64 when successful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDataResponse {
    /// Whether the payload was read successfully
    pub success: bool,
    /// Base64-encoded audio payload (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    /// Error detail (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ========================================
// Directory Listing Types
// ========================================

/// Response to `parseDirectory(path)`
///
/// `tracks` holds one entry per recognized audio file found beneath the
/// directory, including files whose metadata could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Whether the directory itself could be walked
    pub success: bool,
    /// Per-file results, parse failures included
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
    /// Error detail when the walk itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One audio file found during a directory walk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEntry {
    /// Absolute path to the file
    pub file_path: String,
    /// File name component, for display
    pub file_name: String,
    /// Parse outcome for this file
    #[serde(flatten)]
    pub result: TrackResult,
}

/// Per-file parse outcome
///
/// Serializes flattened into [`TrackEntry`]: a parsed file contributes a
/// `metadata` field, a failed one contributes `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackResult {
    /// Metadata parsed successfully
    Parsed {
        /// Parsed tag and format information
        metadata: TrackMetadata,
    },
    /// The service could not parse this file
    Failed {
        /// Human-readable error message
        error: String,
    },
}

/// Parsed metadata for one track
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Common tag fields (title, artist, ...)
    #[serde(default)]
    pub common: CommonTags,
    /// Technical format fields (duration, codec, ...)
    #[serde(default)]
    pub format: FormatInfo,
}

/// Common tag fields; all optional, absent tags are omitted on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonTags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Track number within the album
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackNumber>,
}

/// Track number as `no` of `of`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackNumber {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of: Option<u32>,
}

/// Technical format fields reported by the parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Bitrate in bits per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<f64>,
    /// Sample rate in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Codec name as reported by the parser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions_case_insensitive() {
        assert!(has_supported_extension("a.mp3"));
        assert!(has_supported_extension("a.FLAC"));
        assert!(has_supported_extension("a.Opus"));
        assert!(!has_supported_extension("a.txt"));
        assert!(!has_supported_extension("mp3"));
    }

    #[test]
    fn test_track_entry_parsed_wire_shape() {
        let entry = TrackEntry {
            file_path: "/music/a.flac".to_string(),
            file_name: "a.flac".to_string(),
            result: TrackResult::Parsed {
                metadata: TrackMetadata {
                    common: CommonTags {
                        title: Some("A".to_string()),
                        artist: Some("B".to_string()),
                        ..Default::default()
                    },
                    format: FormatInfo {
                        duration: Some(180.5),
                        sample_rate: Some(44100),
                        ..Default::default()
                    },
                },
            },
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["filePath"], "/music/a.flac");
        assert_eq!(json["fileName"], "a.flac");
        assert_eq!(json["metadata"]["common"]["title"], "A");
        assert_eq!(json["metadata"]["format"]["sampleRate"], 44100);
        assert!(json.get("error").is_none(), "parsed entry has no error field");
    }

    #[test]
    fn test_track_entry_failed_wire_shape() {
        let entry = TrackEntry {
            file_path: "/music/bad.wma".to_string(),
            file_name: "bad.wma".to_string(),
            result: TrackResult::Failed {
                error: "unsupported codec".to_string(),
            },
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["error"], "unsupported codec");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_directory_listing_mixed_entries_roundtrip() {
        let raw = r#"{
            "success": true,
            "tracks": [
                {"filePath": "/m/ok.mp3", "fileName": "ok.mp3",
                 "metadata": {"common": {"title": "Ok"}, "format": {"duration": 10.0}}},
                {"filePath": "/m/bad.ape", "fileName": "bad.ape", "error": "corrupt header"}
            ]
        }"#;

        let listing: DirectoryListing = serde_json::from_str(raw).unwrap();
        assert!(listing.success);
        assert_eq!(listing.tracks.len(), 2);
        assert!(matches!(listing.tracks[0].result, TrackResult::Parsed { .. }));
        assert!(matches!(listing.tracks[1].result, TrackResult::Failed { .. }));
    }

    #[test]
    fn test_audio_data_response_shapes() {
        let ok: AudioDataResponse =
            serde_json::from_str(r#"{"success": true, "audioData": "AAAA"}"#).unwrap();
        assert!(ok.success);
        assert_eq!(ok.audio_data.as_deref(), Some("AAAA"));

        let err: AudioDataResponse =
            serde_json::from_str(r#"{"success": false, "error": "no such file"}"#).unwrap();
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("no such file"));
    }
}
