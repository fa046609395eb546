//! Core data models for playlist reconciliation.
//!
//! This module contains the track model, the catalog record shapes it is
//! built from, match results, and the report/statistics types produced by
//! the reconcile driver.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};

// ============================================================================
// Constants
// ============================================================================

/// `category` values the search service uses for its single best guess.
/// The service localizes this label, so every known variant is listed.
pub const TOP_RESULT_MARKERS: [&str; 2] = ["Top result", "上位の検索結果"];

// ============================================================================
// Durations
// ============================================================================

/// Parse a `minutes:seconds` duration into whole seconds.
/// e.g., "4:31" → 271, "0:07" → 7
pub fn parse_duration(text: &str) -> MatchResult<u32> {
    let invalid = |reason: &str| MatchError::InvalidDuration {
        value: text.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 2 {
        return Err(invalid("expected exactly two ':'-separated components"));
    }

    let minutes: u32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| invalid("minutes are not an integer"))?;
    let seconds: u32 = parts[1]
        .trim()
        .parse()
        .map_err(|_| invalid("seconds are not an integer"))?;

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| invalid("duration overflows"))
}

/// Render whole seconds as `minutes:seconds` (seconds zero-padded).
pub fn format_duration(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Duration as it appears in catalog records: a number of seconds or a
/// `minutes:seconds` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationField {
    Seconds(u32),
    Text(String),
}

impl DurationField {
    pub fn to_seconds(&self) -> MatchResult<u32> {
        match self {
            DurationField::Seconds(secs) => Ok(*secs),
            DurationField::Text(text) => parse_duration(text),
        }
    }
}

// ============================================================================
// Catalog Records
// ============================================================================

/// Song record from the catalog being migrated away from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationField>,
}

/// Playlist exported from the source catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub songs: Vec<SourceRecord>,
}

/// Artist credit on a search result: either a bare name or an object with a
/// `name` (extra fields such as ids are ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtistCredit {
    Name(String),
    Credit { name: String },
}

impl ArtistCredit {
    pub fn name(&self) -> &str {
        match self {
            ArtistCredit::Name(name) | ArtistCredit::Credit { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub name: String,
}

/// Search result record from the destination catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration: Option<DurationField>,
    /// Numeric duration; preferred over `duration` when both are present
    #[serde(default, rename = "duration_seconds")]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default, alias = "videoId")]
    pub id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

// ============================================================================
// Track
// ============================================================================

/// Provenance of a candidate in the destination catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Unknown,
    Song,
    Video,
}

impl From<Option<&str>> for SourceKind {
    fn from(s: Option<&str>) -> Self {
        match s {
            Some("song") => SourceKind::Song,
            Some("video") => SourceKind::Video,
            _ => SourceKind::Unknown,
        }
    }
}

/// The unit being matched.
///
/// `title` is kept verbatim; normalization only ever produces derived values.
/// Match scores live on [`TrackMatch`], never on the track itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_secs: u32,
    /// `None` for source-side tracks
    pub kind: Option<SourceKind>,
    pub external_id: Option<String>,
    pub is_top_result: bool,
}

impl Track {
    /// Source-side track from already-parsed fields.
    pub fn new(
        title: impl Into<String>,
        artists: Vec<String>,
        album: impl Into<String>,
        duration_secs: u32,
    ) -> Self {
        Self {
            title: title.into(),
            artists,
            album: album.into(),
            duration_secs,
            kind: None,
            external_id: None,
            is_top_result: false,
        }
    }

    /// Mark this track as a destination-catalog candidate.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_top_result(mut self, is_top_result: bool) -> Self {
        self.is_top_result = is_top_result;
        self
    }

    pub fn from_source(record: &SourceRecord) -> MatchResult<Self> {
        let duration_secs = match &record.duration {
            Some(d) => d.to_seconds()?,
            None => 0,
        };
        Ok(Self::new(
            record.name.clone(),
            record.artists.clone(),
            record.album.clone(),
            duration_secs,
        ))
    }

    pub fn from_candidate(record: &CandidateRecord) -> MatchResult<Self> {
        let duration_secs = match (record.duration_seconds, &record.duration) {
            (Some(secs), _) => secs,
            (None, Some(d)) => d.to_seconds()?,
            (None, None) => 0,
        };
        let is_top_result = record
            .category
            .as_deref()
            .is_some_and(|c| TOP_RESULT_MARKERS.contains(&c));

        Ok(Self {
            title: record.title.clone(),
            artists: record
                .artists
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
            album: record
                .album
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            duration_secs,
            kind: Some(SourceKind::from(record.result_type.as_deref())),
            external_id: record.id.clone(),
            is_top_result,
        })
    }

    /// Duration rendered as `minutes:seconds`.
    pub fn duration_display(&self) -> String {
        format_duration(self.duration_secs)
    }
}

/// Build candidate tracks from search results.
///
/// Only songs and videos are kept, in their original order. Records that fail
/// to convert are logged and counted rather than aborting the whole batch.
pub fn extract_candidates(records: &[CandidateRecord]) -> (Vec<Track>, usize) {
    let mut tracks = Vec::with_capacity(records.len());
    let mut malformed = 0;

    for record in records {
        if !matches!(record.result_type.as_deref(), Some("song" | "video")) {
            continue;
        }
        match Track::from_candidate(record) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                log::warn!("Skipping candidate '{}': {}", record.title, e);
                malformed += 1;
            }
        }
    }

    (tracks, malformed)
}

// ============================================================================
// Match Results
// ============================================================================

/// A candidate chosen as the best match, with the score that won it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackMatch<'a> {
    pub candidate: &'a Track,
    pub score: f64,
}

/// One entry of a many-to-many result: a source track and its match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment<'s, 'c> {
    pub source: &'s Track,
    pub matched: TrackMatch<'c>,
}

// ============================================================================
// Reconcile Output
// ============================================================================

/// Which search query produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Title plus cleaned artist names
    Detailed,
    /// Title only
    Simple,
}

/// Matched source track, ready for the playlist mutation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedEntry {
    pub source_title: String,
    pub source_artists: Vec<String>,
    pub matched_title: String,
    pub matched_artists: Vec<String>,
    pub external_id: Option<String>,
    pub score: f64,
    pub query: String,
    pub query_kind: QueryKind,
}

/// Source track that no query could match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotFoundEntry {
    #[serde(flatten)]
    pub record: SourceRecord,
    /// Last query attempted
    pub query: String,
    pub end_reason: String,
}

/// Source track matched against a shared candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolMatch {
    pub source_title: String,
    pub matched_title: String,
    pub matched_artists: Vec<String>,
    pub external_id: Option<String>,
    pub kind: Option<SourceKind>,
    pub score: f64,
}

/// Timestamp format of the `date` field in not-found reports
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// "Not found" report for one playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotFoundReport {
    pub name: String,
    /// Local time the report was built
    pub date: String,
    pub songs: Vec<NotFoundEntry>,
}

impl NotFoundReport {
    pub fn new(name: impl Into<String>, songs: Vec<NotFoundEntry>) -> Self {
        Self {
            name: name.into(),
            date: chrono::Local::now().format(REPORT_DATE_FORMAT).to_string(),
            songs,
        }
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run reconcile statistics.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ReconcileStats {
    pub total_tracks: usize,
    pub detailed_query_matches: usize,
    pub simple_query_matches: usize,
    pub pool_matches: usize,
    pub not_found: usize,
    pub invalid_source_records: usize,

    pub searches: usize,
    pub candidates_seen: usize,
    pub candidates_malformed: usize,

    pub elapsed_seconds: f64,
}

impl ReconcileStats {
    pub fn total_matches(&self) -> usize {
        self.detailed_query_matches + self.simple_query_matches + self.pool_matches
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_tracks == 0 {
            0.0
        } else {
            100.0 * self.total_matches() as f64 / self.total_tracks as f64
        }
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            log::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
