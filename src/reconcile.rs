//! Playlist reconciliation driver.
//!
//! Walks a source playlist, searches the destination catalog for each track
//! (detailed query first, then title only) and keeps the best accepted
//! candidate. Tracks nothing matched are collected for the "not found" report.
//! Searching itself is delegated to a [`CatalogSearch`] implementation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::matcher::Matcher;
use crate::models::{
    extract_candidates, CandidateRecord, MatchedEntry, NotFoundEntry, NotFoundReport, Playlist,
    PoolMatch, QueryKind, ReconcileStats, Track,
};
use crate::progress::{create_progress_bar, log_progress};
use crate::query::query_plan;

/// End reason recorded for tracks no query could match
pub const NOT_FOUND_REASON: &str = "No match found after detail and simple queries";

/// End reason for tracks without an accepted candidate in a shared pool
pub const POOL_NOT_FOUND_REASON: &str = "No candidate in pool reached tolerance";

// ============================================================================
// Catalog Search
// ============================================================================

/// Destination catalog search, supplied by the service wrapper.
/// Results should come back in the service's relevance order.
pub trait CatalogSearch {
    fn search(&self, query: &str) -> Result<Vec<CandidateRecord>>;
}

/// Search results recorded ahead of time, keyed by query.
/// Unknown queries return no results.
#[derive(Debug, Clone, Default)]
pub struct RecordedSearch {
    results: FxHashMap<String, Vec<CandidateRecord>>,
}

impl RecordedSearch {
    pub fn new(results: FxHashMap<String, Vec<CandidateRecord>>) -> Self {
        Self { results }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let results = serde_json::from_str(json).context("Failed to parse recorded searches")?;
        Ok(Self::new(results))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recorded searches {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn insert(&mut self, query: impl Into<String>, records: Vec<CandidateRecord>) {
        self.results.insert(query.into(), records);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl CatalogSearch for RecordedSearch {
    fn search(&self, query: &str) -> Result<Vec<CandidateRecord>> {
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of reconciling one playlist.
#[derive(Debug, Clone)]
pub struct PlaylistOutcome {
    pub name: String,
    pub matched: Vec<MatchedEntry>,
    pub not_found: Vec<NotFoundEntry>,
    pub stats: ReconcileStats,
}

impl PlaylistOutcome {
    /// Matched external ids, first occurrence kept, in playlist order.
    pub fn unique_external_ids(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.matched
            .iter()
            .filter_map(|m| m.external_id.as_deref())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// "Not found" report, or `None` when every track matched.
    pub fn not_found_report(&self) -> Option<NotFoundReport> {
        if self.not_found.is_empty() {
            return None;
        }
        Some(NotFoundReport::new(self.name.clone(), self.not_found.clone()))
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Reconcile every track of `playlist` against `search`.
///
/// A track is matched by the first query whose results contain an accepted
/// candidate. Source records that cannot be turned into a track (bad
/// duration) are reported as not found with the conversion error as reason.
/// Search failures abort the run.
pub fn reconcile_playlist<S: CatalogSearch + ?Sized>(
    matcher: &Matcher,
    search: &S,
    playlist: &Playlist,
) -> Result<PlaylistOutcome> {
    let start = Instant::now();
    let total = playlist.songs.len();
    let mut stats = ReconcileStats {
        total_tracks: total,
        ..Default::default()
    };
    let mut matched = Vec::new();
    let mut not_found = Vec::new();

    log::info!("Searching catalog for '{}' ({} tracks)", playlist.name, total);
    let pb = create_progress_bar(total as u64, "Matching");

    for (index, record) in playlist.songs.iter().enumerate() {
        pb.inc(1);
        log_progress("match", index as u64 + 1, total as u64, 50);

        let source = match Track::from_source(record) {
            Ok(track) => track,
            Err(e) => {
                log::warn!("[{}/{}] Invalid: {} ({})", index + 1, total, record.name, e);
                stats.invalid_source_records += 1;
                not_found.push(NotFoundEntry {
                    record: record.clone(),
                    query: String::new(),
                    end_reason: e.to_string(),
                });
                continue;
            }
        };

        let mut last_query = String::new();
        let mut found = None;
        for (kind, query) in query_plan(record) {
            let records = search
                .search(&query)
                .with_context(|| format!("Search failed for query '{}'", query))?;
            stats.searches += 1;

            let (candidates, malformed) = extract_candidates(&records);
            stats.candidates_seen += candidates.len();
            stats.candidates_malformed += malformed;

            if let Some(best) = matcher.match_one_to_many(&source, &candidates) {
                log::debug!(
                    "Accepted '{}' ({}) for '{}' ({})",
                    best.candidate.title,
                    best.candidate.duration_display(),
                    source.title,
                    source.duration_display()
                );
                found = Some(MatchedEntry {
                    source_title: source.title.clone(),
                    source_artists: source.artists.clone(),
                    matched_title: best.candidate.title.clone(),
                    matched_artists: best.candidate.artists.clone(),
                    external_id: best.candidate.external_id.clone(),
                    score: best.score,
                    query,
                    query_kind: kind,
                });
                break;
            }
            last_query = query;
        }

        match found {
            Some(entry) => {
                log::info!(
                    "[{}/{}] Matched ({:?} query): {} -> {} (id: {}) (score: {:.3})",
                    index + 1,
                    total,
                    entry.query_kind,
                    entry.source_title,
                    entry.matched_title,
                    entry.external_id.as_deref().unwrap_or("-"),
                    entry.score
                );
                match entry.query_kind {
                    QueryKind::Detailed => stats.detailed_query_matches += 1,
                    QueryKind::Simple => stats.simple_query_matches += 1,
                }
                matched.push(entry);
            }
            None => {
                log::warn!("[{}/{}] Failed: {}", index + 1, total, source.title);
                stats.not_found += 1;
                not_found.push(NotFoundEntry {
                    record: record.clone(),
                    query: last_query,
                    end_reason: NOT_FOUND_REASON.to_string(),
                });
            }
        }
    }

    pb.finish_with_message("done");
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    Ok(PlaylistOutcome {
        name: playlist.name.clone(),
        matched,
        not_found,
        stats,
    })
}

// ============================================================================
// Pool Matching
// ============================================================================

/// Result of matching a playlist against one shared candidate pool.
#[derive(Debug, Clone)]
pub struct PoolOutcome {
    pub name: String,
    pub matched: Vec<PoolMatch>,
    pub not_found: Vec<NotFoundEntry>,
    pub stats: ReconcileStats,
}

impl PoolOutcome {
    pub fn not_found_report(&self) -> Option<NotFoundReport> {
        if self.not_found.is_empty() {
            return None;
        }
        Some(NotFoundReport::new(self.name.clone(), self.not_found.clone()))
    }
}

/// Match every track of `playlist` against the same candidate records.
///
/// Tracks are scored in parallel. Matched and not-found entries both keep
/// playlist order; invalid source records are reported as not found with the
/// conversion error as reason.
pub fn reconcile_pool(
    matcher: &Matcher,
    playlist: &Playlist,
    records: &[CandidateRecord],
) -> PoolOutcome {
    let start = Instant::now();
    let (candidates, malformed) = extract_candidates(records);
    let mut stats = ReconcileStats {
        total_tracks: playlist.songs.len(),
        candidates_seen: candidates.len(),
        candidates_malformed: malformed,
        ..Default::default()
    };

    let converted: Vec<_> = playlist.songs.iter().map(Track::from_source).collect();
    let sources: Vec<Track> = converted
        .iter()
        .filter_map(|t| t.as_ref().ok().cloned())
        .collect();
    log::info!(
        "Matching '{}' ({} tracks) against {} pooled candidates",
        playlist.name,
        sources.len(),
        candidates.len()
    );
    let assignments = matcher.match_many_to_many(&sources, &candidates);

    // Assignments follow source order, so one cursor pairs them back up
    let mut assigned = assignments.iter().peekable();
    let mut valid = sources.iter();
    let mut matched = Vec::new();
    let mut not_found = Vec::new();

    for (record, track) in playlist.songs.iter().zip(&converted) {
        if let Err(e) = track {
            log::warn!("Invalid: {} ({})", record.name, e);
            stats.invalid_source_records += 1;
            not_found.push(NotFoundEntry {
                record: record.clone(),
                query: String::new(),
                end_reason: e.to_string(),
            });
            continue;
        }
        let Some(source) = valid.next() else {
            continue;
        };

        match assigned.next_if(|a| std::ptr::eq(a.source, source)) {
            Some(assignment) => {
                let candidate = assignment.matched.candidate;
                stats.pool_matches += 1;
                matched.push(PoolMatch {
                    source_title: source.title.clone(),
                    matched_title: candidate.title.clone(),
                    matched_artists: candidate.artists.clone(),
                    external_id: candidate.external_id.clone(),
                    kind: candidate.kind,
                    score: assignment.matched.score,
                });
            }
            None => {
                stats.not_found += 1;
                not_found.push(NotFoundEntry {
                    record: record.clone(),
                    query: String::new(),
                    end_reason: POOL_NOT_FOUND_REASON.to_string(),
                });
            }
        }
    }

    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    PoolOutcome {
        name: playlist.name.clone(),
        matched,
        not_found,
        stats,
    }
}
