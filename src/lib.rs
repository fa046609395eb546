//! Playlist reconciliation library: decides which search result from the
//! destination catalog is the same song as each source playlist track.

pub mod config;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod query;
pub mod reconcile;
pub mod scoring;

pub use config::{MatchConfig, ScoringWeights};
pub use error::{MatchError, MatchResult};
pub use matcher::{FieldScores, Matcher};
pub use models::{Assignment, SourceKind, Track, TrackMatch};
pub use reconcile::{
    reconcile_playlist, reconcile_pool, CatalogSearch, PlaylistOutcome, PoolOutcome, RecordedSearch,
};
