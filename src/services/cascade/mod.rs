//! Cascade deletion engine.
//!
//! The backing store has no referential integrity, so removing a team, game, player
//! or formation means discovering every dependent record and removing it before the
//! root record itself. Each root type has a planner encoding its dependency graph;
//! planners share the paginated [`reader`], the bounded [`deleter`] and the weak
//! reference [`mutator`].
//!
//! Cleanup of dependents is best effort: listing and per-record failures are logged
//! and reported but never prevent the root delete, which is always the last write of
//! a cascade and the only failure surfaced to callers.

pub mod deleter;
mod formation;
mod game;
pub mod mutator;
mod player;
pub mod reader;
mod team;
#[cfg(test)]
pub(crate) mod test_support;

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::dao::{
    models::{Collection, FieldFilter, Record, RecordId},
    record_store::{MAX_PAGE_SIZE, RecordStore},
    storage::{StorageError, StorageResult},
};

use self::deleter::BatchTally;

/// Deletes issued concurrently by one batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Tunables of the cascade engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSettings {
    /// Maximum number of deletes (or updates) in flight per batch operation.
    pub batch_size: usize,
    /// Records requested per listing call, capped at [`MAX_PAGE_SIZE`].
    pub page_size: usize,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// The only failure a cascade reports to its caller.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// The root record itself could not be deleted.
    #[error("failed to delete `{id}` from `{collection}`")]
    RootDelete {
        /// Collection of the root record.
        collection: Collection,
        /// Identifier of the root record.
        id: RecordId,
        #[source]
        source: StorageError,
    },
}

/// What a cascade did, per collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Collection of the root entity.
    pub root: Collection,
    /// Identifier of the root entity.
    pub root_id: RecordId,
    /// Successful deletes per collection, root record included.
    pub deleted: BTreeMap<Collection, usize>,
    /// Failed deletes per collection.
    pub failed: BTreeMap<Collection, usize>,
    /// Goals whose `assistId` was cleared.
    pub assists_cleared: usize,
    /// Goals whose `assistId` could not be cleared.
    pub assist_clear_failures: usize,
    /// Collections whose listing failed; their cleanup was skipped for this run.
    pub failed_listings: Vec<Collection>,
}

impl CascadeReport {
    fn new(root: Collection, root_id: &str) -> Self {
        Self {
            root,
            root_id: root_id.to_owned(),
            deleted: BTreeMap::new(),
            failed: BTreeMap::new(),
            assists_cleared: 0,
            assist_clear_failures: 0,
            failed_listings: Vec::new(),
        }
    }

    /// Total number of records removed, root included.
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    /// Total number of deletes that failed.
    pub fn total_failed(&self) -> usize {
        self.failed.values().sum()
    }

    /// Records deleted from `collection`.
    pub fn deleted_in(&self, collection: Collection) -> usize {
        self.deleted.get(&collection).copied().unwrap_or(0)
    }

    fn record_deletes(&mut self, collection: Collection, tally: BatchTally) {
        if tally.succeeded > 0 {
            *self.deleted.entry(collection).or_default() += tally.succeeded;
        }
        if tally.failed > 0 {
            *self.failed.entry(collection).or_default() += tally.failed;
        }
    }

    fn record_root_deleted(&mut self, collection: Collection) {
        self.record_deletes(
            collection,
            BatchTally {
                succeeded: 1,
                failed: 0,
            },
        );
    }

    fn record_root_failed(&mut self, collection: Collection) {
        self.record_deletes(
            collection,
            BatchTally {
                succeeded: 0,
                failed: 1,
            },
        );
    }

    fn record_cleared(&mut self, tally: BatchTally) {
        self.assists_cleared += tally.succeeded;
        self.assist_clear_failures += tally.failed;
    }

    /// Unwrap a listing, downgrading a failure to an empty result that is noted in the
    /// report.
    fn collect_listing(
        &mut self,
        collection: Collection,
        listing: StorageResult<Vec<Record>>,
    ) -> Vec<Record> {
        match listing {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    %collection,
                    root = %self.root,
                    root_id = %self.root_id,
                    error = %err,
                    "listing dependents failed; skipping their cleanup"
                );
                if !self.failed_listings.contains(&collection) {
                    self.failed_listings.push(collection);
                }
                Vec::new()
            }
        }
    }
}

/// Store handle and settings shared by the planners of one service.
#[derive(Clone)]
struct CascadeContext {
    store: Arc<dyn RecordStore>,
    settings: CascadeSettings,
}

impl CascadeContext {
    async fn list_all(
        &self,
        collection: Collection,
        filter: FieldFilter,
    ) -> StorageResult<Vec<Record>> {
        reader::list_all(
            self.store.as_ref(),
            collection,
            filter,
            self.settings.page_size,
        )
        .await
    }

    async fn delete_all(&self, collection: Collection, records: &[Record]) -> BatchTally {
        deleter::best_effort_delete_all(
            self.store.as_ref(),
            collection,
            records,
            self.settings.batch_size,
        )
        .await
    }

    async fn clear_all(
        &self,
        collection: Collection,
        records: &[Record],
        field: &'static str,
    ) -> BatchTally {
        mutator::clear_references(
            self.store.as_ref(),
            collection,
            records,
            field,
            self.settings.batch_size,
        )
        .await
    }

    /// Delete the root record of a (possibly nested) cascade.
    async fn delete_root(
        &self,
        collection: Collection,
        id: &str,
        report: &mut CascadeReport,
    ) -> Result<(), CascadeError> {
        match self.store.delete(collection, id.to_owned()).await {
            Ok(()) => {
                report.record_root_deleted(collection);
                Ok(())
            }
            Err(source) => {
                report.record_root_failed(collection);
                Err(CascadeError::RootDelete {
                    collection,
                    id: id.to_owned(),
                    source,
                })
            }
        }
    }
}

/// Public entry point of the cascade engine: one operation per root entity type.
#[derive(Clone)]
pub struct CascadeService {
    ctx: CascadeContext,
}

impl CascadeService {
    /// Build a service issuing its reads and writes against `store`.
    pub fn new(store: Arc<dyn RecordStore>, settings: CascadeSettings) -> Self {
        Self {
            ctx: CascadeContext { store, settings },
        }
    }

    /// Settings this service was built with.
    pub fn settings(&self) -> CascadeSettings {
        self.ctx.settings
    }

    /// Delete a game, everything it owns, and finally the game record.
    pub async fn delete_game_cascade(&self, game_id: &str) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::new(Collection::Games, game_id);
        let outcome = game::delete_game(&self.ctx, game_id, &mut report)
            .instrument(cascade_span(Collection::Games, game_id))
            .await;
        conclude(outcome, report)
    }

    /// Delete a team, fully cascading each of its games, then the team record.
    pub async fn delete_team_cascade(&self, team_id: &str) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::new(Collection::Teams, team_id);
        let outcome = team::delete_team(&self.ctx, team_id, &mut report)
            .instrument(cascade_span(Collection::Teams, team_id))
            .await;
        conclude(outcome, report)
    }

    /// Delete a player and its records; goals it merely assisted are kept with the
    /// assist cleared.
    pub async fn delete_player_cascade(
        &self,
        player_id: &str,
    ) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::new(Collection::Players, player_id);
        let outcome = player::delete_player(&self.ctx, player_id, &mut report)
            .instrument(cascade_span(Collection::Players, player_id))
            .await;
        conclude(outcome, report)
    }

    /// Delete a formation and its positions. Teams pointing at it are left untouched.
    pub async fn delete_formation_cascade(
        &self,
        formation_id: &str,
    ) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::new(Collection::Formations, formation_id);
        let outcome = formation::delete_formation(&self.ctx, formation_id, &mut report)
            .instrument(cascade_span(Collection::Formations, formation_id))
            .await;
        conclude(outcome, report)
    }
}

fn cascade_span(root: Collection, id: &str) -> tracing::Span {
    info_span!("cascade", %root, id, cascade_id = %Uuid::new_v4())
}

/// Emit the per-root summary line and hand the outcome back.
fn conclude(
    outcome: Result<(), CascadeError>,
    report: CascadeReport,
) -> Result<CascadeReport, CascadeError> {
    match outcome {
        Ok(()) => {
            info!(
                root = %report.root,
                id = %report.root_id,
                deleted = ?report.deleted,
                failed = ?report.failed,
                assists_cleared = report.assists_cleared,
                failed_listings = ?report.failed_listings,
                "cascade delete completed"
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                root = %report.root,
                id = %report.root_id,
                deleted = ?report.deleted,
                failed = ?report.failed,
                error = %err,
                "cascade delete could not remove its root record"
            );
            Err(err)
        }
    }
}
