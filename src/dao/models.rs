use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier of a stored record.
pub type RecordId = String;

/// Field holding the owning game of a game-scoped record.
pub const GAME_ID: &str = "gameId";
/// Field holding the owning team.
pub const TEAM_ID: &str = "teamId";
/// Field holding the player a record belongs to.
pub const PLAYER_ID: &str = "playerId";
/// Field holding the player who scored a goal.
pub const SCORER_ID: &str = "scorerId";
/// Field holding the player who assisted a goal (weak reference).
pub const ASSIST_ID: &str = "assistId";
/// Field holding the owning game plan of a planned rotation.
pub const GAME_PLAN_ID: &str = "gamePlanId";
/// Field holding the formation a position or team points to.
pub const FORMATION_ID: &str = "formationId";

/// Every collection known to the coaching backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum Collection {
    Teams,
    Games,
    TeamRosters,
    TeamInvitations,
    Players,
    PlayTimeRecords,
    Goals,
    GameNotes,
    Substitutions,
    LineupAssignments,
    PlayerAvailabilities,
    GamePlans,
    PlannedRotations,
    Formations,
    FormationPositions,
}

impl Collection {
    /// All collections, in declaration order.
    pub const ALL: [Collection; 15] = [
        Collection::Teams,
        Collection::Games,
        Collection::TeamRosters,
        Collection::TeamInvitations,
        Collection::Players,
        Collection::PlayTimeRecords,
        Collection::Goals,
        Collection::GameNotes,
        Collection::Substitutions,
        Collection::LineupAssignments,
        Collection::PlayerAvailabilities,
        Collection::GamePlans,
        Collection::PlannedRotations,
        Collection::Formations,
        Collection::FormationPositions,
    ];

    /// Name of the collection inside the backing store.
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Teams => "teams",
            Collection::Games => "games",
            Collection::TeamRosters => "teamRosters",
            Collection::TeamInvitations => "teamInvitations",
            Collection::Players => "players",
            Collection::PlayTimeRecords => "playTimeRecords",
            Collection::Goals => "goals",
            Collection::GameNotes => "gameNotes",
            Collection::Substitutions => "substitutions",
            Collection::LineupAssignments => "lineupAssignments",
            Collection::PlayerAvailabilities => "playerAvailabilities",
            Collection::GamePlans => "gamePlans",
            Collection::PlannedRotations => "plannedRotations",
            Collection::Formations => "formations",
            Collection::FormationPositions => "formationPositions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemaless record: an identifier plus arbitrary JSON fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Primary key inside its collection.
    pub id: RecordId,
    /// Every other field of the document.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record without any field.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style helper setting a string field.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.to_owned(), Value::String(value.into()));
        self
    }

    /// String value of `name`, if present and a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Whether the record satisfies an equality filter.
    pub fn matches(&self, filter: &FieldFilter) -> bool {
        self.field_str(filter.field) == Some(filter.value.as_str())
    }
}

/// Equality filter on exactly one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    /// Name of the field compared.
    pub field: &'static str,
    /// Identifier the field must equal.
    pub value: RecordId,
}

impl FieldFilter {
    /// Shorthand constructor.
    pub fn eq(field: &'static str, value: impl Into<RecordId>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// One bounded page returned by a store listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records of the page, in store order.
    pub records: Vec<Record>,
    /// Cursor for the next page; `None` once the listing is exhausted.
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_unique() {
        let mut names = Collection::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Collection::ALL.len());
    }

    #[test]
    fn collection_serializes_as_store_name() {
        for collection in Collection::ALL {
            let json = serde_json::to_value(collection).unwrap();
            assert_eq!(json, Value::String(collection.as_str().to_owned()));
        }
    }

    #[test]
    fn record_matches_only_string_equality() {
        let record = Record::new("g1").with_field(GAME_ID, "game-1");
        assert!(record.matches(&FieldFilter::eq(GAME_ID, "game-1")));
        assert!(!record.matches(&FieldFilter::eq(GAME_ID, "game-2")));
        assert!(!record.matches(&FieldFilter::eq(TEAM_ID, "game-1")));

        let mut cleared = Record::new("goal").with_field(ASSIST_ID, "p1");
        cleared.fields.insert(ASSIST_ID.to_owned(), Value::Null);
        assert!(!cleared.matches(&FieldFilter::eq(ASSIST_ID, "p1")));
    }
}
