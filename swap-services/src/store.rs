//! Swap Store
//!
//! SQLite-backed persistence for everything the engine reads and writes:
//! listings, profiles, swipes, matches, deal invitations, learned
//! affinities, swap opportunities, item boosts and ranking policies.
//!
//! The engine only mutates affinities, opportunities and the boost columns
//! of `items`. The remaining write methods exist for the collaborators that
//! own those rows (listing, swipe, match and policy administration).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use swap_core::{
    Category, Condition, Coordinates, CycleType, DealLink, Item, MatchRecord, OpportunityStatus,
    Participant, Policy, Swipe, SwipeRecord, SwapError, SwapOpportunity, UserAffinity,
    UserProfile, ValueRange,
};
use tracing::{debug, info, instrument};

const ITEM_COLUMNS: &str = "id, owner_id, category, condition, desired_categories, value_min, \
     value_max, latitude, longitude, created_at, is_active, is_archived, reciprocal_boost, \
     boost_expires_at";

const OPPORTUNITY_COLUMNS: &str = "id, cycle_type, user_a, item_a, user_b, item_b, user_c, \
     item_c, score, status, created_at, expires_at";

/// Swap engine storage using SQLite
pub struct SwapStore {
    conn: Mutex<Connection>,
}

impl SwapStore {
    /// Create a new SwapStore instance
    ///
    /// Creates the database file and tables if they don't exist.
    #[instrument(skip(db_path))]
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        info!("Opening swap database: {:?}", db_path.as_ref());
        let conn = Connection::open(db_path)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Create an in-memory SwapStore (useful for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                category TEXT NOT NULL,
                condition TEXT NOT NULL,
                desired_categories TEXT NOT NULL DEFAULT '[]',
                value_min TEXT,
                value_max TEXT,
                latitude REAL,
                longitude REAL,
                created_at INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_archived INTEGER NOT NULL DEFAULT 0,
                reciprocal_boost REAL NOT NULL DEFAULT 0,
                boost_expires_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);

            CREATE INDEX IF NOT EXISTS idx_items_listed
            ON items(is_active, is_archived, created_at);

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                latitude REAL,
                longitude REAL
            );

            CREATE TABLE IF NOT EXISTS swipes (
                source_item_id TEXT NOT NULL,
                target_item_id TEXT NOT NULL,
                liked INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (source_item_id, target_item_id)
            );

            CREATE INDEX IF NOT EXISTS idx_swipes_target ON swipes(target_item_id);

            CREATE INDEX IF NOT EXISTS idx_swipes_created ON swipes(created_at);

            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                item_a_id TEXT NOT NULL,
                item_b_id TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_matches_a ON matches(item_a_id);
            CREATE INDEX IF NOT EXISTS idx_matches_b ON matches(item_b_id);

            CREATE TABLE IF NOT EXISTS deal_invitations (
                id TEXT PRIMARY KEY,
                from_item_id TEXT NOT NULL,
                to_item_id TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_affinities (
                user_id TEXT PRIMARY KEY,
                affinities TEXT NOT NULL,
                computed_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS swap_opportunities (
                id TEXT PRIMARY KEY,
                cycle_type TEXT NOT NULL,
                user_a TEXT NOT NULL,
                item_a TEXT NOT NULL,
                user_b TEXT NOT NULL,
                item_b TEXT NOT NULL,
                user_c TEXT,
                item_c TEXT,
                score REAL NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_opportunities_expires
            ON swap_opportunities(expires_at);

            CREATE TABLE IF NOT EXISTS policies (
                version TEXT PRIMARY KEY,
                is_active INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )?;

        debug!("Swap database schema initialized");
        Ok(())
    }

    // ========================================================================
    // Items and profiles
    // ========================================================================

    /// Insert or replace a listing
    pub fn upsert_item(&self, item: &Item) -> Result<(), StoreError> {
        let desired: Vec<&str> = item.desired_categories.iter().map(|c| c.as_str()).collect();
        let desired_json = serde_json::to_string(&desired)?;
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO items (
                id, owner_id, category, condition, desired_categories, value_min, value_max,
                latitude, longitude, created_at, is_active, is_archived, reciprocal_boost,
                boost_expires_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                item.id,
                item.owner_id,
                item.category.as_str(),
                item.condition.as_str(),
                desired_json,
                item.value_range.map(|r| r.min.to_string()),
                item.value_range.map(|r| r.max.to_string()),
                item.coordinates.map(|c| c.latitude),
                item.coordinates.map(|c| c.longitude),
                item.created_at.timestamp(),
                item.is_active,
                item.is_archived,
                item.reciprocal_boost,
                item.boost_expires_at.map(|t| t.timestamp()),
            ],
        )?;

        Ok(())
    }

    pub fn get_item(&self, item_id: &str) -> Result<Option<Item>, StoreError> {
        let conn = self.conn.lock();

        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                params![item_id],
                row_to_item,
            )
            .optional()?;

        Ok(item)
    }

    /// Listed items not owned by `owner_id`
    pub fn listed_items_excluding_owner(&self, owner_id: &str) -> Result<Vec<Item>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items
             WHERE is_active = 1 AND is_archived = 0 AND owner_id != ?1
             ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![owner_id], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count_listed_items(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE is_active = 1 AND is_archived = 0",
            [],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    /// Up to `limit` listed items, newest first
    pub fn load_listed_items(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items
             WHERE is_active = 1 AND is_archived = 0
             ORDER BY created_at DESC, id ASC
             LIMIT ?1",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![limit as i64], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO profiles (user_id, latitude, longitude) VALUES (?1, ?2, ?3)",
            params![
                profile.user_id,
                profile.coordinates.map(|c| c.latitude),
                profile.coordinates.map(|c| c.longitude),
            ],
        )?;

        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let conn = self.conn.lock();

        let profile = conn
            .query_row(
                "SELECT user_id, latitude, longitude FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let latitude: Option<f64> = row.get(1)?;
                    let longitude: Option<f64> = row.get(2)?;
                    Ok(UserProfile {
                        user_id: row.get(0)?,
                        coordinates: coordinates(latitude, longitude),
                    })
                },
            )
            .optional()?;

        Ok(profile)
    }

    // ========================================================================
    // Swipes, matches and deals
    // ========================================================================

    pub fn record_swipe(&self, swipe: &Swipe) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO swipes (source_item_id, target_item_id, liked, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                swipe.source_item_id,
                swipe.target_item_id,
                swipe.liked,
                swipe.created_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Swipe history of one source item
    pub fn swipes_from_item(&self, item_id: &str) -> Result<Vec<Swipe>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT source_item_id, target_item_id, liked, created_at
             FROM swipes WHERE source_item_id = ?1
             ORDER BY created_at DESC",
        )?;

        let swipes = stmt
            .query_map(params![item_id], |row| {
                Ok(Swipe {
                    source_item_id: row.get(0)?,
                    target_item_id: row.get(1)?,
                    liked: row.get(2)?,
                    created_at: timestamp(3, row.get(3)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(swipes)
    }

    /// Targets swiped by `item_id` before `cutoff`
    pub fn targets_swiped_before(
        &self,
        item_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT target_item_id FROM swipes
             WHERE source_item_id = ?1 AND created_at < ?2",
        )?;

        let ids = stmt
            .query_map(params![item_id, cutoff.timestamp()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    /// Categories of every item liked from any of the user's items
    pub fn liked_categories_for_user(&self, user_id: &str) -> Result<Vec<Category>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT t.category
             FROM swipes s
             JOIN items src ON src.id = s.source_item_id
             JOIN items t ON t.id = s.target_item_id
             WHERE src.owner_id = ?1 AND s.liked = 1",
        )?;

        let categories = stmt
            .query_map(params![user_id], |row| {
                let label: String = row.get(0)?;
                Ok(Category::from_label(&label))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Number of swipes received per target item
    pub fn received_swipe_counts(&self) -> Result<HashMap<String, u32>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt =
            conn.prepare("SELECT target_item_id, COUNT(*) FROM swipes GROUP BY target_item_id")?;

        let counts = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((id, count as u32))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(counts)
    }

    pub fn count_swipes(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM swipes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Up to `limit` swipes, newest first, joined with the swiping user and
    /// the target's category
    pub fn load_swipe_records(&self, limit: usize) -> Result<Vec<SwipeRecord>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT src.owner_id, s.target_item_id, t.category, s.liked, s.created_at
             FROM swipes s
             JOIN items src ON src.id = s.source_item_id
             JOIN items t ON t.id = s.target_item_id
             ORDER BY s.created_at DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                let label: String = row.get(2)?;
                Ok(SwipeRecord {
                    user_id: row.get(0)?,
                    target_item_id: row.get(1)?,
                    target_category: Category::from_label(&label),
                    liked: row.get(3)?,
                    created_at: timestamp(4, row.get(4)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn record_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO matches (id, item_a_id, item_b_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.item_a_id,
                record.item_b_id,
                record.created_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Items already matched with `item_id`
    pub fn matched_item_ids(&self, item_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT CASE WHEN item_a_id = ?1 THEN item_b_id ELSE item_a_id END
             FROM matches WHERE item_a_id = ?1 OR item_b_id = ?1",
        )?;

        let ids = stmt
            .query_map(params![item_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    pub fn record_deal_invitation(&self, deal: &DealLink) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO deal_invitations (id, from_item_id, to_item_id, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![deal.id, deal.from_item_id, deal.to_item_id, deal.status.as_str()],
        )?;

        Ok(())
    }

    /// Items linked to `item_id` through accepted direct-deal invitations
    pub fn accepted_deal_item_ids(&self, item_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT CASE WHEN from_item_id = ?1 THEN to_item_id ELSE from_item_id END
             FROM deal_invitations
             WHERE status = 'accepted' AND (from_item_id = ?1 OR to_item_id = ?1)",
        )?;

        let ids = stmt
            .query_map(params![item_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    // ========================================================================
    // Affinities
    // ========================================================================

    /// Replace the stored affinity snapshot for a user
    pub fn save_affinity(&self, affinity: &UserAffinity) -> Result<(), StoreError> {
        let labelled: BTreeMap<&str, f64> = affinity
            .affinities
            .iter()
            .map(|(c, w)| (c.as_str(), *w))
            .collect();
        let data = serde_json::to_string(&labelled)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO user_affinities (user_id, affinities, computed_at)
             VALUES (?1, ?2, ?3)",
            params![affinity.user_id, data, affinity.computed_at.timestamp()],
        )?;

        Ok(())
    }

    pub fn get_affinity(&self, user_id: &str) -> Result<Option<UserAffinity>, StoreError> {
        let conn = self.conn.lock();

        let row = conn
            .query_row(
                "SELECT affinities, computed_at FROM user_affinities WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, timestamp(1, row.get(1)?)?)),
            )
            .optional()?;

        let Some((data, computed_at)) = row else {
            return Ok(None);
        };

        let labelled: BTreeMap<String, f64> = serde_json::from_str(&data)?;
        Ok(Some(UserAffinity {
            user_id: user_id.to_string(),
            affinities: labelled
                .into_iter()
                .map(|(label, w)| (Category::from_label(&label), w))
                .collect(),
            computed_at,
        }))
    }

    // ========================================================================
    // Opportunities
    // ========================================================================

    /// Delete opportunities whose expiry has passed
    #[instrument(skip(self))]
    pub fn purge_expired_opportunities(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.conn.lock();

        let deleted = conn.execute(
            "DELETE FROM swap_opportunities WHERE expires_at <= ?1",
            params![now.timestamp()],
        )?;

        if deleted > 0 {
            info!("Purged {} expired swap opportunities", deleted);
        }

        Ok(deleted)
    }

    /// Delete pending opportunities left over from earlier runs
    pub fn delete_pending_opportunities(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();

        let deleted = conn.execute(
            "DELETE FROM swap_opportunities WHERE status = ?1",
            params![OpportunityStatus::Pending.as_str()],
        )?;

        Ok(deleted)
    }

    pub fn insert_opportunity(&self, opportunity: &SwapOpportunity) -> Result<(), StoreError> {
        let slots = &opportunity.participants;
        if slots.len() != opportunity.cycle_type.participant_count() {
            return Err(StoreError::Corrupt(format!(
                "{} opportunity {} has {} participants",
                opportunity.cycle_type,
                opportunity.id,
                slots.len()
            )));
        }
        let third = slots.get(2);
        let conn = self.conn.lock();

        conn.execute(
            &format!(
                "INSERT INTO swap_opportunities ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                OPPORTUNITY_COLUMNS
            ),
            params![
                opportunity.id,
                opportunity.cycle_type.as_str(),
                slots[0].user_id,
                slots[0].item_id,
                slots[1].user_id,
                slots[1].item_id,
                third.map(|p| p.user_id.as_str()),
                third.map(|p| p.item_id.as_str()),
                opportunity.score,
                opportunity.status.as_str(),
                opportunity.created_at.timestamp(),
                opportunity.expires_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Unexpired opportunities involving `user_id`, best first
    pub fn opportunities_for_user(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SwapOpportunity>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM swap_opportunities
             WHERE expires_at > ?2 AND (user_a = ?1 OR user_b = ?1 OR user_c = ?1)
             ORDER BY score DESC",
            OPPORTUNITY_COLUMNS
        ))?;

        let opportunities = stmt
            .query_map(params![user_id, now.timestamp()], row_to_opportunity)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(opportunities)
    }

    /// All unexpired opportunities, best first
    pub fn active_opportunities(&self, now: DateTime<Utc>) -> Result<Vec<SwapOpportunity>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM swap_opportunities WHERE expires_at > ?1 ORDER BY score DESC",
            OPPORTUNITY_COLUMNS
        ))?;

        let opportunities = stmt
            .query_map(params![now.timestamp()], row_to_opportunity)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(opportunities)
    }

    // ========================================================================
    // Boosts
    // ========================================================================

    /// Items carrying a non-zero boost or a boost expiry
    pub fn boosted_item_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id FROM items WHERE reciprocal_boost > 0 OR boost_expires_at IS NOT NULL",
        )?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    /// Write an item's boost fields; returns false when the item is unknown
    pub fn set_item_boost(
        &self,
        item_id: &str,
        boost: f64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock();

        let updated = conn.execute(
            "UPDATE items SET reciprocal_boost = ?2, boost_expires_at = ?3 WHERE id = ?1",
            params![item_id, boost, expires_at.map(|t| t.timestamp())],
        )?;

        Ok(updated > 0)
    }

    // ========================================================================
    // Policies
    // ========================================================================

    /// Store a policy version, optionally making it the active one
    pub fn save_policy(&self, policy: &Policy, activate: bool) -> Result<(), StoreError> {
        let data = serde_json::to_string(policy)?;
        self.save_raw_policy(&policy.policy_version, &data, activate)
    }

    /// Store an unvalidated policy body as received from administration
    pub fn save_raw_policy(&self, version: &str, data: &str, activate: bool) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if activate {
            tx.execute("UPDATE policies SET is_active = 0", [])?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO policies (version, is_active, data, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![version, activate, data, Utc::now().timestamp()],
        )?;
        tx.commit()?;

        Ok(())
    }

    /// Make a stored policy version the active one; returns false when the
    /// version is unknown
    pub fn activate_policy(&self, version: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let known: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM policies WHERE version = ?1)",
            params![version],
            |row| row.get(0),
        )?;
        if known {
            tx.execute("UPDATE policies SET is_active = (version = ?1)", params![version])?;
        }
        tx.commit()?;

        Ok(known)
    }

    /// The active policy, if any
    pub fn load_active_policy(&self) -> Result<Option<Policy>, StoreError> {
        let conn = self.conn.lock();

        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM policies WHERE is_active = 1
                 ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Whether the database answers a trivial query
    pub fn ping(&self) -> bool {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok()
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

fn timestamp(column: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        conversion_error(
            column,
            StoreError::Corrupt(format!("timestamp {} out of range", secs)),
        )
    })
}

fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

fn conversion_error(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

fn parse_decimal(column: usize, value: Option<String>) -> rusqlite::Result<Option<Decimal>> {
    value
        .map(|v| Decimal::from_str(&v).map_err(|e| conversion_error(column, e)))
        .transpose()
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let category: String = row.get(2)?;
    let condition: String = row.get(3)?;
    let desired_json: String = row.get(4)?;
    let desired: Vec<String> =
        serde_json::from_str(&desired_json).map_err(|e| conversion_error(4, e))?;
    let value_min = parse_decimal(5, row.get(5)?)?;
    let value_max = parse_decimal(6, row.get(6)?)?;
    let boost_expires_at: Option<i64> = row.get(13)?;

    Ok(Item {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        category: Category::from_label(&category),
        condition: Condition::from_str(&condition).unwrap_or_default(),
        desired_categories: desired.iter().map(|l| Category::from_label(l)).collect(),
        value_range: match (value_min, value_max) {
            (Some(min), Some(max)) => Some(ValueRange { min, max }),
            _ => None,
        },
        coordinates: coordinates(row.get(7)?, row.get(8)?),
        created_at: timestamp(9, row.get(9)?)?,
        is_active: row.get(10)?,
        is_archived: row.get(11)?,
        reciprocal_boost: row.get(12)?,
        boost_expires_at: boost_expires_at.map(|secs| timestamp(13, secs)).transpose()?,
    })
}

fn row_to_opportunity(row: &Row<'_>) -> rusqlite::Result<SwapOpportunity> {
    let cycle_type: String = row.get(1)?;
    let cycle_type = CycleType::from_str(&cycle_type)
        .map_err(|e| conversion_error(1, StoreError::Corrupt(e)))?;
    let status: String = row.get(9)?;
    let status = OpportunityStatus::from_str(&status)
        .map_err(|e| conversion_error(9, StoreError::Corrupt(e)))?;

    let mut participants = vec![
        Participant::new(row.get::<_, String>(2)?, row.get::<_, String>(3)?),
        Participant::new(row.get::<_, String>(4)?, row.get::<_, String>(5)?),
    ];
    let user_c: Option<String> = row.get(6)?;
    let item_c: Option<String> = row.get(7)?;
    if let (Some(user), Some(item)) = (user_c, item_c) {
        participants.push(Participant::new(user, item));
    }

    Ok(SwapOpportunity {
        id: row.get(0)?,
        cycle_type,
        participants,
        score: row.get(8)?,
        status,
        created_at: timestamp(10, row.get(10)?)?,
        expires_at: timestamp(11, row.get(11)?)?,
    })
}

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for SwapError {
    fn from(e: StoreError) -> Self {
        SwapError::database(e.to_string())
    }
}
