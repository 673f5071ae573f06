//! The production [`Store`] implementation: grants and groups live in
//! Postgres, with subject/resource patterns normalized into their own
//! tables and referenced by id, as `jsonb` documents keyed by their `type`
//! discriminator.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::model::grant::GrantError;
use crate::model::{
    Grant, GrantId, Group, GroupId, NewGrant, NewGroup, Permission, ResourcePattern,
    SubjectPattern,
};

use super::{GroupUpdate, Store, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_uri: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_uri)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(PgStore { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

#[derive(FromRow)]
struct GrantRow {
    id: i64,
    subject_pattern: serde_json::Value,
    resource_pattern: serde_json::Value,
    permission: String,
    extra: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    expiry: Option<DateTime<Utc>>,
    negated: bool,
}

impl GrantRow {
    /// Malformed stored patterns are a store-layer concern, not a policy
    /// one: a row that no longer deserializes is logged and dropped rather
    /// than failing the whole listing.
    fn into_grant(self) -> Option<Grant> {
        let subject_pattern = match serde_json::from_value::<SubjectPattern>(self.subject_pattern)
        {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::warn!(grant_id = self.id, error = %err, "dropping grant with malformed subject pattern");
                return None;
            }
        };
        let resource_pattern =
            match serde_json::from_value::<ResourcePattern>(self.resource_pattern) {
                Ok(pattern) => pattern,
                Err(err) => {
                    tracing::warn!(grant_id = self.id, error = %err, "dropping grant with malformed resource pattern");
                    return None;
                }
            };
        Some(Grant {
            id: GrantId(self.id),
            subject_pattern,
            resource_pattern,
            permission: Permission(self.permission),
            extra: self.extra,
            created: self.created_at,
            expiry: self.expiry,
            negated: self.negated,
        })
    }
}

#[derive(FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    membership: serde_json::Value,
    created_at: DateTime<Utc>,
    expiry: Option<DateTime<Utc>>,
}

impl GroupRow {
    fn into_group(self) -> Result<Group, StoreError> {
        let membership = serde_json::from_value(self.membership)
            .map_err(|err| StoreError::Unavailable(format!("malformed group membership: {err}")))?;
        Ok(Group {
            id: GroupId(self.id),
            name: self.name,
            membership,
            created: self.created_at,
            expiry: self.expiry,
        })
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn list_grants(&self) -> Result<Vec<Grant>, StoreError> {
        let rows: Vec<GrantRow> = sqlx::query_as(
            r#"
            SELECT g.id, s.pattern AS subject_pattern, r.pattern AS resource_pattern,
                   g.permission, g.extra, g.created_at, g.expiry, g.negated
            FROM grants g
            JOIN subjects s ON s.id = g.subject_id
            JOIN resources r ON r.id = g.resource_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(rows.into_iter().filter_map(GrantRow::into_grant).collect())
    }

    async fn get_grant(&self, id: GrantId) -> Result<Grant, StoreError> {
        let row: Option<GrantRow> = sqlx::query_as(
            r#"
            SELECT g.id, s.pattern AS subject_pattern, r.pattern AS resource_pattern,
                   g.permission, g.extra, g.created_at, g.expiry, g.negated
            FROM grants g
            JOIN subjects s ON s.id = g.subject_id
            JOIN resources r ON r.id = g.resource_id
            WHERE g.id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        row.and_then(GrantRow::into_grant)
            .ok_or(StoreError::NotFound { kind: "grant", id: id.0 })
    }

    async fn create_grant(&self, new: NewGrant) -> Result<Grant, StoreError> {
        if let Err(err) = new.validate() {
            return Err(StoreError::Conflict(err.to_string()));
        }
        if let SubjectPattern::Group { group_id } = &new.subject_pattern {
            let group_id = *group_id;
            self.get_group(group_id)
                .await
                .map_err(|_| StoreError::Conflict(GrantError::UnknownGroup(group_id).to_string()))?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let subject_id = upsert_pattern(&mut tx, "subjects", &new.subject_pattern).await?;
        let resource_id = upsert_pattern(&mut tx, "resources", &new.resource_pattern).await?;

        let row: GrantRow = sqlx::query_as(
            r#"
            WITH inserted AS (
                INSERT INTO grants (subject_id, resource_id, permission, extra, expiry, negated)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, permission, extra, created_at, expiry, negated
            )
            SELECT inserted.id, $7::jsonb AS subject_pattern, $8::jsonb AS resource_pattern,
                   inserted.permission, inserted.extra, inserted.created_at, inserted.expiry,
                   inserted.negated
            FROM inserted
            "#,
        )
        .bind(subject_id)
        .bind(resource_id)
        .bind(new.permission.as_str())
        .bind(&new.extra)
        .bind(new.expiry)
        .bind(new.negated)
        .bind(serde_json::to_value(&new.subject_pattern).expect("subject pattern serializes"))
        .bind(serde_json::to_value(&new.resource_pattern).expect("resource pattern serializes"))
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| conflict_or_unavailable(err, "grant"))?;

        tx.commit().await.map_err(|err| StoreError::Unavailable(err.to_string()))?;

        row.into_grant().ok_or(StoreError::Unavailable("freshly inserted grant failed to decode".into()))
    }

    async fn delete_grant(&self, id: GrantId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM grants WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "grant", id: id.0 });
        }
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows: Vec<GroupRow> =
            sqlx::query_as("SELECT id, name, membership, created_at, expiry FROM groups")
                .fetch_all(&self.pool)
                .await
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        rows.into_iter().map(GroupRow::into_group).collect()
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StoreError> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, membership, created_at, expiry FROM groups WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        match row {
            Some(row) => row.into_group(),
            None => Err(StoreError::NotFound { kind: "group", id: id.0 }),
        }
    }

    async fn create_group(&self, new: NewGroup) -> Result<Group, StoreError> {
        new.validate().map_err(|err| StoreError::Conflict(err.to_string()))?;

        let membership = serde_json::to_value(&new.membership).expect("membership serializes");
        let row: GroupRow = sqlx::query_as(
            r#"
            INSERT INTO groups (name, membership, expiry)
            VALUES ($1, $2, $3)
            RETURNING id, name, membership, created_at, expiry
            "#,
        )
        .bind(&new.name)
        .bind(membership)
        .bind(new.expiry)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| conflict_or_unavailable(err, "group"))?;

        row.into_group()
    }

    async fn update_group(&self, id: GroupId, update: GroupUpdate) -> Result<Group, StoreError> {
        let membership = update
            .membership
            .as_ref()
            .map(|m| serde_json::to_value(m).expect("membership serializes"));

        let row: Option<GroupRow> = sqlx::query_as(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                membership = COALESCE($3, membership),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, membership, created_at, expiry
            "#,
        )
        .bind(id.0)
        .bind(&update.name)
        .bind(membership)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| conflict_or_unavailable(err, "group"))?;

        match row {
            Some(row) => row.into_group(),
            None => Err(StoreError::NotFound { kind: "group", id: id.0 }),
        }
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        // Group references live inside the subject pattern's jsonb document
        // rather than a foreign key, so the cascade invariant is enforced
        // here rather than by the schema.
        let referenced: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM grants g
            JOIN subjects s ON s.id = g.subject_id
            WHERE s.pattern @> jsonb_build_object('type', 'Group', 'group_id', $1)
            LIMIT 1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        if referenced.is_some() {
            return Err(StoreError::Conflict(format!(
                "group {id} is still referenced by one or more grants"
            )));
        }

        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|err| conflict_or_unavailable(err, "group"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "group", id: id.0 });
        }

        tx.commit().await.map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }

    async fn resolve_resource(&self, pattern: &ResourcePattern) -> Result<i64, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let id = upsert_pattern(&mut tx, "resources", pattern).await?;
        tx.commit().await.map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(id)
    }

    async fn resolve_subject(&self, pattern: &SubjectPattern) -> Result<i64, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let id = upsert_pattern(&mut tx, "subjects", pattern).await?;
        tx.commit().await.map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(id)
    }

    async fn healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

async fn upsert_pattern(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    table: &str,
    pattern: &impl serde::Serialize,
) -> Result<i64, StoreError> {
    let value = serde_json::to_value(pattern).expect("pattern serializes");
    let query = format!(
        r#"
        INSERT INTO {table} (pattern) VALUES ($1)
        ON CONFLICT (pattern) DO UPDATE SET pattern = EXCLUDED.pattern
        RETURNING id
        "#
    );
    let (id,): (i64,) = sqlx::query_as(&query)
        .bind(value)
        .fetch_one(&mut **tx)
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;
    Ok(id)
}

fn conflict_or_unavailable(err: sqlx::Error, kind: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("duplicate {kind}"))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::Conflict(format!("{kind} is still referenced"))
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}
