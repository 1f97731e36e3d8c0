use chrono::{DateTime, Utc};
use coterie_storage::{
    AddGroupMemberParams, CreateGroupParams, Group, GroupId, GroupMember, GroupType, Role, Store,
    StoreError, UpdateGroupParams, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const OWNER: &str = "owner";

/// Connection pool tuning for [`SqliteStore::open_with`].
#[derive(Clone, Debug)]
pub struct SqliteStoreOptions {
    pub max_connections: u32,
    /// How long a call waits for a pooled connection before failing with a backend error.
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `~/.coterie/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".coterie");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}", path.to_string_lossy());
        Self::open(&url).await
    }

    /// Private in-memory database. A single connection is kept alive for the
    /// lifetime of the pool, since every new connection would see an empty database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(backend)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(backend)?;
        Self::migrate(pool).await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        Self::open_with(url, &SqliteStoreOptions::default()).await
    }

    pub async fn open_with(url: &str, opts: &SqliteStoreOptions) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(opts.busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(opts.max_connections)
            .acquire_timeout(opts.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(backend)?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StoreError> {
        MIGRATOR.run(&pool).await.map_err(|e| {
            tracing::warn!(error = %e, "SQLite migration failed");
            StoreError::Backend(e.to_string())
        })?;
        Ok(Self { pool })
    }
}

// ───────────────────────────── Row mapping ─────────────────────────────

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: String,
    name: String,
    description: String,
    icon: String,
    group_type: String,
    exchange_address: Option<String>,
    created_by: String,
    modified_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    group_id: String,
    user_id: String,
    role: String,
    added_by: Option<String>,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(GroupMember {
            group_id: GroupId(parse_uuid(&row.group_id)?),
            user_id: UserId(parse_uuid(&row.user_id)?),
            role: row.role.parse::<Role>().map_err(backend)?,
            added_by: row
                .added_by
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(UserId),
            joined_at: row.joined_at,
        })
    }
}

const MEMBER_COLUMNS: &str = "group_id, user_id, role, added_by, joined_at";

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(backend)
}

/// Unique-key violations are the "already exists" outcome of a conditional insert.
fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        sqlx::Error::PoolTimedOut => {
            StoreError::Backend("timed out waiting for a database connection".into())
        }
        _ => StoreError::Backend(e.to_string()),
    }
}

/// Read a full group snapshot on one connection.
async fn load_group(conn: &mut SqliteConnection, group_id: &GroupId) -> Result<Group, StoreError> {
    let id = group_id.0.to_string();

    let row = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, description, icon, group_type, exchange_address,
                created_by, modified_by, created_at, updated_at
         FROM groups WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx_err)?
    .ok_or(StoreError::NotFound)?;

    let tags = sqlx::query_as::<_, (String,)>(
        "SELECT label FROM group_tags WHERE group_id = ? ORDER BY label",
    )
    .bind(&id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_err)?
    .into_iter()
    .map(|(label,)| label)
    .collect::<BTreeSet<_>>();

    let members = load_members(conn, &id).await?;

    Ok(Group {
        id: GroupId(parse_uuid(&row.id)?),
        name: row.name,
        description: row.description,
        icon: row.icon,
        group_type: row.group_type.parse::<GroupType>().map_err(backend)?,
        tags,
        members,
        exchange_address: row.exchange_address,
        created_by: UserId(parse_uuid(&row.created_by)?),
        modified_by: UserId(parse_uuid(&row.modified_by)?),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

async fn load_members(
    conn: &mut SqliteConnection,
    group_id: &str,
) -> Result<Vec<GroupMember>, StoreError> {
    sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ? ORDER BY joined_at, user_id"
    ))
    .bind(group_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_err)?
    .into_iter()
    .map(GroupMember::try_from)
    .collect()
}

async fn insert_tags(
    conn: &mut SqliteConnection,
    group_id: &str,
    tags: &BTreeSet<String>,
) -> Result<(), StoreError> {
    for label in tags {
        sqlx::query("INSERT INTO group_tags(group_id, label) VALUES(?, ?)")
            .bind(group_id)
            .bind(label)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_err)?;
    }
    Ok(())
}

/// Explain why a guarded member write matched no row.
async fn guard_failure(
    conn: &mut SqliteConnection,
    group_id: &str,
    user_id: &str,
    expected_role: Role,
) -> Result<StoreError, StoreError> {
    let row = sqlx::query_as::<_, (String,)>(
        "SELECT role FROM group_members WHERE group_id = ? AND user_id = ?",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx_err)?;

    Ok(match row {
        None => StoreError::NotFound,
        Some((role,)) if role != expected_role.as_str() => StoreError::RoleMismatch,
        Some(_) => StoreError::Conflict,
    })
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Groups ─────────────────────────────

    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError> {
        let group_id = GroupId::new();
        let id = group_id.0.to_string();
        let creator = params.created_by.0.to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO groups(id, name, description, icon, group_type, exchange_address,
                                created_by, modified_by, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.icon)
        .bind(params.group_type.as_str())
        .bind(&params.exchange_address)
        .bind(&creator)
        .bind(&creator)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        insert_tags(&mut tx, &id, &params.tags).await?;

        sqlx::query(
            "INSERT INTO group_members(group_id, user_id, role, added_by, joined_at)
             VALUES(?, ?, ?, NULL, ?)",
        )
        .bind(&id)
        .bind(&creator)
        .bind(OWNER)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let group = load_group(&mut tx, &group_id).await?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(group)
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        // Read inside a transaction so fields, tags and members come from one snapshot.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let group = load_group(&mut tx, group_id).await?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(group)
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
        modified_by: &UserId,
    ) -> Result<Group, StoreError> {
        let id = group_id.0.to_string();
        let (set_exchange, exchange_address) = match &params.exchange_address {
            Some(addr) => (true, addr.clone()),
            None => (false, None),
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let result = sqlx::query(
            "UPDATE groups SET
                 name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 icon = COALESCE(?, icon),
                 group_type = COALESCE(?, group_type),
                 exchange_address = CASE WHEN ? THEN ? ELSE exchange_address END,
                 modified_by = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.icon)
        .bind(params.group_type.map(|t| t.as_str()))
        .bind(set_exchange)
        .bind(exchange_address)
        .bind(modified_by.0.to_string())
        .bind(Utc::now())
        .bind(&id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        if let Some(tags) = &params.tags {
            sqlx::query("DELETE FROM group_tags WHERE group_id = ?")
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
            insert_tags(&mut tx, &id, tags).await?;
        }

        let group = load_group(&mut tx, group_id).await?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(group)
    }

    // ───────────────────────────── Members ─────────────────────────────

    async fn get_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMember, StoreError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ? AND user_id = ?"
        ))
        .bind(group_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => GroupMember::try_from(row),
        }
    }

    async fn list_group_members(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<GroupMember>, StoreError> {
        let id = group_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let exists = sqlx::query_as::<_, (i64,)>("SELECT 1 FROM groups WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        let members = load_members(&mut tx, &id).await?;
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(members)
    }

    async fn add_group_member(
        &self,
        params: &AddGroupMemberParams,
    ) -> Result<GroupMember, StoreError> {
        let id = params.group_id.0.to_string();

        // One statement: the EXISTS guard covers a missing group and the primary key
        // rejects a duplicate pair, so there is no window between check and insert.
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "INSERT INTO group_members(group_id, user_id, role, added_by, joined_at)
             SELECT ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM groups WHERE id = ?)
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(&id)
        .bind(params.user_id.0.to_string())
        .bind(params.role.as_str())
        .bind(params.added_by.as_ref().map(|u| u.0.to_string()))
        .bind(Utc::now())
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => GroupMember::try_from(row),
        }
    }

    async fn remove_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
    ) -> Result<GroupMember, StoreError> {
        let gid = group_id.0.to_string();
        let uid = user_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "DELETE FROM group_members
             WHERE group_id = ? AND user_id = ? AND role = ?
               AND (role <> ?
                    OR (SELECT COUNT(*) FROM group_members WHERE group_id = ? AND role = ?) > 1)
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(&gid)
        .bind(&uid)
        .bind(expected_role.as_str())
        .bind(OWNER)
        .bind(&gid)
        .bind(OWNER)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let result = match row {
            Some(row) => GroupMember::try_from(row),
            None => Err(guard_failure(&mut tx, &gid, &uid, expected_role).await?),
        };

        tx.commit().await.map_err(map_sqlx_err)?;
        result
    }

    async fn update_group_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
        role: Role,
    ) -> Result<GroupMember, StoreError> {
        let gid = group_id.0.to_string();
        let uid = user_id.0.to_string();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "UPDATE group_members SET role = ?
             WHERE group_id = ? AND user_id = ? AND role = ?
               AND (role <> ? OR ? = ?
                    OR (SELECT COUNT(*) FROM group_members WHERE group_id = ? AND role = ?) > 1)
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(&gid)
        .bind(&uid)
        .bind(expected_role.as_str())
        .bind(OWNER)
        .bind(role.as_str())
        .bind(OWNER)
        .bind(&gid)
        .bind(OWNER)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let result = match row {
            Some(row) => GroupMember::try_from(row),
            None => Err(guard_failure(&mut tx, &gid, &uid, expected_role).await?),
        };

        tx.commit().await.map_err(map_sqlx_err)?;
        result
    }
}
