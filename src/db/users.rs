//! Users repository
//!
//! User records are keyed by their GitHub login: the login is the stable
//! external identifier, and at most one record exists per login. The stored
//! github_token doubles as the bearer credential for subsequent requests.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool as Pool;

use super::helpers::{new_id, now_iso8601};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub github_login: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub github_token: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub github_login: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub github_token: String,
}

type UserRow = (String, String, Option<String>, Option<String>, String, String);

const USER_COLUMNS: &str = "id, github_login, name, avatar, github_token, created_at";

fn row_to_record(r: UserRow) -> UserRecord {
    UserRecord {
        id: r.0,
        github_login: r.1,
        name: r.2,
        avatar: r.3,
        github_token: r.4,
        created_at: r.5,
    }
}

pub struct UsersRepository {
    pool: Pool,
}

impl UsersRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new user and read the stored record back
    pub async fn create(&self, user: CreateUser) -> Result<UserRecord> {
        let id = new_id();
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO users (id, github_login, name, avatar, github_token, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.github_login)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(&user.github_token)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_login(&user.github_login)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create user"))
    }

    /// Bulk-insert users in one statement. Assigned ids are not returned;
    /// use [latest](Self::latest) to read the inserted rows back.
    pub async fn insert_many(&self, users: &[CreateUser]) -> Result<u64> {
        if users.is_empty() {
            return Ok(0);
        }

        let now = now_iso8601();
        let placeholders: Vec<&str> = users.iter().map(|_| "(?, ?, ?, ?, ?, ?)").collect();
        let sql = format!(
            "INSERT INTO users (id, github_login, name, avatar, github_token, created_at) VALUES {}",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for user in users {
            query = query
                .bind(new_id())
                .bind(&user.github_login)
                .bind(&user.name)
                .bind(&user.avatar)
                .bind(&user.github_token)
                .bind(&now);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Get user by github login
    pub async fn get_by_login(&self, login: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE github_login = ?"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    /// Get user by stored bearer token
    pub async fn get_by_token(&self, token: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE github_token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_record))
    }

    /// Refresh profile fields and rotate the token on an existing record,
    /// keyed by login. Returns the updated record.
    pub async fn update_profile(
        &self,
        login: &str,
        name: Option<&str>,
        avatar: Option<&str>,
        token: &str,
    ) -> Result<Option<UserRecord>> {
        sqlx::query(
            "UPDATE users SET name = ?, avatar = ?, github_token = ? WHERE github_login = ?",
        )
        .bind(name)
        .bind(avatar)
        .bind(token)
        .bind(login)
        .execute(&self.pool)
        .await?;

        self.get_by_login(login).await
    }

    /// List all users in insertion order
    pub async fn list_all(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// The `count` most recently inserted users, in insertion order
    pub async fn latest(&self, count: u32) -> Result<Vec<UserRecord>> {
        let mut rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY rowid DESC LIMIT ?"
        ))
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Count users
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
