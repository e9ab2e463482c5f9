//! GraphQL type definitions
//!
//! These types wrap the stored records and are decorated with async-graphql
//! attributes. Fields that fan out to other records (postedBy, postedPhotos)
//! resolve with a follow-up lookup by github login.

use async_graphql::{
    Context, Enum, InputObject, InputValueError, InputValueResult, Object, Result, Scalar,
    ScalarType, SimpleObject, Upload, Value,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::helpers::str_to_datetime;
use crate::db::{Database, PhotoRecord, UserRecord};

use super::limits::LIST_FANOUT;

/// Public base URL injected into the schema; photo URLs derive from it
pub struct PublicUrl(pub String);

/// A valid date time value, carried on the wire as an ISO-8601 string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime(pub chrono::DateTime<Utc>);

#[Scalar(name = "DateTime")]
impl ScalarType for DateTime {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::String(s) => str_to_datetime(&s).map(DateTime).map_err(InputValueError::custom),
            other => Err(InputValueError::expected_type(other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339())
    }
}

/// Category a photo is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum PhotoCategory {
    Selfie,
    Portrait,
    Action,
    Landscape,
    Graphic,
}

impl PhotoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoCategory::Selfie => "SELFIE",
            PhotoCategory::Portrait => "PORTRAIT",
            PhotoCategory::Action => "ACTION",
            PhotoCategory::Landscape => "LANDSCAPE",
            PhotoCategory::Graphic => "GRAPHIC",
        }
    }
}

impl From<&str> for PhotoCategory {
    fn from(s: &str) -> Self {
        match s {
            "SELFIE" => PhotoCategory::Selfie,
            "ACTION" => PhotoCategory::Action,
            "LANDSCAPE" => PhotoCategory::Landscape,
            "GRAPHIC" => PhotoCategory::Graphic,
            _ => PhotoCategory::Portrait,
        }
    }
}

/// A user authorized via GitHub
#[derive(Debug, Clone)]
pub struct User {
    record: UserRecord,
}

#[Object]
impl User {
    /// The user's unique GitHub login
    async fn github_login(&self) -> &str {
        &self.record.github_login
    }

    async fn name(&self) -> Option<&str> {
        self.record.name.as_deref()
    }

    async fn avatar(&self) -> Option<&str> {
        self.record.avatar.as_deref()
    }

    /// All photos this user has posted
    #[graphql(complexity = "LIST_FANOUT * child_complexity + 1")]
    async fn posted_photos(&self, ctx: &Context<'_>) -> Result<Vec<Photo>> {
        let db = ctx.data_unchecked::<Database>();
        let records = db
            .photos()
            .list_by_login(&self.record.github_login)
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        Ok(records.into_iter().map(Photo::from).collect())
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self { record }
    }
}

/// A shared photo
#[derive(Debug, Clone)]
pub struct Photo {
    record: PhotoRecord,
}

#[Object]
impl Photo {
    async fn id(&self) -> &str {
        &self.record.id
    }

    async fn name(&self) -> &str {
        &self.record.name
    }

    async fn description(&self) -> Option<&str> {
        self.record.description.as_deref()
    }

    async fn category(&self) -> PhotoCategory {
        PhotoCategory::from(self.record.category.as_str())
    }

    /// Display URL, derived from the assigned id
    async fn url(&self, ctx: &Context<'_>) -> String {
        let base = ctx.data_unchecked::<PublicUrl>();
        format!("{}/img/{}.jpg", base.0, self.record.id)
    }

    /// The user who posted this photo
    async fn posted_by(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let db = ctx.data_unchecked::<Database>();
        let record = db
            .users()
            .get_by_login(&self.record.posted_by)
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        Ok(record.map(User::from))
    }

    /// When the photo was posted
    async fn created(&self) -> Result<DateTime> {
        str_to_datetime(&self.record.created)
            .map(DateTime)
            .map_err(|e| async_graphql::Error::new(e.to_string()))
    }
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Self { record }
    }
}

/// Token and user returned by the authentication mutations. The token is the
/// bearer credential for subsequent requests.
#[derive(SimpleObject)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

/// Client-supplied fields for a new photo
#[derive(InputObject)]
pub struct PostPhotoInput {
    pub name: String,
    pub description: Option<String>,
    #[graphql(default_with = "PhotoCategory::Portrait")]
    pub category: PhotoCategory,
    pub file: Option<Upload>,
}
