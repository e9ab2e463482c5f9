//! End-to-end tests for the GraphQL API
//!
//! Each test builds the schema over an in-memory database with stubbed
//! external collaborators, and executes operations the way the HTTP layer
//! does: the bearer credential is resolved into a session before the
//! operation runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::{Request, Response, Value};
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;

use photoshare::db::{CreatePhoto, Database};
use photoshare::graphql::{self, PhotoShareSchema, build_schema};
use photoshare::services::{
    CodeExchange, EventBus, ExchangedProfile, PhotoCatalog, PhotoStorage, ProfileSource,
    SyntheticProfile, UserDirectory,
};

// ============================================================================
// Test Harness
// ============================================================================

/// Code exchange stub: maps an authorization code to a canned profile
#[derive(Default)]
struct StubExchange {
    profiles: HashMap<String, ExchangedProfile>,
}

impl StubExchange {
    fn with_profile(mut self, code: &str, login: &str, token: &str) -> Self {
        self.profiles.insert(
            code.to_string(),
            ExchangedProfile {
                message: None,
                access_token: Some(token.to_string()),
                login: Some(login.to_string()),
                name: Some(format!("{login} name")),
                avatar_url: Some(format!("https://example.com/{login}.png")),
            },
        );
        self
    }

    fn with_failure(mut self, code: &str, message: &str) -> Self {
        self.profiles.insert(
            code.to_string(),
            ExchangedProfile {
                message: Some(message.to_string()),
                ..Default::default()
            },
        );
        self
    }
}

#[async_trait]
impl CodeExchange for StubExchange {
    async fn authorize(&self, code: &str) -> anyhow::Result<ExchangedProfile> {
        Ok(self.profiles.get(code).cloned().unwrap_or_else(|| {
            ExchangedProfile {
                message: Some("bad verification code".to_string()),
                ..Default::default()
            }
        }))
    }
}

/// Profile source stub: deterministic synthetic identities
struct StubProfiles;

#[async_trait]
impl ProfileSource for StubProfiles {
    async fn fetch(&self, count: u32) -> anyhow::Result<Vec<SyntheticProfile>> {
        Ok((0..count)
            .map(|i| SyntheticProfile {
                login: format!("fake-{i}"),
                name: format!("Fake User {i}"),
                avatar: format!("https://example.com/fake-{i}.png"),
                token: format!("fake-token-{i}"),
            })
            .collect())
    }
}

struct TestApp {
    db: Database,
    bus: Arc<EventBus>,
    schema: PhotoShareSchema,
    _images: tempfile::TempDir,
}

async fn test_app(exchange: StubExchange) -> TestApp {
    let db = Database::connect_in_memory().await.expect("in-memory db");
    let bus = Arc::new(EventBus::new());
    let images = tempfile::tempdir().expect("temp image dir");

    let storage = PhotoStorage::new(images.path());
    storage.ensure_root().await.expect("image dir");

    let directory = Arc::new(UserDirectory::new(
        db.clone(),
        bus.clone(),
        Arc::new(exchange),
        Arc::new(StubProfiles),
    ));
    let catalog = Arc::new(PhotoCatalog::new(db.clone(), bus.clone(), storage));

    let schema = build_schema(
        db.clone(),
        bus.clone(),
        directory,
        catalog,
        "http://localhost:4000".to_string(),
    );

    TestApp {
        db,
        bus,
        schema,
        _images: images,
    }
}

impl TestApp {
    /// Execute a request the way the HTTP handler does: resolve the bearer
    /// credential into a session first, then run the operation.
    async fn execute(&self, query: &str, bearer: Option<&str>) -> Response {
        let mut request = Request::new(query);
        if let Some(session) = graphql::resolve_identity(&self.db, bearer).await {
            request = request.data(session);
        }
        self.schema.execute(request).await
    }
}

fn data_json(response: &Response) -> serde_json::Value {
    serde_json::to_value(&response.data).expect("response data serializes")
}

// ============================================================================
// Authentication & Upsert
// ============================================================================

#[tokio::test]
async fn test_repeated_auth_for_one_login_signals_once() {
    let app = test_app(
        StubExchange::default()
            .with_profile("abc", "gPlake", "token-1")
            .with_profile("def", "gPlake", "token-2"),
    )
    .await;

    let mut new_users = app.bus.new_user.subscribe();

    let first = app
        .execute(
            r#"mutation { githubAuth(code: "abc") { token user { githubLogin } } }"#,
            None,
        )
        .await;
    assert!(first.errors.is_empty(), "{:?}", first.errors);
    assert_eq!(
        data_json(&first)["githubAuth"]["user"]["githubLogin"],
        "gPlake"
    );

    // Exactly one creation event, carrying the assigned id
    let event = new_users.recv().await.expect("new-user event");
    assert_eq!(event.github_login, "gPlake");
    assert!(!event.id.is_empty());

    let second = app
        .execute(r#"mutation { githubAuth(code: "def") { token } }"#, None)
        .await;
    assert!(second.errors.is_empty(), "{:?}", second.errors);
    assert_eq!(data_json(&second)["githubAuth"]["token"], "token-2");

    // The second exchange updated, it did not insert or signal
    assert!(new_users.try_recv().is_err());
    assert_eq!(app.db.users().count().await.unwrap(), 1);

    let record = app
        .db
        .users()
        .get_by_login("gPlake")
        .await
        .unwrap()
        .expect("gPlake on file");
    assert_eq!(record.github_token, "token-2");
}

#[tokio::test]
async fn test_exchange_error_fails_whole_operation() {
    let app = test_app(StubExchange::default().with_failure("expired", "code expired")).await;

    let response = app
        .execute(r#"mutation { githubAuth(code: "expired") { token } }"#, None)
        .await;

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "code expired");
    assert_eq!(app.db.users().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_fake_user_auth_returns_stored_token() {
    let app = test_app(StubExchange::default()).await;

    app.execute(r#"mutation { addFakeUsers(count: 1) { githubLogin } }"#, None)
        .await;

    let response = app
        .execute(
            r#"mutation { fakeUserAuth(githubLogin: "fake-0") { token user { githubLogin } } }"#,
            None,
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(data_json(&response)["fakeUserAuth"]["token"], "fake-token-0");

    // The returned token works as a bearer credential
    let me = app.execute("{ me { githubLogin } }", Some("fake-token-0")).await;
    assert_eq!(data_json(&me)["me"]["githubLogin"], "fake-0");
}

#[tokio::test]
async fn test_fake_user_auth_unknown_login_is_not_found() {
    let app = test_app(StubExchange::default()).await;

    let response = app
        .execute(
            r#"mutation { fakeUserAuth(githubLogin: "nobody") { token } }"#,
            None,
        )
        .await;

    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "cannot find user with githubLogin 'nobody'"
    );
}

#[tokio::test]
async fn test_add_fake_users_signals_each_inserted_record() {
    let app = test_app(StubExchange::default()).await;
    let mut new_users = app.bus.new_user.subscribe();

    let response = app
        .execute(r#"mutation { addFakeUsers(count: 3) { githubLogin } }"#, None)
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(app.db.users().count().await.unwrap(), 3);

    let mut ids = Vec::new();
    for expected_login in ["fake-0", "fake-1", "fake-2"] {
        let event = new_users.recv().await.expect("new-user event");
        assert_eq!(event.github_login, expected_login);
        assert!(!event.id.is_empty());
        ids.push(event.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "each event carries a distinct id");

    assert!(new_users.try_recv().is_err(), "exactly 3 events");
}

// ============================================================================
// Photos
// ============================================================================

#[tokio::test]
async fn test_post_photo_attributes_to_session_identity() {
    let app = test_app(StubExchange::default().with_profile("abc", "gPlake", "token-1")).await;
    app.execute(r#"mutation { githubAuth(code: "abc") { token } }"#, None)
        .await;

    let mut photos = app.bus.photo_added.subscribe();
    let before = chrono::Utc::now();

    let response = app
        .execute(
            r#"mutation { postPhoto(input: {name: "x", category: SELFIE}) { id name category url created } }"#,
            Some("token-1"),
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let data = data_json(&response);
    let id = data["postPhoto"]["id"].as_str().expect("assigned id");
    assert!(!id.is_empty());
    assert_eq!(data["postPhoto"]["name"], "x");
    assert_eq!(data["postPhoto"]["category"], "SELFIE");
    assert_eq!(
        data["postPhoto"]["url"],
        format!("http://localhost:4000/img/{id}.jpg")
    );

    // The gateway assigned the timestamp within this call's window
    let created = chrono::DateTime::parse_from_rfc3339(
        data["postPhoto"]["created"].as_str().expect("created"),
    )
    .unwrap()
    .with_timezone(&chrono::Utc);
    let after = chrono::Utc::now();
    assert!(created >= before && created <= after);

    // Stored owner is the session identity
    let record = app
        .db
        .photos()
        .get_by_id(id)
        .await
        .unwrap()
        .expect("photo on file");
    assert_eq!(record.posted_by, "gPlake");

    // One photo-added event with the same data, published after the write
    let event = photos.recv().await.expect("photo-added event");
    assert_eq!(event.id, id);
    assert_eq!(event.posted_by, "gPlake");
    assert!(photos.try_recv().is_err());
}

#[tokio::test]
async fn test_unauthenticated_post_photo_writes_and_publishes_nothing() {
    let app = test_app(StubExchange::default()).await;
    let mut photos = app.bus.photo_added.subscribe();

    let response = app
        .execute(
            r#"mutation { postPhoto(input: {name: "x", category: SELFIE}) { id } }"#,
            None,
        )
        .await;

    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "only an authorized user can perform this operation"
    );
    assert_eq!(app.db.photos().count().await.unwrap(), 0);
    assert!(photos.try_recv().is_err());
}

#[tokio::test]
async fn test_all_photos_applies_the_after_bound_in_order() {
    let app = test_app(StubExchange::default().with_profile("abc", "gPlake", "token-1")).await;
    app.execute(r#"mutation { githubAuth(code: "abc") { token } }"#, None)
        .await;

    let photos = app.db.photos();
    for (name, created) in [
        ("first", "2020-01-01T00:00:00Z"),
        ("second", "2021-06-01T12:00:00Z"),
        ("third", "2022-03-05T08:30:00Z"),
    ] {
        photos
            .create(CreatePhoto {
                name: name.to_string(),
                description: None,
                category: "LANDSCAPE".to_string(),
                posted_by: "gPlake".to_string(),
                created: chrono::DateTime::parse_from_rfc3339(created)
                    .unwrap()
                    .with_timezone(&chrono::Utc),
            })
            .await
            .unwrap();
    }

    let response = app
        .execute(
            r#"{ allPhotos(after: "2020-12-31T00:00:00Z") { name } }"#,
            None,
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let names: Vec<_> = data_json(&response)["allPhotos"]
        .as_array()
        .expect("list")
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["second", "third"]);

    let totals = app.execute("{ totalPhotos totalUsers }", None).await;
    assert_eq!(data_json(&totals)["totalPhotos"], 3);
    assert_eq!(data_json(&totals)["totalUsers"], 1);
}

#[tokio::test]
async fn test_me_is_null_for_anonymous_sessions() {
    let app = test_app(StubExchange::default()).await;

    let response = app.execute("{ me { githubLogin } }", None).await;
    assert!(response.errors.is_empty());
    assert_eq!(data_json(&response)["me"], serde_json::Value::Null);

    // An unknown credential also resolves to anonymous, without an error
    let response = app.execute("{ me { githubLogin } }", Some("not-a-token")).await;
    assert!(response.errors.is_empty());
    assert_eq!(data_json(&response)["me"], serde_json::Value::Null);
}

// ============================================================================
// Validation limits
// ============================================================================

#[tokio::test]
async fn test_six_level_nesting_is_rejected_before_execution() {
    let app = test_app(StubExchange::default()).await;

    // Six levels, but cheap: the rejection can only come from the depth limit
    let response = app
        .execute(
            r#"{ me { postedPhotos { postedBy { postedPhotos { postedBy { githubLogin } } } } } }"#,
            None,
        )
        .await;

    assert!(!response.errors.is_empty());
    assert_eq!(response.data, Value::Null, "no partial data");

    // One level shallower passes validation
    let response = app
        .execute(
            r#"{ me { postedPhotos { postedBy { postedPhotos { name } } } } }"#,
            None,
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
}

#[tokio::test]
async fn test_expensive_operation_is_rejected_before_execution() {
    let app = test_app(StubExchange::default()).await;

    // Within the depth limit, but the stacked list fan-out weights push the
    // estimated cost past the ceiling
    let response = app
        .execute(
            r#"{ allUsers { postedPhotos { postedBy { postedPhotos { name } } } } }"#,
            None,
        )
        .await;

    assert!(!response.errors.is_empty());
    assert_eq!(response.data, Value::Null, "no partial data");

    let response = app.execute("{ allUsers { githubLogin } }", None).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn test_subscription_stream_receives_new_user_events() {
    let app = test_app(StubExchange::default().with_profile("abc", "gPlake", "token-1")).await;

    let schema = app.schema.clone();
    let handle = tokio::spawn(async move {
        let mut stream = schema.execute_stream(Request::new(
            "subscription { newUser { githubLogin name } }",
        ));
        stream.next().await
    });

    // Wait for the stream to register with the bus before publishing
    while app.bus.new_user.subscriber_count() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    app.execute(r#"mutation { githubAuth(code: "abc") { token } }"#, None)
        .await;

    let response = handle.await.unwrap().expect("one subscription payload");
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(data_json(&response)["newUser"]["githubLogin"], "gPlake");
}

#[tokio::test]
async fn test_subscription_stream_receives_new_photo_events() {
    let app = test_app(StubExchange::default().with_profile("abc", "gPlake", "token-1")).await;
    app.execute(r#"mutation { githubAuth(code: "abc") { token } }"#, None)
        .await;

    let schema = app.schema.clone();
    let handle = tokio::spawn(async move {
        let mut stream = schema.execute_stream(Request::new(
            "subscription { newPhoto { name category postedBy { githubLogin } } }",
        ));
        stream.next().await
    });

    while app.bus.photo_added.subscriber_count() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    app.execute(
        r#"mutation { postPhoto(input: {name: "powder day", category: ACTION}) { id } }"#,
        Some("token-1"),
    )
    .await;

    let response = handle.await.unwrap().expect("one subscription payload");
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let data = data_json(&response);
    assert_eq!(data["newPhoto"]["name"], "powder day");
    assert_eq!(data["newPhoto"]["category"], "ACTION");
    assert_eq!(data["newPhoto"]["postedBy"]["githubLogin"], "gPlake");
}
