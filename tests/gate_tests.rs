// tests for gated execution, with a fake generator and store

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use sqlgate::{Error, Generator, QueryResult, Safety, Store, gate};

/// Store that records every statement it was asked to run.
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    fail_with: Option<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl CountingStore {
    fn with_rows(rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn execute(&self, sql: &str) -> Result<QueryResult, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(sql.to_string());

        match &self.fail_with {
            Some(message) => Err(Error::Store(message.clone())),
            None => Ok(QueryResult::new(
                vec!["id".to_string(), "name".to_string()],
                self.rows.clone(),
            )),
        }
    }
}

/// Generator that always answers with the same text.
struct CannedGenerator {
    reply: Result<String, String>,
    calls: AtomicUsize,
    last_user: Mutex<String>,
}

impl CannedGenerator {
    fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(String::new()),
        }
    }

    fn broken(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(String::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, _system: &str, user: &str) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user.lock().unwrap() = user.to_string();
        self.reply.clone().map_err(Error::Generation)
    }
}

#[tokio::test]
async fn test_denied_never_reaches_store() {
    let unsafe_sql = [
        "DROP TABLE Movies",
        "UPDATE Actors SET name='x' WHERE id=1",
        "SELECT * FROM Movies; DROP TABLE Movies",
        "DELETE FROM Actors",
        "PRAGMA foreign_keys = OFF",
        "SHOW TABLES",
        "",
    ];

    let store = CountingStore::default();
    for sql in unsafe_sql {
        let verdict = Safety::check(sql);
        assert!(!verdict.is_allowed(), "{sql:?} should be denied");

        let result = gate::execute(verdict, &store).await;
        assert!(matches!(result, Err(Error::UnsafeStatement { .. })));
    }

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_allowed_runs_once_verbatim() {
    let store = CountingStore::with_rows(vec![vec![json!(1), json!("Titanic")]]);

    let answer = gate::execute(Safety::check("```sql\nSELECT *\nFROM Movies\n```"), &store)
        .await
        .unwrap();

    assert_eq!(store.calls(), 1);
    assert_eq!(*store.seen.lock().unwrap(), vec!["SELECT * FROM Movies"]);
    assert_eq!(answer.generated_sql, "SELECT * FROM Movies");
    assert_eq!(answer.result.rows, vec![vec![json!(1), json!("Titanic")]]);
}

#[tokio::test]
async fn test_store_error_is_reported_not_retried() {
    let store = CountingStore::failing("no such table: NonExistentTable");

    let err = gate::execute(Safety::check("SELECT * FROM NonExistentTable"), &store)
        .await
        .unwrap_err();

    assert_eq!(store.calls(), 1);
    match err {
        Error::StoreExecution { statement, message } => {
            assert_eq!(statement, "SELECT * FROM NonExistentTable");
            assert_eq!(message, "no such table: NonExistentTable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_end_to_end_movie_by_id() {
    let generator = CannedGenerator::new("SELECT * FROM Movies WHERE id = 1");
    let store = CountingStore::with_rows(vec![vec![json!(1), json!("The Shawshank Redemption")]]);

    let answer = gate::answer(Some("Show movie with id 1"), "", &generator, &store)
        .await
        .unwrap();

    assert_eq!(answer.generated_sql, "SELECT * FROM Movies WHERE id = 1");
    assert_eq!(
        answer.result.rows,
        vec![vec![json!(1), json!("The Shawshank Redemption")]]
    );
    assert_eq!(
        *generator.last_user.lock().unwrap(),
        "Convert this to SQL: Show movie with id 1"
    );
    assert_eq!(generator.calls(), 1);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_missing_prompt_skips_generation() {
    let generator = CannedGenerator::new("SELECT 1");
    let store = CountingStore::default();

    for prompt in [None, Some(""), Some("   ")] {
        let err = gate::answer(prompt, "", &generator, &store).await.unwrap_err();
        assert!(matches!(err, Error::MissingInput));
    }

    assert_eq!(generator.calls(), 0);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_passes_through() {
    let generator = CannedGenerator::broken("rate limited");
    let store = CountingStore::default();

    let err = gate::answer(Some("Show all movies"), "", &generator, &store)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Generation(ref m) if m == "rate limited"));
    assert_eq!(generator.calls(), 1);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_unsafe_generation_is_blocked() {
    let generator = CannedGenerator::new("```sql\nDROP TABLE Movies;\n```");
    let store = CountingStore::default();

    let err = gate::answer(Some("Delete all movies"), "", &generator, &store)
        .await
        .unwrap_err();

    match err {
        Error::UnsafeStatement { statement, reason } => {
            assert_eq!(statement, "DROP TABLE Movies;");
            assert_eq!(reason.code(), "forbidden-keyword:drop");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.calls(), 0);
}
