// database connection and query execution
// supports postgres, sqlite, and mysql

use crate::Error;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{AnyPool, Column, Row, any::AnyPoolOptions};

/// Something that runs a statement and hands back rows.
///
/// The gate only ever calls `execute` with statements it has allowed.
#[async_trait]
pub trait Store: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, Error>;
}

pub struct Db {
    pool: AnyPool,
    dialect: Dialect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
}

// the sample movies database
const SEED_SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS Actors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS Movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ActorMovies (
        actor_id INTEGER,
        movie_id INTEGER,
        FOREIGN KEY (actor_id) REFERENCES Actors(id),
        FOREIGN KEY (movie_id) REFERENCES Movies(id)
    )",
];

const SEED_CAST: [(&str, &[&str]); 5] = [
    (
        "Leonardo DiCaprio",
        &["Titanic", "Inception", "The Revenant"],
    ),
    ("Kate Winslet", &["Titanic"]),
    ("Tom Hanks", &["Forrest Gump"]),
    (
        "Scarlett Johansson",
        &[
            "Lost in Translation",
            "Avengers: Endgame",
            "Captain America: Civil War",
        ],
    ),
    (
        "Robert Downey Jr.",
        &[
            "Iron Man",
            "Avengers: Endgame",
            "Captain America: Civil War",
        ],
    ),
];

const SEED_MOVIES: [&str; 8] = [
    "Titanic",
    "Inception",
    "The Revenant",
    "Forrest Gump",
    "Iron Man",
    "Avengers: Endgame",
    "Lost in Translation",
    "Captain America: Civil War",
];

impl Db {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();

        // figure out which database we're talking to
        let dialect = detect_dialect(url);

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        tracing::info!(dialect = dialect.name(), "connected to database");

        Ok(Self { pool, dialect })
    }

    /// Like `connect`, but a missing sqlite file is created.
    pub async fn create(url: &str) -> Result<Self, Error> {
        Self::connect(&create_mode(url)).await
    }

    // table and column info for the generation prompt
    pub async fn schema(&self) -> Result<String, Error> {
        match self.dialect {
            Dialect::Postgres => self.postgres_schema().await,
            Dialect::Sqlite => self.sqlite_schema().await,
            Dialect::Mysql => self.mysql_schema().await,
        }
    }

    async fn postgres_schema(&self) -> Result<String, Error> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name::text, column_name::text, data_type::text
               FROM information_schema.columns
               WHERE table_schema = 'public'
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(format_schema(rows))
    }

    async fn sqlite_schema(&self) -> Result<String, Error> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for (table,) in tables {
            let query = format!("SELECT name, type FROM pragma_table_info('{table}')");
            let cols: Vec<(String, String)> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

            for (name, dtype) in cols {
                result.push((table.clone(), name, dtype));
            }
        }

        Ok(format_schema(result))
    }

    async fn mysql_schema(&self) -> Result<String, Error> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name, column_name, data_type
               FROM information_schema.columns
               WHERE table_schema = DATABASE()
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(format_schema(rows))
    }

    /// Creates and fills the sample movies database.
    ///
    /// Goes straight to the pool, never through the gate.
    pub async fn seed(&self) -> Result<(), Error> {
        if !matches!(self.dialect, Dialect::Sqlite) {
            return Err(Error::Store(format!(
                "seeding only works on sqlite, not {}",
                self.dialect.name()
            )));
        }

        let mut tx = self.pool.begin().await?;

        for ddl in SEED_SCHEMA {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }

        for (actor, _) in SEED_CAST {
            sqlx::query("INSERT INTO Actors (name) VALUES (?)")
                .bind(actor)
                .execute(&mut *tx)
                .await?;
        }

        for movie in SEED_MOVIES {
            sqlx::query("INSERT INTO Movies (name) VALUES (?)")
                .bind(movie)
                .execute(&mut *tx)
                .await?;
        }

        for (actor, movies) in SEED_CAST {
            for movie in movies {
                sqlx::query(
                    "INSERT INTO ActorMovies (actor_id, movie_id)
                     SELECT a.id, m.id FROM Actors a, Movies m
                     WHERE a.name = ? AND m.name = ?",
                )
                .bind(actor)
                .bind(*movie)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::info!(
            actors = SEED_CAST.len(),
            movies = SEED_MOVIES.len(),
            "seeded movies database"
        );

        Ok(())
    }
}

#[async_trait]
impl Store for Db {
    // one connection per statement, back to the pool when we're done
    async fn execute(&self, sql: &str) -> Result<QueryResult, Error> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Error::Store(native_message(e)))?;

        if rows.is_empty() {
            return Ok(QueryResult::default());
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let json_rows: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|i| row_value_to_json(row, i))
                    .collect()
            })
            .collect();

        Ok(QueryResult::new(columns, json_rows))
    }
}

impl Dialect {
    fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Mysql => "mysql",
        }
    }
}

// figure out dialect from connection string
fn detect_dialect(url: &str) -> Dialect {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Dialect::Postgres
    } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        Dialect::Mysql
    } else {
        Dialect::Sqlite
    }
}

// sqlite only opens existing files unless asked for rwc
fn create_mode(url: &str) -> String {
    if !matches!(detect_dialect(url), Dialect::Sqlite)
        || url.contains("mode=")
        || url.contains(":memory:")
    {
        return url.to_string();
    }

    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}mode=rwc")
}

// the driver's own words, without sqlx's wrapping
fn native_message(e: sqlx::Error) -> String {
    match e {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

// turn schema rows into readable text for the prompt
fn format_schema(rows: Vec<(String, String, String)>) -> String {
    let mut result = String::new();
    let mut current_table = String::new();

    for (table, column, dtype) in rows {
        if table != current_table {
            if !current_table.is_empty() {
                result.push_str(")\n\n");
            }
            result.push_str(&format!("TABLE {table} (\n"));
            current_table = table;
        }
        result.push_str(&format!("  {column} {dtype}\n"));
    }

    if !current_table.is_empty() {
        result.push(')');
    }

    result
}

// convert database values to json (handling type mismatches gracefully)
fn row_value_to_json(row: &sqlx::any::AnyRow, index: usize) -> serde_json::Value {
    use sqlx::ValueRef;

    // null check first
    if row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true) {
        return serde_json::Value::Null;
    }

    // integers before strings so ids stay numbers
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return serde_json::Value::Bool(v);
    }

    // give up - some postgres types just don't work with the any driver
    serde_json::Value::String("<unsupported>".to_string())
}
