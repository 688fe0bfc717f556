// gated execution - the only path from generated text to the database

use serde::Serialize;

use super::ai::{self, Generator};
use super::db::{QueryResult, Store};
use super::normalize::normalize;
use super::safety::{Safety, Verdict};
use crate::Error;

/// What a caller gets back when a generated statement ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub generated_sql: String,
    pub result: QueryResult,
}

/// Runs an allowed statement, exactly once.
///
/// A denied verdict returns before the store is touched.
pub async fn execute<S>(verdict: Verdict, store: &S) -> Result<Answer, Error>
where
    S: Store + ?Sized,
{
    let statement = match verdict {
        Verdict::Allowed(statement) => statement,
        Verdict::Denied { statement, reason } => {
            tracing::warn!(%reason, statement = %statement, "blocked generated sql");
            return Err(Error::UnsafeStatement { statement, reason });
        }
    };

    tracing::debug!(statement = %statement, "executing generated sql");

    match store.execute(&statement).await {
        Ok(result) => Ok(Answer {
            generated_sql: statement,
            result,
        }),
        Err(e) => {
            let message = e.to_string();
            tracing::info!(statement = %statement, error = %message, "store rejected generated sql");
            Err(Error::StoreExecution { statement, message })
        }
    }
}

/// The whole request: prompt in, rows out.
///
/// A blank prompt stops before the generator is called. Generator
/// errors come back as they are, nothing is retried.
pub async fn answer<G, S>(
    prompt: Option<&str>,
    schema: &str,
    generator: &G,
    store: &S,
) -> Result<Answer, Error>
where
    G: Generator + ?Sized,
    S: Store + ?Sized,
{
    let prompt = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(Error::MissingInput)?;

    let raw = generator
        .generate(&ai::system_prompt(schema), &ai::user_prompt(prompt))
        .await?;

    let statement = normalize(&raw);
    execute(Safety::classify(&statement), store).await
}
