// sqlgate library - natural language to sql behind a read-only gate

pub mod cli;
mod config;
mod core;
mod error;
pub mod logging;
mod output;
mod server;

pub use config::Config;
pub use crate::core::{
    Answer, Claude, Db, DenyReason, FORBIDDEN_KEYWORDS, Generator, OpenAi, Provider, QueryResult,
    Safety, Store, Verdict, ai, gate, normalize,
};
pub use error::Error;
pub use server::{AppState, Server};
