// core logic - generation, the sql gate, and the database

pub mod ai;
mod db;
pub mod gate;
mod normalize;
mod safety;

pub use ai::{Claude, Generator, OpenAi, Provider};
pub use db::{Db, QueryResult, Store};
pub use gate::Answer;
pub use normalize::normalize;
pub use safety::{DenyReason, FORBIDDEN_KEYWORDS, Safety, Verdict};
