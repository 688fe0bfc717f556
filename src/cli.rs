// command line interface

use crate::core::{Db, Provider, Safety, Verdict, gate};
use crate::output::Output;
use crate::{Config, Error, Server, ai};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::process::ExitCode;

// `check` exits with this when the statement is denied
const DENIED_STATUS: u8 = 2;

#[derive(Parser)]
#[command(name = "sqlgate", about = "Ask your database questions in plain english, read-only")]
struct Cli {
    /// database connection url
    #[arg(long, short, env = "DATABASE_URL", global = true)]
    db: Option<String>,

    /// ai provider (openai, claude)
    #[arg(long, short = 'p', value_enum, default_value_t = Provider::Openai, global = true)]
    provider: Provider,

    /// api key for the ai provider (falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY)
    #[arg(long, short = 'k', global = true)]
    api_key: Option<String>,

    /// model name, defaults per provider
    #[arg(long, short, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// start as http server
    Serve {
        /// port number
        #[arg(long, short = 'P', default_value = "5000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// ask one question and print the rows
    Ask {
        /// the question, in plain english
        prompt: String,

        /// print json instead of a table
        #[arg(long)]
        raw: bool,
    },

    /// run a statement through the gate without executing it
    Check {
        /// the sql (fences and newlines are fine)
        sql: String,
    },

    /// create and fill the sample movies database (sqlite)
    Seed,
}

impl Cli {
    fn config(&self) -> Config {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(self.provider.key_var()).ok());

        let mut config = Config {
            database_url: self.db.clone(),
            provider: self.provider,
            api_key,
            model: self.model.clone(),
            ..Config::default()
        };

        if let Commands::Serve { port, host } = &self.command {
            config.port = *port;
            config.host = host.clone();
        }

        config
    }
}

pub async fn run() -> Result<ExitCode> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    crate::logging::init();

    let status = dispatch(Cli::parse()).await.into_diagnostic()?;
    Ok(ExitCode::from(status))
}

// exit status on success
async fn dispatch(cli: Cli) -> std::result::Result<u8, Error> {
    let config = cli.config();

    match cli.command {
        Commands::Serve { .. } => Server::run(&config).await.map(|_| 0),

        Commands::Ask { prompt, raw } => {
            let db = Db::connect(config.database_url()?).await?;
            let schema = db.schema().await?;
            let generator = ai::from_config(&config)?;

            let answer = gate::answer(Some(&prompt), &schema, generator.as_ref(), &db).await?;

            if raw {
                Output::raw(&answer)?;
            } else {
                Output::pretty(&answer);
            }
            Ok(0)
        }

        Commands::Check { sql } => {
            let verdict = Safety::check(&sql);
            Output::verdict(&verdict);
            Ok(check_status(&verdict))
        }

        Commands::Seed => {
            let url = config.database_url()?;
            let db = Db::create(url).await?;
            db.seed().await?;
            println!("seeded sample movies database at {url}");
            Ok(0)
        }
    }
}

fn check_status(verdict: &Verdict) -> u8 {
    if verdict.is_allowed() { 0 } else { DENIED_STATUS }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_check_exits_nonzero() {
        assert_eq!(check_status(&Safety::check("DROP TABLE Movies")), DENIED_STATUS);
        assert_eq!(check_status(&Safety::check("SELECT * FROM Movies")), 0);
    }

    #[test]
    fn cli_parses_check() {
        let cli = Cli::try_parse_from(["sqlgate", "check", "SELECT 1"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { ref sql } if sql == "SELECT 1"));
    }
}
