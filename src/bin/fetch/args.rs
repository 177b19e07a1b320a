use clap::{Parser, Subcommand, ValueEnum};
use sql_fetcher::context::{ConnectionParams, Context, DbType as ContextDbType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Creates a context.
    ///
    /// Contexts allow the fetch command to switch between different databases.
    CreateContext(ContextParams),
    /// Selects an existing context.
    UseContext { name: String },
    /// List available contexts.
    ListContexts,
    /// Imports the schema of the current context's database from a JSON file.
    ///
    /// The file holds a list of tables, in the order the database lists them:
    /// [{"name": "orders", "columns": ["id", "total"]}, ...]
    ImportSchema { file: PathBuf },
    /// Prints the schema the way the text generator sees it.
    DescribeSchema,
    /// Prints the SQL for a query model saved as JSON.
    ///
    /// Parts of the model that don't match the current schema are left out, with a warning.
    Generate { model: PathBuf },
    /// Proposes the ON clause for joining two tables.
    SuggestJoin { left: String, right: String },
    /// Checks that a query is a single SELECT statement. Use "-" to read it from stdin.
    Validate { sql: String },
    /// Asks the text generator for SQL, and prints it if it passes validation.
    Ask(AskParams),
    /// Saves the API key passed on to the text generator.
    SaveApiKey,
}

#[derive(clap::Args, Debug)]
pub struct ContextParams {
    /// You can reuse your context by referencing this name
    name: String,

    /// Database type
    #[arg(value_enum, long = "type")]
    db_type: DbType,
    /// Hostname or ip address of the database server (without the port number)
    #[arg(long = "host")]
    hostname_or_ip: String,
    /// Port number of the database server
    #[arg(short, long)]
    port: u16,
    /// Username
    #[arg(short, long)]
    username: String,
    /// Database to build queries for
    #[arg(short, long)]
    database: String,
    /// Use the new context
    #[arg(long = "use")]
    pub use_it: bool,
}

#[derive(clap::Args, Debug)]
pub struct AskParams {
    /// What you want, in plain words
    #[arg(required = true)]
    pub request: Vec<String>,
    /// Program that reads a prompt on stdin and answers with SQL on stdout. Defaults to the
    /// SQL_FETCHER_GENERATOR environment variable.
    #[arg(long)]
    pub generator: Option<String>,
    /// Seconds to wait for an answer
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

#[derive(Debug, ValueEnum, Clone)]
pub enum DbType {
    SqlServer,
    #[value(name = "mysql")]
    MySql,
}

impl From<ContextParams> for Context {
    fn from(value: ContextParams) -> Self {
        Context {
            name: value.name.into(),
            connection: ConnectionParams {
                db_type: value.db_type.into(),
                hostname: value.hostname_or_ip,
                port: value.port,
                user: value.username,
                database: value.database,
            },
        }
    }
}

impl From<DbType> for ContextDbType {
    fn from(value: DbType) -> Self {
        match value {
            DbType::SqlServer => Self::SqlServer,
            DbType::MySql => Self::MySql,
        }
    }
}
