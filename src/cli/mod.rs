pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "tablectl")]
#[command(about = "tablectl - Command-line client for the Table API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "TABLE_API_URL", default_value = "http://localhost:3000", help = "Base URL of the API server")]
    pub url: String,

    #[arg(long, global = true, env = "TABLE_API_USER", help = "Basic auth username")]
    pub user: Option<String>,

    #[arg(long, global = true, env = "TABLE_API_PASSWORD", hide_env_values = true, help = "Basic auth password")]
    pub password: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check server and database health")]
    Health,

    #[command(about = "List tables exposed by the API")]
    Tables,

    #[command(about = "Select a page of rows from a table")]
    Select {
        #[arg(help = "Table name")]
        table: String,
        #[arg(long, help = "Page number (1-based)")]
        page: Option<u32>,
        #[arg(long, help = "Rows per page")]
        limit: Option<u32>,
    },

    #[command(about = "Insert a row from --data or stdin")]
    Insert {
        #[arg(help = "Table name")]
        table: String,
        #[arg(long, help = "JSON object of column values (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Update a row by id from --data or stdin")]
    Update {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
        #[arg(long, help = "JSON object of column values (reads stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Delete a row by id")]
    Delete {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row id")]
        id: String,
    },

    #[command(about = "Run SQL through the playground endpoint")]
    Sql {
        #[arg(help = "SQL text")]
        query: String,
        #[arg(long, help = "Print the result as CSV")]
        csv: bool,
    },

    #[command(about = "Create a table")]
    CreateTable {
        #[arg(help = "Table name")]
        name: String,
        #[arg(long = "column", short = 'c', required = true, help = "Column as name:type[:constraints], repeatable")]
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.url, cli.user.clone(), cli.password.clone())?;

    match cli.command {
        Commands::Health => commands::server::health(&client, output_format).await,
        Commands::Tables => commands::data::tables(&client, output_format).await,
        Commands::Select { table, page, limit } => {
            commands::data::select(&client, &table, page, limit, output_format).await
        }
        Commands::Insert { table, data } => {
            commands::data::insert(&client, &table, data.as_deref(), output_format).await
        }
        Commands::Update { table, id, data } => {
            commands::data::update(&client, &table, &id, data.as_deref(), output_format).await
        }
        Commands::Delete { table, id } => commands::data::delete(&client, &table, &id, output_format).await,
        Commands::Sql { query, csv } => commands::sql::execute(&client, &query, csv, output_format).await,
        Commands::CreateTable { name, columns } => {
            commands::sql::create_table(&client, &name, &columns, output_format).await
        }
    }
}
