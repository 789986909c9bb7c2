//! `settle` - command-line front end of the settings service
//!
//! Runs one command against the SQLite store in the data directory, with an
//! in-process cache that lives as long as the command.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use settle_cache_adapter_lru::CacheAdapterLru;
use settle_core::service::Adapters;
use settle_core::{ScopeContext, SettingsService, SettleConfig};
use settle_store_adapter_sqlite::StoreAdapterSqlite;
use settle_types::prelude::*;

mod catalog_file;

use catalog_file::CatalogFile;

#[derive(Parser)]
#[command(name = "settle")]
#[command(about = "Scoped runtime settings: system < org < team < user")]
struct Cli {
	/// Data directory holding the settings database
	#[arg(short, long, env = "SETTLE_DATA_DIR", default_value = "./data")]
	data_dir: PathBuf,

	#[command(subcommand)]
	command: Command,
}

/// Scope entity the command applies to; none means system
#[derive(Args, Debug)]
struct ScopeArgs {
	#[arg(long)]
	user: Option<String>,
	#[arg(long)]
	org: Option<String>,
	#[arg(long)]
	team: Option<String>,
}

impl ScopeArgs {
	fn context(self) -> ClResult<ScopeContext> {
		ScopeContext::from_ids(
			self.user.map(Into::into),
			self.org.map(Into::into),
			self.team.map(Into::into),
		)
	}
}

#[derive(Subcommand)]
enum Command {
	/// Load a YAML catalog into the store
	Import { file: PathBuf },
	/// Show the effective value of one setting
	Get {
		key: String,
		#[command(flatten)]
		scope: ScopeArgs,
	},
	/// List every visible setting, grouped
	List {
		#[arg(long)]
		category: Option<String>,
		#[command(flatten)]
		scope: ScopeArgs,
	},
	/// Store an override. VALUE is parsed as JSON, falling back to a plain string.
	Set {
		key: String,
		value: String,
		#[command(flatten)]
		scope: ScopeArgs,
	},
	/// Remove one override
	Reset {
		key: String,
		#[command(flatten)]
		scope: ScopeArgs,
	},
	/// Remove every override of the scope entity
	ResetAll {
		#[command(flatten)]
		scope: ScopeArgs,
	},
}

fn print_json<T: Serialize>(value: &T) -> ClResult<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn parse_value(raw: &str) -> serde_json::Value {
	serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}

async fn open_service(data_dir: &PathBuf) -> ClResult<SettingsService> {
	let config = SettleConfig::from_env()?;
	let store = Arc::new(StoreAdapterSqlite::new(data_dir).await?);
	let adapters = Adapters {
		catalog: Arc::clone(&store) as _,
		overrides: store as _,
		cache: Arc::new(CacheAdapterLru::default()),
		directory: None,
	};
	SettingsService::new(adapters, &config)
}

async fn run(cli: Cli) -> ClResult<()> {
	let service = open_service(&cli.data_dir).await?;

	match cli.command {
		Command::Import { file } => {
			let registry = CatalogFile::load(&file).await?.into_registry()?;
			let summary = service.catalog().import(&registry).await?;
			println!(
				"imported {} categories and {} settings",
				summary.categories, summary.definitions
			);
		}
		Command::Get { key, scope } => {
			print_json(&service.get_setting(&scope.context()?, &key).await?)?;
		}
		Command::List { category, scope } => {
			print_json(&service.list_settings(&scope.context()?, category.as_deref()).await?)?;
		}
		Command::Set { key, value, scope } => {
			let setting = service.set_setting(&scope.context()?, &key, parse_value(&value)).await?;
			print_json(&setting)?;
		}
		Command::Reset { key, scope } => {
			print_json(&service.reset_setting(&scope.context()?, &key).await?)?;
		}
		Command::ResetAll { scope } => {
			let removed = service.reset_all(&scope.context()?).await?;
			println!("removed {} overrides", removed);
		}
	}

	service.flush_invalidations().await;
	Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
	dotenvy::dotenv().ok();
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	match run(cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			if err.is_business() {
				eprintln!("{}", err);
			} else {
				error!("{}", err);
			}
			ExitCode::FAILURE
		}
	}
}


// vim: ts=4
