//! Native messaging host for QuotaGuard
//!
//! Runs the quota engine behind a length-prefixed JSON stream on
//! stdin/stdout. The platform adapter feeds it foreground and usage events
//! and relays editor requests; it answers with overlay and block signals.

use log::{error, info};
use quotaguard::{
    config::{AppPaths, EngineConfig},
    db::Database,
    host::NativeHost,
    platform::{RecordedUsageLog, SystemClock},
    store::SqliteStore,
    Engine,
};
use std::io;
use std::process::ExitCode;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let paths = AppPaths::resolve()?;
    let config = EngineConfig::load(&paths.config_file);
    info!("Using database {}", paths.database_file.display());

    // Store, engine log and host recorder each hold their own connection.
    let store = SqliteStore::new(Database::open_migrated(&paths.database_file)?);
    let usage_log = RecordedUsageLog::new(Database::open(&paths.database_file)?);
    let recorder = RecordedUsageLog::new(Database::open(&paths.database_file)?);

    let engine = Engine::new(config, store, usage_log);
    NativeHost::new(recorder).run(engine, SystemClock, io::stdin().lock(), io::stdout())?;
    Ok(())
}

fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr only.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Native host error: {e}");
            ExitCode::FAILURE
        }
    }
}
