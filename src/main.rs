use anyhow::{Context, Result};
use chrono::Local;
use log::info;

use autoinv::accounting::account::resolve;
use autoinv::accounting::session::Session;
use autoinv::accounting::Book;
use autoinv::backup;
use autoinv::config::Config;
use autoinv::import;

fn main() -> Result<()> {
    let config = Config::load();

    let default_filter = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let now = Local::now().naive_local();
    let options = config.import_options(now)?;

    let mut session = Session::open(&config.book)?;

    if !config.dry_run && !config.no_backup {
        backup::create_backup(session.path(), config.backup_dir.as_deref(), now)?;
    }

    let summary = import::import_file(&config.input, session.book_mut(), &options)
        .with_context(|| format!("import of {} into {} failed", config.input.display(), config.book.display()))?;

    for path in [&options.receivable_account, &options.transfer_account] {
        let book = session.book();
        let account = resolve(book.root_account(), path)?;
        let balance = book.balance(account.id)?;
        info!(
            "{} balance {}",
            path,
            balance.to_decimal().map_or_else(|| balance.to_string(), |value| value.to_string())
        );
    }

    if config.dry_run {
        info!("dry run, {} left unchanged", session.path().display());
    } else {
        session.save()?;
    }
    session.end();

    println!("{}", summary);

    Ok(())
}
