//! Purpose: Hold top-level CLI command dispatch for `locdb`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: URL arguments are checked for an http(s) scheme before any request.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    options: ClientOptions,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "locdb", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Lookup { db_url, name } => {
            let client = connect(&db_url, options)?;
            let result = client.lookup(&name)?;
            Ok(emit_lookup(result, &name))
        }
        Command::Add { db_url, name, url } => {
            ensure_http_url(&url, "location URL")?;
            let client = connect(&db_url, options)?;
            client.add(&name, &url)?;
            println!("OK");
            Ok(RunOutcome::ok())
        }
        Command::Remove { db_url, name, url } => {
            ensure_http_url(&url, "location URL")?;
            let client = connect(&db_url, options)?;
            client.remove(&name, &url)?;
            println!("OK");
            Ok(RunOutcome::ok())
        }
        Command::Sync {
            db_url,
            dir,
            dir_url,
        } => {
            ensure_http_url(&dir_url, "directory URL")?;
            let client = connect(&db_url, options)?;
            let report = sync_directory(&client, &dir, &dir_url)?;
            let registered = serde_json::to_value(&report.registered).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode sync report")
                    .with_source(err)
            })?;
            emit_json(json!({
                "dir": dir.display().to_string(),
                "count": report.registered.len(),
                "registered": registered,
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn connect(db_url: &str, options: ClientOptions) -> Result<LocationClient, Error> {
    ensure_http_url(db_url, "location directory URL")?;
    LocationClient::with_options(db_url, options)
}
