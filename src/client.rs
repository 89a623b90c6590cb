//! Command-line surface shared by the `socialgraph` binary.
//!
//! Every command goes through the same [`SyncController`] and
//! [`CanonicalStore`] a library caller would use, so the three surfaces
//! (library, CLI, external process) agree on results and failures.

use std::{fs::File, io::BufReader, sync::Arc};

use serde_json::{Value, json};

use crate::{
    SocialGraphError,
    auth::{Credential, StaticAuthGateway},
    canonical::CanonicalStore,
    config::{SocialGraphConfig, storage_for},
    ids::{AccountId, UserId},
    persistence::open_store,
    snapshot::read_snapshot,
    sync::SyncController,
};

const LOCAL_TOKEN: &str = "socialgraph-cli";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub database: Option<String>,
    pub account: String,
    pub config_path: Option<String>,
    pub command: String,
    pub command_args: Vec<String>,
    /// `--help`/`-h` seen before the command word.
    pub help: bool,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut database = None;
        let mut account = String::from("default");
        let mut config_path = None;
        let mut command = String::from("status");
        let mut command_args = Vec::new();
        let mut command_set = false;
        let mut help = false;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            if command_set {
                command_args.push(arg.to_string());
                continue;
            }
            match *arg {
                "--help" | "-h" => help = true,
                "--db" | "--database" => {
                    database = Some(
                        iter.next()
                            .ok_or_else(|| "--db requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--account" => {
                    account = iter
                        .next()
                        .ok_or_else(|| "--account requires a value".to_string())?
                        .to_string();
                }
                "--config" => {
                    config_path = Some(
                        iter.next()
                            .ok_or_else(|| "--config requires a value".to_string())?
                            .to_string(),
                    );
                }
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                _ => {
                    command = arg.to_string();
                    command_set = true;
                }
            }
        }
        if account.trim().is_empty() {
            return Err("--account must not be empty".to_string());
        }
        Ok(Self {
            database,
            account,
            config_path,
            command,
            command_args,
            help,
        })
    }

    pub fn help() -> &'static str {
        "Usage: socialgraph [--db memory|PATH] [--account ID] [--config FILE] <command> [args]\n\
         Commands:\n  \
           add-user <name>\n  \
           connect <user-id> <user-id>\n  \
           check-connection <user-id> <user-id>\n  \
           mutual-friends <user-id> <user-id>\n  \
           suggest-friends <user-id>\n  \
           find-communities\n  \
           users\n  \
           save [snapshot-file]\n  \
           load\n  \
           status\n"
    }

    /// Config file, then environment, then `--db`.
    pub fn settings(&self) -> Result<SocialGraphConfig, SocialGraphError> {
        let base = match &self.config_path {
            Some(path) => SocialGraphConfig::from_path(path)?,
            None => SocialGraphConfig::default(),
        };
        let mut settings = base.with_env_overrides()?;
        if let Some(db) = &self.database {
            settings.storage = storage_for(db);
        }
        Ok(settings)
    }
}

pub async fn run_command(
    config: &CommandLineConfig,
    settings: &SocialGraphConfig,
) -> Result<Value, SocialGraphError> {
    let account = AccountId::new(config.account.as_str());
    let gateway = StaticAuthGateway::new();
    gateway.register(LOCAL_TOKEN, account.clone());
    let store = Arc::new(CanonicalStore::new(open_store(&settings.storage)?, gateway));
    let credential = Credential::bearer(LOCAL_TOKEN);
    let args = &config.command_args;

    if config.command == "load" {
        return to_value(&store.load(&credential).await?);
    }

    let mut replica = SyncController::new(store.session(credential), &settings.sync);
    replica.pull().await?;
    match config.command.as_str() {
        "add-user" => to_value(&replica.add_user(arg(args, 0, "name")?).await?),
        "connect" => {
            let (a, b) = (user_arg(args, 0)?, user_arg(args, 1)?);
            to_value(&replica.connect(&a, &b).await?)
        }
        "check-connection" => {
            let (a, b) = (user_arg(args, 0)?, user_arg(args, 1)?);
            Ok(json!({ "connected": replica.query().are_connected(&a, &b) }))
        }
        "mutual-friends" => {
            let (a, b) = (user_arg(args, 0)?, user_arg(args, 1)?);
            to_value(&replica.query().mutual_friends(&a, &b))
        }
        "suggest-friends" => to_value(&replica.query().suggest_friends(&user_arg(args, 0)?)),
        "find-communities" => to_value(&replica.query().find_components()),
        "users" => to_value(&replica.local().users()),
        "save" => {
            // Without a file the current canonical graph is written back as is.
            let snapshot = match args.first() {
                Some(path) => {
                    let file = File::open(path)
                        .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
                    read_snapshot(BufReader::new(file))?
                }
                None => replica.local().snapshot(),
            };
            replica.import(snapshot).await?;
            Ok(json!({
                "saved": true,
                "users": replica.local().user_count(),
                "connections": replica.local().connection_count(),
            }))
        }
        "status" => Ok(json!({
            "account": account,
            "users": replica.local().user_count(),
            "connections": replica.local().connection_count(),
            "lastModified": replica.local().last_modified(),
        })),
        other => Err(SocialGraphError::validation(format!("unknown command {other}"))),
    }
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str, SocialGraphError> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| SocialGraphError::validation(format!("missing argument <{name}>")))
}

fn user_arg(args: &[String], idx: usize) -> Result<UserId, SocialGraphError> {
    arg(args, idx, "user-id").map(UserId::from)
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, SocialGraphError> {
    serde_json::to_value(value).map_err(|e| SocialGraphError::validation(e.to_string()))
}
