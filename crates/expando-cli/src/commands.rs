use crate::cli::{Commands, Expando, GroupCommand, MatcherArgs, ModeArg, WhitelistCommand};
use crate::utils::{format_library, format_whitelist};
use expando_core::config::{data_file_path, ensure_config_dir};
use expando_core::{
    AppMatcher, ExpandoError, GroupId, Result, Store, TriggerMode, WhitelistMode,
};
use expando_daemon::run_daemon;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub fn handle_command(args: Expando) -> Result<()> {
    let custom = args.data.is_some();
    let path = args.data.unwrap_or_else(data_file_path);
    match args.commands {
        Commands::Run => run(&path),
        Commands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        command => {
            let mut store = if custom {
                Store::open(&path)?
            } else {
                ensure_config_dir()?;
                Store::open_default()?
            };
            handle_subcommand(&mut store, command)
        }
    }
}

pub fn handle_subcommand(store: &mut Store, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            print!("{}", format_library(store.library()));
            Ok(())
        }
        Commands::Add {
            group,
            prefix,
            body,
            delay_ms,
            description,
        } => {
            let trigger = delay_ms.map_or(TriggerMode::Immediate, TriggerMode::delayed);
            let group_id = group_or_create(store, &group)?;
            store
                .add_expansion(group_id, &prefix, &body, trigger, &description)
                .map(|_| println!("Expansion added successfully"))
        }
        Commands::Remove { prefix } => store
            .remove_by_prefix(&prefix)
            .map(|_| println!("Expansion removed successfully")),
        Commands::Group(command) => handle_group(store, command),
        Commands::Whitelist(command) => handle_whitelist(store, command),
        Commands::Import { file, merge } => store
            .import(&file, merge)
            .map(|count| println!("Imported {} expansions", count)),
        Commands::Export { file } => store
            .export(&file)
            .map(|_| println!("Exported to {}", file.display())),
        Commands::Run | Commands::Path => Err(ExpandoError::Other(
            "command does not operate on the store".to_string(),
        )),
    }
}

fn handle_group(store: &mut Store, command: GroupCommand) -> Result<()> {
    match command {
        GroupCommand::Add { name } => {
            if store.library().group_by_name(&name).is_some() {
                return Err(ExpandoError::InvalidConfig(format!(
                    "group '{}' already exists",
                    name
                )));
            }
            store
                .add_group(&name)
                .map(|_| println!("Group added successfully"))
        }
        GroupCommand::Rename { name, new_name } => {
            let id = group_id(store, &name)?;
            store
                .rename_group(id, &new_name)
                .map(|_| println!("Group renamed successfully"))
        }
        GroupCommand::Enable { name } => {
            let id = group_id(store, &name)?;
            store
                .set_group_enabled(id, true)
                .map(|_| println!("Group enabled"))
        }
        GroupCommand::Disable { name } => {
            let id = group_id(store, &name)?;
            store
                .set_group_enabled(id, false)
                .map(|_| println!("Group disabled"))
        }
        GroupCommand::Remove { name } => {
            let id = group_id(store, &name)?;
            store.remove_group(id).map(|group| {
                println!(
                    "Group removed with {} expansions",
                    group.expansions.len()
                )
            })
        }
    }
}

fn handle_whitelist(store: &mut Store, command: WhitelistCommand) -> Result<()> {
    match command {
        WhitelistCommand::Mode { mode } => {
            let mode = match mode {
                ModeArg::Disabled => WhitelistMode::Disabled,
                ModeArg::Allow => WhitelistMode::AllowList,
                ModeArg::Deny => WhitelistMode::DenyList,
            };
            store
                .update_settings(|settings| settings.whitelist.mode = mode)
                .map(|_| println!("Whitelist mode set to {:?}", mode))
        }
        WhitelistCommand::Add(args) => {
            let matcher = matcher(args)?;
            let mut added = false;
            store.update_settings(|settings| added = settings.whitelist.add(matcher))?;
            if added {
                println!("Application added to whitelist");
            } else {
                println!("Application already in whitelist");
            }
            Ok(())
        }
        WhitelistCommand::Remove(args) => {
            let matcher = matcher(args)?;
            let mut removed = false;
            store.update_settings(|settings| removed = settings.whitelist.remove(&matcher))?;
            if removed {
                println!("Application removed from whitelist");
                Ok(())
            } else {
                Err(ExpandoError::InvalidConfig(format!(
                    "'{}' is not in the whitelist",
                    matcher.pattern
                )))
            }
        }
        WhitelistCommand::Show => {
            print!("{}", format_whitelist(&store.library().settings.whitelist));
            Ok(())
        }
    }
}

fn matcher(args: MatcherArgs) -> Result<AppMatcher> {
    match (args.process, args.title) {
        (Some(process), None) => Ok(AppMatcher::process(process)),
        (None, Some(title)) => Ok(AppMatcher::title(title)),
        _ => Err(ExpandoError::InvalidConfig(
            "give exactly one of --process or --title".to_string(),
        )),
    }
}

fn group_id(store: &Store, name: &str) -> Result<GroupId> {
    store
        .library()
        .group_by_name(name)
        .map(|group| group.id)
        .ok_or_else(|| ExpandoError::GroupNotFound(name.to_string()))
}

fn group_or_create(store: &mut Store, name: &str) -> Result<GroupId> {
    match store.library().group_by_name(name) {
        Some(group) => Ok(group.id),
        None => {
            info!(group = name, "Creating group");
            store.add_group(name)
        }
    }
}

fn run(path: &Path) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|err| ExpandoError::Other(format!("Failed to set Ctrl-C handler: {}", err)))?;

    println!("expando is running. Press Ctrl-C to stop.");
    run_daemon(path, shutdown)
}
