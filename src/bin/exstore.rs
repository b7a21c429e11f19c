use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use colored::control as colored_control;
use owo_colors::OwoColorize;

use exstore::cli::commands::{Cli, Commands, ConfigCmd, RemoteCmd};
use exstore::cli::ui::{print_success, print_warning};
use exstore::config::{settings::CONFIG_FILE, StoreConfig};
use exstore::core::manifest::BUILT_ID_PREFIX;
use exstore::core::{ManifestStore, PublishPipeline, Publisher};
use exstore::remote::{EntryKind, RemoteClient, RemoteConfig};
use exstore::StoreError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure colored output even in some CI shells unless explicitly off
    if cli.no_color {
        let _ = colored_control::set_override(false);
    } else if std::env::var_os("NO_COLOR").is_none() {
        let _ = colored_control::set_override(true);
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Publish { archive } => cmd_publish(&config, &archive),
        Commands::List => cmd_list(&config),
        Commands::Remove { slug, force } => cmd_remove(&config, &slug, force),
        Commands::Remote { cmd } => match cmd {
            RemoteCmd::Push { slug, message } => cmd_remote_push(&config, &slug, message.as_deref()),
            RemoteCmd::Rm { path, message } => cmd_remote_rm(&config, &path, message.as_deref()),
            RemoteCmd::Ls { path } => cmd_remote_ls(&config, path.as_deref()),
        },
        Commands::Config { cmd } => cmd_config(&config, cmd),
    }
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::load_or_default()?,
    };
    if let Some(store) = &cli.store {
        config.store.root = Some(store.clone());
    }
    Ok(config)
}

fn cmd_publish(config: &StoreConfig, archive: &PathBuf) -> Result<()> {
    println!("🚀 {}", "Publishing exercise".bold());

    let pipeline = PublishPipeline::new(config.clone());
    let report = pipeline.run(archive)?;

    println!();
    print_success(&format!("Exercise '{}' published", report.record.name));
    println!("📁 Location: {}", report.target.display());
    println!(
        "🌐 URL: /{}/{}/index.html",
        config.store_root().display(),
        report.record.folder
    );
    if report.install_warning {
        print_warning("Dependency install reported errors; verify the published output");
    }
    Ok(())
}

fn cmd_list(config: &StoreConfig) -> Result<()> {
    let manifest = ManifestStore::new(config.store_root()).load();

    if manifest.exercises.is_empty() {
        println!("No exercises published yet. Use 'exstore publish <archive>' to add one.");
        return Ok(());
    }

    println!("{} published exercises:", manifest.exercises.len());
    for exercise in &manifest.exercises {
        println!(
            "  {} {} {}: {} {}",
            exercise.icon,
            exercise.name.cyan(),
            format!("({})", exercise.folder).dimmed(),
            exercise.description,
            format!("[{}]", exercise.created).dimmed(),
        );
    }
    Ok(())
}

fn cmd_remove(config: &StoreConfig, slug: &str, force: bool) -> Result<()> {
    if !force {
        print!("🗑️  Remove exercise '{}' from the store? [y/N]: ", slug.red());
        let _ = std::io::stdout().flush();

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input != "y" && input != "yes" {
            println!("✋ {} removal", "Cancelled".yellow());
            return Ok(());
        }
    }

    let publisher = Publisher::new(config.store_root());
    let folder_removed = match publisher.unpublish(slug) {
        Ok(()) => true,
        Err(StoreError::NotFound { .. }) => false,
        Err(e) => return Err(e.into()),
    };

    let manifest = ManifestStore::new(config.store_root());
    let record_removed = match manifest.remove(&format!("{}{}", BUILT_ID_PREFIX, slug)) {
        Ok(_) => true,
        Err(StoreError::NotFound { .. }) => false,
        Err(e) => return Err(e.into()),
    };

    if !folder_removed && !record_removed {
        return Err(anyhow!("exercise '{}' not found in the store", slug));
    }

    print_success(&format!("Exercise '{}' removed", slug));
    Ok(())
}

fn cmd_remote_push(config: &StoreConfig, slug: &str, message: Option<&str>) -> Result<()> {
    let folder = config.store_root().join(slug);
    if !folder.is_dir() {
        return Err(anyhow!("exercise '{}' is not published locally", slug));
    }

    let client = RemoteClient::new(RemoteConfig::from_settings(&config.remote)?)?;
    let remote_path = format!("{}/{}", config.remote.prefix, slug);
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Add exercise: {}", slug));

    println!("☁️  {} {} → {}", "Uploading".cyan(), folder.display(), remote_path);
    let uploaded = client.push_directory(&folder, &remote_path, &message)?;

    print_success(&format!("Uploaded {} files to {}", uploaded, remote_path));
    Ok(())
}

fn cmd_remote_rm(config: &StoreConfig, path: &str, message: Option<&str>) -> Result<()> {
    let client = RemoteClient::new(RemoteConfig::from_settings(&config.remote)?)?;
    let message = message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Remove {}", path));

    println!("🗑️  {} {}", "Deleting remote path".yellow(), path);
    let outcome = client.delete_directory(path, &message)?;

    if outcome.is_complete() {
        print_success(&format!("Deleted {} remote files", outcome.deleted));
    } else {
        // Partial deletion is a reported outcome, not a process failure
        print_warning(&format!(
            "Deleted {} of {} remote files; re-run to remove the rest",
            outcome.deleted,
            outcome.attempted()
        ));
    }
    Ok(())
}

fn cmd_remote_ls(config: &StoreConfig, path: Option<&str>) -> Result<()> {
    let client = RemoteClient::new(RemoteConfig::from_settings(&config.remote)?)?;
    let path = path.unwrap_or(config.remote.prefix.as_str());

    let entries = client.list_directory(path)?;
    println!("{} entries under {}:", entries.len(), path.cyan());
    for entry in &entries {
        let marker = match entry.kind {
            EntryKind::Dir => "📁",
            _ => "📄",
        };
        let sha_short = &entry.sha[..7.min(entry.sha.len())];
        println!("  {} {} {}", marker, entry.name, sha_short.dimmed());
    }
    Ok(())
}

fn cmd_config(config: &StoreConfig, cmd: Option<ConfigCmd>) -> Result<()> {
    match cmd {
        Some(ConfigCmd::Init) => {
            let path = PathBuf::from(CONFIG_FILE);
            if path.exists() {
                return Err(anyhow!("{} already exists", CONFIG_FILE));
            }
            StoreConfig::default().save(&path)?;
            print_success(&format!("Wrote default configuration to {}", CONFIG_FILE));
        }
        Some(ConfigCmd::Show) | None => {
            let mut shown = config.clone();
            if shown.remote.token.is_some() {
                shown.remote.token = Some("********".to_string());
            }
            let text = toml::to_string_pretty(&shown)
                .map_err(|e| anyhow!("failed to render config: {}", e))?;
            print!("{}", text);
        }
    }
    Ok(())
}
