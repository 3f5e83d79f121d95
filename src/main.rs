mod backend;
mod cfg;
mod fsutil;
mod patterns;
mod placeholder;
mod redact;
mod restore;
mod scan;
mod store;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;

use backend::mapping::MappingStore;
use backend::{BackendKind, BackendRegistry, ResolveOpts, Resolver};
use store::SecretStore;

/// Dotveil - keep secrets out of your dotfiles repository
#[derive(Parser)]
#[command(name = "dotveil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Working directory for config and stores (defaults to ~/.dotveil)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dotveil's working directory and config
    Init {
        /// Force initialization even if config exists
        #[arg(short, long)]
        force: bool,
    },

    /// Scan files or directories for likely secrets
    Scan {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Replace detected secrets with placeholders, in place
    Redact {
        /// Files or directories to redact
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Accept all suggested names without prompting
        #[arg(short, long)]
        yes: bool,

        /// Do not save detected values to the local secret store
        #[arg(long)]
        no_store: bool,
    },

    /// Replace placeholders with values from secret backends
    Restore {
        /// Files or directories to restore
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Fail if any placeholder cannot be resolved (for unattended use)
        #[arg(long)]
        strict: bool,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the local secret store
    #[command(subcommand)]
    Secret(SecretCommands),

    /// Manage placeholder-to-backend mappings
    #[command(subcommand)]
    Map(MapCommands),

    /// Show availability of all secret backends
    Backends,

    /// Run diagnostics and check system health
    Doctor,

    /// Edit or view configuration
    Config {
        /// Open config in editor
        #[arg(long)]
        edit: bool,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
enum SecretCommands {
    /// Store a secret value under a placeholder name
    Set {
        /// Placeholder name (coerced to A-Z, 0-9, _ if needed)
        name: String,

        /// Secret value (prompted for when omitted)
        #[arg(long)]
        value: Option<String>,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a secret from the local store
    Unset {
        /// Placeholder name
        name: String,
    },

    /// List stored secret names (never values)
    List,
}

#[derive(Subcommand)]
enum MapCommands {
    /// Map a placeholder name to a backend
    Set {
        /// Placeholder name
        name: String,

        /// Backend: local, onepassword, bitwarden, or pass
        backend: String,

        /// Backend-specific path (e.g. an op:// reference or a pass entry)
        #[arg(long)]
        path: Option<String>,
    },

    /// List all mappings
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ui::init(cli.verbose);

    let dir = cli.dir.unwrap_or_else(fsutil::default_dir);

    let result = match cli.command {
        Commands::Init { force } => cmd_init(dir, force).await,
        Commands::Scan { paths } => cmd_scan(dir, paths).await,
        Commands::Redact { paths, yes, no_store } => cmd_redact(dir, paths, yes, no_store).await,
        Commands::Restore { paths, strict, dry_run } => {
            cmd_restore(dir, paths, strict, dry_run).await
        }
        Commands::Secret(subcmd) => cmd_secret(dir, subcmd).await,
        Commands::Map(subcmd) => cmd_map(dir, subcmd).await,
        Commands::Backends => cmd_backends(dir).await,
        Commands::Doctor => cmd_doctor(dir).await,
        Commands::Config { edit, show } => cmd_config(dir, edit, show).await,
    };

    if let Err(e) = result {
        ui::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_init(dir: PathBuf, force: bool) -> Result<()> {
    ui::info("Initializing dotveil...");
    cfg::init(&dir, force)?;
    ui::success(&format!(
        "Dotveil initialized at {}",
        fsutil::display_path(&dir)
    ));
    ui::hint("Run 'dotveil scan <path>' to look for secrets in your dotfiles");
    Ok(())
}

fn expand_inputs(dir: &PathBuf, paths: &[PathBuf]) -> Result<(cfg::Config, Vec<PathBuf>)> {
    let config = cfg::load_or_default(dir)?;
    let expanded: Vec<PathBuf> = paths
        .iter()
        .map(|p| fsutil::expand_user_path(&p.to_string_lossy()))
        .collect();
    let files = scan::expand_paths(&expanded, &config.scan.exclude_patterns)?;
    Ok((config, files))
}

async fn cmd_scan(dir: PathBuf, paths: Vec<PathBuf>) -> Result<()> {
    let (_config, files) = expand_inputs(&dir, &paths)?;
    ui::info(&format!("Scanning {} files...", files.len()));

    let summary = scan::scan_files(&files);

    for report in summary.files.iter().filter(|r| !r.matches.is_empty()) {
        ui::section(&report.display_path);
        let rows = report
            .matches
            .iter()
            .map(|m| {
                let pattern = patterns::by_id(m.pattern_id)
                    .map(|p| p.display_name)
                    .unwrap_or(m.pattern_id);
                vec![
                    format!("{}:{}", m.line, m.column),
                    ui::severity_label(m.severity),
                    pattern.to_string(),
                    m.redacted_preview.clone(),
                    m.placeholder_suggestion.clone(),
                ]
            })
            .collect();
        ui::print_table(
            &["Location", "Severity", "Pattern", "Preview", "Suggested name"],
            rows,
        );
    }

    for skipped in &summary.skipped {
        ui::warn(&format!(
            "Skipped {}: {}",
            fsutil::display_path(&skipped.path),
            skipped.reason
        ));
    }

    if summary.is_clean() {
        ui::success(&format!(
            "No secrets detected in {} files",
            summary.files_scanned()
        ));
    } else {
        let counts = summary.severity_counts();
        let breakdown = counts
            .iter()
            .rev()
            .map(|(sev, n)| format!("{} {}", n, sev))
            .collect::<Vec<_>>()
            .join(", ");
        ui::warn(&format!(
            "Found {} potential secrets in {} files ({})",
            summary.total_matches(),
            summary.files_scanned(),
            breakdown
        ));
        ui::hint("Run 'dotveil redact <path>' to replace them with placeholders");
    }

    Ok(())
}

async fn cmd_redact(dir: PathBuf, paths: Vec<PathBuf>, yes: bool, no_store: bool) -> Result<()> {
    let (_config, files) = expand_inputs(&dir, &paths)?;

    let mut store = SecretStore::load(&dir)?;
    let mut total_replacements = 0;
    let mut files_changed = 0;
    let mut files_skipped = 0;

    for path in &files {
        let display = fsutil::display_path(path);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                ui::warn(&format!("Skipped {}: {}", display, e));
                files_skipped += 1;
                continue;
            }
        };

        let matches = scan::scan(&content);
        if matches.is_empty() {
            ui::debug(&format!("{}: clean", display));
            continue;
        }

        ui::section(&display);
        let rows = matches
            .iter()
            .map(|m| {
                vec![
                    format!("{}", m.line),
                    ui::severity_label(m.severity),
                    m.redacted_preview.clone(),
                    m.placeholder_suggestion.clone(),
                ]
            })
            .collect();
        ui::print_table(&["Line", "Severity", "Preview", "Name"], rows);

        // One name per distinct value; prompted unless --yes.
        let mut name_for_value: HashMap<String, String> = HashMap::new();
        for m in &matches {
            if name_for_value.contains_key(&m.value) {
                continue;
            }
            let name = if yes {
                m.placeholder_suggestion.clone()
            } else {
                let raw = ui::prompt_text(
                    &format!("Placeholder name for {}", m.redacted_preview),
                    Some(&m.placeholder_suggestion),
                );
                match placeholder::normalize_name(&raw) {
                    Some(name) => {
                        if name != raw {
                            ui::info(&format!("Using {}", name));
                        }
                        name
                    }
                    None => {
                        ui::warn(&format!(
                            "'{}' is not usable as a name; keeping {}",
                            raw, m.placeholder_suggestion
                        ));
                        m.placeholder_suggestion.clone()
                    }
                }
            };
            name_for_value.insert(m.value.clone(), name);
        }

        if !yes
            && !ui::prompt_confirm(
                &format!("Redact {} secrets in {}?", name_for_value.len(), display),
                true,
            )
        {
            ui::info("Skipped");
            continue;
        }

        if !no_store {
            for (value, name) in &name_for_value {
                store.set(
                    name,
                    value.clone(),
                    Some(format!("redacted from {}", display)),
                    None,
                )?;
            }
            // The values must be on disk before the rewrite destroys their
            // only other copy.
            store.save()?;
        }

        let result = redact::redact_file(path, &matches, &name_for_value)?;
        total_replacements += result.replacements.len();
        if result.changed() {
            files_changed += 1;
        }
        ui::success(&format!(
            "Redacted {} values in {}",
            result.replacements.len(),
            display
        ));
    }

    if !no_store && total_replacements > 0 {
        ui::debug(&format!(
            "Secret store updated at {}",
            fsutil::display_path(store.path())
        ));
    }

    if total_replacements == 0 {
        ui::success("Nothing to redact");
    } else {
        ui::success(&format!(
            "Done: {} values redacted across {} files ({} skipped)",
            total_replacements, files_changed, files_skipped
        ));
        if !no_store {
            ui::hint("Values were saved to the local store; restore with 'dotveil restore'");
        }
    }

    Ok(())
}

fn build_resolver(dir: &PathBuf, config: &cfg::Config) -> Result<Resolver> {
    let registry = BackendRegistry::new(dir, config);
    let mappings = MappingStore::load(dir)?;
    Ok(Resolver::new(
        registry,
        mappings,
        config.secrets.default_backend,
    ))
}

async fn cmd_restore(dir: PathBuf, paths: Vec<PathBuf>, strict: bool, dry_run: bool) -> Result<()> {
    let (config, files) = expand_inputs(&dir, &paths)?;
    let resolver = build_resolver(&dir, &config)?;
    let opts = ResolveOpts {
        fail_on_auth_required: strict,
    };

    if dry_run {
        let mut unresolved_total = 0;
        for path in &files {
            let display = fsutil::display_path(path);
            let preview = restore::preview_restoration(path, &resolver, opts).await?;
            if preview.changed() {
                ui::info(&format!(
                    "{}: {} placeholders would be restored",
                    display, preview.resolved_count
                ));
            } else {
                ui::debug(&format!("{}: no changes", display));
            }
            for name in &preview.unresolved {
                ui::warn(&format!("{}: unresolved {{{{{}}}}}", display, name));
                unresolved_total += 1;
            }
        }
        if strict && unresolved_total > 0 {
            bail!("{} placeholders could not be resolved", unresolved_total);
        }
        return Ok(());
    }

    let pb = ui::progress_bar(files.len() as u64, "Restoring...");
    let results = restore::restore_files(&files, &resolver, opts).await?;
    pb.finish_and_clear();

    let mut changed = 0;
    let mut resolved = 0;
    let mut unresolved: Vec<String> = Vec::new();
    let mut skipped = 0;

    for r in &results {
        if let Some(reason) = &r.skipped {
            ui::warn(&format!("Skipped {}: {}", r.display_path, reason));
            skipped += 1;
            continue;
        }
        if r.changed {
            changed += 1;
            ui::success(&format!(
                "{}: restored {} placeholders",
                r.display_path, r.resolved_count
            ));
        }
        resolved += r.resolved_count;
        for name in &r.unresolved {
            ui::warn(&format!("{}: unresolved {{{{{}}}}}", r.display_path, name));
            if !unresolved.contains(name) {
                unresolved.push(name.clone());
            }
        }
    }

    ui::info(&format!(
        "Restored {} placeholders in {} files ({} unresolved, {} skipped)",
        resolved,
        changed,
        unresolved.len(),
        skipped
    ));

    if !unresolved.is_empty() {
        if strict {
            bail!(
                "unresolved placeholders: {} (add them with 'dotveil secret set' or map a backend)",
                unresolved.join(", ")
            );
        }
        ui::hint("Check backend status with 'dotveil backends', or add values with 'dotveil secret set <NAME>'");
    }

    Ok(())
}

async fn cmd_secret(dir: PathBuf, subcmd: SecretCommands) -> Result<()> {
    match subcmd {
        SecretCommands::Set {
            name,
            value,
            description,
        } => {
            let mut store = SecretStore::load(&dir)?;
            let value = match value {
                Some(v) => v,
                None => ui::prompt_password(&format!("Value for {}", name)),
            };
            if value.is_empty() {
                bail!("Refusing to store an empty value");
            }

            let outcome = store.set(&name, value, None, description)?;
            if outcome.normalized {
                ui::info(&format!("Stored as {}", outcome.name));
            }
            store.save()?;
            ui::success(&format!("Secret {} saved to local store", outcome.name));
        }
        SecretCommands::Unset { name } => {
            let mut store = SecretStore::load(&dir)?;
            let name = placeholder::normalize_name(&name)
                .with_context(|| format!("'{}' is not a usable placeholder name", name))?;
            if store.unset(&name) {
                store.save()?;
                ui::success(&format!("Secret {} removed", name));
            } else {
                ui::warn(&format!("No secret named {}", name));
            }
        }
        SecretCommands::List => {
            let store = SecretStore::load(&dir)?;
            if store.is_empty() {
                ui::info("No secrets stored");
                ui::hint("Add one with: dotveil secret set <NAME>");
                return Ok(());
            }

            let rows = store
                .list()
                .into_iter()
                .map(|info| {
                    vec![
                        info.name,
                        info.added_at.format("%Y-%m-%d %H:%M").to_string(),
                        info.source_hint.unwrap_or_default(),
                        info.description.unwrap_or_default(),
                    ]
                })
                .collect();
            ui::print_table(&["Name", "Added", "Source", "Description"], rows);
            println!("\n  {}", "Values are never displayed.".dimmed());
        }
    }

    Ok(())
}

async fn cmd_map(dir: PathBuf, subcmd: MapCommands) -> Result<()> {
    match subcmd {
        MapCommands::Set {
            name,
            backend,
            path,
        } => {
            let kind: BackendKind = backend.parse()?;
            let mut mappings = MappingStore::load(&dir)?;
            let name = mappings.set_mapping(&name, kind, path)?;
            mappings.save()?;
            ui::success(&format!("{} will resolve from {}", name, kind));
        }
        MapCommands::List => {
            let mappings = MappingStore::load(&dir)?;
            let all = mappings.list_mappings();
            if all.is_empty() {
                ui::info("No mappings configured");
                ui::hint("Add one with: dotveil map set <NAME> <backend>");
                return Ok(());
            }

            let rows = all
                .into_iter()
                .map(|m| {
                    vec![
                        m.name,
                        m.backend.to_string(),
                        m.backend_path.unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            ui::print_table(&["Name", "Backend", "Path"], rows);
        }
    }

    Ok(())
}

async fn cmd_backends(dir: PathBuf) -> Result<()> {
    let config = cfg::load_or_default(&dir)?;
    let resolver = build_resolver(&dir, &config)?;

    let rows = resolver
        .backend_statuses()
        .await
        .into_iter()
        .map(|s| {
            let mark = |ok: bool| {
                if ok {
                    "✓".green().to_string()
                } else {
                    "✗".red().to_string()
                }
            };
            vec![
                s.kind.to_string(),
                s.display_name.to_string(),
                mark(s.available),
                mark(s.authenticated),
                if s.is_default { "yes".to_string() } else { String::new() },
            ]
        })
        .collect();

    ui::print_table(
        &["Backend", "Name", "Installed", "Ready", "Default"],
        rows,
    );
    Ok(())
}

async fn cmd_doctor(dir: PathBuf) -> Result<()> {
    ui::info("Running diagnostics...");

    let checks: Vec<(&str, Result<()>)> = vec![
        ("Config file exists", cfg::check_exists(&dir)),
        (
            "Secret store readable",
            SecretStore::load(&dir).map(|_| ()).map_err(Into::into),
        ),
        (
            "Mapping store readable",
            MappingStore::load(&dir).map(|_| ()).map_err(Into::into),
        ),
    ];

    let mut has_issues = false;
    for (check, result) in checks {
        match result {
            Ok(_) => ui::success(check),
            Err(e) => {
                has_issues = true;
                ui::error(&format!("{}: {:#}", check, e));
            }
        }
    }

    let config = cfg::load_or_default(&dir)?;
    let resolver = build_resolver(&dir, &config)?;
    for status in resolver.backend_statuses().await {
        if status.available && status.authenticated {
            ui::success(&format!("Backend {} ready", status.kind));
        } else if status.available {
            ui::warn(&format!("Backend {} installed but not ready", status.kind));
            if let Some(backend) = resolver.registry().get(status.kind) {
                ui::hint(backend.setup_instructions());
            }
        } else {
            ui::debug(&format!("Backend {} not installed", status.kind));
        }
    }

    if !has_issues {
        ui::success("All checks passed!");
    }

    Ok(())
}

async fn cmd_config(dir: PathBuf, edit: bool, show: bool) -> Result<()> {
    if edit {
        cfg::edit(&dir)?;
        ui::success("Configuration edited");
    } else if show {
        let config = cfg::load(&dir)?;
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        ui::hint("Use --edit to modify or --show to view the configuration");
    }

    Ok(())
}
