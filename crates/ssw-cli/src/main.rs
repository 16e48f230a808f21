use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand};
use ssw_core::{FsTree, GameGroup, HistoryRecord, OwnerTag, SaveSwitcher, SwitchOutcome};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;

use config::{AppConfig, DEFAULT_CONFIG};

#[derive(Parser, Debug)]
#[command(
    name = "ssw-cli",
    about = "Keep one save per user in shared emulator save folders",
    version
)]
struct Cli {
    /// Config file listing emulators and their save folders
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List discovered games with their active save and owner variants
    Scan(ScanArgs),
    /// Show what switching a game to an owner would find
    Preview(TargetArgs),
    /// Make an owner's save the active save
    Switch(SwitchArgs),
    /// Copy the active save into a folder
    Export(ExportArgs),
    /// Replace the active save with a file
    Import(ImportArgs),
    /// Print the owner tag for a display name
    Normalize { name: String },
    /// Show recorded operations
    History(HistoryArgs),
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    /// Print groups as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct TargetArgs {
    /// Game id as printed by `scan`
    #[arg(long)]
    game: String,
    /// Owner display name or tag
    #[arg(long)]
    target: String,
}

#[derive(ClapArgs, Debug)]
struct SwitchArgs {
    /// Game id as printed by `scan`
    #[arg(long)]
    game: String,
    /// Owner of the current active save
    #[arg(long)]
    source: Option<String>,
    /// Owner whose save becomes active
    #[arg(long)]
    target: String,
}

#[derive(ClapArgs, Debug)]
struct ExportArgs {
    #[arg(long)]
    game: String,
    /// Destination folder
    #[arg(long)]
    dest: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct ImportArgs {
    #[arg(long)]
    game: String,
    /// Save file to import
    #[arg(long)]
    file: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct HistoryArgs {
    /// Show only the last N records
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn main() {
    let filter = EnvFilter::try_from_env("SSW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd.unwrap_or(Cmd::Scan(ScanArgs { json: false })) {
        Cmd::Normalize { name } => cmd_normalize(&name),
        Cmd::Scan(a) => cmd_scan(&load(&cli.config), a),
        Cmd::Preview(a) => cmd_preview(&load(&cli.config), a),
        Cmd::Switch(a) => cmd_switch(&load(&cli.config), a),
        Cmd::Export(a) => cmd_export(&load(&cli.config), a),
        Cmd::Import(a) => cmd_import(&load(&cli.config), a),
        Cmd::History(a) => cmd_history(&load(&cli.config), a),
    }
}

fn load(path: &Path) -> AppConfig {
    AppConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(2);
    })
}

fn owner_tag(name: &str) -> String {
    match OwnerTag::normalize(name) {
        Some(t) => t.to_string(),
        None => {
            eprintln!("error: {:?} does not contain a usable owner name", name);
            std::process::exit(3);
        }
    }
}

fn find_game(cfg: &AppConfig, tree: &FsTree, id: &str) -> GameGroup<PathBuf> {
    let groups = ssw_core::scan(tree, &cfg.profiles());
    match groups.into_iter().find(|g| g.id() == id) {
        Some(g) => g,
        None => {
            eprintln!("game not found: {}", id);
            std::process::exit(3);
        }
    }
}

fn record(cfg: &AppConfig, rec: &HistoryRecord) {
    let path = cfg.history_path();
    let res = rec
        .to_json_line()
        .map_err(|e| e.to_string())
        .and_then(|line| {
            let mut f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| e.to_string())?;
            writeln!(f, "{}", line).map_err(|e| e.to_string())
        });
    if let Err(e) = res {
        tracing::warn!(path = %path.display(), error = %e, "could not write history");
    }
}

fn report(outcome: SwitchOutcome) {
    if outcome.succeeded {
        println!("{}", outcome.message);
    } else {
        eprintln!("error: {}", outcome.message);
        std::process::exit(1);
    }
}

fn cmd_normalize(name: &str) {
    println!("{}", owner_tag(name));
}

fn cmd_scan(cfg: &AppConfig, args: ScanArgs) {
    let groups = ssw_core::scan(&FsTree::new(), &cfg.profiles());
    if args.json {
        match serde_json::to_string_pretty(&groups) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(4);
            }
        }
        return;
    }
    for g in groups {
        let base = g
            .base_save
            .as_ref()
            .map(|s| format!("active {}", s.modified_label()))
            .unwrap_or_else(|| "no active save".to_string());
        let owners: Vec<String> = g
            .variant_saves
            .iter()
            .map(|(o, s)| format!("{} ({})", o, s.modified_label()))
            .collect();
        println!(
            "{}\t{} [{}]\t{}\t{}",
            g.id(),
            g.display_name(),
            g.emulator_name,
            base,
            owners.join(", ")
        );
    }
}

fn cmd_preview(cfg: &AppConfig, args: TargetArgs) {
    let tree = FsTree::new();
    let game = find_game(cfg, &tree, &args.game);
    let target = owner_tag(&args.target);
    match SaveSwitcher::new(&tree).preview(&game, &target) {
        Ok(p) => println!("{}", serde_json::to_string_pretty(&p).unwrap_or_default()),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_switch(cfg: &AppConfig, args: SwitchArgs) {
    let tree = FsTree::new();
    let game = find_game(cfg, &tree, &args.game);
    let source = args.source.as_deref().map(owner_tag);
    let target = owner_tag(&args.target);
    let started = Utc::now();
    let outcome = SaveSwitcher::new(&tree).switch_owner(&game, source.as_deref(), &target);
    record(cfg, &HistoryRecord::from_outcome(&game, source.as_deref(), &target, started, &outcome));
    report(outcome);
}

fn cmd_export(cfg: &AppConfig, args: ExportArgs) {
    let tree = FsTree::new();
    let game = find_game(cfg, &tree, &args.game);
    let started = Utc::now();
    let outcome = SaveSwitcher::new(&tree).export(&game, &args.dest);
    record(cfg, &HistoryRecord::from_outcome(&game, None, "export", started, &outcome));
    report(outcome);
}

fn cmd_import(cfg: &AppConfig, args: ImportArgs) {
    let tree = FsTree::new();
    let game = find_game(cfg, &tree, &args.game);
    let started = Utc::now();
    let outcome = SaveSwitcher::new(&tree).import(&game, &args.file);
    record(cfg, &HistoryRecord::from_outcome(&game, None, "import", started, &outcome));
    report(outcome);
}

fn cmd_history(cfg: &AppConfig, args: HistoryArgs) {
    let path = cfg.history_path();
    let f = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            eprintln!("error reading {}: {}", path.display(), e);
            std::process::exit(2);
        }
    };
    let records: Vec<HistoryRecord> = BufReader::new(f)
        .lines()
        .map_while(Result::ok)
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match serde_json::from_str(&l) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed history line");
                None
            }
        })
        .collect();
    let skip = records.len().saturating_sub(args.limit);
    for r in records.iter().skip(skip) {
        println!(
            "{}\t{}\t{}\t{} -> {}\t{:?}\t{}",
            r.started_at.format("%Y-%m-%d %H:%M:%S"),
            r.id,
            r.game_id,
            r.source_owner.as_deref().unwrap_or("-"),
            r.target_owner,
            r.status,
            r.message().unwrap_or("")
        );
    }
}
