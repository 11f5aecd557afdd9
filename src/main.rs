mod dashboard;
mod learner;
mod models;
mod prefs;
mod ranker;
mod scoring;
mod sources;
mod store;
mod tags;
mod tui;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use dashboard::Dashboard;
use prefs::{Factor, PreferenceEdit, Preferences, Sector};
use sources::{SourceConfig, SourceKind};
use std::collections::BTreeSet;
use std::path::PathBuf;
use store::Store;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Personal job discovery - fetch, rank, and learn from your feedback")]
struct Cli {
    /// Path to the data store (defaults to the user data directory)
    #[arg(long, global = true, env = "JOBSCOUT_DB")]
    db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all enabled sources and rank the results
    Search {
        /// Search terms
        query: String,

        /// Location filter passed to each source
        #[arg(short, long, default_value = "")]
        location: String,

        /// Number of postings to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Re-rank the current results with the current preferences
    Rank {
        /// Number of postings to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show a posting with its score breakdown
    Show {
        /// Posting ID
        id: String,

        /// Source name, when the ID exists in several sources
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Like a posting and learn from it
    Like(FeedbackArgs),

    /// Dislike a posting and learn from it
    Dislike(FeedbackArgs),

    /// Save a posting for later
    Save {
        /// Posting ID
        id: String,

        #[arg(short, long)]
        source: Option<String>,
    },

    /// Remove a saved posting
    Unsave {
        /// Posting ID
        id: String,

        #[arg(short, long)]
        source: Option<String>,
    },

    /// List saved postings
    Saved,

    /// Show the feedback log
    Log {
        /// Number of most recent events to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Browse ranked results interactively
    Browse,

    /// Manage preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Manage job sources
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
}

#[derive(Args)]
struct FeedbackArgs {
    /// Posting ID
    id: String,

    /// Source name, when the ID exists in several sources
    #[arg(short, long)]
    source: Option<String>,

    /// Free-text notes (e.g. "salary too low", "love the remote setup")
    #[arg(short, long, default_value = "")]
    notes: String,

    /// Tags to learn from instead of the posting's own tags (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show the current preferences
    Show,

    /// Change any subset of preferences (list values are comma-separated)
    Set(PrefsSetArgs),

    /// Restore the default preferences
    Reset,
}

#[derive(Args)]
struct PrefsSetArgs {
    #[arg(long, value_delimiter = ',')]
    keywords: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    blocked: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    locations: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    exclude_locations: Option<Vec<String>>,

    /// Minimum salary; 0 clears it
    #[arg(long)]
    min_salary: Option<i64>,

    #[arg(long, value_delimiter = ',')]
    work_types: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    industries: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',')]
    seniority: Option<Vec<String>>,

    #[arg(long, action = clap::ArgAction::Set)]
    remote_only: Option<bool>,

    #[arg(long, action = clap::ArgAction::Set)]
    academia: Option<bool>,

    #[arg(long, action = clap::ArgAction::Set)]
    consulting: Option<bool>,

    #[arg(long, action = clap::ArgAction::Set)]
    public_sector: Option<bool>,

    #[arg(long, action = clap::ArgAction::Set)]
    private_sector: Option<bool>,

    /// Factor weight as name=value, e.g. --weight recency=1.2 (repeatable)
    #[arg(long = "weight", value_parser = parse_weight)]
    weights: Vec<(Factor, f64)>,
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List configured sources
    List,

    /// Add a source backed by a local JSON file of postings
    AddFile {
        name: String,
        path: PathBuf,
    },

    /// Add a source backed by an HTTP endpoint returning JSON postings
    AddFeed {
        name: String,
        url: String,

        /// Request timeout in seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },

    /// Enable a source
    Enable { name: String },

    /// Disable a source
    Disable { name: String },

    /// Remove a source
    Remove { name: String },
}

fn parse_weight(s: &str) -> Result<(Factor, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let factor = Factor::parse(name.trim()).ok_or_else(|| {
        let known: Vec<&str> = Factor::ALL.iter().map(|f| f.name()).collect();
        format!("unknown factor '{}'. Available: {}", name, known.join(", "))
    })?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid weight '{}': {}", value, e))?;
    Ok((factor, value))
}

impl PrefsSetArgs {
    fn into_edit(self) -> PreferenceEdit {
        // `--locations ""` clears a list rather than storing an empty term
        let to_list = |v: Vec<String>| {
            v.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        };
        let to_set = |v: Vec<String>| to_list(v).into_iter().collect::<BTreeSet<_>>();

        let sectors = [
            (Sector::Academia, self.academia),
            (Sector::Consulting, self.consulting),
            (Sector::PublicSector, self.public_sector),
            (Sector::PrivateSector, self.private_sector),
        ]
        .into_iter()
        .filter_map(|(sector, value)| value.map(|v| (sector, v)))
        .collect();

        PreferenceEdit {
            keywords: self.keywords.map(to_list),
            blocked_keywords: self.blocked.map(to_list),
            locations: self.locations.map(to_list),
            excluded_locations: self.exclude_locations.map(to_list),
            min_salary: self.min_salary.map(|v| (v > 0).then_some(v)),
            work_types: self.work_types.map(to_set),
            industries: self.industries.map(to_set),
            seniority: self.seniority.map(to_set),
            remote_only: self.remote_only,
            sectors,
            weights: self.weights,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "jobscout=warn",
        1 => "jobscout=info",
        _ => "jobscout=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = Store::open(cli.db.as_deref())?;
    tracing::debug!(path = %store.path().display(), "store opened");
    let mut dash = Dashboard::load(store);

    match cli.command {
        Commands::Search {
            query,
            location,
            limit,
        } => {
            let enabled = dash.sources().iter().filter(|s| s.enabled).count();
            if enabled == 0 {
                println!("No enabled sources. Add one with 'jobscout sources add-file' or 'add-feed'.");
                return Ok(());
            }
            println!("Searching {} source(s) for '{}'...", enabled, query);
            let count = dash.search(&query, &location).await?;
            println!("Found {} posting(s).\n", count);
            print_ranked(&dash, limit);
        }

        Commands::Rank { limit } => {
            print_ranked(&dash, limit);
        }

        Commands::Show { id, source } => {
            let job = match dash.find(&id, source.as_deref()) {
                Ok(job) => job,
                Err(e) => {
                    println!("{}", e);
                    return Ok(());
                }
            };
            let mut tagged = job;
            tags::ensure_tags(&mut tagged);

            println!("{} [{}:{}]", tagged.title, tagged.source, tagged.id);
            println!("Company: {}", tagged.company);
            if !tagged.location.is_empty() {
                println!("Location: {}", tagged.location);
            }
            if let Some(date) = tagged.posted_at {
                println!("Posted: {}", date);
            }
            match (tagged.salary_min, tagged.salary_max) {
                (Some(min), Some(max)) => println!("Pay: ${} - ${}", min, max),
                (Some(min), None) => println!("Pay: ${}+", min),
                (None, Some(max)) => println!("Pay: up to ${}", max),
                (None, None) => {}
            }
            if let Some(work_type) = &tagged.work_type {
                println!("Work type: {}", work_type);
            }
            if let Some(seniority) = &tagged.seniority {
                println!("Seniority: {}", seniority);
            }
            if tagged.is_remote_or_hybrid() {
                let mode = if tagged.remote.unwrap_or(false) { "remote" } else { "hybrid" };
                println!("Mode: {}", mode);
            }
            if !tagged.url.is_empty() {
                println!("URL: {}", tagged.url);
            }
            if !tagged.tag_list().is_empty() {
                println!("Tags: {}", tagged.tag_list().join(", "));
            }

            let today = chrono::Local::now().date_naive();
            let breakdown = scoring::breakdown_on(&tagged, dash.prefs(), today);
            println!("\nScore: {:.2}", breakdown.total());
            for (factor, value) in &breakdown.parts {
                if *value != 0.0 {
                    println!("  {:<16} {:+.2}", factor.name(), value);
                }
            }

            if let Some(text) = &tagged.description {
                println!("\n--- Description ---\n{}", textwrap::fill(text, 80));
            }
        }

        Commands::Like(args) => record_feedback(&mut dash, args, true)?,

        Commands::Dislike(args) => record_feedback(&mut dash, args, false)?,

        Commands::Save { id, source } => match dash.find(&id, source.as_deref()) {
            Ok(job) => {
                if dash.save_posting(&job)? {
                    println!("Saved '{}'.", job.title);
                } else {
                    println!("'{}' is already saved.", job.title);
                }
            }
            Err(e) => println!("{}", e),
        },

        Commands::Unsave { id, source } => {
            if dash.unsave_posting(&id, source.as_deref())? {
                println!("Removed '{}' from saved postings.", id);
            } else {
                println!("Posting '{}' is not saved.", id);
            }
        }

        Commands::Saved => {
            let saved = dash.saved();
            if saved.is_empty() {
                println!("No saved postings.");
            } else {
                println!("{:<12} {:<12} {:<34} {:<22}", "ID", "SOURCE", "TITLE", "COMPANY");
                println!("{}", "-".repeat(82));
                for job in saved {
                    println!(
                        "{:<12} {:<12} {:<34} {:<22}",
                        truncate(&job.id, 10),
                        truncate(&job.source, 10),
                        truncate(&job.title, 32),
                        truncate(&job.company, 20)
                    );
                }
            }
        }

        Commands::Log { limit } => {
            let log = dash.feedback_log();
            if log.is_empty() {
                println!("No feedback yet.");
            } else {
                println!("{:<17} {:<8} {:<30} {:<30}", "WHEN", "VERDICT", "TITLE", "NOTES");
                println!("{}", "-".repeat(86));
                for event in log.iter().rev().take(limit) {
                    println!(
                        "{:<17} {:<8} {:<30} {:<30}",
                        event
                            .timestamp
                            .with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M")
                            .to_string(),
                        if event.liked { "like" } else { "dislike" },
                        truncate(&event.title, 28),
                        truncate(&event.notes, 28)
                    );
                }
            }
        }

        Commands::Browse => tui::run_browse(&mut dash)?,

        Commands::Prefs { command } => match command {
            PrefsCommands::Show => print_prefs(dash.prefs()),

            PrefsCommands::Set(args) => {
                let edit = args.into_edit();
                if edit.is_empty() {
                    println!("Nothing to change. See 'jobscout prefs set --help'.");
                } else {
                    dash.edit_preferences(edit)?;
                    println!("Preferences updated.\n");
                    print_prefs(dash.prefs());
                }
            }

            PrefsCommands::Reset => {
                dash.replace_preferences(Preferences::default())?;
                println!("Preferences reset to defaults.");
            }
        },

        Commands::Sources { command } => {
            let mut configs = dash.sources();
            match command {
                SourceCommands::List => {
                    if configs.is_empty() {
                        println!("No sources configured.");
                    } else {
                        println!("{:<16} {:<8} {:<6} {:<50}", "NAME", "ENABLED", "TYPE", "LOCATION");
                        println!("{}", "-".repeat(82));
                        for config in &configs {
                            let (kind, target) = match &config.kind {
                                SourceKind::File { path } => ("file", path.display().to_string()),
                                SourceKind::Feed { url, .. } => ("feed", url.clone()),
                            };
                            println!(
                                "{:<16} {:<8} {:<6} {:<50}",
                                truncate(&config.name, 14),
                                if config.enabled { "yes" } else { "no" },
                                kind,
                                truncate(&target, 48)
                            );
                        }
                    }
                }

                SourceCommands::AddFile { name, path } => {
                    let path = std::fs::canonicalize(&path).unwrap_or(path);
                    add_source(&dash, &mut configs, name, SourceKind::File { path })?;
                }

                SourceCommands::AddFeed { name, url, timeout } => {
                    add_source(
                        &dash,
                        &mut configs,
                        name,
                        SourceKind::Feed {
                            url,
                            timeout_secs: timeout,
                        },
                    )?;
                }

                SourceCommands::Enable { name } => {
                    if sources::set_enabled(&mut configs, &name, true) {
                        dash.set_sources(&configs)?;
                        println!("Enabled '{}'.", name);
                    } else {
                        println!("Source '{}' not found.", name);
                    }
                }

                SourceCommands::Disable { name } => {
                    if sources::set_enabled(&mut configs, &name, false) {
                        dash.set_sources(&configs)?;
                        println!("Disabled '{}'.", name);
                    } else {
                        println!("Source '{}' not found.", name);
                    }
                }

                SourceCommands::Remove { name } => {
                    let before = configs.len();
                    configs.retain(|c| !c.name.eq_ignore_ascii_case(&name));
                    if configs.len() == before {
                        println!("Source '{}' not found.", name);
                    } else {
                        dash.set_sources(&configs)?;
                        println!("Removed '{}'.", name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn record_feedback(dash: &mut Dashboard, args: FeedbackArgs, liked: bool) -> Result<()> {
    let job = match dash.find(&args.id, args.source.as_deref()) {
        Ok(job) => job,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    let mut tagged = job;
    tags::ensure_tags(&mut tagged);

    let before = dash.prefs().clone();
    dash.submit_feedback(&tagged, liked, &args.notes, &args.tags)?;
    let after = dash.prefs();

    println!(
        "{} '{}'.",
        if liked { "Liked" } else { "Disliked" },
        tagged.title
    );
    for factor in Factor::ALL {
        let (old, new) = (before.weights.get(factor), after.weights.get(factor));
        if old != new {
            println!("  {:<16} {:.2} -> {:.2}", factor.name(), old, new);
        }
    }
    let learned: Vec<&String> = if liked {
        after.keywords.iter().filter(|k| !before.keywords.contains(k)).collect()
    } else {
        after
            .blocked_keywords
            .iter()
            .filter(|k| !before.blocked_keywords.contains(k))
            .collect()
    };
    if !learned.is_empty() {
        let list = if liked { "keywords" } else { "blocked keywords" };
        let names: Vec<&str> = learned.iter().map(|s| s.as_str()).collect();
        println!("  added to {}: {}", list, names.join(", "));
    }
    Ok(())
}

fn add_source(
    dash: &Dashboard,
    configs: &mut Vec<SourceConfig>,
    name: String,
    kind: SourceKind,
) -> Result<()> {
    if configs.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
        return Err(anyhow!("A source named '{}' already exists", name));
    }
    let config = SourceConfig {
        name: name.clone(),
        enabled: true,
        kind,
    };
    // Fail early on configs that cannot produce an adapter
    config.build()?;
    configs.push(config);
    dash.set_sources(configs)?;
    println!("Added source '{}'.", name);
    Ok(())
}

fn print_ranked(dash: &Dashboard, limit: usize) {
    let ranked = dash.ranked();
    if ranked.is_empty() {
        println!("No postings to rank.");
        return;
    }
    println!(
        "{:<5} {:<12} {:<10} {:<30} {:<20} {:>7}",
        "RANK", "ID", "SOURCE", "TITLE", "COMPANY", "SCORE"
    );
    println!("{}", "-".repeat(89));
    for (i, scored) in ranked.iter().take(limit).enumerate() {
        let job = &scored.posting;
        println!(
            "{:<5} {:<12} {:<10} {:<30} {:<20} {:>7.2}",
            i + 1,
            truncate(&job.id, 10),
            truncate(&job.source, 8),
            truncate(&job.title, 28),
            truncate(&job.company, 18),
            scored.score
        );
    }
    if ranked.len() > limit {
        println!("... and {} more", ranked.len() - limit);
    }
}

fn print_prefs(prefs: &Preferences) {
    println!("Keywords:           {}", join_or_dash(&prefs.keywords));
    println!("Blocked keywords:   {}", join_or_dash(&prefs.blocked_keywords));
    println!("Locations:          {}", join_or_dash(&prefs.locations));
    println!("Excluded locations: {}", join_or_dash(&prefs.excluded_locations));
    match prefs.min_salary {
        Some(min) => println!("Minimum salary:     ${}", min),
        None => println!("Minimum salary:     -"),
    }
    println!("Work types:         {}", join_or_dash(&prefs.work_types));
    println!("Industries:         {}", join_or_dash(&prefs.industries));
    println!("Seniority:          {}", join_or_dash(&prefs.seniority));
    println!("Remote only:        {}", prefs.remote_only);
    println!(
        "Sectors:            academia={} consulting={} public={} private={}",
        prefs.sector(Sector::Academia),
        prefs.sector(Sector::Consulting),
        prefs.sector(Sector::PublicSector),
        prefs.sector(Sector::PrivateSector)
    );
    println!("\nWeights:");
    for factor in Factor::ALL {
        println!("  {:<16} {:+.2}", factor.name(), prefs.weights.get(factor));
    }
}

fn join_or_dash<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let v: Vec<&str> = items.into_iter().map(|s| s.as_str()).collect();
    if v.is_empty() { "-".to_string() } else { v.join(", ") }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("recency=1.5").unwrap(), (Factor::Recency, 1.5));
        assert_eq!(
            parse_weight("negativeKeyword = -2").unwrap(),
            (Factor::NegativeKeyword, -2.0)
        );
        assert!(parse_weight("recency").is_err());
        assert!(parse_weight("luck=1").is_err());
        assert!(parse_weight("salary=lots").is_err());
    }

    #[test]
    fn test_prefs_set_args_into_edit() {
        let cli = Cli::try_parse_from([
            "jobscout",
            "prefs",
            "set",
            "--keywords",
            "economics, climate",
            "--min-salary",
            "0",
            "--consulting",
            "false",
            "--weight",
            "remote=1.1",
        ])
        .unwrap();
        let Commands::Prefs {
            command: PrefsCommands::Set(args),
        } = cli.command
        else {
            panic!("expected prefs set");
        };
        let edit = args.into_edit();
        assert_eq!(
            edit.keywords,
            Some(vec!["economics".to_string(), "climate".to_string()])
        );
        assert_eq!(edit.min_salary, Some(None));
        assert_eq!(edit.sectors, vec![(Sector::Consulting, false)]);
        assert_eq!(edit.weights, vec![(Factor::Remote, 1.1)]);
        assert!(edit.locations.is_none());
    }

    #[test]
    fn test_empty_list_values_clear_the_list() {
        let cli = Cli::try_parse_from([
            "jobscout",
            "prefs",
            "set",
            "--locations",
            "",
            "--industries",
            " , health,",
            "--exclude-locations",
            "",
        ])
        .unwrap();
        let Commands::Prefs {
            command: PrefsCommands::Set(args),
        } = cli.command
        else {
            panic!("expected prefs set");
        };
        let edit = args.into_edit();
        assert_eq!(edit.locations, Some(Vec::new()));
        assert_eq!(edit.excluded_locations, Some(Vec::new()));
        assert_eq!(edit.industries, Some(BTreeSet::from(["health".to_string()])));

        let prefs = Preferences::default().with_edit(edit);
        assert!(prefs.locations.is_empty());
    }

    #[test]
    fn test_feedback_args_collect_repeated_tags() {
        let cli = Cli::try_parse_from([
            "jobscout", "like", "42", "--tag", "policy", "--tag", "climate", "-n", "great pay",
        ])
        .unwrap();
        let Commands::Like(args) = cli.command else {
            panic!("expected like");
        };
        assert_eq!(args.id, "42");
        assert_eq!(args.tags, vec!["policy".to_string(), "climate".to_string()]);
        assert_eq!(args.notes, "great pay");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }
}
