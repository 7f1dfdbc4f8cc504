use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graph::{EditStore, GitWalker, Relation, TreeBuilder, TreeConfig, TreeSnapshot};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "gitree")]
#[command(about = "Lay out a Git history as a tree of branches", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the laid out commit tree
    Tree {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Branch, tag or commit the main branch runs through
        #[arg(short, long)]
        start: Option<String>,
        /// Load at most this many commits
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
        /// Only ever continue a branch through the first parent
        #[arg(long)]
        trust_parent0: bool,
        /// Configuration file (defaults to <git dir>/gitree.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also print every merge rule that fired
        #[arg(long)]
        rules: bool,
    },
    /// Manage join-parent overrides
    Edits {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        #[command(subcommand)]
        command: EditCommands,
    },
    /// Show history statistics
    Stats {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum EditCommands {
    /// List overrides in effect
    List,
    /// Make parent INDEX the one continuing COMMIT's branch
    Set {
        /// Commit id or unique prefix
        commit: String,
        /// Position in the commit's parent list
        index: usize,
    },
    /// Drop the override for a commit
    Remove {
        /// Commit id or unique prefix
        commit: String,
    },
    /// Drop every override
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tree {
            path,
            start,
            limit,
            json,
            trust_parent0,
            config,
            rules,
        } => {
            let walker = open(&path)?;
            let mut tree_config = match config {
                Some(file) => TreeConfig::load(&file)
                    .with_context(|| format!("Failed to read config {}", file.display()))?,
                None => TreeConfig::load_for_repo(walker.git_dir())
                    .context("Failed to read repository config")?,
            };
            if trust_parent0 {
                tree_config.trust_parent0_only = true;
            }

            let mut dag = walker
                .into_dag(limit.or(tree_config.max_commits))
                .context("Failed to load history")?;
            if dag.is_empty() {
                println!("No commits");
                return Ok(());
            }

            let refs = walker.ref_index()?;
            let (edits, source) = EditStore::for_repo(walker.git_dir(), walker.workdir()).load();
            if let Some(source) = source {
                tracing::info!(?source, entries = edits.len(), "using edit list");
            }

            let builder = TreeBuilder::new(tree_config);
            tracing::debug!(config = ?builder.config(), "resolved configuration");
            let start = builder
                .resolve_start(&dag, &refs, start.as_deref())
                .context("Could not pick a start commit, pass one with --start")?;
            let snapshot = builder.generate(&mut dag, &edits, start)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_tree(&snapshot);
                if rules {
                    print_rules(&snapshot);
                }
            }
        }
        Commands::Edits { path, command } => {
            let walker = open(&path)?;
            let store = EditStore::for_repo(walker.git_dir(), walker.workdir());
            let (mut edits, source) = store.load();

            match command {
                EditCommands::List => {
                    if edits.is_empty() {
                        println!("No edits");
                    } else {
                        if let Some(source) = source {
                            println!("From {:?}:", source);
                        }
                        for (commit, index) in edits.iter() {
                            println!("  {} = {}", commit, index);
                        }
                    }
                    return Ok(());
                }
                EditCommands::Set { commit, index } => {
                    let dag = walker.into_dag(None)?;
                    let node = dag.node(dag.find_prefix(&commit)?);
                    if index >= node.parents().len() {
                        bail!(
                            "Commit {} has {} parent(s), index {} is out of range",
                            node.short_id(),
                            node.parents().len(),
                            index
                        );
                    }
                    edits.set(node.id.clone(), index);
                    println!("Set {} = {}", node.short_id(), index);
                }
                EditCommands::Remove { commit } => {
                    let dag = walker.into_dag(None)?;
                    let id = dag.node(dag.find_prefix(&commit)?).id.clone();
                    match edits.remove(&id) {
                        Some(index) => println!("Removed {} = {}", &id[..id.len().min(8)], index),
                        None => println!("No edit for {}", commit),
                    }
                }
                EditCommands::Clear => {
                    println!("Cleared {} edit(s)", edits.len());
                    edits.clear();
                }
            }

            store.save(&edits).context("Failed to save edit list")?;
        }
        Commands::Stats { path } => {
            let walker = open(&path)?;
            let dag = walker.into_dag(None)?;
            let stats = dag.stats();

            println!("Commits:      {}", stats.total_commits);
            println!("Edges:        {}", stats.total_edges);
            println!("Merges:       {}", stats.merge_commits);
            println!("Roots:        {}", stats.root_commits);
            println!("Leaves:       {}", stats.leaf_commits);
            println!("Generations:  {}", stats.max_generation + 1);
            if stats.has_orphans {
                println!("History has disconnected components");
            }
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<GitWalker> {
    GitWalker::new(Some(path))
        .with_context(|| format!("Failed to open repository at {}", path.display()))
}

/// One line per commit, newest at the bottom, with a marker in its column
fn print_tree(snapshot: &TreeSnapshot) {
    for commit in snapshot.rows() {
        let x = commit.x.unwrap_or(0);
        let lanes: String = (0..snapshot.width)
            .map(|i| if i == x { "* " } else { "  " })
            .collect();

        let mut names: Vec<&str> = commit.branch_names.iter().map(String::as_str).collect();
        names.extend(commit.tags.iter().map(String::as_str));
        let decoration = if names.is_empty() {
            String::new()
        } else {
            format!("({}) ", names.join(", "))
        };

        let merged: Vec<&str> = commit
            .parents
            .iter()
            .filter(|p| p.relation == Relation::MergeIn)
            .map(|p| &p.id[..p.id.len().min(8)])
            .collect();
        let merges = if merged.is_empty() {
            String::new()
        } else {
            format!(" <- {}", merged.join(" "))
        };

        println!(
            "{}{} {} {}{}{}",
            lanes,
            &commit.id[..commit.id.len().min(8)],
            commit.timestamp.format("%Y-%m-%d"),
            decoration,
            commit.message,
            merges
        );
    }

    if !snapshot.unplaced.is_empty() {
        println!("\n{} branch(es) could not be placed", snapshot.unplaced.len());
    }
}

fn print_rules(snapshot: &TreeSnapshot) {
    println!(
        "\n{} rule application(s) in {} iteration(s){}",
        snapshot.rules.len(),
        snapshot.iterations,
        if snapshot.converged { "" } else { ", stopped early" }
    );
    for applied in &snapshot.rules {
        println!(
            "  {:>4}  {:<20} {}",
            applied.iteration,
            applied.rule,
            &applied.commit[..applied.commit.len().min(8)]
        );
    }
}
