use anyhow::{Context, Result};
use cap_core::{FsRemote, RefRelation, Repository};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Cap - a minimal single-file version control tool
#[derive(Parser)]
#[command(name = "cap")]
#[command(about = "Track one file, sync with another repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Working directory containing the repository (defaults to .)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository in the working directory
    Create,

    /// Snapshot the tracked file as a new commit
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Bootstrap a new repository from an existing one
    Clone {
        /// Working directory of the source repository
        source: PathBuf,

        /// Destination directory for the new repository
        dest: PathBuf,
    },

    /// Fetch new commits from a remote and fast-forward
    Pull {
        /// Remote name or path (defaults to origin)
        remote: Option<String>,
    },

    /// Send new commits to a remote and advance its branch
    Push {
        /// Remote name or path (defaults to origin)
        remote: Option<String>,
    },

    /// Show changes between the tracked file and the branch tip
    Diff,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let dir = cli.dir.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Create => cmd_create(&dir),
        Commands::Commit { message } => cmd_commit(&dir, &message),
        Commands::Clone { source, dest } => cmd_clone(&source, &dest),
        Commands::Pull { remote } => cmd_pull(&dir, remote.as_deref()),
        Commands::Push { remote } => cmd_push(&dir, remote.as_deref()),
        Commands::Diff => cmd_diff(&dir),
    }
}

fn open_repo(dir: &Path) -> Result<Repository> {
    Repository::open(dir)
        .with_context(|| format!("Failed to open repository at {}", dir.display()))
}

/// Resolve a remote argument to a (tracking name, path) pair: a name
/// recorded in the config wins, otherwise the argument is taken as a path
/// and tracked under origin.
fn resolve_remote(repo: &Repository, arg: Option<&str>) -> Result<(String, PathBuf)> {
    let arg = arg.unwrap_or(cap_core::DEFAULT_REMOTE);

    if let Some(path) = repo.remote_path(arg)? {
        return Ok((arg.to_string(), path));
    }

    let path = PathBuf::from(arg);
    if path.join(cap_core::REPO_DIR).is_dir() {
        return Ok((cap_core::DEFAULT_REMOTE.to_string(), path));
    }

    anyhow::bail!(
        "Unknown remote: {} (not a configured name, and no repository at that path)",
        arg
    )
}

fn cmd_create(dir: &Path) -> Result<()> {
    Repository::init(dir)
        .with_context(|| format!("Failed to initialize repository at {}", dir.display()))?;

    println!("Initialized empty repository in {}", dir.join(cap_core::REPO_DIR).display());
    Ok(())
}

fn cmd_commit(dir: &Path, message: &str) -> Result<()> {
    let repo = open_repo(dir)?;
    let hash = repo
        .commit_file(message)
        .with_context(|| format!("Failed to commit {}", cap_core::TRACKED_FILE))?;

    println!("{} {}", repo.refs().head()?, hash);
    Ok(())
}

fn cmd_clone(source: &Path, dest: &Path) -> Result<()> {
    let remote = FsRemote::open(source)
        .with_context(|| format!("Failed to open remote at {}", source.display()))?;

    let repo = cap_core::clone_repository(&remote, dest, cap_core::DEFAULT_REMOTE)
        .with_context(|| format!("Failed to clone into {}", dest.display()))?;

    let origin = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    repo.record_remote(cap_core::DEFAULT_REMOTE, &origin)?;

    println!(
        "Cloned {} into {}",
        source.display(),
        dest.display()
    );
    Ok(())
}

fn cmd_pull(dir: &Path, remote_arg: Option<&str>) -> Result<()> {
    let repo = open_repo(dir)?;
    let (name, path) = resolve_remote(&repo, remote_arg)?;
    let remote = FsRemote::open(&path)
        .with_context(|| format!("Failed to open remote at {}", path.display()))?;

    let report = cap_core::pull(&repo, &remote, &name)
        .with_context(|| format!("Failed to pull from {}", name))?;

    match report.relation {
        RefRelation::Equal => println!("Already up to date"),
        RefRelation::Ahead => println!("Local branch is ahead of {}; nothing to pull", name),
        RefRelation::Behind => {
            // Bring the working file up to the new tip.
            repo.checkout_file()?;
            println!(
                "Fast-forwarded ({} objects fetched)",
                report.objects_transferred
            );
        }
        RefRelation::Diverged => unreachable!("divergence is reported as an error"),
    }
    Ok(())
}

fn cmd_push(dir: &Path, remote_arg: Option<&str>) -> Result<()> {
    let repo = open_repo(dir)?;
    let (name, path) = resolve_remote(&repo, remote_arg)?;
    let remote = FsRemote::open(&path)
        .with_context(|| format!("Failed to open remote at {}", path.display()))?;

    let report = cap_core::push(&repo, &remote, &name)
        .with_context(|| format!("Failed to push to {}", name))?;

    match report.relation {
        RefRelation::Equal => println!("Already up to date"),
        RefRelation::Behind => println!("Local branch is behind {}; pull first", name),
        RefRelation::Ahead => println!(
            "Pushed ({} objects sent)",
            report.objects_transferred
        ),
        RefRelation::Diverged => unreachable!("divergence is reported as an error"),
    }
    Ok(())
}

fn cmd_diff(dir: &Path) -> Result<()> {
    let repo = open_repo(dir)?;

    let branch = repo.refs().head()?;
    let Some(tip) = repo.refs().read_branch(&branch)? else {
        anyhow::bail!("No commits yet on {}", branch);
    };
    let commit = repo.get_commit(&tip)?;
    let snapshot = repo.get_blob(&commit.root)?;

    // The committed snapshot goes to a scratch file so the external diff
    // utility can compare it with the working file.
    let mut scratch = tempfile::NamedTempFile::new()?;
    scratch.write_all(&snapshot)?;
    scratch.flush()?;

    let tracked = repo.tracked_file_path();
    let output = Command::new("diff")
        .arg("-u")
        .arg(scratch.path())
        .arg(&tracked)
        .output()
        .context("Failed to run the diff utility")?;

    // diff exits 0 when identical, 1 when the files differ.
    match output.status.code() {
        Some(0) => println!("No changes since {}", tip),
        Some(1) => {
            std::io::stdout().write_all(&output.stdout)?;
        }
        _ => anyhow::bail!(
            "diff failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    }
    Ok(())
}
