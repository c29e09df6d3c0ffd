//! Command line front end: `repotree remote <reference>` or `repotree local <dir>`, printing the tree as JSON.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};
use repotree_builder::{
    build_local_tree, build_remote_tree, BuildOptions, EngineConfig, FsDirectory, GithubClient,
    ProgressReporter, ProgressState, ResponseCache, TreeError, TreeSnapshot,
};

/// 每处理多少个文件输出一次进度
const PROGRESS_EVERY: u64 = 100;

#[derive(Debug, Parser)]
#[command(name = "repotree", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory name to skip with its subtree (repeatable); defaults to node_modules and .git
    #[arg(long = "exclude", global = true)]
    exclude: Vec<String>,

    /// Extra extension treated as text for inlining (repeatable)
    #[arg(long = "ext", global = true)]
    extensions: Vec<String>,

    /// Stop descending below this depth (root = 0)
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a GitHub repository, e.g. https://github.com/owner/repo/tree/main/src
    Remote {
        reference: String,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Walk a local directory
    Local { path: String },
}

impl Cli {
    fn build_options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();
        if !self.exclude.is_empty() {
            options = options.excluding(self.exclude.iter().cloned());
        }
        options.custom_extensions = self.extensions.clone();
        options.max_depth = self.max_depth;
        if let Command::Remote { token: Some(token), .. } = &self.command {
            options = options.with_token(token.clone());
        }
        options
    }
}

fn reporter() -> ProgressReporter {
    ProgressReporter::default().with_observer(Box::new(|s: &ProgressState| {
        if s.processed > 0 && s.processed % PROGRESS_EVERY == 0 {
            info!(
                "progress: {}/{} files ({:.0}%)",
                s.processed,
                s.total,
                s.ratio() * 100.0
            );
        }
    }))
}

async fn run(cli: &Cli, reporter: &ProgressReporter) -> Result<TreeSnapshot, TreeError> {
    let config = EngineConfig::from_env()?;
    let options = cli.build_options();
    match &cli.command {
        Command::Remote { reference, .. } => {
            let client = GithubClient::new(&config, options.token.clone())?;
            let cache = ResponseCache::new(config.cache_ttl);
            build_remote_tree(&client, &cache, &config, reference, &options, reporter).await
        }
        Command::Local { path } => {
            let root = FsDirectory::open(path).await?;
            build_local_tree(&root, &config, &options, reporter).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let reporter = reporter();
    let cancel = reporter.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    let snapshot = match run(&cli, &reporter).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    };
    match json {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to serialize tree: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_options() {
        let cli = Cli::try_parse_from([
            "repotree",
            "remote",
            "https://github.com/o/r",
            "--token",
            "abc",
            "--exclude",
            "target",
            "--exclude",
            "dist",
            "--ext",
            "nix",
            "--max-depth",
            "3",
        ])
        .unwrap();
        let options = cli.build_options();
        assert_eq!(options.token.as_deref(), Some("abc"));
        assert!(options.is_excluded("target"));
        assert!(options.is_excluded("dist"));
        assert!(!options.is_excluded("node_modules"));
        assert!(options.text_extensions().contains("nix"));
        assert_eq!(options.max_depth, Some(3));
    }

    #[test]
    fn test_local_defaults() {
        let cli = Cli::try_parse_from(["repotree", "local", "."]).unwrap();
        let options = cli.build_options();
        assert!(options.is_excluded("node_modules"));
        assert!(options.token.is_none());
        assert!(matches!(cli.command, Command::Local { ref path } if path == "."));
    }
}
