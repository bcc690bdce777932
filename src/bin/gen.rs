//! pacrule-gen: CLI tool for generating PAC scripts and checking routing decisions.

use clap::{Parser, Subcommand, ValueEnum};
use pacrule::{DecisionEngine, Mode, RuleListFetcher, StoredConfig};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pacrule-gen")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Generate PAC scripts from proxy routing rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the PAC script for a stored configuration
    Pac {
        /// Config file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the routing decision for each host
    Decide {
        /// Config file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Hostnames to evaluate
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Download a rule list and optionally store it in a config file
    Fetch {
        /// Rule list URL (http or https, optionally gzip compressed)
        #[arg(short, long)]
        url: String,

        /// Which list the rules belong to
        #[arg(short, long, value_enum, default_value_t = ListArg::Whitelist)]
        list: ListArg,

        /// Config file to update with the fetched rules
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    Whitelist,
    Blacklist,
}

impl From<ListArg> for Mode {
    fn from(list: ListArg) -> Self {
        match list {
            ListArg::Whitelist => Mode::Whitelist,
            ListArg::Blacklist => Mode::Blacklist,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pac {
            config,
            output,
            verbose,
        } => generate_pac(&config, output.as_deref(), verbose),
        Commands::Decide { config, hosts } => decide_hosts(&config, &hosts),
        Commands::Fetch { url, list, config } => fetch_rules(&url, list.into(), config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn generate_pac(config_path: &Path, output: Option<&Path>, verbose: bool) -> pacrule::Result<()> {
    let stored = StoredConfig::load(config_path)?;
    let engine = DecisionEngine::new(stored.to_config());

    if !engine.config().proxy_enabled {
        log::warn!("Proxy is disabled in {:?}; the browser would use system settings", config_path);
    }

    if verbose {
        eprintln!(
            "Mode: {}, rules: {} valid of {}, proxy: {}",
            engine.config().mode,
            engine.rules().len(),
            engine.config().rules.len(),
            engine.proxy()
        );
    }

    let script = engine.pac_script();
    match output {
        Some(path) => {
            fs::write(path, &script)?;
            println!("Generated {:?} ({} bytes)", path, script.len());
        }
        None => print!("{}", script),
    }
    Ok(())
}

fn decide_hosts(config_path: &Path, hosts: &[String]) -> pacrule::Result<()> {
    let stored = StoredConfig::load(config_path)?;
    let engine = DecisionEngine::new(stored.to_config());

    for host in hosts {
        println!("{}\t{}", host, engine.evaluate(host));
    }
    Ok(())
}

fn fetch_rules(url: &str, list: Mode, config_path: Option<&Path>) -> pacrule::Result<()> {
    let parsed = RuleListFetcher::new().fetch_rules(url)?;
    println!(
        "Fetched {}: {} valid rules, {} lines ignored",
        url,
        parsed.rules.len(),
        parsed.ignored()
    );

    if let Some(path) = config_path {
        let mut stored = StoredConfig::load(path)?;
        stored.set_url_rules(list, url, &parsed);
        stored.save(path)?;
        println!("Stored {} rules in {:?}", list, path);
    }
    Ok(())
}
