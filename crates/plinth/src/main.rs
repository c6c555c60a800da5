mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{debug, warn};
use plinth_core::plugin_system::{
    Disambiguator, FactoryRegistry, FirstCandidate, ManifestLoader, PluginManager, Registry,
    ResolutionReport,
};
use plinth_core::profile::{FileProfileSink, Profile, ProfileSource};
use plinth_core::storage::EngineConfig;
use plinth_core::Result;

/// Plinth: dependency resolution and activation for pluggable shells
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Engine configuration file (json, yaml or toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra directory scanned for plugin manifests, may be repeated
    #[arg(long = "plugins-dir", global = true)]
    plugins_dir: Vec<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pick the first candidate instead of prompting
    #[arg(long, global = true)]
    assume_first: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and activate plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Reconcile requirement documents
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Remembered disambiguation choices
    Selections {
        #[command(subcommand)]
        command: SelectionsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List plugins in load order
    List {},
    /// Show the load order and pruned dependency cycles
    Resolve {},
    /// List plugins matching `SECTION ATTRIBUTE VALUE` triples
    Query {
        #[arg(required = true, num_args = 3..)]
        constraints: Vec<String>,
    },
    /// Activate a plugin and its dependencies
    Activate {
        /// The id of the plugin to activate
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Load documents into a profile and print the active set
    Load {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep the profile membership synced to this file
        #[arg(long)]
        sync: Option<PathBuf>,
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum SelectionsCommand {
    /// Print the persisted form of the remembered selections
    Show {},
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    cli::init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) if path.exists() => EngineConfig::load(path)?,
        Some(path) => {
            debug!("Configuration {} not found, using defaults", path.display());
            EngineConfig::default()
        }
        None => EngineConfig::default(),
    };

    let (registry, report) = discover(&config, &args.plugins_dir);
    let factories = FactoryRegistry::new(Arc::new(cli::NativeFactory));
    let disambiguator: Box<dyn Disambiguator> = if args.assume_first {
        Box::new(FirstCandidate)
    } else {
        Box::new(cli::StdinDisambiguator)
    };
    let mut manager = PluginManager::with_config(registry, factories, disambiguator, &config);

    let code = match args.command {
        Commands::Plugin { command } => match command {
            PluginCommand::List {} => {
                list_plugins(&manager);
                ExitCode::SUCCESS
            }
            PluginCommand::Resolve {} => {
                print_report(&report);
                ExitCode::SUCCESS
            }
            PluginCommand::Query { constraints } => {
                let matches = manager.query().query(constraints.as_slice());
                if matches.is_empty() {
                    println!("No matching plugins.");
                }
                for descriptor in matches {
                    println!("{}\t{}", descriptor.id(), descriptor.name());
                }
                ExitCode::SUCCESS
            }
            PluginCommand::Activate { id } => {
                manager.subscribe_all(Box::new(|event| {
                    println!("{} {}", event.name(), event.plugin_id().unwrap_or_default());
                }));
                let outcome = manager.activate(&id);
                for diagnostic in manager.take_diagnostics() {
                    eprintln!("Warning: {diagnostic}");
                }
                outcome?;
                println!("Plugin '{id}' is active.");
                persist(&manager, &mut config, args.config.as_deref())?;
                ExitCode::SUCCESS
            }
        },
        Commands::Profile { command } => match command {
            ProfileCommand::Load { files, sync, name } => {
                let mut profile = Profile::new(&name);
                if let Some(path) = sync.or_else(|| config.profile_sync_file.clone()) {
                    profile.set_sink(Box::new(FileProfileSink::new(&path)?))?;
                }
                let sources = files
                    .iter()
                    .map(|path| ProfileSource::from_file(path))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let selected = profile.load(&mut manager, &sources)?;
                for diagnostic in manager.take_diagnostics() {
                    eprintln!("Warning: {diagnostic}");
                }
                println!("Profile '{name}' selected: {}", selected.join(", "));
                println!("Active plugins:");
                for id in manager.active_plugins() {
                    println!("  - {id}");
                }
                persist(&manager, &mut config, args.config.as_deref())?;
                ExitCode::SUCCESS
            }
        },
        Commands::Selections { command } => match command {
            SelectionsCommand::Show {} => {
                let remembered = manager.remembered_selections_string();
                if remembered.is_empty() {
                    println!("No remembered selections.");
                } else {
                    println!("{remembered}");
                }
                ExitCode::SUCCESS
            }
        },
    };

    manager.unload_all();
    Ok(code)
}

/// Scan configured and command-line plugin directories into a resolved registry
fn discover(config: &EngineConfig, extra_dirs: &[PathBuf]) -> (Registry, ResolutionReport) {
    let mut loader = ManifestLoader::new();
    for dir in config.plugin_dirs.iter().chain(extra_dirs) {
        loader.add_plugin_dir(dir);
    }
    let discovery = loader.scan();
    for error in &discovery.errors {
        eprintln!("Warning: {error}");
    }

    let mut registry = Registry::new();
    discovery.register_all(&mut registry);
    let report = registry.resolve();
    (registry, report)
}

fn list_plugins(manager: &PluginManager) {
    let registry = manager.registry();
    if registry.is_empty() {
        println!("No plugins registered.");
        return;
    }
    for idx in registry.order() {
        let Some(descriptor) = registry.get(*idx) else {
            continue;
        };
        println!(
            "{}\t{}\tcan-load={}\tdisabled={}\tstate={}",
            descriptor.id(),
            descriptor.name(),
            descriptor.can_load(),
            manager.is_disabled(descriptor.id()),
            cli::state_label(manager.state(descriptor.id())),
        );
    }
}

fn print_report(report: &ResolutionReport) {
    println!("Load order:");
    for (position, id) in report.load_order.iter().enumerate() {
        println!("  {}. {id}", position + 1);
    }
    for cycle in &report.pruned_cycles {
        println!("Pruned cycle: {}", cycle.join(" -> "));
    }
    for (plugin, missing) in report.missing() {
        println!("Missing dependency: {plugin} requires {missing}");
    }
}

/// Write remembered selections back when a configuration file was given
fn persist(manager: &PluginManager, config: &mut EngineConfig, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    manager.store_into(config);
    if let Err(e) = config.save(path) {
        warn!("Could not save configuration to {}: {e}", path.display());
        return Err(e.into());
    }
    Ok(())
}
