use std::io::{self, BufRead, Write};
use std::sync::Arc;

use log::{debug, info, LevelFilter};
use plinth_core::plugin_system::{
    Descriptor, Disambiguator, PluginFactory, PluginHost, PluginInstance, PluginState,
    PluginSystemError, Selection,
};

/// Set up `env_logger`. `RUST_LOG` wins; otherwise `--verbose` picks debug.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // a second initialisation is harmless
    let _ = builder.try_init();
}

/// Instance handed out for every native plugin; its hooks only log.
#[derive(Debug)]
pub struct LoggedInstance {
    id: String,
}

impl PluginInstance for LoggedInstance {
    fn activate(&self) -> bool {
        info!("Plugin '{}' activated", self.id);
        true
    }

    fn deactivate(&self) -> bool {
        info!("Plugin '{}' deactivated", self.id);
        true
    }
}

/// Native factory of the command-line shell
#[derive(Debug, Default)]
pub struct NativeFactory;

impl PluginFactory for NativeFactory {
    fn instantiate(
        &self,
        descriptor: &Descriptor,
        host: &PluginHost,
    ) -> Result<Arc<dyn PluginInstance>, PluginSystemError> {
        debug!("{} instantiating '{}'", host.app_name(), descriptor.id());
        Ok(Arc::new(LoggedInstance {
            id: descriptor.id().to_string(),
        }))
    }
}

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Default)]
pub struct StdinDisambiguator;

impl Disambiguator for StdinDisambiguator {
    fn select_one(&mut self, title: &str, description: &str, candidates: &[&Descriptor]) -> Selection {
        println!("{title}");
        println!("{description}");
        for (i, candidate) in candidates.iter().enumerate() {
            println!("  {}) {} [{}]", i + 1, candidate.name(), candidate.id());
        }
        print!("Choice (number, append '!' to remember, empty to cancel): ");
        if io::stdout().flush().is_err() {
            return Selection::declined();
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_choice(&line, candidates),
            Err(e) => {
                debug!("Could not read selection: {e}");
                Selection::declined()
            }
        }
    }
}

/// `2` picks the second candidate, `2!` also remembers it. Anything else declines.
pub fn parse_choice(input: &str, candidates: &[&Descriptor]) -> Selection {
    let input = input.trim();
    let (number, remember) = match input.strip_suffix('!') {
        Some(number) => (number.trim(), true),
        None => (input, false),
    };
    number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| candidates.get(i))
        .map(|d| Selection::chosen(d.id(), remember))
        .unwrap_or_default()
}

pub fn state_label(state: Option<PluginState>) -> &'static str {
    match state {
        Some(PluginState::Active) => "active",
        Some(PluginState::Cached) => "cached",
        Some(PluginState::Inactive) | None => "inactive",
    }
}
