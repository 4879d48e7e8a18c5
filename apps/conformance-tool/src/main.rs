//! CLI for the entity API conformance suite.
//!
//! Provides commands for:
//! - Running the suite over every entity or a selection
//! - Listing discovered entities
//! - Calling a single API action with JSON parameters

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::Level;

use crm_api_conformance::{discover_live, ConformanceConfig, ConformanceRunner, StaticEntityList};
use crm_api_core::{ActionKind, ApiConfig, Component, ComponentSetup, EntityRegistry, Record};

/// Command-line arguments for the conformance tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log debug output from the API and the runner
    #[arg(short, long)]
    verbose: bool,

    /// Additional permission granted to the session (repeatable)
    #[arg(long = "grant")]
    grants: Vec<String>,

    /// Enable only these components instead of all of them (repeatable)
    #[arg(long = "component")]
    components: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the conformance suite (default)
    Run {
        /// Entities to check; all entities when omitted
        entities: Vec<String>,

        /// Report format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Skip comparing the static entity list with the live registry
        #[arg(long)]
        skip_drift_check: bool,
    },
    /// List the entities the registry exposes
    Entities,
    /// Execute one API action and print the result as JSON
    Call {
        /// Entity name, e.g. Contact
        entity: String,
        /// Action name, e.g. get or getFields
        action: String,
        /// Action parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let setup = component_setup(&args.components)?;
    let mut config = ApiConfig::default();
    for grant in &args.grants {
        config = config.grant(grant.clone());
    }
    let registry =
        EntityRegistry::with_builtin_entities(config).context("Failed to build entity registry")?;

    match args.command.unwrap_or(Command::Run {
        entities: Vec::new(),
        format: Format::Text,
        skip_drift_check: false,
    }) {
        Command::Run {
            entities,
            format,
            skip_drift_check,
        } => run_suite(&registry, setup, entities, format, skip_drift_check),
        Command::Entities => {
            let provider = discover_live(&registry, &setup)?;
            for name in provider.keys() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            entity,
            action,
            params,
        } => call(&registry, setup, &entity, &action, &params),
    }
}

fn component_setup(components: &[String]) -> anyhow::Result<ComponentSetup> {
    if components.is_empty() {
        return Ok(ComponentSetup::EnableAll);
    }
    let components = components
        .iter()
        .map(|c| Component::from_str(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ComponentSetup::Enable(components))
}

fn run_suite(
    registry: &EntityRegistry,
    components: ComponentSetup,
    entities: Vec<String>,
    format: Format,
    skip_drift_check: bool,
) -> anyhow::Result<ExitCode> {
    let config = ConformanceConfig {
        components,
        static_list: StaticEntityList::default(),
        entities,
        check_drift: !skip_drift_check,
        ..Default::default()
    };
    let report = ConformanceRunner::new(registry, config)
        .run()
        .context("Conformance fixtures could not be set up")?;

    match format {
        Format::Text => println!("{}", report),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn call(
    registry: &EntityRegistry,
    setup: ComponentSetup,
    entity: &str,
    action: &str,
    params: &str,
) -> anyhow::Result<ExitCode> {
    registry.apply(&setup);
    let action = ActionKind::from_str(action).map_err(anyhow::Error::msg)?;
    let params: Record = match serde_json::from_str(params).context("Invalid --params JSON")? {
        Value::Object(map) => map,
        other => bail!("--params must be a JSON object, got {}", other),
    };

    let result = registry.api(entity)?.execute(action, &params)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}
