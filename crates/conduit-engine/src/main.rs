use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use conduit_engine::{flatten, reconcile, EngineConfig};
use conduit_model::{ExternalId, JsonImporter, PlaceholderSet};
use indexmap::IndexSet;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` as given, `info` when unset or unparsable
fn log_filter(spec: Option<&str>) -> EnvFilter {
    spec.and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("conduit")
        .version(conduit_engine::VERSION)
        .about("Interchange-to-native synchronization tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("flatten")
                .about("List the convertible nodes of an interchange document in walk order")
                .arg(
                    Arg::new("doc")
                        .long("doc")
                        .required(true)
                        .help("Path to the interchange JSON document"),
                )
                .arg(
                    Arg::new("convertible")
                        .long("convertible")
                        .required(true)
                        .value_delimiter(',')
                        .help("Comma-separated type tags to treat as convertible"),
                )
                .arg(
                    Arg::new("type-key")
                        .long("type-key")
                        .default_value("speckle_type")
                        .help("JSON key holding the node type tag"),
                )
                .arg(
                    Arg::new("id-key")
                        .long("id-key")
                        .default_value("applicationId")
                        .help("JSON key holding the node external id"),
                ),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Compute delete instructions between two placeholder sets")
                .arg(
                    Arg::new("previous")
                        .long("previous")
                        .required(true)
                        .help("Placeholder set persisted by the previous run"),
                )
                .arg(
                    Arg::new("current")
                        .long("current")
                        .required(true)
                        .help("Placeholder set of the current run"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective engine configuration")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Path to a TOML config file (optional)"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("flatten", args)) => run_flatten(args).await,
        Some(("reconcile", args)) => run_reconcile(args).await,
        Some(("config", args)) => run_config(args),
        _ => Ok(()),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .with_context(|| format!("missing --{name}"))
}

async fn run_flatten(args: &ArgMatches) -> Result<()> {
    let path = required(args, "doc")?;
    let importer = JsonImporter::new(required(args, "type-key")?, required(args, "id-key")?);
    let convertible: IndexSet<&str> = args
        .get_many::<String>("convertible")
        .into_iter()
        .flatten()
        .map(|tag| tag.trim())
        .collect();

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {path}"))?;
    let graph = importer.import_str(&text)?;
    let root = graph.root().context("document has no root node")?;

    let flat = flatten(&graph, root, |node| convertible.contains(node.type_tag().as_str()));
    tracing::info!("{} convertible nodes in {}", flat.nodes.len(), path);
    for id in &flat.nodes {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        let external_id = node
            .external_id()
            .map_or("<no id>", ExternalId::as_str);
        println!("{}\t{}", node.type_tag(), external_id);
    }
    for err in &flat.errors {
        eprintln!("{err}");
    }
    if !flat.errors.is_empty() {
        anyhow::bail!("{} errors while walking {}", flat.errors.len(), path);
    }
    Ok(())
}

async fn read_placeholders(path: &str) -> Result<PlaceholderSet> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("malformed placeholder set in {path}"))
}

async fn run_reconcile(args: &ArgMatches) -> Result<()> {
    let previous = read_placeholders(required(args, "previous")?).await?;
    let current = read_placeholders(required(args, "current")?).await?;
    let deletes = reconcile(&previous, &current);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&deletes)?);
    } else {
        println!("{} delete instructions", deletes.len());
        for delete in &deletes {
            println!("  {delete}");
        }
    }
    Ok(())
}

fn run_config(args: &ArgMatches) -> Result<()> {
    let config = match args.get_one::<String>("path") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    print!("{}", config.to_toml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_level_in_env_is_kept() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(log_filter(None).to_string(), "info");
    }
}
