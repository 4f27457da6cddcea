//! CLI binary entrypoint.

use clap::{Parser, Subcommand};
use javalens_adapters::{
    ChromaConfig, ChromaVectorIndex, OllamaConfig, OllamaEmbedder, TreeSitterJavaParser,
};
use javalens_app::{
    answer_query, embedding_health_check, index_client_from_config, index_repository,
    search_stats, ChunkerSettings, EmbedderDeps, EmbedderSettings, IndexClient,
    IndexRepositoryDeps, IndexRepositoryInput, IndexStatus, QueryDeps, QueryInput,
};
use javalens_config::{load_app_config_std_env, ValidatedAppConfig};
use javalens_shared::{ErrorCode, ErrorEnvelope, RequestContext};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "javalens",
    version,
    about = "Semantic code search over Java source trees",
    long_about = None
)]
struct Cli {
    /// Optional config file path (TOML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Index a Java repository into the vector collection.
    Index {
        /// Repository root to scan for `.java` files.
        path: PathBuf,
    },
    /// Search the indexed code.
    Query {
        /// Query text.
        query: String,
        /// Maximum number of matches to return.
        #[arg(long, default_value_t = 10)]
        max_results: u32,
        /// Metadata filter entries (`key=value`, repeatable).
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// Show collection statistics.
    Stats,
    /// Check embedding provider and vector index availability.
    Health,
    /// Delete the vector collection.
    Delete,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode, ErrorEnvelope> {
    let config = load_app_config_std_env(cli.config.as_deref())?;
    tracing::debug!(path = ?cli.config, "configuration loaded");
    let ctx = RequestContext::new_request();

    match cli.command {
        Commands::Index { path } => run_index(&ctx, &config, path, cli.json).await,
        Commands::Query {
            query,
            max_results,
            filters,
        } => run_query(&ctx, &config, query, max_results, &filters, cli.json).await,
        Commands::Stats => run_stats(&ctx, &config, cli.json).await,
        Commands::Health => run_health(&ctx, &config).await,
        Commands::Delete => run_delete(&ctx, &config).await,
    }
}

struct Wiring {
    embedding: Arc<OllamaEmbedder>,
    index_client: IndexClient,
}

fn build_wiring(config: &ValidatedAppConfig) -> Result<Wiring, ErrorEnvelope> {
    let embedder = OllamaEmbedder::new(&OllamaConfig::from_embedding_config(&config.embedding))?;
    let index = ChromaVectorIndex::new(&ChromaConfig::from_vector_index_config(
        &config.vector_index,
    ))?;
    let index_client = index_client_from_config(Arc::new(index), &config.vector_index)?;

    Ok(Wiring {
        embedding: Arc::new(embedder),
        index_client,
    })
}

async fn run_index(
    ctx: &RequestContext,
    config: &ValidatedAppConfig,
    path: PathBuf,
    json: bool,
) -> Result<ExitCode, ErrorEnvelope> {
    let wiring = build_wiring(config)?;
    let deps = IndexRepositoryDeps {
        parser: Arc::new(TreeSitterJavaParser::new()),
        embedding: wiring.embedding,
        index_client: wiring.index_client,
    };
    let input = IndexRepositoryInput {
        repository_root: path,
        scan: config.scan.clone(),
        chunker: ChunkerSettings::from_chunking_config(&config.chunking),
        embedder: EmbedderSettings::from_embedding_config(&config.embedding),
    };

    let report = index_repository(ctx, &deps, input).await?;
    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("files scanned:     {}", report.total_files);
        println!("files parsed:      {}", report.parsed_files);
        println!("chunks produced:   {}", report.total_chunks);
        for (kind, count) in &report.chunks_by_kind {
            println!("  {kind}: {count}");
        }
        println!("embeddings stored: {}", report.stored_embeddings);
        println!(
            "status: {} ({} ms)",
            status_label(report.status),
            report.duration.as_millis()
        );
    }

    Ok(match report.status {
        IndexStatus::Completed => ExitCode::SUCCESS,
        IndexStatus::Failed => ExitCode::FAILURE,
    })
}

async fn run_query(
    ctx: &RequestContext,
    config: &ValidatedAppConfig,
    query: String,
    max_results: u32,
    filters: &[String],
    json: bool,
) -> Result<ExitCode, ErrorEnvelope> {
    let metadata_filter = parse_filters(filters)?;
    let wiring = build_wiring(config)?;
    let deps = QueryDeps {
        embedding: wiring.embedding,
        index_client: wiring.index_client,
        explainer: None,
        embedder: EmbedderSettings::from_embedding_config(&config.embedding),
    };
    let input = QueryInput {
        query: query.into(),
        max_results,
        metadata_filter,
        include_explanation: false,
    };

    let outcome = answer_query(ctx, &deps, input).await;
    if json {
        println!("{}", to_json(&outcome)?);
        return Ok(ExitCode::SUCCESS);
    }

    if outcome.matches.is_empty() {
        println!("no matches for \"{}\"", outcome.query);
    }
    for (rank, code_match) in outcome.matches.iter().enumerate() {
        let location = code_match.method_name.as_ref().map_or_else(
            || code_match.class_name.to_string(),
            |method| format!("{}.{}", code_match.class_name, method),
        );
        println!(
            "{:>2}. [{:.2}] {} ({}) {}",
            rank + 1,
            code_match.similarity,
            location,
            code_match.kind,
            code_match.file_path
        );
    }
    if let Some(explanation) = &outcome.explanation {
        println!("{explanation}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_stats(
    ctx: &RequestContext,
    config: &ValidatedAppConfig,
    json: bool,
) -> Result<ExitCode, ErrorEnvelope> {
    let wiring = build_wiring(config)?;
    let stats = search_stats(ctx, &wiring.index_client).await;

    if json {
        println!("{}", to_json(&stats)?);
    } else {
        for (key, value) in &stats {
            println!("{key}: {value}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_health(
    ctx: &RequestContext,
    config: &ValidatedAppConfig,
) -> Result<ExitCode, ErrorEnvelope> {
    let wiring = build_wiring(config)?;
    let embedder_deps = EmbedderDeps {
        embedding: wiring.embedding,
    };

    let embedding_ok = embedding_health_check(ctx, &embedder_deps).await;
    let index_ok = wiring.index_client.health_check(ctx).await;

    println!("embedding: {}", availability(embedding_ok));
    println!("vector index: {}", availability(index_ok));

    Ok(if embedding_ok && index_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_delete(
    ctx: &RequestContext,
    config: &ValidatedAppConfig,
) -> Result<ExitCode, ErrorEnvelope> {
    let wiring = build_wiring(config)?;
    let collection = wiring.index_client.collection().as_str().to_owned();

    if wiring.index_client.delete_collection(ctx).await {
        println!("deleted collection {collection}");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("failed to delete collection {collection}");
        Ok(ExitCode::FAILURE)
    }
}

fn parse_filters(filters: &[String]) -> Result<BTreeMap<String, String>, ErrorEnvelope> {
    let mut map = BTreeMap::new();
    for raw in filters {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("filter must be key=value, got `{raw}`"),
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("filter key is empty in `{raw}`"),
            ));
        }
        map.insert(key.to_owned(), value.trim().to_owned());
    }
    Ok(map)
}

const fn status_label(status: IndexStatus) -> &'static str {
    match status {
        IndexStatus::Completed => "completed",
        IndexStatus::Failed => "failed",
    }
}

const fn availability(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "unavailable"
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ErrorEnvelope> {
    serde_json::to_string_pretty(value).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("cli", "serialize_json"),
            format!("failed to serialize output: {error}"),
            javalens_shared::ErrorClass::NonRetriable,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn version_flag_is_supported() {
        let result = Cli::command().try_get_matches_from(["javalens", "--version"]);
        let is_version = matches!(
            result,
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayVersion
        );

        assert!(is_version, "expected clap to render version");
    }

    #[test]
    fn cli_parses_index_command() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from(["javalens", "index", "/tmp/repo", "--config", "jl.toml"])?;

        assert_eq!(cli.config, Some(PathBuf::from("jl.toml")));
        match cli.command {
            Commands::Index { path } => assert_eq!(path, PathBuf::from("/tmp/repo")),
            _ => return Err("expected index command".into()),
        }
        Ok(())
    }

    #[test]
    fn cli_parses_query_flags() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::try_parse_from([
            "javalens",
            "--json",
            "query",
            "user creation endpoint",
            "--max-results",
            "5",
            "--filter",
            "type=METHOD",
            "--filter",
            "isEndpoint=true",
        ])?;

        assert!(cli.json);
        match cli.command {
            Commands::Query {
                query,
                max_results,
                filters,
            } => {
                assert_eq!(query, "user creation endpoint");
                assert_eq!(max_results, 5);
                assert_eq!(filters, vec!["type=METHOD", "isEndpoint=true"]);
            },
            _ => return Err("expected query command".into()),
        }
        Ok(())
    }

    #[test]
    fn filters_parse_into_a_map() -> Result<(), Box<dyn std::error::Error>> {
        let map = parse_filters(&["type=METHOD".to_owned(), " className = UserService ".to_owned()])?;

        assert_eq!(map.get("type").map(String::as_str), Some("METHOD"));
        assert_eq!(
            map.get("className").map(String::as_str),
            Some("UserService")
        );
        Ok(())
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(parse_filters(&["no-separator".to_owned()]).is_err());
        assert!(parse_filters(&["=value".to_owned()]).is_err());
    }
}
