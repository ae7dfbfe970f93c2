//! demesne CLI: fetch the spatial assets of a remotely hosted domain.
//!
//! # Usage
//!
//! ```bash
//! demesne load <domain-id> -o ./out
//! demesne catalog <domain-id>
//! demesne stream <domain-id> -o ./tiles
//! demesne portals <domain-id>
//! ```
//!
//! Connection settings come from flags or `DEMESNE_*` environment
//! variables and are validated before any network call. Ctrl-C cancels the
//! in-flight download without retracting anything already written.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use demesne_catalog::AssetKind;
use demesne_client::{ClientConfig, DomainClient, PartitionTile, SplatSnapshot};
use demesne_fetch::ProgressCallback;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

const PB_STYLE: &str =
    "{spinner:.blue} {prefix:>12.cyan.bold} {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";

#[derive(Parser)]
#[command(
    name = "demesne",
    about = "Fetch the spatial assets of a captured physical space",
    version
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings, resolved from flags or the environment.
#[derive(Args)]
struct Connection {
    /// Token service origin.
    #[arg(long, env = "DEMESNE_API_SERVER")]
    api_server: String,

    /// Domain broker origin.
    #[arg(long, env = "DEMESNE_DDS_SERVER")]
    dds_server: String,

    /// Application key for the service token grant.
    #[arg(long, env = "DEMESNE_APP_KEY")]
    app_key: String,

    /// Application secret for the service token grant.
    #[arg(long, env = "DEMESNE_APP_SECRET", hide_env_values = true)]
    app_secret: String,

    /// Client identifier sent with every request.
    #[arg(long, env = "DEMESNE_CLIENT_ID", default_value = "demesne-cli")]
    client_id: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every asset the domain offers and write them to a directory.
    Load {
        /// Domain identifier.
        domain_id: String,

        /// Output directory for the downloaded assets.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// List the domain's catalog with each entry's classification.
    Catalog {
        /// Domain identifier.
        domain_id: String,
    },

    /// Stream splat tiles progressively, writing each as it arrives.
    Stream {
        /// Domain identifier.
        domain_id: String,

        /// Output directory for the downloaded tiles.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Refinement id to stream. Defaults to the canonical refinement
        /// named by the domain metadata.
        #[arg(long)]
        refinement: Option<String>,
    },

    /// Print the domain's portal poses as JSON.
    Portals {
        /// Domain identifier.
        domain_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = DomainClient::new(ClientConfig {
        api_server: cli.connection.api_server,
        dds_server: cli.connection.dds_server,
        app_key: cli.connection.app_key,
        app_secret: cli.connection.app_secret,
        client_id: cli.connection.client_id,
    })?
    .with_timeout(Duration::from_secs(cli.connection.timeout));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Load { domain_id, output } => cmd_load(&client, &domain_id, &output, &cancel).await,
        Commands::Catalog { domain_id } => cmd_catalog(&client, &domain_id, &cancel).await,
        Commands::Stream {
            domain_id,
            output,
            refinement,
        } => cmd_stream(&client, &domain_id, &output, refinement, &cancel).await,
        Commands::Portals { domain_id } => cmd_portals(&client, &domain_id, &cancel).await,
    }
}

async fn cmd_load(
    client: &DomainClient,
    domain_id: &str,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let domain = client.load_domain(domain_id, cancel, None).await?;
    println!(
        "domain \"{}\": {} catalog items, refinement {}",
        domain.session.domain_name,
        domain.catalog.items().len(),
        domain.refinement.as_deref().unwrap_or("(none)")
    );

    let mut written = 0usize;
    for (name, bytes) in [
        ("nav_mesh.obj", &domain.nav_mesh),
        ("occlusion_mesh.obj", &domain.occlusion_mesh),
        ("point_cloud.ply", &domain.point_cloud),
    ] {
        if let Some(bytes) = bytes {
            write_asset(&output.join(name), bytes)?;
            written += 1;
        }
    }
    if let Some(splat) = &domain.splat {
        write_asset(
            &output.join(format!("splat.{}", splat.format)),
            &splat.bytes,
        )?;
        written += 1;
    }
    if let Some(matrix) = &domain.alignment_matrix {
        write_asset(
            &output.join("alignment_matrix.json"),
            serde_json::to_string(matrix)?.as_bytes(),
        )?;
    }

    println!("wrote {} asset(s) to {}", written, output.display());
    Ok(())
}

async fn cmd_catalog(
    client: &DomainClient,
    domain_id: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let session = client.authenticate(domain_id, cancel).await?;
    let catalog = client.fetch_catalog(&session, cancel).await?;

    for item in catalog.items() {
        let kind = catalog
            .refs()
            .iter()
            .find(|r| r.item_id == item.id)
            .map(|r| describe_kind(&r.kind))
            .unwrap_or_else(|| "(unclassified)".to_string());
        println!("{}  {}  {}  {}", item.id, item.data_type, item.name, kind);
    }
    Ok(())
}

async fn cmd_stream(
    client: &DomainClient,
    domain_id: &str,
    output: &Path,
    refinement: Option<String>,
    cancel: &CancellationToken,
) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let session = client.authenticate(domain_id, cancel).await?;
    let catalog = client.fetch_catalog(&session, cancel).await?;
    let refinement = match refinement {
        Some(r) => r,
        None => client
            .fetch_metadata(&session, &catalog, cancel)
            .await?
            .canonical_refinement
            .with_context(|| format!("domain {domain_id} names no canonical refinement"))?,
    };

    let bar = download_bar("streaming");
    let callback = bar_callback(&bar);

    let mut stream = client.stream_splat(
        &session,
        &catalog,
        &refinement,
        cancel.clone(),
        Some(callback),
    );
    let mut written = 0usize;
    while let Some(snapshot) = stream.next().await {
        match snapshot {
            SplatSnapshot::Partitioned(tiles) => {
                // Snapshots only grow; everything before `written` is
                // already on disk.
                for tile in &tiles[written..] {
                    write_asset(&output.join(tile_file_name(tile)), &tile.bytes)?;
                }
                written = tiles.len();
                bar.set_message(format!("{written} tile(s)"));
            }
            SplatSnapshot::Single(single) => {
                write_asset(&output.join(format!("splat.{}", single.format)), &single.bytes)?;
                written = 1;
            }
        }
    }
    bar.finish_and_clear();

    if written == 0 {
        println!("no splat data for refinement {refinement}");
    } else {
        println!("wrote {} file(s) to {}", written, output.display());
    }
    Ok(())
}

async fn cmd_portals(
    client: &DomainClient,
    domain_id: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let session = client.authenticate(domain_id, cancel).await?;
    let portals = client.fetch_portals(&session, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&portals)?);
    Ok(())
}

fn describe_kind(kind: &AssetKind) -> String {
    match kind {
        AssetKind::NavMesh => "nav mesh".to_string(),
        AssetKind::OcclusionMesh => "occlusion mesh".to_string(),
        AssetKind::Metadata => "domain metadata".to_string(),
        AssetKind::PointCloud { refinement } => format!("point cloud [{refinement}]"),
        AssetKind::SplatSingle { refinement, format } => {
            format!("splat ({format}) [{refinement}]")
        }
        AssetKind::SplatPartition(p) => format!(
            "splat tile {} {}x ({}, {}) [{}]",
            p.lod, p.tile_size, p.tile_x, p.tile_z, p.refinement
        ),
    }
}

fn tile_file_name(tile: &PartitionTile) -> String {
    format!(
        "tile_{}_{}_{}_{}.{}",
        tile.lod, tile.tile_size, tile.tile_x, tile.tile_z, tile.format
    )
}

fn write_asset(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn download_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::no_length();
    if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
        bar.set_style(style.progress_chars("█▓▒░  "));
    }
    bar.set_prefix(prefix.to_string());
    bar
}

/// Drive the bar from transfer progress. Tiles download one at a time, so
/// the bar tracks the current transfer.
fn bar_callback(bar: &ProgressBar) -> ProgressCallback {
    let bar = bar.clone();
    Arc::new(move |progress| {
        if let Some(total) = progress.total_bytes {
            bar.set_length(total);
        }
        bar.set_position(progress.bytes_loaded);
    })
}
