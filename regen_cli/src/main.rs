use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use regen_sim::{
    CatalogVariant, FileAssetResolver, InterventionCatalog, SimulationController,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::info;

mod host;

use host::{HostOptions, ScriptHost};

#[derive(Parser, Debug)]
#[command(author, version, about = "Axon regeneration lab terminal host", long_about = None)]
struct Cli {
    /// Directory holding the PNG assets named by the catalog.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,
    /// Catalog JSON to load instead of a builtin variant.
    #[arg(long, conflicts_with = "variant")]
    catalog: Option<PathBuf>,
    /// Builtin catalog: standard, classic, astrocyte_penalty or astrocyte_folded.
    #[arg(long)]
    variant: Option<String>,
    /// Seed for reproducible outcomes.
    #[arg(long)]
    seed: Option<u64>,
    /// Write every emitted frame as a PNG into this directory.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Settle animations immediately instead of waiting out the dwell.
    #[arg(long)]
    no_dwell: bool,
    /// Pretty-print events.
    #[arg(long)]
    pretty: bool,
    /// Read commands from this file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = load_catalog(&cli)?;
    let assets = Arc::new(FileAssetResolver::new(cli.assets.clone()));
    let controller = match cli.seed {
        Some(seed) => SimulationController::with_seed(catalog, assets, seed),
        None => SimulationController::new(catalog, assets),
    };

    if let Some(dir) = &cli.out {
        tokio::fs::create_dir_all(dir)
            .await
            .wrap_err_with(|| format!("creating frame directory {}", dir.display()))?;
    }

    let mut host = ScriptHost::new(
        controller,
        HostOptions {
            out_dir: cli.out.clone(),
            honour_dwell: !cli.no_dwell,
            pretty: cli.pretty,
        },
    );

    match &cli.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .wrap_err_with(|| format!("opening script {}", path.display()))?;
            run_lines(&mut host, file).await?;
        }
        None => run_lines(&mut host, tokio::io::stdin()).await?,
    }

    let metrics = host.controller().metrics();
    info!(
        runs = metrics.runs,
        successes = metrics.successes,
        success_rate = metrics.success_rate(),
        frames = host.frames_written(),
        "session.finished"
    );
    Ok(())
}

fn load_catalog(cli: &Cli) -> Result<Arc<InterventionCatalog>> {
    if let Some(path) = &cli.catalog {
        let catalog = InterventionCatalog::from_file(path)
            .wrap_err_with(|| format!("loading catalog {}", path.display()))?;
        info!(path = %path.display(), "catalog.loaded=file");
        return Ok(Arc::new(catalog));
    }
    let name = cli.variant.as_deref().unwrap_or("standard");
    let variant = CatalogVariant::from_name(name)
        .ok_or_else(|| eyre!("unknown catalog variant '{name}'"))?;
    info!(variant = variant.name(), "catalog.loaded=builtin");
    Ok(InterventionCatalog::variant(variant))
}

async fn run_lines<R>(host: &mut ScriptHost, input: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        host.execute_line(&line, &mut stdout).await?;
    }
    Ok(())
}
