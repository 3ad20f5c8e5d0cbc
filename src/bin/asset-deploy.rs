use anyhow::{Context, Result};
use asset_deploy::config::ContainerConfig;
use asset_deploy::net::HttpFetcher;
use asset_deploy::pkg::{PkgSettings, DEFAULT_REPOS_CONF};
use asset_deploy::runner::{CommandRunner, CrossRunner, LocalRunner, DEFAULT_CROSS_IMAGE};
use asset_deploy::version::GithubReleases;
use asset_deploy::{ContainerDeployer, ContainerInfo, DeployRoot};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "asset-deploy")]
#[command(about = "Deploy archives, files and FreeBSD packages into container roots")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct AssetDeployCli {
    /// Container configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Directory receiving one root per architecture
    #[arg(short, long)]
    root: PathBuf,

    /// The root directory as seen by commands (defaults to --root)
    #[arg(long)]
    logical_root: Option<PathBuf>,

    /// Project name
    #[arg(long)]
    project: String,

    /// Package name (defaults to the project name)
    #[arg(long)]
    package: Option<String>,

    /// Version; resolved from the assets when omitted
    #[arg(long, default_value = "")]
    version: String,

    /// Target FreeBSD release, MAJOR.MINOR
    #[arg(long)]
    freebsd: String,

    /// Target architecture, repeatable (defaults to the configuration's)
    #[arg(short, long)]
    arch: Vec<String>,

    /// Run commands inside the cross-build container
    #[arg(long)]
    cross: bool,

    /// Cross-build container image
    #[arg(long, default_value = DEFAULT_CROSS_IMAGE)]
    image: String,

    /// Where the package repository configuration is written
    #[arg(long, default_value = DEFAULT_REPOS_CONF)]
    repos_conf: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AssetDeployCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting asset-deploy v{}", env!("CARGO_PKG_VERSION"));

    let config = ContainerConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let fetcher = Arc::new(HttpFetcher::new(cli.timeout)?);
    let releases = Arc::new(GithubReleases::new(fetcher.client().clone()));
    let package = cli.package.clone().unwrap_or_else(|| cli.project.clone());
    let arches = if cli.arch.is_empty() {
        config.arches()
    } else {
        cli.arch.clone()
    };

    for arch in arches {
        let runner: Arc<dyn CommandRunner> = if cli.cross {
            Arc::new(CrossRunner::new().with_image(&cli.image).with_arch(&arch))
        } else {
            Arc::new(LocalRunner::new())
        };

        let mount = cli.root.join(&arch);
        std::fs::create_dir_all(&mount)
            .with_context(|| format!("Failed to create {}", mount.display()))?;
        let logical = cli.logical_root.as_ref().unwrap_or(&cli.root).join(&arch);
        let root = DeployRoot::new(mount).with_logical(logical);

        let info = ContainerInfo::new(&cli.project, &package, &cli.freebsd, &arch)
            .with_version(&cli.version);

        let deployer =
            ContainerDeployer::new(config.clone(), runner, fetcher.clone(), releases.clone())
                .with_pkg_settings(PkgSettings {
                    repos_conf: cli.repos_conf.clone(),
                    ..PkgSettings::default()
                });

        let metadata = deployer
            .deploy(&root, &info)
            .await
            .with_context(|| format!("Failed to deploy {package} for {arch}"))?;

        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }

    Ok(())
}
