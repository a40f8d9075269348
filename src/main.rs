#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mimalloc::MiMalloc;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::{EndpointExt, Route, Server};
use poem_openapi::OpenApiService;

use lust_thumbnails::config;
use lust_thumbnails::routes::ThumbnailApi;
use lust_thumbnails::{ThumbnailParams, ThumbnailResolver};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// The file path to the config file.
    #[clap(long, env = "THUMBNAILS_CONFIG", default_value = "config.yaml")]
    config_file: PathBuf,

    /// The default log level filter.
    #[clap(long, env = "THUMBNAILS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serves the thumbnail API over HTTP.
    Serve {
        /// The binding host address of the server.
        #[clap(long, env = "THUMBNAILS_HOST", default_value = "127.0.0.1")]
        host: String,

        #[clap(long, env = "THUMBNAILS_PORT", default_value = "8000")]
        port: u16,

        /// The external URL that would be used to access the server,
        /// shown in the API docs.
        #[clap(long, env = "THUMBNAILS_EXTERNAL_URL")]
        external_url: Option<String>,
    },

    /// Resolves a single thumbnail and prints its URL.
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// The original image, relative to the media folder.
    image_url: String,

    /// The thumbnail bounds as `<width>x<height>`.
    size: String,

    #[clap(long)]
    crop: Option<String>,

    #[clap(long)]
    background: Option<String>,

    #[clap(long)]
    quality: Option<u8>,

    /// The storage backend, `local` or `s3`.
    #[clap(long)]
    backend: Option<String>,

    #[clap(long)]
    bucket: Option<String>,
}

impl From<ResolveArgs> for ThumbnailParams {
    fn from(args: ResolveArgs) -> Self {
        Self {
            image_url: args.image_url,
            size: args.size,
            crop: args.crop,
            background: args.background,
            quality: args.quality,
            backend: args.backend,
            bucket: args.bucket,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", format!("{},poem=info,hyper=info", args.log_level));
    }
    tracing_subscriber::fmt::init();

    if let Err(e) = config::init(&args.config_file) {
        error!("Failed to load config file {:?}: {:#}", &args.config_file, e);
        return Err(e);
    }

    let resolver = Arc::new(ThumbnailResolver::connect(config::config().clone())?);

    match args.command {
        Command::Serve { host, port, external_url } => serve(resolver, host, port, external_url).await,
        Command::Resolve(resolve) => {
            let url = resolver.thumbnail(resolve.into()).await?;
            println!("{}", url);
            Ok(())
        },
    }
}

async fn serve(
    resolver: Arc<ThumbnailResolver>,
    host: String,
    port: u16,
    external_url: Option<String>,
) -> Result<()> {
    let bind = format!("{}:{}", host, port);
    let server_url = external_url.unwrap_or_else(|| format!("http://{}/v1", &bind));

    let api_service = OpenApiService::new(
        ThumbnailApi::new(resolver),
        "Lust Thumbnails API",
        env!("CARGO_PKG_VERSION"),
    )
    .description(include_str!("../description.md"))
    .server(server_url);

    let ui = api_service.redoc();
    let app = Route::new()
        .nest("/v1", api_service)
        .nest("/docs", ui)
        .with(Tracing);

    info!("Lust thumbnails has started!");
    info!("Serving @ http://{}", &bind);
    info!("Docs available @ http://{}/docs", &bind);

    Server::new(TcpListener::bind(bind))
        .run(app)
        .await?;

    Ok(())
}
