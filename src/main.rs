use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "In-memory book collection service")]
struct Cli {
    /// Override `server.port`
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the resolved settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .with_context(|| "failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Serve => serve(settings).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        address = %settings.server.bind_address(),
        "bookshelf bootstrap starting"
    );

    let mut registry = ModuleRegistry::new();
    bookshelf::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("bookshelf bootstrap complete");

    let served = bookshelf_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
