use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wxbot")]
#[command(about = "Wxbot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a starter config file.
    Init {
        /// Config file path (default: WXBOT_CONFIG_PATH or ~/.wxbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (WeCom callback + health endpoints). Forwards mentioned
    /// group messages to the completion backend and relays answers back.
    Gateway {
        /// Config file path (default: WXBOT_CONFIG_PATH or ~/.wxbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 7575)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one prompt to the completion backend and print the answer.
    Ask {
        /// Config file path (default: WXBOT_CONFIG_PATH or ~/.wxbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Prompt text.
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wxbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { config, prompt }) => {
            if let Err(e) = run_ask(config, prompt).await {
                log::error!("ask failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let _dir = lib::init::init_config_dir(&path)?;
    println!(
        "initialized configuration at {}",
        path.parent().unwrap_or(std::path::Path::new(".")).display()
    );
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    lib::gateway::run_gateway(config, path).await
}

async fn run_ask(config_path: Option<std::path::PathBuf>, prompt: String) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let token = lib::config::resolve_completion_token(&config).ok_or_else(|| {
        anyhow::anyhow!(
            "no completion token configured (set completion.authToken or WXBOT_COMPLETION_TOKEN)"
        )
    })?;
    let client = lib::completion::CompletionClient::new(
        &config.completion.endpoint,
        &config.completion.model,
        &token,
    );
    let answer = client.complete(&prompt).await?;
    println!("{}", answer.trim());
    Ok(())
}
