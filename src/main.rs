//! Console-bridge binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;

use console_bridge::api::{serve_with_state, AppState, ServerConfig};
use console_bridge::backend::backend_from_config;
use console_bridge::cli;
use console_bridge::config::{Config, ConsoleMode};
use console_bridge::console::{ConsoleController, RawAttachConsole, SessionDriver};
use console_bridge::logging;
use console_bridge::session::SessionRegistry;
use console_bridge::target::DockerTargetLifecycle;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'console-bridge --help' for more information.");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_filter(Some(config.log_filter()));

    info!("console-bridge v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(SessionRegistry::new());
    let backend = backend_from_config(&config.exec);
    info!(backend = %backend.describe(), "execution backend ready");

    let driver: Arc<dyn SessionDriver> = match config.console.mode {
        ConsoleMode::Structured => {
            let lifecycle = Arc::new(DockerTargetLifecycle::new(
                Arc::clone(&backend),
                config.console.probe_timeout(),
            ));
            Arc::new(ConsoleController::new(
                Arc::clone(&registry),
                backend,
                lifecycle,
                config.console.history_capacity,
                config.console.command_timeout(),
            ))
        }
        ConsoleMode::RawAttach => Arc::new(RawAttachConsole::new(
            Arc::clone(&registry),
            config.console.attach_shell.clone(),
            config.console.history_capacity,
        )),
    };
    info!(mode = ?config.console.mode, "console driver ready");

    let state = AppState::new(registry, driver);
    let server = ServerConfig::new(config.server.host.clone(), config.server.port);

    if let Err(e) = serve_with_state(server, state).await {
        eprintln!("server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
