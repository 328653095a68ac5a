use std::io::IsTerminal;

use actix_web::{App, HttpServer, middleware, web};
use anyhow::Result;
use clap::Parser;
use log::{error, info};

use rootserve::{ServeConfig, StartupError, args::CliArgs, configure_app};

fn main() {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let color_choice = if std::io::stderr().is_terminal() {
        simplelog::ColorChoice::Auto
    } else {
        simplelog::ColorChoice::Never
    };

    if let Err(e) = simplelog::TermLogger::init(
        log_level,
        simplelog::ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        simplelog::TerminalMode::Mixed,
        color_choice,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }

    if let Err(e) = run(args) {
        for cause in format!("{e:#}").lines() {
            error!("{cause}");
        }
        std::process::exit(1);
    }
}

#[actix_web::main]
async fn run(args: CliArgs) -> Result<()> {
    let config = ServeConfig::try_from_args(args)?;
    serve(config).await.map_err(anyhow::Error::from)
}

async fn serve(config: ServeConfig) -> Result<(), StartupError> {
    let addr = config.socket_addr();
    let root = config.root.path().display().to_string();
    let data = web::Data::new(config);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %Dms"))
            .configure(configure_app)
    })
    .bind(addr)
    .map_err(|e| StartupError::BindError(addr.to_string(), e))?;

    info!("Server starting on http://{addr}");
    info!("Serving files from: {root}");

    server
        .run()
        .await
        .map_err(|e| StartupError::IoError("Server failed".to_string(), e))
}
