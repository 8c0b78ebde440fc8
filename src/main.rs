#[macro_use]
extern crate log;

use anyhow::Result;
use structopt::StructOpt;

use slim_fixture_server::cli::Opt;
use slim_fixture_server::server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let opt = Opt::from_args();
    let level = if opt.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(level)
        .parse_default_env()
        .init();

    info!("starting slimd on {}:{}", opt.inethost, opt.port);

    let config = server::Config::from(opt);
    if let Err(e) = server::serve(config).await {
        error!("FATAL: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
