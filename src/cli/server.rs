use error_stack::{Result, ResultExt};
use posts::config::Server as Config;
use posts::server::StartServerError;

use clap::Parser;
use std::net::IpAddr;
use std::num::NonZeroUsize;

/// Expose the posts HTTP API
#[derive(Debug, Parser)]
pub struct ServerCommand {
    #[clap(long)]
    pub address: Option<IpAddr>,
    #[clap(long)]
    pub port: Option<u16>,
    #[clap(long)]
    pub workers: Option<NonZeroUsize>,
}

pub fn run(args: &ServerCommand) -> Result<(), StartServerError> {
    let mut config = Config::load().change_context(StartServerError)?;
    args.override_config(&mut config);

    posts::logging::init(&config).change_context(StartServerError)?;
    actix_web::rt::System::new().block_on(posts::server::run(config))
}

impl ServerCommand {
    fn override_config(&self, config: &mut Config) {
        // override server configurations if set by the cli
        if let Some(address) = self.address {
            config.address = address;
        }

        if let Some(port) = self.port {
            config.port = port;
        }

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }
}
