//! Command-line surface. Parsed with `structopt`: doc comments become
//! `--help` text, and a couple of knobs fall back to environment
//! variables.

use std::path::PathBuf;

use structopt::StructOpt;

use crate::server::Config;

#[derive(StructOpt, Debug)]
#[structopt(name = "slimd", about = "SLIM protocol fixture server")]
pub struct Opt {
    /// Filesystem root(s) to search for fixture modules, prepended to the
    /// resolver search path at startup. May be given more than once.
    #[structopt(long, value_name = "DIR")]
    pub syspath: Vec<PathBuf>,

    /// Address to listen on.
    #[structopt(long, default_value = "0.0.0.0", env = "SLIMD_HOST")]
    pub inethost: String,

    /// Port to listen on.
    #[structopt(short, long, default_value = "8085", env = "SLIMD_PORT")]
    pub port: u16,

    /// Raise the log level from info to debug.
    #[structopt(short, long)]
    pub verbose: bool,

    /// Keep serving connections after the first session ends, instead of
    /// exiting once it completes.
    #[structopt(short, long)]
    pub keepalive: bool,
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Config {
            inethost: opt.inethost,
            port: opt.port,
            syspath: opt.syspath,
            keepalive: opt.keepalive,
        }
    }
}
