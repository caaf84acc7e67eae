// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! enve - Environment Activation Launcher CLI

use clap::Parser;
use miette::Result;

mod cmd_load;
mod cmd_show;

use cmd_load::CmdLoad;
use enve::Verbosity;


#[derive(Parser)]
#[clap(
    name = "enve",
    about = "Environment Activation Launcher",
    version,
    long_about = "Activate the environment described by an enve.jsonnet config and run a command inside it"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(flatten)]
    load: CmdLoad,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

impl Logging {
    /// Level from the flags or the `use-verbose` option, whichever is more
    /// verbose.
    fn level(&self, option: Verbosity) -> tracing::Level {
        let from_flags = match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };
        let from_option = match option {
            Verbosity::Debug => tracing::Level::DEBUG,
            Verbosity::Info => tracing::Level::INFO,
            Verbosity::Warning if self.quiet => tracing::Level::ERROR,
            Verbosity::Warning => tracing::Level::WARN,
        };
        from_flags.max(from_option)
    }
}

impl Opt {
    async fn run(mut self) -> Result<i32> {
        let options = self.load.enve_options()?;

        tracing_subscriber::fmt()
            .with_max_level(self.logging.level(options.verbose.value))
            .with_writer(std::io::stderr)
            .init();

        self.load.run(options).await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
