mod commands;
mod terminal;

use commands::{CommandLine, Commands, run, scan};
use blecount_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    let cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
    };
    print::banner(&cfg);

    let result = match commands.command {
        Commands::Run(args) => {
            print::section("getting ready", &cfg);
            run::run(args, &cfg).await
        }
        Commands::Scan(args) => {
            print::section("scanning", &cfg);
            scan::scan(args, &cfg).await
        }
    };

    if cfg.quiet == 0 {
        print::rule();
    }
    result
}
