mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, probe};
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    match commands.command {
        Commands::Discover(args) => discover::discover(args, commands.quiet).await,
        Commands::Probe { ip, port, timeout } => {
            probe::probe(ip, port, timeout, commands.quiet).await
        }
    }
}
