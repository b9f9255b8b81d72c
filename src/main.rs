use tape_weave::cli::{Cli, Commands};
use tape_weave::error::Result;
use tape_weave::{commands, logger};
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let args = Cli::parse_args();

    // Initialize logging system
    logger::init(args.verbose)?;

    debug!("tape-weave CLI starting");

    match run(args) {
        Ok(_) => {
            info!("Operation completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Operation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Cli) -> Result<()> {
    match args.command {
        Commands::Info { cartridge } => commands::info::execute(cartridge),

        Commands::Locate {
            cartridge,
            value,
            from,
        } => commands::locate::execute(cartridge, value, from),

        Commands::Map { definition, rescan } => commands::map::execute(definition, rescan),

        Commands::Order {
            definition,
            physical,
            export,
        } => commands::order::execute(definition, physical, export),

        Commands::Condense {
            definition,
            output,
            physical,
        } => commands::condense::execute(definition, output, physical),
    }
}
