use clap::Parser;
use threadpad::cli::commands::{Cli, Commands};
use threadpad::cli::handlers;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init(args)) => {
            // Init runs before any config is loaded
            if let Err(e) = handlers::cmd_init(args) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            if let Err(e) = handlers::dispatch(cli) {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
