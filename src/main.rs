//! # nextport - Next.js → React Router
//!
//! CLI sobre el motor de conversión: `convert`, `routes`, `rules` e `init`.

use clap::Parser;
use colored::*;
use nextport::commands::{self, Cli, Commands};

fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Convert {
            path,
            out,
            dry_run,
            json,
            report,
            overrides,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(commands::convert::handle_convert_command(
                commands::convert::ConvertRequest {
                    root: path,
                    out,
                    dry_run,
                    json,
                    report,
                    overrides,
                },
            ))
        }
        Commands::Routes { path, json } => {
            commands::routes::handle_routes_command(&path, json)?;
            Ok(true)
        }
        Commands::Rules {
            path,
            json,
            overrides,
        } => {
            commands::rules::handle_rules_command(&path, &overrides, json)?;
            Ok(true)
        }
        Commands::Init { path, force } => {
            commands::init::handle_init_command(&path, force)?;
            Ok(true)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("{} {:#}", "❌".red(), e);
            std::process::exit(1);
        }
    }
}
