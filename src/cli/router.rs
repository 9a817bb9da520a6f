//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::{run_filename, run_generate, run_validate, GenerateOptions};
use crate::config::BatchdocConfig;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, config: &BatchdocConfig) -> Result<()> {
    match command {
        Commands::Validate { template, data } => run_validate(config, &template, &data).await,
        Commands::Generate {
            template,
            data,
            formats,
            pattern,
            insert,
            force,
            output,
        } => {
            let options = GenerateOptions {
                template,
                data,
                formats,
                pattern,
                insert,
                force,
                output,
            };
            run_generate(config, options).await
        }
        Commands::Filename { pattern, values } => run_filename(&pattern, &values),
    }
}
