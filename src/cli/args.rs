//! CLI argument structures

use crate::format::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate one document per spreadsheet row from a template
#[derive(Parser)]
#[command(name = "batchdoc")]
#[command(about = "batchdoc - Generate one document per spreadsheet row from a template", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file, applied after batchdoc.toml
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a template and dataset and report how they line up
    Validate {
        /// Template document (.docx or .odt)
        #[arg(short, long)]
        template: PathBuf,

        /// Spreadsheet with one row per document (.xlsx)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Run the whole batch and save the resulting archive
    Generate {
        /// Template document (.docx or .odt)
        #[arg(short, long)]
        template: PathBuf,

        /// Spreadsheet with one row per document (.xlsx)
        #[arg(short, long)]
        data: PathBuf,

        /// Output format; repeat for several (default: from config)
        #[arg(short = 'f', long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        /// Filename pattern, e.g. "Receipt_{{STUDENT_NAME}}"
        #[arg(short, long)]
        pattern: Option<String>,

        /// Append a {{TOKEN}} marker to the filename pattern
        #[arg(long = "insert", value_name = "TOKEN")]
        insert: Vec<String>,

        /// Generate even when template placeholders are missing from the dataset
        #[arg(long)]
        force: bool,

        /// Where to write the archive (default: ./documents_<session>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Preview a filename pattern against values given on the command line
    Filename {
        /// Filename pattern containing {{TOKEN}} markers
        #[arg(short, long)]
        pattern: String,

        /// Column value for the preview row
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
}

/// Map verbosity count to a tracing filter directive.
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,reqwest=debug", // -vvv shows everything including dependencies
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("NAME=Alice=B").unwrap(),
            ("NAME".to_string(), "Alice=B".to_string())
        );
        assert_eq!(
            parse_key_value("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_key_value("NAME").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "batchdoc",
            "-vv",
            "generate",
            "-t",
            "t.docx",
            "-d",
            "d.xlsx",
            "--format",
            "pdf",
            "-f",
            ".odt",
            "--insert",
            "ID",
            "--force",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Generate {
                formats,
                insert,
                force,
                pattern,
                ..
            } => {
                assert_eq!(formats, vec![OutputFormat::Pdf, OutputFormat::Odt]);
                assert_eq!(insert, vec!["ID".to_string()]);
                assert!(force);
                assert!(pattern.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Cli::try_parse_from([
            "batchdoc", "generate", "-t", "t.docx", "-d", "d.xlsx", "-f", "rtf",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_log_level() {
        assert_eq!(get_log_level(0), "info");
        assert_eq!(get_log_level(1), "debug");
        assert_eq!(get_log_level(2), "trace");
    }
}
