//! Command-line interface for placejournal.
//!
//! This module provides the CLI structure for the `placejournal` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    AddCommand, ConfigCommand, ListCommand, MapCommand, OutputFormat, ShowCommand,
};

/// placejournal - Keep a journal of the places you photograph
///
/// Capture a photo, tag it with where you were, and browse your places as a
/// list or on a map. Everything stays on this machine.
#[derive(Debug, Parser)]
#[command(name = "placejournal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check camera, location and biometric access
    Gate,

    /// Capture a place
    Add(AddCommand),

    /// List saved places, newest first
    List(ListCommand),

    /// Show one place
    Show(ShowCommand),

    /// Show places on a map
    Map(MapCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Check if the command needs the capability gate to pass first.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            Self::Add(_) | Self::List(_) | Self::Show(_) | Self::Map(_)
        )
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "placejournal");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["placejournal", "gate"]).verbosity(), Verbosity::Normal);
        assert_eq!(
            parse(&["placejournal", "-v", "gate"]).verbosity(),
            Verbosity::Verbose
        );
        assert_eq!(
            parse(&["placejournal", "-vv", "gate"]).verbosity(),
            Verbosity::Trace
        );
        assert_eq!(
            parse(&["placejournal", "-q", "-v", "gate"]).verbosity(),
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_parse_add_with_position() {
        let cli = parse(&[
            "placejournal",
            "add",
            "--photo",
            "beach.jpg",
            "--title",
            "Beach",
            "--lat",
            "-23.5",
            "--lon",
            "-46.6",
        ]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.photo, "beach.jpg");
        assert_eq!(add.title, "Beach");
        assert_eq!(add.lat, Some(-23.5));
        assert_eq!(add.lon, Some(-46.6));
        assert!(!add.no_location);
    }

    #[test]
    fn test_parse_add_defaults_to_blank_title() {
        let cli = parse(&["placejournal", "add", "--photo", "file:///a.jpg"]);
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert!(add.title.is_empty());
        assert!(add.lat.is_none());
    }

    #[test]
    fn test_add_requires_photo() {
        assert!(Cli::try_parse_from(["placejournal", "add"]).is_err());
    }

    #[test]
    fn test_add_lat_requires_lon() {
        assert!(
            Cli::try_parse_from(["placejournal", "add", "--photo", "a.jpg", "--lat", "1.0"])
                .is_err()
        );
    }

    #[test]
    fn test_add_no_location_conflicts_with_position() {
        assert!(Cli::try_parse_from([
            "placejournal",
            "add",
            "--photo",
            "a.jpg",
            "--lat",
            "1.0",
            "--lon",
            "2.0",
            "--no-location",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_list_format() {
        let cli = parse(&["placejournal", "list", "--format", "json"]);
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_show_and_map() {
        let cli = parse(&["placejournal", "show", "1705314600000", "--json"]);
        assert!(matches!(cli.command, Command::Show(ShowCommand { json: true, .. })));

        let cli = parse(&["placejournal", "map"]);
        assert!(matches!(cli.command, Command::Map(MapCommand { id: None })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["placejournal", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_gated_commands() {
        assert!(!parse(&["placejournal", "gate"]).command.is_gated());
        assert!(!parse(&["placejournal", "config", "show"]).command.is_gated());
        assert!(parse(&["placejournal", "list"]).command.is_gated());
        assert!(parse(&["placejournal", "map", "1"]).command.is_gated());
    }
}
