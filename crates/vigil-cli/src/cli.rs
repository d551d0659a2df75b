//! Command-line argument definitions for the supervisor shell.

use clap::Parser;

/// Command-line interface for the vigil module supervisor.
#[derive(Parser, Debug)]
#[command(
    name = "vigil",
    version,
    about = "Supervises the vigil data-collection modules"
)]
pub(crate) struct Cli {
    /// Run modules against the testing dataset instead of production.
    #[arg(long)]
    pub(crate) testing: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,

    /// Modules to start automatically, comma separated. Pass "none" to
    /// disable autostart. Overrides the settings file.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub(crate) autostart_modules: Option<Vec<String>>,

    /// Run an interactive command session instead of waiting for signals.
    #[arg(short, long)]
    pub(crate) interactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(arguments: &[&str]) -> Cli {
        Cli::try_parse_from(arguments).expect("arguments parse")
    }

    #[test]
    fn defaults_are_production_headless() {
        let cli = parse(&["vigil"]);
        assert!(!cli.testing);
        assert!(!cli.verbose);
        assert!(!cli.interactive);
        assert!(cli.autostart_modules.is_none());
    }

    #[test]
    fn autostart_list_splits_on_commas() {
        let cli = parse(&["vigil", "--autostart-modules", "vigil-server,vigil-watcher-afk"]);
        assert_eq!(
            cli.autostart_modules.expect("override present"),
            ["vigil-server", "vigil-watcher-afk"]
        );
    }

    #[test]
    fn autostart_none_is_passed_through() {
        let cli = parse(&["vigil", "--autostart-modules", "none"]);
        assert_eq!(cli.autostart_modules.expect("override present"), ["none"]);
    }

    #[rstest]
    #[case::short(&["vigil", "-i", "-v"])]
    #[case::long(&["vigil", "--interactive", "--verbose"])]
    fn interactive_and_verbose_flags(#[case] arguments: &[&str]) {
        let cli = parse(arguments);
        assert!(cli.interactive);
        assert!(cli.verbose);
    }

    #[test]
    fn testing_flag_parses() {
        assert!(parse(&["vigil", "--testing"]).testing);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["vigil", "--frobnicate"]).is_err());
    }
}
