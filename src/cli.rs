//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use sor4onnx::error::RenameResult;
use sor4onnx::pattern::SearchMode;
use sor4onnx::transform::{RenameMode, RenameRule};

/// Rename ONNX node names and tensor names
#[derive(Parser, Debug)]
#[command(name = "sor4onnx")]
#[command(version)]
#[command(about = "Simple op/tensor renamer for ONNX models", long_about = None)]
pub struct Cli {
    /// Input onnx file path
    #[arg(short = 'i', long = "input_onnx_file_path")]
    pub input_onnx_file_path: PathBuf,

    /// Text to look for and its replacement, e.g. --old_new "onnx::" ""
    #[arg(
        long = "old_new",
        num_args = 2,
        value_names = ["OLD", "NEW"],
        allow_hyphen_values = true,
        required = true
    )]
    pub old_new: Vec<String>,

    /// Output onnx file path; nothing is written when omitted
    #[arg(short = 'o', long = "output_onnx_file_path")]
    pub output_onnx_file_path: Option<PathBuf>,

    /// Scope of the rename
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = ModeArg::Full)]
    pub mode: ModeArg,

    /// How OLD is matched
    #[arg(
        short = 's',
        long = "search_mode",
        value_enum,
        default_value_t = SearchModeArg::ExactMatch
    )]
    pub search_mode: SearchModeArg,

    /// Only error lines are shown
    #[arg(short = 'n', long = "non_verbose")]
    pub non_verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[default]
    Full,
    Inputs,
    Outputs,
}

impl From<ModeArg> for RenameMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Full => RenameMode::Full,
            ModeArg::Inputs => RenameMode::Inputs,
            ModeArg::Outputs => RenameMode::Outputs,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SearchModeArg {
    #[default]
    #[value(name = "exact_match")]
    ExactMatch,
    #[value(name = "partial_match")]
    PartialMatch,
    #[value(name = "prefix_match")]
    PrefixMatch,
    #[value(name = "suffix_match")]
    SuffixMatch,
}

impl From<SearchModeArg> for SearchMode {
    fn from(arg: SearchModeArg) -> Self {
        match arg {
            SearchModeArg::ExactMatch => SearchMode::Exact,
            SearchModeArg::PartialMatch => SearchMode::Partial,
            SearchModeArg::PrefixMatch => SearchMode::Prefix,
            SearchModeArg::SuffixMatch => SearchMode::Suffix,
        }
    }
}

impl Cli {
    /// Build the rename rule
    pub fn rule(&self) -> RenameResult<RenameRule> {
        Ok(RenameRule::from_old_new(self.old_new.as_slice())?
            .with_mode(self.mode.into())
            .with_search_mode(self.search_mode.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_full_command() {
        let cli = Cli::try_parse_from([
            "sor4onnx",
            "-i",
            "in.onnx",
            "--old_new",
            "onnx::",
            "",
            "-o",
            "out.onnx",
            "--search_mode",
            "partial_match",
        ])
        .unwrap();

        let rule = cli.rule().unwrap();
        assert_eq!(rule.old, "onnx::");
        assert_eq!(rule.new, "");
        assert_eq!(rule.mode, RenameMode::Full);
        assert_eq!(rule.search_mode, SearchMode::Partial);
        assert_eq!(cli.output_onnx_file_path, Some(PathBuf::from("out.onnx")));
    }

    #[test]
    fn test_old_new_needs_two_values() {
        let parsed = Cli::try_parse_from(["sor4onnx", "-i", "in.onnx", "--old_new", "only"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hyphen_values() {
        let cli = Cli::try_parse_from(["sor4onnx", "-i", "m.onnx", "--old_new", "-a", "-b"]).unwrap();
        assert_eq!(cli.old_new, vec!["-a", "-b"]);
    }

    #[test]
    fn test_invalid_mode_rejected_by_parser() {
        let err = Cli::try_parse_from([
            "sor4onnx", "-i", "m.onnx", "--old_new", "a", "b", "-m", "nodes",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_value_names_match_library() {
        for arg in SearchModeArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(SearchMode::from(*arg).as_str(), name);
        }
        for arg in ModeArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(RenameMode::from(*arg).to_string(), name);
        }
    }

    #[test]
    fn test_help_lists_allowed_values() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("suffix_match"));
        assert!(help.contains("outputs"));
    }
}
