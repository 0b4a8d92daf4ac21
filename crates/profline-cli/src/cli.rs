use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use profline_codec::Format;

#[derive(Parser)]
#[command(
    name = "profline",
    about = "Inspect and edit profline profile files",
    version,
    after_help = "Arguments after `--` are -Key=value overrides merged over the file and never saved."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Profile file (default: next to the executable)
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    /// Codec of the profile file: line or structured
    #[arg(long, global = true)]
    pub format: Option<Format>,

    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ActionArg {
    Append,
    Merge,
    Overwrite,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the first value of a key
    Get(GetArgs),
    /// Set a key, replacing its first match or appending it
    Set(SetArgs),
    /// Remove every entry matching a pattern
    Remove(RemoveArgs),
    /// List entries, optionally filtered by a pattern
    List(ListArgs),
    /// Rewrite the profile in another format
    Convert(ConvertArgs),
    /// Write the profile as a compressed transport envelope
    Pack(PackArgs),
    /// Load a compressed transport envelope into the profile
    Unpack(UnpackArgs),
}

#[derive(Args)]
pub struct GetArgs {
    #[arg(allow_hyphen_values = true)]
    pub key: String,
    /// Record and print this value when the key is absent
    #[arg(long)]
    pub default: Option<String>,
    /// Print every matching value
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct SetArgs {
    #[arg(allow_hyphen_values = true)]
    pub key: String,
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    #[arg(allow_hyphen_values = true)]
    pub pattern: String,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(allow_hyphen_values = true)]
    pub pattern: Option<String>,
    /// Strip the literal part of the pattern from each key
    #[arg(long)]
    pub strip: bool,
}

#[derive(Args)]
pub struct ConvertArgs {
    #[arg(long)]
    pub to: Format,
}

#[derive(Args)]
pub struct PackArgs {
    pub out: PathBuf,
}

#[derive(Args)]
pub struct UnpackArgs {
    pub input: PathBuf,
    #[arg(long, value_enum, default_value = "merge")]
    pub action: ActionArg,
}

/// Split process arguments at the first `--`. Everything after it is an
/// override for the profile rather than an argument for clap.
pub fn split_overrides<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut head = Vec::new();
    let mut iter = args.into_iter();
    for arg in iter.by_ref() {
        if arg == "--" {
            break;
        }
        head.push(arg);
    }
    (head, iter.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overrides_follow_double_dash() {
        let (head, tail) = split_overrides(strings(&["profline", "list", "--", "-Debug", "-Port=1"]));
        assert_eq!(head, strings(&["profline", "list"]));
        assert_eq!(tail, strings(&["-Debug", "-Port=1"]));

        let (head, tail) = split_overrides(strings(&["profline", "list"]));
        assert_eq!(head.len(), 2);
        assert!(tail.is_empty());
    }

    #[test]
    fn parses_global_options_and_keys_with_dashes() {
        let cli = Cli::try_parse_from([
            "profline",
            "--format",
            "structured",
            "set",
            "-Retries",
            "-5",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(Format::Structured));
        match cli.command {
            Command::Set(args) => {
                assert_eq!(args.key, "-Retries");
                assert_eq!(args.value, "-5");
            }
            _ => panic!("expected set"),
        }
    }
}
