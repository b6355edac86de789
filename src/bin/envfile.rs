use std::env;
use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use clap::{Args, Parser, Subcommand};
use envfile::{EnvLoader, EnvMap, Entry};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "envfile",
    version,
    about = "Parse .env files and run commands with their variables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the merged variables as re-parseable `KEY="value"` lines.
    Print(FileArgs),
    /// Parse the files and report errors without printing values.
    Check(FileArgs),
    /// Load the files and execute a command with the variables set.
    Run(RunArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
struct FileArgs {
    /// Dotenv file path(s). Repeat or pass comma-separated paths.
    #[arg(short, long = "file", value_name = "PATHS", value_delimiter = ',', default_value = ".env")]
    files: Vec<PathBuf>,

    /// Skip selected files that do not exist.
    #[arg(short, long = "ignore-missing")]
    ignore_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
struct RunArgs {
    #[command(flatten)]
    files: FileArgs,

    /// Keep variables that are already set in the environment.
    #[arg(long)]
    no_override: bool,

    /// Command to execute, followed by its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    process::exit(run(cli.command));
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(command: Commands) -> i32 {
    let result = match command {
        Commands::Print(args) => print_entries(&args),
        Commands::Check(args) => check_files(&args),
        Commands::Run(args) => execute_run(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("envfile: {err}");
            1
        }
    }
}

fn loader_for(args: &FileArgs) -> EnvLoader {
    EnvLoader::new()
        .paths(&args.files)
        .required(!args.ignore_missing)
}

fn print_entries(args: &FileArgs) -> Result<i32, String> {
    let map = loader_for(args).read().map_err(|err| err.to_string())?;
    print!("{}", render(&map));
    Ok(0)
}

fn check_files(args: &FileArgs) -> Result<i32, String> {
    let entries = loader_for(args).entries().map_err(|err| err.to_string())?;
    println!("ok: {} variables", entries.len());
    Ok(0)
}

fn execute_run(args: RunArgs) -> Result<i32, String> {
    let entries = loader_for(&args.files)
        .entries()
        .map_err(|err| err.to_string())?;
    let Some((program, program_args)) = args.command.split_first() else {
        return Err("missing command after `run`".to_owned());
    };

    let mut command = Command::new(program);
    command.args(program_args);
    for Entry { key, value, .. } in entries {
        if args.no_override && env::var_os(&key).is_some() {
            continue;
        }
        command.env(key, value);
    }

    execute_command(command, program)
}

#[cfg(unix)]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    Ok(status.code().unwrap_or(1))
}

/// Render a map as double-quoted assignments that parse back to the same map.
///
/// A closing quote right after a backslash never terminates a value, so values
/// ending in `\` are written inline between `"""` markers instead.
fn render(map: &EnvMap) -> String {
    let mut out = String::new();
    for (key, value) in map {
        let quote = if value.ends_with('\\') { "\"\"\"" } else { "\"" };
        out.push_str(key);
        out.push('=');
        out.push_str(quote);
        for ch in value.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '$' => out.push_str("\\$"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{0c}' => out.push_str("\\f"),
                '\u{08}' => out.push_str("\\b"),
                _ => out.push(ch),
            }
        }
        out.push_str(quote);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("envfile").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn run_uses_defaults() {
        let Commands::Run(args) = parse(&["run", "printenv", "FOO"]).command else {
            panic!("expected run");
        };

        assert_eq!(args.files.files, vec![PathBuf::from(".env")]);
        assert!(!args.files.ignore_missing);
        assert!(!args.no_override);
        assert_eq!(
            args.command,
            vec![OsString::from("printenv"), OsString::from("FOO")]
        );
    }

    #[test]
    fn run_supports_repeated_and_comma_separated_files() {
        let Commands::Run(args) = parse(&[
            "run",
            "-f",
            "base.env,local.env",
            "--file",
            "custom.env",
            "--",
            "printenv",
            "FOO",
        ])
        .command
        else {
            panic!("expected run");
        };

        assert_eq!(
            args.files.files,
            vec![
                PathBuf::from("base.env"),
                PathBuf::from("local.env"),
                PathBuf::from("custom.env"),
            ]
        );
    }

    #[test]
    fn run_passes_hyphenated_command_arguments_through() {
        let Commands::Run(args) = parse(&["run", "--", "ls", "-la"]).command else {
            panic!("expected run");
        };
        assert_eq!(args.command, vec![OsString::from("ls"), OsString::from("-la")]);
    }

    #[test]
    fn run_requires_a_command() {
        let err = Cli::try_parse_from(["envfile", "run"]).expect_err("parse should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn render_round_trips_through_parser() {
        let map = EnvMap::from([
            ("A".to_owned(), "plain".to_owned()),
            ("B".to_owned(), "line1\nline2\t\"q\" \\ $HOME # x".to_owned()),
            ("C".to_owned(), String::new()),
        ]);

        let rendered = render(&map);
        assert_eq!(
            rendered.lines().next().expect("first line"),
            "A=\"plain\""
        );
        assert_eq!(envfile::parse_str(&rendered).expect("reparse"), map);
    }

    #[test]
    fn render_uses_triple_quotes_for_trailing_backslash() {
        let map = EnvMap::from([
            ("DIR".to_owned(), "C:\\Users\\".to_owned()),
            ("Q".to_owned(), "say \"hi\"\\".to_owned()),
        ]);

        let rendered = render(&map);
        assert_eq!(
            rendered.lines().next().expect("first line"),
            "DIR=\"\"\"C:\\\\Users\\\\\"\"\""
        );
        assert_eq!(envfile::parse_str(&rendered).expect("reparse"), map);
    }
}
