//! Splits the adapter's argument vector and parses the structured part.
//!
//! Everything after the first `--` is handed to the framework untouched;
//! everything before it is parsed against the grammar assembled from the
//! registry:
//!
//! ```text
//! <prog> discover <tool> [--simple] [--no-hide-stdio] [--pretty] [-- <framework-args>...]
//! ```

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::options::{AdapterOptions, CommandName};
use crate::registry::Registry;

/// Token separating adapter arguments from framework arguments.
pub const SEPARATOR: &str = "--";

/// A fully parsed adapter request, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: String,
    pub command: CommandName,
    pub options: AdapterOptions,
    /// Pass-through arguments for the framework, in their original order.
    pub args: Vec<String>,
}

/// Split `argv` at the first [`SEPARATOR`] into `(structured, pass_through)`.
///
/// Without a separator the whole vector is structured and the pass-through
/// part is empty.
pub fn split_args<S: AsRef<str>>(argv: &[S]) -> (Vec<String>, Vec<String>) {
    let owned = |items: &[S]| items.iter().map(|s| s.as_ref().to_owned()).collect::<Vec<_>>();
    match argv.iter().position(|arg| arg.as_ref() == SEPARATOR) {
        Some(pos) => (owned(&argv[..pos]), owned(&argv[pos + 1..])),
        None => (owned(argv), Vec::new()),
    }
}

/// Assemble the CLI grammar: one subcommand per enabled command, with one
/// nested subcommand per tool that contributes a grammar.
///
/// Tool words without a grammar are still accepted so that the dispatcher
/// reports them as unsupported tools.
pub fn build_cli(registry: &Registry) -> Command {
    let mut cli = Command::new("testbridge")
        .about("Run Python testing operations.")
        .disable_help_subcommand(true);

    for &command in CommandName::ENABLED {
        let mut sub = Command::new(command.as_str())
            .disable_help_subcommand(true)
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(clap::value_parser!(String));

        for (tool, grammar) in registry.grammars() {
            let mut tool_cmd = grammar.subcommand(command, tool);
            if command == CommandName::Discover {
                tool_cmd = with_discover_flags(tool_cmd);
            }
            sub = sub.subcommand(tool_cmd);
        }
        cli = cli.subcommand(sub);
    }

    cli
}

fn with_discover_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("simple")
            .long("simple")
            .action(ArgAction::SetTrue)
            .help("Emit a flat list of tests instead of the hierarchy"),
    )
    .arg(
        Arg::new("hidestdio")
            .long("no-hide-stdio")
            .action(ArgAction::SetFalse)
            .help("Show the framework's own output while discovering"),
    )
    .arg(
        Arg::new("pretty")
            .long("pretty")
            .action(ArgAction::SetTrue)
            .help("Indent the JSON output"),
    )
}

/// Split `argv` (without the program name) and parse the structured part.
///
/// Missing command or tool is a usage error returned as a [`clap::Error`];
/// nothing is looked up in the registry beyond building the grammar.
pub fn parse_invocation<S: AsRef<str>>(
    prog: &str,
    argv: &[S],
    registry: &Registry,
) -> Result<Invocation, clap::Error> {
    let (structured, args) = split_args(argv);

    let mut cli = build_cli(registry);
    let matches = cli.try_get_matches_from_mut(std::iter::once(prog.to_owned()).chain(structured))?;

    let Some((command_name, command_matches)) = matches.subcommand() else {
        return Err(cli.error(ErrorKind::MissingSubcommand, "missing command"));
    };
    let command: CommandName = command_name
        .parse()
        .map_err(|msg: String| cli.error(ErrorKind::InvalidSubcommand, msg))?;

    let Some((tool, tool_matches)) = command_matches.subcommand() else {
        return Err(cli.error(ErrorKind::MissingSubcommand, "missing tool"));
    };

    let defaults = AdapterOptions::default();
    let options = AdapterOptions {
        simple: flag(tool_matches, "simple", defaults.simple),
        hidestdio: flag(tool_matches, "hidestdio", defaults.hidestdio),
        pretty: flag(tool_matches, "pretty", defaults.pretty),
    };

    tracing::debug!(tool, command = %command, ?options, pass_through = args.len(), "parsed invocation");

    Ok(Invocation {
        tool: tool.to_owned(),
        command,
        options,
        args,
    })
}

/// Flags only exist on tools with a grammar; anything else keeps defaults.
fn flag(matches: &ArgMatches, id: &str, default: bool) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(default)
}
