//! Command-line argument parsing.
//!
//! Usage:
//!   lua-runtime [-c<config>] [-e<code>]... [-r] [-q] [<file>]...
//!   lua-runtime [-c<config>] -j
//!
//! Actions (`-e`, `-r`, files) run in the order given.  With no actions and
//! no `-j`, an interactive loop reads chunks from stdin.

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

pub const USAGE: &str = "Usage: lua-runtime [-c<config>] [-e<code>]... [-r] [-q] [<file>]...\n\
                         \x20      lua-runtime [-c<config>] -j";

/// One step to perform, in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `-e<code>`: evaluate a chunk.
    Eval(String),
    /// `<file>`: evaluate a file.
    File(PathBuf),
    /// `-r`: discard interpreter state.
    Reset,
}

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Config file override (`-c<file>`).
    pub config: Option<PathBuf>,
    pub actions: Vec<Action>,
    /// Speak the JSON-line method channel on stdio (`-j`).
    pub channel: bool,
    /// Do not print successful results (`-q`).
    pub quiet: bool,
    /// Print usage and exit (`-h`).
    pub help: bool,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing; everything after is a file.
        if arg == "--" {
            args.actions
                .extend(argv[i + 1..].iter().map(|p| Action::File(PathBuf::from(p))));
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            args.actions.push(Action::File(PathBuf::from(arg)));
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'r' => args.actions.push(Action::Reset),
                'j' => args.channel = true,
                'q' => args.quiet = true,
                'h' => args.help = true,

                // -e<code>
                'e' => {
                    let code = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-e requires a code argument".to_owned());
                    };
                    args.actions.push(Action::Eval(code));
                }

                // -c<config>
                'c' => {
                    let file = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-c requires a config file argument".to_owned());
                    };
                    args.config = Some(PathBuf::from(file));
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    if args.channel && !args.actions.is_empty() {
        return Err("-j cannot be combined with -e, -r or files".to_owned());
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
