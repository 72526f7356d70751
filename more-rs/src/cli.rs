//! Command-line argument parsing.
//!
//! Usage: `more [-b] [-dd] [-s] [-license] [-?] [file ...]`
//!
//! Hand-rolled rather than a derive-macro crate (spec.md §6 AMBIENT): five
//! flags and no subcommands is well under the complexity where a parsing
//! crate earns its keep, matching the teacher's own `parse_argv`.

// ── Public types ──────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// `-b`: basic enumeration — bare `open()`, a directory is an error.
    pub basic: bool,
    /// `-dd`: debug display — clears and redraws the whole viewport on
    /// every change, for auditing internal state.
    pub debug_display: bool,
    /// `-s`: directories expand recursively instead of one level deep.
    pub recursive: bool,
    /// `-license`: print the license text and exit.
    pub show_license: bool,
    /// `-?`: print usage and exit.
    pub show_help: bool,
    /// File/path patterns to page through; empty means stdin.
    pub paths: Vec<String>,
}

// ── Parsing ─────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "--" => {
                args.paths.extend(argv[i + 1..].iter().cloned());
                break;
            }
            "-b" => args.basic = true,
            "-dd" => args.debug_display = true,
            "-s" => args.recursive = true,
            "-license" => args.show_license = true,
            "-?" => args.show_help = true,
            "-" => args.paths.push(arg.to_owned()),
            _ if arg.starts_with('-') => return Err(format!("illegal option -- {arg}")),
            _ => args.paths.push(arg.to_owned()),
        }
        i += 1;
    }

    Ok(args)
}

/// Usage text for `-?`.
pub const USAGE: &str = "usage: more [-b] [-dd] [-s] [-license] [-?] [file ...]";

/// License text for `-license`.
pub const LICENSE: &str = "more-pager is distributed under the same terms as its upstream project.";

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args_reads_stdin() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(a.paths.is_empty());
        assert_eq!(a, CliArgs::default());
    }

    #[test]
    fn basic_flag() {
        let a = parse_argv(&argv(&["-b"])).unwrap();
        assert!(a.basic);
    }

    #[test]
    fn debug_display_flag() {
        let a = parse_argv(&argv(&["-dd"])).unwrap();
        assert!(a.debug_display);
    }

    #[test]
    fn recursive_flag() {
        let a = parse_argv(&argv(&["-s"])).unwrap();
        assert!(a.recursive);
    }

    #[test]
    fn license_flag() {
        let a = parse_argv(&argv(&["-license"])).unwrap();
        assert!(a.show_license);
    }

    #[test]
    fn help_flag() {
        let a = parse_argv(&argv(&["-?"])).unwrap();
        assert!(a.show_help);
    }

    #[test]
    fn combined_flags_and_paths() {
        let a = parse_argv(&argv(&["-b", "-s", "one.txt", "two.txt"])).unwrap();
        assert!(a.basic);
        assert!(a.recursive);
        assert_eq!(a.paths, vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn dash_alone_is_a_path() {
        let a = parse_argv(&argv(&["-"])).unwrap();
        assert_eq!(a.paths, vec!["-"]);
    }

    #[test]
    fn double_dash_ends_flag_processing() {
        let a = parse_argv(&argv(&["--", "-b"])).unwrap();
        assert!(!a.basic);
        assert_eq!(a.paths, vec!["-b"]);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }
}
