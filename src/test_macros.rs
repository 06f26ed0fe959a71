//! Declarative test macros shared by the command modules.
//!
//! CLI macros parse a `vtstore` command line and assert on the matched subcommand's fields.
//! Output macros render an rstest fixture in one output format.

/// Parse `vtstore <args>` and yield the `Command::$variant` payload.
#[macro_export]
macro_rules! parse_command {
    ($variant:ident, [$($arg:expr),* $(,)?]) => {{
        let parsed = <$crate::cli::Args as ::clap::Parser>::try_parse_from(["vtstore", $($arg),*]);
        match parsed.map(|args| args.command) {
            Ok($crate::commands::Command::$variant(cmd)) => cmd,
            Ok(other) => panic!("Expected {} command, got {:?}", stringify!($variant), other),
            Err(err) => panic!("Arguments did not parse: {}", err),
        }
    }};
}

/// Check the fields a command gets when only its required arguments are given.
#[macro_export]
macro_rules! cli_defaults_test {
    (
        command: $cmd:literal,
        variant: $variant:ident,
        required_args: [$($req_arg:literal),*],
        defaults: {
            $($field:ident : $expected:expr),* $(,)?
        } $(,)?
    ) => {
        #[test]
        fn test_defaults() {
            let _cmd = $crate::parse_command!($variant, [$cmd $(, $req_arg)*]);
            $(
                assert_eq!(_cmd.$field, $expected, concat!("default of ", stringify!($field)));
            )*
        }
    };
}

/// Check that one option lands in the expected field.
#[macro_export]
macro_rules! cli_option_test {
    (
        command: $cmd:literal,
        variant: $variant:ident,
        $(required_args: [$($req_arg:literal),+],)?
        test_name: $test_name:ident,
        args: [$($arg:literal),+],
        field: $field:ident,
        expected: $expected:expr $(,)?
    ) => {
        #[test]
        fn $test_name() {
            let cmd = $crate::parse_command!($variant, [$cmd $($(, $req_arg)+)? $(, $arg)+]);
            assert_eq!(cmd.$field, $expected, concat!("value of ", stringify!($field)));
        }
    };
}

/// `--limit` defaults to `default` and accepts only `1..=max`.
#[macro_export]
macro_rules! cli_limit_tests {
    (
        command: $cmd:literal,
        variant: $variant:ident,
        required_args: [$($req_arg:literal),*],
        limit: {
            field: $field:ident,
            default: $default:expr,
            max: $max:expr $(,)?
        } $(,)?
    ) => {
        #[test]
        fn test_limit_default() {
            let cmd = $crate::parse_command!($variant, [$cmd $(, $req_arg)*]);
            assert_eq!(cmd.$field, $default);
        }

        #[test]
        fn test_limit_bounds() {
            let parse = |limit: &str| {
                <$crate::cli::Args as ::clap::Parser>::try_parse_from(
                    ["vtstore", $cmd $(, $req_arg)*, "--limit", limit],
                )
            };
            assert!(parse("0").is_err(), "zero limit accepted");
            assert!(parse(&$max.to_string()).is_ok(), "max limit rejected");
            assert!(parse(&($max + 1).to_string()).is_err(), "limit above max accepted");
        }
    };
}

/// A command without `required_arg` fails, and the error names it.
///
/// ```ignore
/// cli_required_arg_test! {
///     command: "query",
///     test_name: test_requires_script,
///     required_arg: "<SCRIPT>",
/// }
/// ```
#[macro_export]
macro_rules! cli_required_arg_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        required_arg: $arg:literal $(,)?
    ) => {
        #[test]
        fn $test_name() {
            match <$crate::cli::Args as ::clap::Parser>::try_parse_from(["vtstore", $cmd]) {
                Ok(_) => panic!(concat!($cmd, " parsed without ", $arg)),
                Err(err) => assert!(err.to_string().contains($arg), "error was: {}", err),
            }
        }
    };
}

/// The given command line is rejected.
#[macro_export]
macro_rules! cli_error_test {
    (
        command: $cmd:literal,
        test_name: $test_name:ident,
        args: [$($arg:literal),+] $(,)?
    ) => {
        #[test]
        fn $test_name() {
            let result =
                <$crate::cli::Args as ::clap::Parser>::try_parse_from(["vtstore", $cmd, $($arg),+]);
            assert!(result.is_err());
        }
    };
}

/// Executing the command on a fresh in-memory session (no stored relations) fails.
#[macro_export]
macro_rules! execute_empty_db_test {
    (
        cmd_type: $cmd_type:ty,
        cmd: $cmd:expr $(,)?
    ) => {
        #[test]
        fn test_empty_db() {
            use $crate::commands::Execute;
            let mut session = $crate::test_utils::mem_session();
            let cmd: $cmd_type = $cmd;
            assert!(cmd.execute(&mut session).is_err());
        }
    };
}

/// The fixture's table rendering equals `expected` exactly.
#[macro_export]
macro_rules! output_table_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        expected: $expected:expr $(,)?
    ) => {
        #[::rstest::rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::Outputable;
            assert_eq!($fixture.to_table(), $expected);
        }
    };
}

/// The fixture rendered as `format` (`Table` or `Toon`) contains every needle.
///
/// ```ignore
/// output_contains_test! {
///     test_name: test_format_toon,
///     fixture: clips_result,
///     fixture_type: QueryResult,
///     format: Toon,
///     contains: ["script:", "backend: cozo"],
/// }
/// ```
#[macro_export]
macro_rules! output_contains_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        format: $format:ident,
        contains: [$($needle:literal),* $(,)?] $(,)?
    ) => {
        #[::rstest::rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::{OutputFormat, Outputable};
            let output = $fixture.format(OutputFormat::$format);
            $(
                assert!(output.contains($needle), "missing {:?} in:\n{}", $needle, output);
            )*
        }
    };
}

/// The fixture renders as valid JSON whose top-level fields match.
#[macro_export]
macro_rules! output_json_test {
    (
        test_name: $test_name:ident,
        fixture: $fixture:ident,
        fixture_type: $fixture_type:ty,
        assertions: { $($field:literal : $expected:expr),* $(,)? } $(,)?
    ) => {
        #[::rstest::rstest]
        fn $test_name($fixture: $fixture_type) {
            use $crate::output::{OutputFormat, Outputable};
            let parsed: serde_json::Value =
                serde_json::from_str(&$fixture.format(OutputFormat::Json)).expect("valid JSON");
            $(
                assert_eq!(parsed[$field], $expected, concat!("JSON field ", $field));
            )*
        }
    };
}
