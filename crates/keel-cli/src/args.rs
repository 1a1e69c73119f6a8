//! CLI argument definitions using clap
//!
//! - keel test [ARGS]...     # Run the app's tests
//!
//! Flag parsing is switched off for `test`; its arguments are routed by
//! `keel_core::args::route_test_args` instead.

use clap::{Parser, Subcommand};

const TEST_LONG_ABOUT: &str = r#"Run the application's tests

Must be run from inside a keel application (a directory tree containing
keel.app). Every argument is passed on to the test runner, except:

  --trace <file>, --trace=<file>   Write a trace of the test run to <file>
  --codegen-debug                  Dump generated code for debugging
  --prepare                        Print the test environment and exit
  --no-color                       Do not colorize log output
  -h, --help                       Show this help

EXAMPLES:
  keel test                        # Run all tests
  keel test -run TestGet -v        # Run matching tests, verbosely
  keel test -json                  # Emit the structured test-event stream
  keel test --prepare              # Print the environment tests run with"#;

#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(about = "Keel - build and test applications with the keel daemon")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the application's tests
    #[command(long_about = TEST_LONG_ABOUT, disable_help_flag = true)]
    Test {
        /// Arguments for the test runner
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },
}
