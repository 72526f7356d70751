//! Entry point: parse arguments, spawn the ingester and input reader, then
//! hand off to [`morepager::app::App`]'s main loop. Mirrors the teacher's
//! `main.rs` shape (early flag handling before any I/O is touched, then
//! construct and run the long-lived loop) without its MUD-client setup.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use crossterm::tty::IsTty;
use tokio::sync::mpsc;

use morepager::app::App;
use morepager::cli::{self, CliArgs};
use morepager::clipboard::{ArboardClipboard, ClipboardSink, NullClipboard};
use morepager::concurrency::IngestHarness;
use morepager::error::ConsoleError;
use morepager::ingest::{self, EnumerateFlags};
use morepager::input;
use morepager::terminal::CrosstermConsole;

const INPUT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("more: {message}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    if args.show_help {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }
    if args.show_license {
        println!("{}", cli::LICENSE);
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("more: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<(), ConsoleError> {
    if !io::stdout().is_tty() {
        return Err(ConsoleError::NotATerminal);
    }

    let console = CrosstermConsole::new(io::stdout())?;
    let _raw_mode = CrosstermConsole::enter_raw_mode()?;

    let store = Arc::new(morepager::linestore::LineStore::new());
    let flags = EnumerateFlags { basic: args.basic, recursive: args.recursive };
    let paths = args.paths;
    let harness = IngestHarness::spawn(store.clone(), move |store, shutdown| async move { ingest::run(&paths, flags, store, shutdown).await });

    let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let _reader = input::spawn_reader(input_tx);

    let clipboard: Box<dyn ClipboardSink> = match ArboardClipboard::new() {
        Ok(c) => Box::new(c),
        Err(_) => Box::new(NullClipboard),
    };

    let mut app = App::new(console, clipboard, store, harness, input_rx, args.debug_display);
    app.run().await.map_err(ConsoleError::from)
}
