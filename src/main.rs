use std::path::PathBuf;

use hn_thread::app::{Mode, Options};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "HN_THREAD_LOG";

const HELP: &str = "HN-Thread — Step through Hacker News reply threads.

Usage: hn-thread [--tree | --slideshow] [--config <path>] <item-id>

  --tree               Print the thread nested by reply (default)
  --slideshow          Step through replies in posting order
  --config <path>      Read settings from <path>
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Parsed {
    Exit(i32),
    Run(Options),
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Parsed::Exit(code) => std::process::exit(code),
        Parsed::Run(options) => options,
    };

    init_logging();

    if let Err(err) = hn_thread::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Parsed {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("HN-Thread {}", hn_thread::VERSION);
                return Parsed::Exit(0);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Parsed::Exit(0);
            }
            "--tree" => options.mode = Mode::Tree,
            "--slideshow" => options.mode = Mode::Slideshow,
            "--config" => match args.next() {
                Some(path) => options.config_file = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config needs a path");
                    return Parsed::Exit(2);
                }
            },
            other if other.starts_with('-') => {
                eprintln!("error: unknown flag {other}\n\n{HELP}");
                return Parsed::Exit(2);
            }
            other => options.item_id = other.to_string(),
        }
    }

    if options.item_id.is_empty() {
        eprintln!("error: missing item id\n\n{HELP}");
        return Parsed::Exit(2);
    }
    Parsed::Run(options)
}
