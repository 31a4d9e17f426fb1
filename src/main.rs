use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use telscript::logging::init_logging;
use telscript::{ScriptRunner, parse_duration};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "telscript",
    about = "Run a file of commands against a line-oriented administrative console",
    version
)]
struct Args {
    /// Options file with ServerHostName, TelnetPort, Username, Password and
    /// optionally OperationTimeoutMS
    options_file: PathBuf,

    /// File with one console command per line
    command_file: PathBuf,

    /// Per-operation timeout overriding OperationTimeoutMS (e.g. 500ms, 10s)
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = init_logging(args.verbose) {
        eprintln!("Failed to initialize logging: {err:#}");
    }

    eprintln!(
        "telscript {} - run batch jobs against a console's telnet interface",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        options = %args.options_file.display(),
        commands = %args.command_file.display(),
        "starting"
    );

    let mut runner = ScriptRunner::new(&args.options_file, &args.command_file);
    if let Some(timeout) = args.timeout {
        runner = runner.with_timeout(timeout);
    }

    let result = match runner.init() {
        Ok(()) => runner.run().await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{err}");
        eprintln!("Exiting application with error code: {code}");
        std::process::exit(code);
    }
}
