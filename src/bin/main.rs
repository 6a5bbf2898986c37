use std::{env, process, time::Duration};

use clap::CommandFactory;
use tracing::debug;

use launcher::{
    cli::{Cli, Command, parse_args},
    config::Options,
    constants::{EXIT_FAILURE, LSB_NOT_RUNNING},
    error::LauncherError,
    launch::LaunchCommand,
    logs::{init_logging, print_error, print_info},
    pidfile::PidFile,
    runtime::find_install_path,
    supervisor::{Outcome, Supervisor},
};

fn main() {
    let args = parse_args();
    init_logging(args.log_level);

    let command = match args.parse_command() {
        Ok(Command::Help) => {
            print_usage();
            return;
        }
        Ok(command) => command,
        Err(LauncherError::MissingCommand) => {
            print_usage();
            process::exit(EXIT_FAILURE);
        }
        Err(err) => fail(err),
    };

    match execute(&args, command) {
        Ok(Outcome::NotRunning) if command == Command::Status => {
            print_info(&Outcome::NotRunning.message());
            process::exit(LSB_NOT_RUNNING);
        }
        Ok(outcome) => print_info(&outcome.message()),
        Err(err) => fail(err),
    }
}

fn execute(args: &Cli, command: Command) -> Result<Outcome, LauncherError> {
    let executable = env::current_exe().map_err(|source| LauncherError::Path {
        what: "cannot locate the launcher executable",
        path: "launcher".into(),
        source,
    })?;
    let install_path = find_install_path(&executable).map_err(|source| LauncherError::Path {
        what: "cannot determine the install path from",
        path: executable.clone(),
        source,
    })?;
    debug!("Install path is {:?}", install_path);

    let options = Options::resolve(args, &install_path)?;
    if options.verbose {
        print_verbose(&options, command);
    }

    let mut pid_file = PidFile::open(&options.pid_file)?;
    let supervisor = Supervisor::new(options, env::args().skip(1).collect())
        .with_stop_timeout(args.stop_timeout.map(Duration::from_secs));

    supervisor.execute(command, &mut pid_file)
}

fn print_verbose(options: &Options, command: Command) {
    println!("{}", options.to_json());
    let daemon = matches!(command, Command::Start | Command::Restart);
    if let Ok(launch) = LaunchCommand::build(options, daemon)
        && let Ok(json) = serde_json::to_string_pretty(&launch)
    {
        println!("{json}");
    }
}

fn print_usage() {
    let _ = Cli::command().print_help();
    println!();
}

fn fail(err: LauncherError) -> ! {
    print_error(&err.to_string());
    process::exit(EXIT_FAILURE);
}
