use cashu_mintd::{
    config::Config,
    db::open_storage,
    locks::{p2sh_locks, render_locks},
    mintd::MintD,
};

use std::{env, io::Write, path::PathBuf, process, str::FromStr};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Create the database and exit
    Init,
    /// Show the unused receiving locks
    Locks,
}

// No need for complex argument parsing: an optional "--conf <path>" and an optional command.
fn parse_args(args: &[String]) -> Result<(Option<PathBuf>, Command), String> {
    let mut conf_file = None;
    let mut command = None;

    let mut args = args.iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--conf" => {
                let path = args
                    .next()
                    .ok_or_else(|| "'--conf' needs a configuration file path".to_string())?;
                conf_file = Some(PathBuf::from(path));
            }
            "init" if command.is_none() => command = Some(Command::Init),
            "locks" if command.is_none() => command = Some(Command::Locks),
            _ => return Err(format!("Unknown argument '{}'.", arg)),
        }
    }

    Ok((conf_file, command.unwrap_or(Command::Locks)))
}

// This creates the log file automagically if it doesn't exist, and logs on stderr
// if None is given
fn setup_logger(
    log_file: Option<&str>,
    log_level: log::LevelFilter,
) -> Result<(), fern::InitError> {
    let dispatcher = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log_level);

    if let Some(log_file) = log_file {
        dispatcher.chain(fern::log_file(log_file)?).apply()?;
    } else {
        dispatcher.chain(std::io::stderr()).apply()?;
    }

    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let (conf_file, command) = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{}", e);
        eprintln!("Usage: cashu_mintd [--conf <configuration file path>] [init|locks]");
        process::exit(1);
    });
    let config = Config::from_file(conf_file).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        process::exit(1);
    });
    let log_level = if let Some(ref level) = &config.log_level {
        log::LevelFilter::from_str(level.as_str()).unwrap_or_else(|e| {
            eprintln!("Invalid log level: {}", e);
            process::exit(1);
        })
    } else {
        log::LevelFilter::Info
    };
    let mintd = MintD::from_config(config).unwrap_or_else(|e| {
        eprintln!("Error creating global state: {}", e);
        process::exit(1);
    });

    let log_file = mintd.log_file();
    let log_output = if mintd.log_to_file {
        Some(log_file.to_str().unwrap_or_else(|| {
            eprintln!("Log file path '{:?}' is not valid unicode", log_file);
            process::exit(1);
        }))
    } else {
        None
    };
    setup_logger(log_output, log_level).unwrap_or_else(|e| {
        eprintln!("Error setting up logger: {}", e);
        process::exit(1);
    });

    // We can't do anything without a database, don't bother retrying.
    let storage = open_storage(&mintd.storage).unwrap_or_else(|e| {
        log::error!("Error initializing the database: {}", e);
        eprintln!("Error initializing the database: {}", e);
        process::exit(1);
    });
    log::debug!(
        "Database ready (Lightning {})",
        if mintd.storage.lightning {
            "enabled"
        } else {
            "disabled"
        }
    );

    match command {
        Command::Init => {
            println!("Database initialized.");
        }
        Command::Locks => {
            let scripts = p2sh_locks(storage.as_ref()).unwrap_or_else(|e| {
                log::error!("Error fetching P2SH locks: {}", e);
                eprintln!("Error fetching P2SH locks: {}", e);
                process::exit(1);
            });
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            if let Err(e) = handle.write_all(render_locks(&scripts).as_bytes()) {
                log::error!("Writing locks to stdout: {}", e);
                process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        std::iter::once("cashu_mintd")
            .chain(a.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn arguments() {
        assert_eq!(parse_args(&args(&[])).unwrap(), (None, Command::Locks));
        assert_eq!(parse_args(&args(&["init"])).unwrap(), (None, Command::Init));
        assert_eq!(
            parse_args(&args(&["--conf", "/tmp/mint.toml", "locks"])).unwrap(),
            (Some(PathBuf::from("/tmp/mint.toml")), Command::Locks)
        );
        assert_eq!(
            parse_args(&args(&["init", "--conf", "mint.toml"])).unwrap(),
            (Some(PathBuf::from("mint.toml")), Command::Init)
        );

        assert!(parse_args(&args(&["--conf"])).is_err());
        assert!(parse_args(&args(&["init", "locks"])).is_err());
        assert!(parse_args(&args(&["--daemon"])).is_err());
    }
}
