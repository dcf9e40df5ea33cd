use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use ttm::cli::{execute_command, output, Cli};
use ttm::exitcode;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    match execute_command(&cli) {
        Ok(code) if code != exitcode::OK => std::process::exit(code),
        Ok(_) => {}
        Err(e) => {
            output::error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    // rayon spans drown the solver output at trace level
    let noisy_modules = ["rayon", "rayon_core"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ttm::cli::Commands;
    use ttm::util::testing;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        testing::init_test_setup();
        Cli::command().debug_assert();
    }

    #[test]
    fn given_solve_args_when_parsing_then_flags_are_set() {
        let cli = Cli::try_parse_from([
            "ttm",
            "-dd",
            "solve",
            "--structure-file",
            "trees.txt",
            "--target-talent-count",
            "7",
            "--sequential",
            "--all-counts",
        ])
        .expect("valid arguments");

        assert_eq!(cli.debug, 2);
        match cli.command {
            Some(Commands::Solve {
                target_talent_count,
                sequential,
                parallel,
                all_counts,
                ..
            }) => {
                assert_eq!(target_talent_count, 7);
                assert!(sequential);
                assert!(!parallel);
                assert!(all_counts);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_parallel_and_sequential_when_parsing_then_rejected() {
        let result = Cli::try_parse_from([
            "ttm",
            "solve",
            "--structure-file",
            "trees.txt",
            "--target-talent-count",
            "1",
            "--parallel",
            "--sequential",
        ]);
        assert!(result.is_err());
    }
}
