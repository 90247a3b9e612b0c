use clap::{Arg, Command, value_parser};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("Batch Duration Predictor")
        .version("1.0")
        .about("Scores a month of taxi trips with a trained duration model")
        .subcommand(
            Command::new("predict")
                .about("Run batch predictions for one (year, month) partition")
                .arg(
                    Arg::new("year")
                        .value_name("YEAR")
                        .required(true)
                        .value_parser(value_parser!(i32)),
                )
                .arg(
                    Arg::new("month")
                        .value_name("MONTH")
                        .required(true)
                        .value_parser(value_parser!(u32).range(1..=12)),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("predict", predict_matches)) => {
            let config_path = predict_matches.get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/batch.toml");
            let year = *predict_matches.get_one::<i32>("year").unwrap_or(&0);
            let month = *predict_matches.get_one::<u32>("month").unwrap_or(&0);

            match batch::run_batch_pipeline(config_path, year, month).await {
                Ok(summary) => {
                    match summary.mean_prediction {
                        Some(mean) => println!("Mean predicted duration: {:.2} minutes", mean),
                        None => println!("Mean predicted duration: n/a (no rows kept)"),
                    }
                    println!("Sum predicted duration: {:.2} minutes", summary.sum_prediction);
                    println!(
                        "Wrote {} predictions to {} ({} rows dropped)",
                        summary.rows_kept, summary.plan.output_uri, summary.rows_dropped
                    );
                    println!(
                        "Finished at {} in {:.3}s",
                        summary.finished_at.to_rfc3339(),
                        summary.elapsed().num_milliseconds() as f64 / 1000.0
                    );
                }
                Err(e) => {
                    eprintln!("Batch pipeline error: {}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
