use anyhow::Context;
use clap::Parser;
use event_toolkit::analysis::observer::TracingObserver;
use event_toolkit::analysis::result::{CurveSignificance, CurveStatistics};
use event_toolkit::config::Config;
use event_toolkit::data::event_source::ThresholdEventSource;
use event_toolkit::data::loader::DataLoader;
use event_toolkit::{CarsCavcsResult, EventStudy};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "event-toolkit", about = "Event study of abnormal returns and volume")]
struct Cli {
    /// Study configuration (YAML)
    #[arg(short, long, default_value = "config/event_study.yaml")]
    config: PathBuf,

    /// Write the full result as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let symbols = config.all_symbols();
    info!(
        path = %config.data.prices_path.display(),
        symbols = symbols.len(),
        "Loading prices"
    );
    let panel = DataLoader::load_panel(&config.data.prices_path, &symbols, &config.fields())?;

    let events = ThresholdEventSource::new(config.events.value_threshold)
        .with_range(config.events.start_date, config.events.end_date)
        .build_from_file(&config.data.events_path, panel.calendar(), &symbols)?;

    let study = EventStudy::new(config.study.clone())?;
    let result = study.run_with_observer(&panel, &events, &TracingObserver)?;

    print_result(&result);

    if let Some(path) = &cli.output {
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        serde_json::to_writer_pretty(writer, &result)?;
        info!(path = %path.display(), "Wrote result");
    }

    Ok(())
}

fn print_result(result: &CarsCavcsResult) {
    println!("\n=== Event Study ({:?}, {:?}) ===", result.mode, result.granularity);
    println!(
        "Window: -{} .. +{} days",
        result.window.pre, result.window.post
    );
    println!("Events: {}", result.num_events);
    println!("Excluded events: {}", result.num_excluded_events);
    println!("Symbols: {}", result.num_symbols());
    for excluded in &result.excluded_symbols {
        println!("  excluded {}: {:?}", excluded.symbol, excluded.reason);
    }

    print_curve(&result.cars, result.window.pre);
    if let Some(cavcs) = &result.cavcs {
        print_curve(cavcs, result.window.pre);
    }
}

fn print_curve(stats: &CurveStatistics, pre: usize) {
    let label = stats.kind.label();
    println!("\n{} Statistics:", label);
    match &stats.significance {
        CurveSignificance::Tested(t) => {
            println!("t-statistic: {:.4}", t.t_statistic);
            println!("p-value: {:.4}", t.p_value);
        }
        CurveSignificance::Undefined(err) => println!("t-statistic: undefined ({})", err),
    }
    println!("Significant: {}", stats.significant());
    println!("Positive: {}", stats.positive);
    if let Some(counts) = &stats.symbol_counts {
        println!(
            "Symbols positive: {} ({} significant), negative: {} ({} significant)",
            counts.positive,
            counts.significant_positive,
            counts.negative,
            counts.significant_negative
        );
    }

    println!("\n{:<8} {:<12} {:<12}", "Offset", label, "Std");
    println!("{:-<34}", "");
    for (i, (mean, std)) in stats.curve.iter().zip(stats.std_err.iter()).enumerate() {
        let offset = i as i64 - pre as i64;
        println!("{:<8} {:<12.6} {:<12.6}", offset, mean, std);
    }
    println!();
}
