use clap::{Parser, Subcommand};
use filmdata_core::FilmConfig;
use tracing_subscriber::{fmt, EnvFilter};

use filmdata_pipeline::subsystems::artifact::ArtifactError;
use filmdata_pipeline::{HitPredictor, PipelineContext, RunOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Film data ingestion and hit-prediction pipeline", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "filmdata.toml")]
    config: String,

    /// Check the database connection and exit
    #[arg(long)]
    health: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create any missing tables
    InitDb,
    /// Country/language directory → language_market.csv
    FetchCountries,
    /// GDP and population for all countries → world_bank_data.csv
    FetchEconomics,
    /// Per-country fill of world_bank_data for codes not present yet
    FetchEconomicsIncremental,
    /// Top and bottom grossing movies with details → movies.csv
    FetchMovies,
    /// Replace database tables from the CSV snapshots
    Load,
    /// Train the hit predictor on the movies table
    Train,
    /// Score one movie with the trained model
    Predict {
        #[arg(long)]
        budget: f64,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Every step in order
    RunAll {
        /// Leave out the per-country economic fill
        #[arg(long)]
        skip_incremental: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match FilmConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Prediction only reads the artifact
    if let Some(Command::Predict { budget, month }) = args.command {
        return predict(&config, budget, month);
    }

    let ctx = match PipelineContext::connect(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Failed to start pipeline: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match filmdata_core::db::health_check(&ctx.pool).await {
            Ok(v) => println!("✅ SQLite connected: {}", v),
            Err(e) => {
                println!("❌ SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let Some(command) = args.command else {
        eprintln!("No command given; see --help");
        std::process::exit(2);
    };

    match command {
        Command::InitDb => ctx.init_db().await?,
        Command::FetchCountries => {
            let records = ctx.fetch_countries().await?;
            println!("{} country/language records", records.len());
        }
        Command::FetchEconomics => {
            let records = ctx.fetch_economics().await?;
            println!("{} economic records", records.len());
        }
        Command::FetchEconomicsIncremental => {
            ctx.init_db().await?;
            let report = ctx.fetch_economics_incremental().await?;
            println!(
                "checked {}, already present {}, inserted {}, no data {}",
                report.checked, report.skipped_existing, report.inserted, report.empty
            );
        }
        Command::FetchMovies => {
            let movies = ctx.fetch_movies().await?;
            println!("{} movies", movies.len());
        }
        Command::Load => {
            let report = ctx.load_snapshots().await?;
            println!("{:?}", report);
        }
        Command::Train => {
            let artifact = ctx.train_model().await?;
            println!(
                "Trained at threshold {} ({} train / {} test, accuracy {})",
                artifact.profitability_threshold,
                artifact.metrics.train_samples,
                artifact.metrics.test_samples,
                artifact
                    .metrics
                    .test_accuracy
                    .map(|a| format!("{:.3}", a))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
        Command::RunAll { skip_incremental } => {
            let summary = ctx.run_all(RunOptions { skip_incremental }).await?;
            println!(
                "{} country records, {} economies, {} movies; model threshold {}",
                summary.countries,
                summary.economies,
                summary.movies,
                summary.artifact.profitability_threshold
            );
        }
        Command::Predict { .. } => unreachable!("handled before connecting"),
    }

    Ok(())
}

fn predict(config: &FilmConfig, budget: f64, month: u32) -> anyhow::Result<()> {
    let predictor = match HitPredictor::load(&config.paths.artifact_path) {
        Ok(p) => p,
        Err(e @ ArtifactError::Missing { .. }) => {
            println!("Prediction unavailable: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let prediction = predictor.predict(budget, month);
    println!(
        "{} (hit probability {:.1}%)",
        if prediction.is_hit { "HIT" } else { "FLOP" },
        prediction.probability * 100.0
    );
    for (feature, weight) in predictor.feature_weights() {
        println!("  {:<14} {:+.4}", feature, weight);
    }
    Ok(())
}
