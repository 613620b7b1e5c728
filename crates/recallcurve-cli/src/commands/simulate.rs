use chrono::{DateTime, Utc};
use clap::Args;
use recallcurve_core::{
    apply_rating, apply_retention_change, build_curve, Card, Config, CurvePlot, FsrsScheduler,
    Rating, ReviewEvent, ReviewScheduler,
};
use serde::Serialize;
use tracing::info;

#[derive(Args)]
pub struct SimulateArgs {
    /// Ratings to apply in order, each at the card's due time (e.g. "good,good,again")
    #[arg(long, value_delimiter = ',', required = true)]
    ratings: Vec<Rating>,
    /// Desired retention while reviewing (overrides the config file)
    #[arg(long)]
    retention: Option<f64>,
    /// Change retention after the last rating and replay it
    #[arg(long)]
    retention_after: Option<f64>,
    /// Creation time of the card, RFC 3339 (defaults to now)
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    /// Enable interval fuzzing with this seed
    #[arg(long)]
    fuzz: Option<u64>,
    /// Print the final state as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Step {
    rating: Rating,
    reviewed_at: DateTime<Utc>,
    card: Card,
}

#[derive(Serialize)]
struct Report {
    steps: Vec<Step>,
    desired_retention: f64,
    card: Card,
    plot: CurvePlot,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut scheduler_config = config.scheduler_config()?;
    if let Some(retention) = args.retention {
        scheduler_config = scheduler_config.with_desired_retention(retention)?;
    }
    let scheduler = match args.fuzz {
        Some(seed) => FsrsScheduler::new(scheduler_config.with_fuzzing(true)).with_fuzz_seed(seed),
        None => FsrsScheduler::new(scheduler_config.without_fuzzing()),
    };

    let mut card = Card::new(args.start.unwrap_or_else(Utc::now));
    let mut last_event: Option<ReviewEvent> = None;
    let mut steps = Vec::with_capacity(args.ratings.len());
    for rating in &args.ratings {
        let (next, event) = apply_rating(&card, *rating, &scheduler)?;
        steps.push(Step {
            rating: *rating,
            reviewed_at: event.review_datetime,
            card: next.clone(),
        });
        card = next;
        last_event = Some(event);
    }

    let (scheduler, card) = match args.retention_after {
        Some(retention) => {
            let change = apply_retention_change::<FsrsScheduler>(
                scheduler.config(),
                retention,
                &card,
                last_event.as_ref(),
            )?;
            info!(retention, outcome = ?change.outcome, "retention changed after simulation");
            (FsrsScheduler::new(change.config), change.card)
        }
        None => (scheduler, card),
    };

    let plot = build_curve(&card, &scheduler, &config.chart.curve_options())?;
    if args.json {
        let report = Report {
            steps,
            desired_retention: scheduler.config().desired_retention(),
            card,
            plot,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (i, step) in steps.iter().enumerate() {
        println!(
            "{:>3}. {:<5} at {}  -> {} (due {})",
            i + 1,
            step.rating,
            step.reviewed_at.to_rfc3339(),
            step.card.state,
            step.card.due.to_rfc3339()
        );
    }
    println!();
    print!("{}", super::render_plot(&config, &plot));
    Ok(())
}
