use std::io::{BufRead, Write};
use std::str::FromStr;

use chrono::Utc;
use clap::Args;
use indoc::indoc;
use recallcurve_core::{Card, Config, CurvePlot, Rating, ReplayOutcome, Session};
use serde::Serialize;

const HELP: &str = indoc! {"
    commands:
      again | hard | good | easy   rate the card (or 1-4)
      retention <r>                change desired retention (snapped to the slider)
      reset                        start over with a new card
      show                         redraw the curve
      json                         print the current state as JSON
      help                         this text
      quit                         leave the session
"};

#[derive(Args)]
pub struct SessionArgs {
    /// Initial desired retention (overrides the config file)
    #[arg(long)]
    retention: Option<f64>,
    /// Print a JSON snapshot instead of the chart after every action
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Rate(Rating),
    Retention(f64),
    Reset,
    Show,
    Json,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or("").to_ascii_lowercase();
        let command = match head.as_str() {
            "retention" | "r" => {
                let value = parts.next().ok_or("usage: retention <value>")?;
                let value: f64 = value
                    .parse()
                    .map_err(|_| format!("not a number: {value}"))?;
                Command::Retention(value)
            }
            "reset" => Command::Reset,
            "show" | "" => Command::Show,
            "json" => Command::Json,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Rate(other.parse()?),
        };
        if parts.next().is_some() {
            return Err(format!("unexpected arguments after '{head}'"));
        }
        Ok(command)
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    review_count: u32,
    desired_retention: f64,
    card: &'a Card,
    plot: &'a CurvePlot,
}

pub fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut scheduler_config = config.scheduler_config()?;
    if let Some(retention) = args.retention {
        scheduler_config = scheduler_config.with_desired_retention(config.slider.snap(retention))?;
    }

    let mut session: Session = Session::new(scheduler_config, Utc::now());
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    print_state(&config, &session, args.json)?;
    if !args.json {
        println!("type 'help' for commands");
    }

    for line in stdin.lock().lines() {
        let line = line?;
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => {
                print!("{HELP}");
                continue;
            }
            Command::Json => {
                print_state(&config, &session, true)?;
                continue;
            }
            Command::Show => {}
            Command::Rate(rating) => {
                if let Err(e) = session.rate(rating) {
                    eprintln!("error: {e}");
                    continue;
                }
            }
            Command::Retention(value) => {
                let snapped = config.slider.snap(value);
                match session.set_desired_retention(snapped) {
                    Ok(ReplayOutcome::Unchanged) => {}
                    Ok(outcome) if !args.json => {
                        println!("desired retention = {snapped} ({outcome:?})");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("error: {e}");
                        continue;
                    }
                }
            }
            Command::Reset => session.reset(Utc::now()),
        }

        print_state(&config, &session, args.json)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_state(
    config: &Config,
    session: &Session,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let plot = session.curve(&config.chart.curve_options())?;
    if json {
        let snapshot = Snapshot {
            review_count: session.review_count(),
            desired_retention: session.config().desired_retention(),
            card: session.card(),
            plot: &plot,
        };
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        print!("{}", super::render_plot(config, &plot));
        println!("reviews this session: {}", session.review_count());
    }
    Ok(())
}
