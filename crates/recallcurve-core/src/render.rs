//! Text rendering of forgetting-curve plots.
//!
//! The chart mirrors the classic matplotlib view: days on x, retrievability
//! on y (clipped to `[y_min, 1]`), a dashed desired-retention line and a
//! vertical due marker.

use serde::{Deserialize, Serialize};

use crate::card::State;
use crate::curve::{CurvePlot, DayDomain, DueMarker};

/// Axis and title text handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub retention_label: String,
}

impl Default for ChartLabels {
    fn default() -> Self {
        Self {
            title: "FSRS Forgetting Curve".into(),
            x_label: "Days".into(),
            y_label: "Retrievability".into(),
            retention_label: "Desired Retention".into(),
        }
    }
}

/// Fixed-size character grid renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsciiChart {
    pub width: usize,
    pub height: usize,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for AsciiChart {
    fn default() -> Self {
        Self {
            width: 72,
            height: 16,
            y_min: 0.4,
            y_max: 1.0,
        }
    }
}

const CURVE: char = '*';
const RETENTION: char = '-';
const DUE: char = '|';
const GUTTER: usize = 6;

impl AsciiChart {
    pub fn render(&self, plot: &CurvePlot, labels: &ChartLabels) -> String {
        let width = self.width.max(2);
        let height = self.height.max(2);
        let mut grid = vec![vec![' '; width]; height];

        if let Some(row) = self.row_for(plot.desired_retention, height) {
            grid[row].fill(RETENTION);
        }
        if let Some(col) = plot
            .due_marker
            .day()
            .and_then(|day| col_for(day, &plot.domain, width))
        {
            for row in grid.iter_mut().filter(|row| row[col] == ' ') {
                row[col] = DUE;
            }
        }
        for point in &plot.points {
            let cell = self
                .row_for(point.retrievability, height)
                .zip(col_for(point.day, &plot.domain, width));
            if let Some((row, col)) = cell {
                grid[row][col] = CURVE;
            }
        }

        let mut out = format!("{}\n", labels.title);
        out.push_str(&format!("{}\n", labels.y_label));
        let tick_rows = [0, height / 2, height - 1];
        for (i, row) in grid.iter().enumerate() {
            let axis = if tick_rows.contains(&i) {
                format!("{:>5.2}", self.row_value(i, height))
            } else {
                " ".repeat(GUTTER - 1)
            };
            let line: String = row.iter().collect();
            out.push_str(&format!("{axis}|{}\n", line.trim_end()));
        }
        out.push_str(&format!("{}+{}\n", " ".repeat(GUTTER - 1), "-".repeat(width)));

        let start = plot.domain.start.to_string();
        let end = plot.domain.end.to_string();
        let pad = (width + 1).saturating_sub(start.len());
        out.push_str(&format!("{}{start}{end:>pad$}\n", " ".repeat(GUTTER - 1)));
        let x_pad = GUTTER + width.saturating_sub(labels.x_label.len()) / 2;
        out.push_str(&format!("{}{}\n", " ".repeat(x_pad), labels.x_label));

        out.push_str(&format!(
            "{CURVE} {}   {RETENTION} {} ({:.2})",
            labels.y_label, labels.retention_label, plot.desired_retention
        ));
        if plot.due_marker != DueMarker::None {
            out.push_str(&format!("   {DUE} due"));
        }
        out.push('\n');
        out
    }

    fn row_for(&self, value: f64, height: usize) -> Option<usize> {
        if !(self.y_min..=self.y_max).contains(&value) {
            return None;
        }
        let frac = (self.y_max - value) / (self.y_max - self.y_min);
        Some((frac * (height - 1) as f64).round() as usize)
    }

    fn row_value(&self, row: usize, height: usize) -> f64 {
        self.y_max - row as f64 / (height - 1) as f64 * (self.y_max - self.y_min)
    }
}

fn col_for(day: u32, domain: &DayDomain, width: usize) -> Option<usize> {
    if day < domain.start || day > domain.end {
        return None;
    }
    let span = domain.len().max(1) as f64;
    Some((f64::from(day - domain.start) / span * (width - 1) as f64).round() as usize)
}

/// Read-out lines describing the card behind `plot`.
pub fn status_lines(plot: &CurvePlot) -> Vec<String> {
    let mut lines = vec![format!("state = {}", plot.state)];
    match plot.due_marker {
        DueMarker::None => {}
        DueMarker::Days { days } => lines.push(format!("days till due: {days}")),
        DueMarker::Now { progress } => {
            let phase = match plot.state {
                State::Relearning => "relearning",
                _ => "learning",
            };
            lines.push(format!(
                "{phase} step {} of {}",
                progress.step_number, progress.step_count
            ));
            lines.push(format!("due in {}", progress.minutes_label()));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{CurvePoint, StepProgress};

    fn plot(state: State, due_marker: DueMarker, points: Vec<CurvePoint>) -> CurvePlot {
        CurvePlot {
            state,
            domain: DayDomain { start: 0, end: 100, step: 1 },
            due_marker,
            points,
            desired_retention: 0.9,
        }
    }

    #[test]
    fn empty_plot_draws_axes_and_retention_line() {
        let chart = AsciiChart::default();
        let text = chart.render(&plot(State::New, DueMarker::None, vec![]), &ChartLabels::default());
        assert!(text.starts_with("FSRS Forgetting Curve\n"));
        assert!(text.contains("Days"));
        assert!(text.contains("Desired Retention (0.90)"));
        assert!(text.contains(&"-".repeat(chart.width)));
        let grid: Vec<&str> = text.lines().skip(2).take(chart.height).collect();
        assert!(grid.iter().all(|line| !line.contains(CURVE)));
        assert!(!text.contains("| due"));
    }

    #[test]
    fn curve_points_and_due_marker_are_drawn() {
        let points = (0..=100)
            .map(|day| CurvePoint { day, retrievability: 1.0 - f64::from(day) * 0.005 })
            .collect();
        let chart = AsciiChart { width: 40, height: 10, ..AsciiChart::default() };
        let text = chart.render(
            &plot(State::Review, DueMarker::Days { days: 20 }, points),
            &ChartLabels::default(),
        );
        let first_row = text.lines().nth(2).unwrap();
        assert!(first_row.starts_with(" 1.00|*"));
        assert!(text.matches('|').count() > 10);
        assert!(text.contains("| due"));
    }

    #[test]
    fn values_below_y_min_are_clipped() {
        let points = vec![CurvePoint { day: 50, retrievability: 0.1 }];
        let chart = AsciiChart::default();
        let text = chart.render(&plot(State::Review, DueMarker::None, points), &ChartLabels::default());
        let grid: Vec<&str> = text.lines().skip(2).take(chart.height).collect();
        assert!(grid.iter().all(|line| !line.contains(CURVE)));
    }

    #[test]
    fn status_lines_follow_state() {
        let review = plot(State::Review, DueMarker::Days { days: 12 }, vec![]);
        assert_eq!(status_lines(&review), vec!["state = Review", "days till due: 12"]);

        let progress = StepProgress { step_number: 1, step_count: 1, minutes_till_due: 1 };
        let relearning = plot(State::Relearning, DueMarker::Now { progress }, vec![]);
        assert_eq!(
            status_lines(&relearning),
            vec!["state = Relearning", "relearning step 1 of 1", "due in 1 minute"]
        );
    }
}
