pub mod config;
pub mod session;
pub mod simulate;

use recallcurve_core::{status_lines, Config, CurvePlot};

/// Chart followed by the read-out lines, as printed after every action.
pub(crate) fn render_plot(config: &Config, plot: &CurvePlot) -> String {
    let mut out = config.chart.ascii_chart().render(plot, &Default::default());
    for line in status_lines(plot) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}
