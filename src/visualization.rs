use crate::simulation::SimulationSeries;
use plotters::prelude::*;
use std::path::Path;

/// Renders temperature-over-time curves for a set of simulation runs as PNG.
pub fn plot_series(
    path: &Path,
    title: &str,
    series: &[SimulationSeries],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let points = series.iter().flat_map(|s| s.points.iter());
    let x_max = points.clone().map(|&(x, _)| x).fold(1.0, f64::max);
    let (y_min, y_max) = points.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
        (lo.min(y), hi.max(y))
    });
    let (y_min, y_max) = if y_min.is_finite() && y_max > y_min {
        let margin = (y_max - y_min) * 0.05;
        (y_min - margin, y_max + margin)
    } else {
        (0.0, 1.0)
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Temperature")
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(1)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
