use std::{
    fs,
    path::{Path, PathBuf},
};

use plotters::{
    prelude::{
        BitMapBackend, EmptyElement, IntoDrawingArea, Polygon, SeriesLabelPosition, Text,
        TriangleMarker,
    },
    series::{LineSeries, PointSeries},
    style::{Color, IntoFont, ShapeStyle},
};

use super::theme;
use crate::{
    constants::render::{CHART_DIMS, CHART_FILE},
    error::RenderError,
    render::{RenderFrame, Renderer},
    types::TimedData,
};

/// Redraws the market chart into a PNG file on every `draw`.
#[derive(Debug)]
pub struct ChartRenderer {
    path: PathBuf,
    closed: bool,
}

impl ChartRenderer {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        fs::create_dir_all(dir.as_ref())?;

        Ok(Self {
            path: dir.as_ref().join(CHART_FILE),
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for ChartRenderer {
    fn draw(&mut self, frame: &RenderFrame) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Closed);
        }

        market_chart(&self.path, frame).map_err(|err| RenderError::Draw(err.to_string()))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

fn step_range(frame: &RenderFrame) -> (u32, u32) {
    let steps = frame
        .prices
        .iter()
        .chain(&frame.longs)
        .chain(&frame.shorts)
        .map(|(step, _)| *step as u32);

    let (min, max) = steps.fold((u32::MAX, 0), |(min, max), step| (min.min(step), max.max(step)));
    if min > max {
        return (0, 1);
    }
    (min, max + 1)
}

fn price_range(frame: &RenderFrame) -> (f64, f64) {
    let prices = frame
        .prices
        .iter()
        .chain(&frame.longs)
        .chain(&frame.shorts)
        .map(|(_, price)| *price);

    let y_min = prices.clone().fold(f64::INFINITY, f64::min);
    let y_max = prices.fold(f64::NEG_INFINITY, f64::max);
    if !y_min.is_finite() || !y_max.is_finite() {
        return (0.0, 1.0);
    }

    let y_range = (y_max - y_min).max(0.01);
    (y_min - y_range * 0.05, y_max + y_range * 0.05)
}

fn marker_points(points: &TimedData) -> impl Iterator<Item = (u32, f64)> + '_ {
    points.iter().map(|(step, price)| (*step as u32, *price))
}

pub fn market_chart(path: &Path, frame: &RenderFrame) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, CHART_DIMS).into_drawing_area();
    root.fill(&theme::BASE)?;

    let (x_min, x_max) = step_range(frame);
    let (y_min, y_max) = price_range(frame);

    let mut chart = plotters::chart::ChartBuilder::on(&root)
        .caption("Simple Market Visualization", ("sans-serif", 20, &theme::TEXT))
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .label_style(("sans-serif", 15, &theme::TEXT))
        .axis_style(&theme::SURFACE1)
        .light_line_style(&theme::SURFACE0)
        .x_desc("Time Steps")
        .y_desc("Price")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            marker_points(&frame.prices),
            ShapeStyle::from(&theme::BLUE).stroke_width(2),
        ))?
        .label("Price")
        .legend(|(x, y)| {
            plotters::element::Rectangle::new([(x, y - 5), (x + 20, y + 5)], theme::BLUE.filled())
        });

    let marker_size = 8;

    chart
        .draw_series(PointSeries::of_element(
            marker_points(&frame.longs),
            marker_size,
            theme::GREEN.filled(),
            &|coord, size, style| {
                EmptyElement::at(coord) + TriangleMarker::new((0, 0), size, style)
            },
        ))?
        .label("Long")
        .legend(|(x, y)| TriangleMarker::new((x + 10, y), 5, theme::GREEN.filled()));

    chart
        .draw_series(PointSeries::of_element(
            marker_points(&frame.shorts),
            marker_size,
            theme::RED.filled(),
            &|coord, size, style| {
                EmptyElement::at(coord)
                    + Polygon::new(vec![(-size, -size), (size, -size), (0, size)], style)
            },
        ))?
        .label("Short")
        .legend(|(x, y)| {
            Polygon::new(
                vec![(x + 5, y - 5), (x + 15, y - 5), (x + 10, y + 5)],
                theme::RED.filled(),
            )
        });

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&theme::SURFACE0)
        .border_style(&theme::SURFACE1)
        .label_font(("sans-serif", 14, &theme::TEXT))
        .draw()?;

    root.draw(&Text::new(
        format!("Profit: {} Reward: {}", frame.cumulative_profit, frame.total_reward),
        (80, 40),
        ("sans-serif", 18).into_font().color(&theme::YELLOW),
    ))?;

    root.present()?;

    Ok(())
}
