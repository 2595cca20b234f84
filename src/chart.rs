//! Chart of the tag distance over the elapsed time.
//!
//! The series is prepared here (time unit conversion and axis labels) and
//! drawn to png with plotters, either at a given path or into the temp
//! directory to be shown with the default image viewer.

use super::error::{Error, Result};
use super::{min_and_max, TimeDistance};
use chrono::prelude::*;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const TITLE: &str = "Elapsed time vs. m_dist";
pub const Y_LABEL: &str = "Tag center distance (m)";

/// 10 x 5 inches at 150 dpi
pub const FIG_SIZE: (u32, u32) = (1500, 750);

const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Unit of the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn from_ms_flag(use_milliseconds: bool) -> TimeUnit {
        if use_milliseconds {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        }
    }

    /// converts an elapsed time in milliseconds to this unit
    pub fn convert(self, ms: f64) -> f64 {
        match self {
            TimeUnit::Seconds => ms / 1000.0,
            TimeUnit::Milliseconds => ms,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "Elapsed time (s)",
            TimeUnit::Milliseconds => "Elapsed time (ms)",
        }
    }
}

/// x and y values ready to be drawn, paired by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub x_label: &'static str,
}

impl ChartSeries {
    pub fn prepare(timedistance: &TimeDistance, unit: TimeUnit) -> ChartSeries {
        let (xs, ys) = timedistance
            .samples()
            .map(|s| (unit.convert(s.elapsed_ms), s.distance_m))
            .unzip();
        ChartSeries {
            xs,
            ys,
            x_label: unit.label(),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Largest magnitude kept on an axis, so that the padded span stays finite.
/// Values beyond it are drawn at the chart border.
const AXIS_LIMIT: f64 = f64::MAX / 4.0;

/// Axis range over the finite values with 5% margin on each side.
/// Always finite and non-empty.
pub fn axis_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = match min_and_max(values) {
        Some((min, max)) => (
            min.clamp(-AXIS_LIMIT, AXIS_LIMIT),
            max.clamp(-AXIS_LIMIT, AXIS_LIMIT),
        ),
        None => return (0.0, 1.0),
    };
    let span = max - min;
    let margin = if span > 0.0 {
        span / 20.0
    } else if min.abs() < f64::EPSILON {
        0.5
    } else {
        min.abs() / 20.0
    };
    (min - margin, max + margin)
}

/// Splits the points into runs of finite values,
/// so that NAN or inf leave a gap in the line.
pub fn finite_segments(xs: &[f64], ys: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Draws the series and writes it as png at fout, whatever its extension.
pub fn render_png(series: &ChartSeries, fout: &Path) -> Result<()> {
    if series.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let (width, height) = FIG_SIZE;
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    draw(series, &mut buf).map_err(|e| Error::Render(e.to_string()))?;
    image::save_buffer_with_format(
        fout,
        &buf,
        width,
        height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .map_err(|source| Error::Png {
        path: fout.to_path_buf(),
        source,
    })
}

/// Draws the chart into an rgb buffer of FIG_SIZE.
fn draw(
    series: &ChartSeries,
    buf: &mut [u8],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (xmin, xmax) = axis_range(&series.xs);
    let (ymin, ymax) = axis_range(&series.ys);
    let root = BitMapBackend::with_buffer(buf, FIG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(100)
        .build_cartesian_2d(xmin..xmax, ymin..ymax)?;
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(RGBColor(210, 210, 210).stroke_width(1))
        .set_all_tick_mark_size(4)
        .label_style(("sans-serif", 22))
        .x_desc(series.x_label)
        .y_desc(Y_LABEL)
        .draw()?;

    for segment in finite_segments(&series.xs, &series.ys) {
        let points = segment
            .into_iter()
            .map(|(x, y)| (x.clamp(xmin, xmax), y.clamp(ymin, ymax)));
        chart.draw_series(LineSeries::new(points, LINE_COLOR.stroke_width(1)))?;
    }
    root.present()?;
    Ok(())
}

/// Temp png used to show the chart, named after the local time and the process.
/// The viewer reads it after this process exits, so it is not removed.
pub fn viewer_path(now: DateTime<Local>, pid: u32) -> PathBuf {
    let name = format!("tagdist_plot_{}_{}.png", now.format("%Y%m%d_%H%M%S"), pid);
    std::env::temp_dir().join(name)
}

/// Draws the series to a temp png and opens it with the default image viewer.
pub fn show(series: &ChartSeries) -> Result<()> {
    let fout = viewer_path(Local::now(), std::process::id());
    render_png(series, &fout)?;
    log::info!("opening {} in the image viewer", fout.display());
    open::that(&fout).map_err(|source| Error::Viewer { path: fout, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;

    fn timedistance(pairs: &[(f64, f64)]) -> TimeDistance {
        pairs
            .iter()
            .map(|&(elapsed_ms, distance_m)| Sample {
                elapsed_ms,
                distance_m,
            })
            .collect()
    }

    #[test]
    fn seconds_by_default() {
        assert_eq!(TimeUnit::default(), TimeUnit::Seconds);
        assert_eq!(TimeUnit::from_ms_flag(false), TimeUnit::Seconds);
        assert_eq!(TimeUnit::from_ms_flag(true), TimeUnit::Milliseconds);
    }

    #[test]
    fn prepare_in_seconds() {
        let td = timedistance(&[(1000.0, 1.23), (2000.0, 1.50)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Seconds);
        assert_eq!(series.xs, vec![1.0, 2.0]);
        assert_eq!(series.ys, vec![1.23, 1.50]);
        assert_eq!(series.x_label, "Elapsed time (s)");
    }

    #[test]
    fn prepare_in_milliseconds() {
        let td = timedistance(&[(1000.0, 1.23), (1500.5, 0.1)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Milliseconds);
        assert_eq!(series.xs, vec![1000.0, 1500.5]);
        assert_eq!(series.x_label, "Elapsed time (ms)");
    }

    #[test]
    fn seconds_back_to_milliseconds() {
        let ms = [0.0, 1.0, 33.3, 1234.5678, 987654321.0];
        for &v in ms.iter() {
            let back = TimeUnit::Seconds.convert(v) * 1000.0;
            assert!((back - v).abs() <= 1e-9 * v.abs().max(1.0));
        }
    }

    #[test]
    fn prepare_keeps_order() {
        let td = timedistance(&[(3000.0, 3.0), (1000.0, 1.0), (2000.0, 2.0)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Seconds);
        assert_eq!(series.xs, vec![3.0, 1.0, 2.0]);
        assert_eq!(series.ys, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn axis_range_margins() {
        assert_eq!(axis_range(&[0.0, 10.0]), (-0.5, 10.5));
        assert_eq!(axis_range(&[0.0]), (-0.5, 0.5));
        assert_eq!(axis_range(&[1e-320]), (1e-320 - 0.5, 1e-320 + 0.5));
        let (lo, hi) = axis_range(&[2.0, 2.0]);
        assert!((lo - 1.9).abs() < 1e-12 && (hi - 2.1).abs() < 1e-12);
        assert_eq!(axis_range(&[f64::NAN]), (0.0, 1.0));
    }

    fn assert_drawable((lo, hi): (f64, f64)) {
        assert!(lo.is_finite() && hi.is_finite(), "{} .. {}", lo, hi);
        assert!(lo < hi);
        assert!((hi - lo).is_finite());
    }

    #[test]
    fn axis_range_huge_span_stays_finite() {
        assert_drawable(axis_range(&[-1e308, 1e308]));
        assert_drawable(axis_range(&[f64::MIN, 0.0, f64::MAX]));
        let (lo, hi) = axis_range(&[-1e300, 1e300]);
        assert!(lo < -1e300 && hi > 1e300);
    }

    #[test]
    fn axis_range_huge_value_stays_finite() {
        assert_drawable(axis_range(&[f64::MAX]));
        assert_drawable(axis_range(&[-1.7e308, -1.7e308]));
        assert_drawable(axis_range(&[1e308, f64::NAN]));
    }

    #[test]
    fn non_finite_values_split_the_line() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [1.0, f64::NAN, 3.0, 4.0, f64::INFINITY, f64::NAN];
        let segments = finite_segments(&xs, &ys);
        assert_eq!(
            segments,
            vec![vec![(1.0, 1.0)], vec![(3.0, 3.0), (4.0, 4.0)]]
        );
    }

    #[test]
    fn empty_series_is_not_rendered() {
        let fout = std::env::temp_dir().join("tagdist_lpp_empty_series.png");
        let series = ChartSeries::prepare(&TimeDistance::default(), TimeUnit::Seconds);
        assert!(matches!(
            render_png(&series, &fout),
            Err(Error::EmptyDataset)
        ));
        assert!(!fout.exists());
    }

    #[test]
    fn viewer_path_in_temp_dir() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = viewer_path(now, 4242);
        assert_eq!(path.parent(), Some(std::env::temp_dir().as_path()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("tagdist_plot_20240309_140507_4242.png")
        );
        assert_ne!(path, viewer_path(now, 4243));
    }

    fn temp_out(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tagdist_lpp_{}_{}", std::process::id(), name))
    }

    fn is_png(path: &Path) -> bool {
        const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        std::fs::read(path)
            .map(|bytes| bytes.starts_with(&SIGNATURE))
            .unwrap_or(false)
    }

    #[test]
    fn renders_png_file() {
        let fout = temp_out("render.png");
        let td = timedistance(&[(1000.0, 1.23), (2000.0, 1.50)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Seconds);
        let result = render_png(&series, &fout);
        let written = is_png(&fout);
        let _ = std::fs::remove_file(&fout);
        assert!(result.is_ok(), "{:?}", result);
        assert!(written);
    }

    #[test]
    fn renders_png_whatever_the_extension() {
        let fout = temp_out("render.svg");
        let td = timedistance(&[(0.0, 0.5), (40.0, 0.6), (80.0, 0.55)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Milliseconds);
        let result = render_png(&series, &fout);
        let written = is_png(&fout);
        let _ = std::fs::remove_file(&fout);
        assert!(result.is_ok(), "{:?}", result);
        assert!(written);
    }

    #[test]
    fn renders_extreme_values() {
        let fout = temp_out("extreme.png");
        let td = timedistance(&[(0.0, -1e308), (1000.0, 1e308), (2000.0, f64::MAX)]);
        let series = ChartSeries::prepare(&td, TimeUnit::Seconds);
        let result = render_png(&series, &fout);
        let written = is_png(&fout);
        let _ = std::fs::remove_file(&fout);
        assert!(result.is_ok(), "{:?}", result);
        assert!(written);
    }
}
