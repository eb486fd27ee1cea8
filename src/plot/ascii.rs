//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observations: `o`
//! - binned means: `B`
//! - best-fit curve: `-`
//! - reference models: `.` (matter only), `:` (partial matter), `=` (ΛCDM)
//!
//! Curves are drawn first in the order given and never overwrite each other;
//! points are drawn last and overwrite curves.

use crate::domain::{AxisScale, BinnedObservation, CurveFile, CurvePoint, Observation, Residual};

/// Glyphs for the reference models, in `REFERENCE_MODELS` order.
const REFERENCE_GLYPHS: [char; 3] = ['.', ':', '='];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Scatter,
    Line,
}

/// One labelled set of `(z, y)` values.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub glyph: char,
    pub kind: SeriesKind,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn line(label: impl Into<String>, glyph: char, points: &[CurvePoint]) -> Self {
        Self {
            label: label.into(),
            glyph,
            kind: SeriesKind::Line,
            points: points.iter().map(|p| (p.z, p.mu)).collect(),
        }
    }

    pub fn scatter(label: impl Into<String>, glyph: char, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            glyph,
            kind: SeriesKind::Scatter,
            points,
        }
    }
}

/// Glyph used for the `i`-th reference model.
pub fn reference_glyph(i: usize) -> char {
    REFERENCE_GLYPHS.get(i).copied().unwrap_or('+')
}

/// Distance modulus vs redshift: data, bins, best fit and reference curves.
pub fn render_fit_plot(
    observations: &[Observation],
    bins: &[BinnedObservation],
    best_fit: &[CurvePoint],
    references: &[(String, Vec<CurvePoint>)],
    width: usize,
    height: usize,
    scale: AxisScale,
) -> String {
    let mut series = vec![Series::line("best fit", '-', best_fit)];
    for (i, (label, curve)) in references.iter().enumerate() {
        series.push(Series::line(label.clone(), reference_glyph(i), curve));
    }
    series.push(Series::scatter("data", 'o', observations.iter().map(|o| (o.z, o.mu)).collect()));
    series.push(Series::scatter("bins", 'B', bins.iter().map(|b| (b.z, b.mu)).collect()));

    render_plot("mu", &series, width, height, scale)
}

/// Residuals against the best fit; reference curves are drawn as offsets.
pub fn render_residual_plot(
    residuals: &[Residual],
    bin_residuals: &[CurvePoint],
    offsets: &[(String, Vec<CurvePoint>)],
    width: usize,
    height: usize,
    scale: AxisScale,
) -> String {
    let zero: Vec<CurvePoint> = match x_bounds(residuals.iter().map(|r| r.observation.z), scale) {
        Some((z0, z1)) => vec![CurvePoint { z: z0, mu: 0.0 }, CurvePoint { z: z1, mu: 0.0 }],
        None => Vec::new(),
    };

    let mut series = vec![Series::line("best fit", '-', &zero)];
    for (i, (label, curve)) in offsets.iter().enumerate() {
        series.push(Series::line(label.clone(), reference_glyph(i), curve));
    }
    series.push(Series::scatter(
        "data",
        'o',
        residuals.iter().map(|r| (r.observation.z, r.residual)).collect(),
    ));
    series.push(Series::scatter("bins", 'B', bin_residuals.iter().map(|p| (p.z, p.mu)).collect()));

    render_plot("mu - mu_fit", &series, width, height, scale)
}

/// Render a saved curve JSON file (curves only).
pub fn render_curve_file_plot(curve: &CurveFile, width: usize, height: usize, scale: AxisScale) -> String {
    let to_points = |mu: &[f64]| -> Vec<CurvePoint> {
        curve
            .grid
            .z
            .iter()
            .zip(mu)
            .map(|(&z, &mu)| CurvePoint { z, mu })
            .collect()
    };

    let mut series = vec![Series::line("best fit", '-', &to_points(&curve.grid.mu))];
    for (i, r) in curve.references.iter().enumerate() {
        series.push(Series::line(r.label.clone(), reference_glyph(i), &to_points(&r.mu)));
    }

    let mut out = format!("Fit: {} (chi^2={:.6})\n", curve.fit.params, curve.fit.chi_square);
    out.push_str(&render_plot("mu", &series, width, height, scale));
    out
}

/// Render labelled series on a fixed-size character grid.
pub fn render_plot(y_label: &str, series: &[Series], width: usize, height: usize, scale: AxisScale) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Non-positive redshifts have no place on a log axis.
    let visible: Vec<Series> = series
        .iter()
        .map(|s| Series {
            points: s
                .points
                .iter()
                .copied()
                .filter(|&(z, y)| y.is_finite() && (scale == AxisScale::Linear || z > 0.0))
                .collect(),
            ..s.clone()
        })
        .collect();

    let Some((x_min, x_max)) = x_bounds(visible.iter().flat_map(|s| s.points.iter().map(|p| p.0)), scale) else {
        return "Plot: nothing to draw\n".to_string();
    };
    let (y_min, y_max) = y_range(&visible).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let (u_min, u_max) = (to_axis(x_min, scale), to_axis(x_max, scale));
    let mut grid = vec![vec![' '; width]; height];

    // Draw curves first (so points can overlay).
    for s in visible.iter().filter(|s| s.kind == SeriesKind::Line) {
        draw_curve(&mut grid, &s.points, s.glyph, scale, u_min, u_max, y_min, y_max);
    }
    for s in visible.iter().filter(|s| s.kind == SeriesKind::Scatter) {
        for &(z, y) in &s.points {
            let x = map_x(to_axis(z, scale), u_min, u_max, width);
            let yy = map_y(y, y_min, y_max, height);
            grid[yy][x] = s.glyph;
        }
    }

    let scale_name = match scale {
        AxisScale::Log => "log",
        AxisScale::Linear => "linear",
    };
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: z=[{x_min:.4}, {x_max:.4}] {scale_name} | {y_label}=[{y_min:.3}, {y_max:.3}]\n"
    ));
    let legend: Vec<String> = visible
        .iter()
        .filter(|s| !s.points.is_empty())
        .map(|s| format!("{} {}", s.glyph, s.label))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join(" | ")));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn to_axis(z: f64, scale: AxisScale) -> f64 {
    match scale {
        AxisScale::Linear => z,
        AxisScale::Log => z.ln(),
    }
}

fn x_bounds(zs: impl Iterator<Item = f64>, scale: AxisScale) -> Option<(f64, f64)> {
    let mut min_z = f64::INFINITY;
    let mut max_z = f64::NEG_INFINITY;
    for z in zs.filter(|&z| z.is_finite() && (scale == AxisScale::Linear || z > 0.0)) {
        min_z = min_z.min(z);
        max_z = max_z.max(z);
    }
    if min_z.is_finite() && max_z.is_finite() && max_z > min_z {
        Some((min_z, max_z))
    } else {
        None
    }
}

fn y_range(series: &[Series]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in series.iter().flat_map(|s| s.points.iter()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(u: f64, u_min: f64, u_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let t = ((u - u_min) / (u_max - u_min)).clamp(0.0, 1.0);
    (t * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

#[allow(clippy::too_many_arguments)]
fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    glyph: char,
    scale: AxisScale,
    u_min: f64,
    u_max: f64,
    y_min: f64,
    y_max: f64,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(z, y) in curve {
        let x = map_x(to_axis(z, scale), u_min, u_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, glyph);
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = glyph;
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(z: f64, mu: f64) -> Observation {
        Observation { z, mu, mu_err: None }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let observations = vec![obs(1.0, 100.0), obs(10.0, 110.0)];
        let flat: Vec<CurvePoint> = (1..=10).map(|i| CurvePoint { z: i as f64, mu: 100.0 }).collect();

        let txt = render_fit_plot(&observations, &[], &flat, &[], 10, 5, AxisScale::Linear);
        let expected = concat!(
            "Plot: z=[1.0000, 10.0000] linear | mu=[99.500, 110.500]\n",
            "Legend: - best fit | o data\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn log_axis_spreads_low_redshifts() {
        let observations = vec![obs(0.01, 33.0), obs(0.1, 38.0), obs(1.0, 44.0)];
        let txt = render_fit_plot(&observations, &[], &[], &[], 21, 5, AxisScale::Log);
        let rows: Vec<&str> = txt.lines().skip(2).collect();

        // Equal spacing in log z puts the middle point in the middle column.
        let middle = rows.iter().find_map(|r| r.find('o').filter(|&c| c != 0 && c != 20));
        assert_eq!(middle, Some(10));
    }

    #[test]
    fn log_axis_drops_non_positive_redshift() {
        let observations = vec![obs(0.0, 10.0), obs(0.1, 38.0), obs(1.0, 44.0)];
        let txt = render_fit_plot(&observations, &[], &[], &[], 20, 5, AxisScale::Log);
        assert!(txt.starts_with("Plot: z=[0.1000, 1.0000] log | mu=[37.700, 44.300]"));
    }

    #[test]
    fn residual_plot_draws_zero_line_and_bins() {
        let residuals = vec![
            Residual {
                observation: obs(0.1, 38.2),
                mu_fit: 38.0,
                residual: 0.2,
            },
            Residual {
                observation: obs(1.0, 43.8),
                mu_fit: 44.0,
                residual: -0.2,
            },
        ];
        let bins = [CurvePoint { z: 0.5, mu: 0.0 }];
        let txt = render_residual_plot(&residuals, &bins, &[], 11, 5, AxisScale::Linear);

        assert!(txt.contains("Legend: - best fit | o data | B bins"));
        let middle_row = txt.lines().nth(4).unwrap_or("");
        assert!(middle_row.contains('B'));
        assert!(middle_row.contains('-'));
    }

    #[test]
    fn empty_plot_is_reported() {
        assert_eq!(
            render_plot("mu", &[], 20, 5, AxisScale::Linear),
            "Plot: nothing to draw\n"
        );
    }
}
