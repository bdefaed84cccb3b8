use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use super::{ChartData, Renderer};
use crate::config::RenderConfig;
use crate::summary::SeriesPoint;
use crate::trace::Schema;

/// One chart panel: a label and a value per series point.
struct Panel {
    label: &'static str,
    values: Vec<i64>,
}

/// Draws stacked log-scale bar panels, one per metric, into an SVG file.
pub struct SvgRenderer {
    width: u32,
    height: u32,
    max_tick_labels: usize,
}

impl SvgRenderer {
    pub fn new(cfg: &RenderConfig) -> Self {
        Self {
            width: cfg.width,
            height: cfg.height,
            max_tick_labels: cfg.max_tick_labels,
        }
    }

    fn draw(&self, chart: &ChartData, out: &Path) -> Result<()> {
        let panels = panels(chart.schema, &chart.points);
        let labels: Vec<String> = chart.points.iter().map(|p| p.size.to_string()).collect();
        let n = i32::try_from(chart.points.len())
            .with_context(|| format!("{} chart points exceed the axis range", chart.points.len()))?;
        let x_labels = label_count(chart.points.len(), self.max_tick_labels);

        let root = SVGBackend::new(out, (self.width, self.height)).into_drawing_area();
        root.fill(&BLACK)?;
        let root = root.titled(
            title(chart.schema),
            ("sans-serif", 18).into_font().color(&WHITE),
        )?;
        let areas = root.split_evenly((panels.len(), 1));
        let last = panels.len().saturating_sub(1);
        let tick_label = |x: &i32| -> String {
            usize::try_from(*x)
                .ok()
                .and_then(|idx| labels.get(idx))
                .cloned()
                .unwrap_or_default()
        };
        let no_label = |_: &i32| String::new();

        for (i, (area, panel)) in areas.iter().zip(&panels).enumerate() {
            let y_max = panel.values.iter().copied().max().unwrap_or(0).max(1) as f64 * 2.0;

            let mut cc = ChartBuilder::on(area)
                .margin(6)
                .x_label_area_size(if i == last { 40 } else { 8 })
                .y_label_area_size(72)
                .build_cartesian_2d(0i32..n.max(1), (1.0f64..y_max).log_scale())?;

            let mut mesh = cc.configure_mesh();
            mesh.disable_x_mesh()
                .y_desc(panel.label)
                .axis_style(WHITE.stroke_width(1))
                .bold_line_style(WHITE.mix(0.3).stroke_width(1))
                .light_line_style(BLACK.stroke_width(1))
                .label_style(("sans-serif", 11).into_font().color(&WHITE))
                .axis_desc_style(("sans-serif", 11).into_font().color(&WHITE));
            if i == last {
                mesh.x_desc(axis_label(chart.schema))
                    .x_labels(x_labels)
                    .x_label_formatter(&tick_label);
            } else {
                // Key points are still computed for one label; it prints empty.
                mesh.x_labels(1).x_label_formatter(&no_label);
            }
            mesh.draw()?;

            cc.draw_series((0..n).zip(&panel.values).map(|(x, &v)| {
                // Zero and negative values have no place on a log axis; they sit on the baseline.
                let top = v.max(1) as f64;
                Rectangle::new([(x, 1.0), (x + 1, top)], WHITE.stroke_width(1))
            }))?;
        }

        root.present()?;
        Ok(())
    }
}

impl Renderer for SvgRenderer {
    fn name(&self) -> &str {
        "svg"
    }

    fn render(&self, chart: &ChartData, out: &Path) -> Result<()> {
        let result = self.draw(chart, out);
        if result.is_err() {
            // Do not leave a half-written chart behind.
            let _ = std::fs::remove_file(out);
        }
        result.with_context(|| format!("rendering chart to {}", out.display()))
    }
}

fn panels(schema: Schema, points: &[SeriesPoint]) -> Vec<Panel> {
    let mut panels = vec![panel("ALLOCATION COUNT", points, |p| p.count)];
    match schema {
        Schema::Stride => {
            panels.push(panel("RAW BYTES", points, |p| p.raw_bytes));
        }
        Schema::Proxy => {
            panels.push(panel("RAW TOTAL BYTES", points, |p| p.raw_bytes));
            panels.push(panel("STRIDE TOTAL BYTES", points, |p| {
                p.stride_bytes.unwrap_or(0)
            }));
        }
    }
    panels.push(panel("PEAK MEMORY PRESSURE", points, |p| p.peak));
    panels
}

fn panel(label: &'static str, points: &[SeriesPoint], value: fn(&SeriesPoint) -> i64) -> Panel {
    Panel {
        label,
        values: points.iter().map(value).collect(),
    }
}

fn title(schema: Schema) -> &'static str {
    match schema {
        Schema::Stride => "STRIDE PRESSURE BY PHASE",
        Schema::Proxy => "RAW / STRIDE TRACE BY PHASE",
    }
}

fn axis_label(schema: Schema) -> &'static str {
    match schema {
        Schema::Stride => "STRIDE SIZE (BYTES)",
        Schema::Proxy => "RAW SIZE (BYTES)",
    }
}

/// Spacing between labelled ticks when `points` categories share roughly
/// `max_labels` labels.
pub(crate) fn tick_interval(points: usize, max_labels: usize) -> usize {
    (points / max_labels.max(1)).max(1)
}

/// Number of tick labels for `points` categories, at least one.
pub(crate) fn label_count(points: usize, max_labels: usize) -> usize {
    points.div_ceil(tick_interval(points, max_labels)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(size: i64, value: i64) -> SeriesPoint {
        SeriesPoint {
            size,
            count: value,
            raw_bytes: value * size,
            stride_bytes: Some(value * size * 2),
            peak: value,
        }
    }

    #[test]
    fn test_tick_interval() {
        assert_eq!(tick_interval(0, 32), 1);
        assert_eq!(tick_interval(10, 32), 1);
        assert_eq!(tick_interval(64, 32), 2);
        assert_eq!(tick_interval(100, 32), 3);
        assert_eq!(tick_interval(5, 0), 5);
    }

    #[test]
    fn test_label_count_bounded() {
        assert_eq!(label_count(10, 32), 10);
        assert_eq!(label_count(64, 32), 32);
        assert_eq!(label_count(100, 32), 34);
        assert_eq!(label_count(0, 32), 1);
        assert_eq!(label_count(5, 0), 1);
    }

    #[test]
    fn test_panels_per_schema() {
        let points = vec![point(8, 1), point(24, 3)];

        let stride: Vec<&str> = panels(Schema::Stride, &points).iter().map(|p| p.label).collect();
        assert_eq!(stride, vec!["ALLOCATION COUNT", "RAW BYTES", "PEAK MEMORY PRESSURE"]);

        let proxy = panels(Schema::Proxy, &points);
        assert_eq!(proxy.len(), 4);
        assert_eq!(proxy[2].values, vec![16, 144]);
    }

    #[test]
    fn test_render_writes_svg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("alloc_trace.svg");
        let chart = ChartData {
            schema: Schema::Proxy,
            points: (1..=40).map(|s| point(s * 8, s)).collect(),
        };

        let renderer = SvgRenderer::new(&RenderConfig::default());
        renderer.render(&chart, &out).expect("render");

        let svg = std::fs::read_to_string(&out).expect("read svg");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("PEAK MEMORY PRESSURE"));
    }

    #[test]
    fn test_render_zero_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("zero.svg");
        let chart = ChartData {
            schema: Schema::Stride,
            points: vec![SeriesPoint {
                size: 8,
                count: 0,
                raw_bytes: 0,
                stride_bytes: None,
                peak: 0,
            }],
        };
        SvgRenderer::new(&RenderConfig::default())
            .render(&chart, &out)
            .expect("render");
        assert!(out.exists());
    }

    #[test]
    fn test_render_every_panel_without_label_overflow() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = RenderConfig {
            max_tick_labels: 1,
            ..RenderConfig::default()
        };
        let renderer = SvgRenderer::new(&cfg);

        for (name, points) in [
            ("empty.svg", Vec::new()),
            ("one.svg", vec![point(16, 5)]),
            ("signed.svg", vec![point(8, -3), point(16, 0), point(32, 7)]),
        ] {
            let out = dir.path().join(name);
            let chart = ChartData {
                schema: Schema::Proxy,
                points,
            };
            renderer.render(&chart, &out).expect("render");
            assert!(out.exists(), "{name} missing");
        }
    }

    #[test]
    fn test_render_failure_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("missing").join("alloc_trace.svg");
        let chart = ChartData {
            schema: Schema::Stride,
            points: vec![point(8, 1)],
        };

        let err = SvgRenderer::new(&RenderConfig::default())
            .render(&chart, &out)
            .unwrap_err();
        assert!(err.to_string().contains("rendering chart"));
        assert!(!out.exists());
    }
}
