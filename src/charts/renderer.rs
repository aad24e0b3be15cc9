//! Static Chart Renderer
//! Draws dispatched views onto any plotters backend (bitmap or SVG) for export.
//!
//! Layout per view:
//! - Chart: caption, axes with category labels, series, optional overlay,
//!   legend when more than one series, optional insight strip at the bottom
//! - Table: title, shaded header, zebra rows (clipped to the box)
//! - Map: caption, lon/lat frame of Africa, coloured centroid symbols, scale bar
//!
//! Every size is multiplied by the pixel ratio so 2x exports stay sharp.

use crate::charts::dispatcher::{ChartProps, MapProps, TableProps, VisualizationView};
use crate::charts::plotter::{ChartPlotter, AFRICA_LAT, AFRICA_LON};
use crate::charts::style;
use crate::data::{Cell, ChartType};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

const FONT: &str = "sans-serif";
const GRID: RGBColor = RGBColor(230, 230, 230);
const MUTED: RGBColor = RGBColor(110, 110, 110);
const HEADER_BG: RGBColor = RGBColor(236, 240, 241);
const ZEBRA_BG: RGBColor = RGBColor(248, 249, 250);
const INSIGHT_BG: RGBColor = RGBColor(254, 249, 231);
const INSIGHT_BORDER: RGBColor = RGBColor(243, 156, 18);
const SEA: RGBColor = RGBColor(234, 242, 248);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing backend error: {0}")]
    Backend(String),
}

fn backend_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn rgb(c: (u8, u8, u8)) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn font<'a>(size: u32, color: &'a RGBColor) -> TextStyle<'a> {
    TextStyle::from((FONT, size as f64)).color(color)
}

/// Truncate to roughly fit `width` pixels at `size`.
fn fit_text(text: &str, width: i32, size: u32) -> String {
    let max_chars = (width as f64 / (size as f64 * 0.55)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Draw a dispatched view into `area`.
    pub fn draw_view<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        view: &VisualizationView<'_>,
        scale: u32,
    ) -> Result<(), RenderError> {
        let scale = scale.max(1);
        match view {
            VisualizationView::Chart(props) => Self::draw_chart(area, props, scale),
            VisualizationView::Table(props) => Self::draw_table(area, props, scale),
            VisualizationView::Map(props) => Self::draw_map(area, props, scale),
            VisualizationView::Unsupported { kind, .. } => {
                Self::draw_unsupported(area, kind, scale)
            }
        }
    }

    fn draw_chart<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        props: &ChartProps<'_>,
        s: u32,
    ) -> Result<(), RenderError> {
        let payload = props.payload;
        let n = payload.labels.len().max(1);
        let si = s as i32;

        let (mut lo, mut hi) = payload.value_range();
        let overlay = props
            .time_series
            .map(|ts| ChartPlotter::overlay_points(&payload.labels, ts))
            .unwrap_or_default();
        for [_, v] in &overlay {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        if matches!(payload.chart_type, ChartType::Bar | ChartType::Area) {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }
        let pad = ((hi - lo) * 0.08).max(1e-3);
        let y_range = if lo < 0.0 || payload.chart_type == ChartType::Line {
            (lo - pad)..(hi + pad)
        } else {
            lo..(hi + pad)
        };

        let (_, height) = area.dim_in_pixel();
        let (chart_area, insight_area) = match props.insight {
            Some(_) if height as i32 > 120 * si => {
                let (top, bottom) = area.split_vertically(height as i32 - 40 * si);
                (top, Some(bottom))
            }
            _ => (area.clone(), None),
        };

        let labels = &payload.labels;
        let x_formatter = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        };
        let y_formatter = |y: &f64| {
            if (hi - lo).abs() < 10.0 {
                format!("{:.1}", y)
            } else {
                format!("{:.0}", y)
            }
        };

        let mut chart = ChartBuilder::on(&chart_area)
            .caption(props.title, (FONT, (18 * s) as f64))
            .margin(10 * si)
            .x_label_area_size(40 * si)
            .y_label_area_size(60 * si)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_range)
            .map_err(backend_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(GRID)
            .bold_line_style(GRID)
            .x_labels(n.min(12))
            .y_labels(6)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .x_desc(payload.x_label.as_str())
            .y_desc(payload.y_label.as_str())
            .label_style((FONT, (11 * s) as f64))
            .axis_desc_style((FONT, (12 * s) as f64))
            .draw()
            .map_err(backend_err)?;

        let series_count = payload.series.len().max(1);
        let bar_width = 0.8 / series_count as f64;

        for (s_idx, series) in payload.series.iter().enumerate() {
            let color = rgb(style::series_color(series, s_idx));
            let points: Vec<(f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as f64, v))
                .collect();

            let drawn = match payload.chart_type {
                ChartType::Line => chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2 * s)))
                    .map_err(backend_err)?,
                ChartType::Area => chart
                    .draw_series(
                        AreaSeries::new(points, 0.0, color.mix(0.3))
                            .border_style(color.stroke_width(2 * s)),
                    )
                    .map_err(backend_err)?,
                ChartType::Bar => {
                    let offset = (s_idx as f64 - (series_count as f64 - 1.0) / 2.0) * bar_width;
                    chart
                        .draw_series(points.into_iter().map(|(x, v)| {
                            let x0 = x + offset - bar_width * 0.475;
                            let x1 = x + offset + bar_width * 0.475;
                            Rectangle::new([(x0, 0.0), (x1, v)], color.filled())
                        }))
                        .map_err(backend_err)?
                }
            };
            drawn.label(series.name.as_str()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 4 * si), (x + 14 * si, y + 4 * si)], color.filled())
            });
        }

        if let (Some(ts), false) = (props.time_series, overlay.is_empty()) {
            let color = rgb(style::OVERLAY);
            let line: Vec<(f64, f64)> = overlay.iter().map(|p| (p[0], p[1])).collect();
            chart
                .draw_series(DashedLineSeries::new(
                    line.clone(),
                    6 * si,
                    4 * si,
                    color.stroke_width(s),
                ))
                .map_err(backend_err)?
                .label(ts.name.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 14 * si, y)], color.stroke_width(2))
                });
            chart
                .draw_series(
                    line.into_iter()
                        .map(|p| Circle::new(p, 3 * si, color.filled())),
                )
                .map_err(backend_err)?;
        }

        if payload.series.len() > 1 || !overlay.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.85))
                .border_style(GRID)
                .label_font((FONT, (11 * s) as f64))
                .draw()
                .map_err(backend_err)?;
        }

        if let (Some(insight), Some(strip)) = (props.insight, insight_area) {
            let (w, h) = strip.dim_in_pixel();
            strip
                .draw(&Rectangle::new(
                    [(8 * si, 2 * si), (w as i32 - 8 * si, h as i32 - 4 * si)],
                    INSIGHT_BG.filled(),
                ))
                .map_err(backend_err)?;
            strip
                .draw(&Rectangle::new(
                    [(8 * si, 2 * si), (w as i32 - 8 * si, h as i32 - 4 * si)],
                    INSIGHT_BORDER.stroke_width(s),
                ))
                .map_err(backend_err)?;
            let text = fit_text(insight, w as i32 - 32 * si, 12 * s);
            strip
                .draw(&Text::new(
                    text,
                    (16 * si, h as i32 / 2),
                    font(12 * s, &BLACK).pos(Pos::new(HPos::Left, VPos::Center)),
                ))
                .map_err(backend_err)?;
        }

        Ok(())
    }

    fn draw_table<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        props: &TableProps<'_>,
        s: u32,
    ) -> Result<(), RenderError> {
        let payload = props.payload;
        let si = s as i32;
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);

        area.draw(&Text::new(
            props.title.to_string(),
            (10 * si, 8 * si),
            font(16 * s, &BLACK),
        ))
        .map_err(backend_err)?;

        let left = 10 * si;
        let inner_w = (w - 20 * si).max(1);
        let row_h = 24 * si;
        let mut y = 36 * si;

        // Column widths follow the longest text in each column.
        let weights: Vec<usize> = payload
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                payload
                    .rows
                    .iter()
                    .filter_map(|row| row.get(c))
                    .map(|cell| cell.to_string().chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(1)
                    .clamp(4, 40)
            })
            .collect();
        let total: usize = weights.iter().sum::<usize>().max(1);
        let mut edges = vec![left];
        for weight in &weights {
            let last = *edges.last().unwrap_or(&left);
            edges.push(last + (inner_w as f64 * *weight as f64 / total as f64) as i32);
        }

        let draw_row = |y: i32, cells: Vec<(String, bool)>, bold: bool| -> Result<(), RenderError> {
            for (c, (text, numeric)) in cells.into_iter().enumerate() {
                let (x0, x1) = (edges[c], edges[c + 1]);
                let text = fit_text(&text, x1 - x0 - 12 * si, 12 * s);
                let size = if bold { 12 * s } else { 11 * s };
                let (x, hpos) = if numeric {
                    (x1 - 6 * si, HPos::Right)
                } else {
                    (x0 + 6 * si, HPos::Left)
                };
                area.draw(&Text::new(
                    text,
                    (x, y + row_h / 2),
                    font(size, &BLACK).pos(Pos::new(hpos, VPos::Center)),
                ))
                .map_err(backend_err)?;
            }
            Ok(())
        };

        area.draw(&Rectangle::new(
            [(left, y), (left + inner_w, y + row_h)],
            HEADER_BG.filled(),
        ))
        .map_err(backend_err)?;
        draw_row(
            y,
            payload.columns.iter().map(|c| (c.clone(), false)).collect(),
            true,
        )?;
        y += row_h;

        let caption_h = if payload.caption.is_some() { row_h } else { 0 };
        for (r, row) in payload.rows.iter().enumerate() {
            let remaining = payload.rows.len() - r;
            if y + row_h > h - caption_h - row_h && remaining > 1 {
                area.draw(&Text::new(
                    format!("… {} more rows", remaining),
                    (left + 6 * si, y + row_h / 2),
                    font(11 * s, &MUTED).pos(Pos::new(HPos::Left, VPos::Center)),
                ))
                .map_err(backend_err)?;
                y += row_h;
                break;
            }
            if r % 2 == 1 {
                area.draw(&Rectangle::new(
                    [(left, y), (left + inner_w, y + row_h)],
                    ZEBRA_BG.filled(),
                ))
                .map_err(backend_err)?;
            }
            draw_row(
                y,
                row.iter()
                    .map(|cell| (cell.to_string(), matches!(cell, Cell::Number(_))))
                    .collect(),
                false,
            )?;
            y += row_h;
        }

        area.draw(&Rectangle::new(
            [(left, 36 * si), (left + inner_w, y)],
            GRID.stroke_width(s),
        ))
        .map_err(backend_err)?;

        if let Some(caption) = &payload.caption {
            area.draw(&Text::new(
                fit_text(caption, inner_w, 10 * s),
                (left, y + 6 * si),
                font(10 * s, &MUTED),
            ))
            .map_err(backend_err)?;
        }

        Ok(())
    }

    fn draw_map<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        props: &MapProps<'_>,
        s: u32,
    ) -> Result<(), RenderError> {
        let payload = props.payload;
        let si = s as i32;
        let (min, max) = payload.value_range();

        let mut chart = ChartBuilder::on(area)
            .caption(props.title, (FONT, (18 * s) as f64))
            .margin(10 * si)
            .margin_bottom(40 * si)
            .build_cartesian_2d(AFRICA_LON.0..AFRICA_LON.1, AFRICA_LAT.0..AFRICA_LAT.1)
            .map_err(backend_err)?;

        chart.plotting_area().fill(&SEA).map_err(backend_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(AFRICA_LON.0, 0.0), (AFRICA_LON.1, 0.0)],
                GRID.stroke_width(s),
            )))
            .map_err(backend_err)?;

        chart
            .draw_series(payload.regions.iter().map(|r| {
                let fill = rgb(style::color_scale(r.value, min, max));
                Circle::new((r.lon, r.lat), 8 * si, fill.filled())
            }))
            .map_err(backend_err)?;
        chart
            .draw_series(
                payload
                    .regions
                    .iter()
                    .map(|r| Circle::new((r.lon, r.lat), 8 * si, MUTED.stroke_width(s))),
            )
            .map_err(backend_err)?;
        chart
            .draw_series(payload.regions.iter().map(|r| {
                Text::new(
                    r.code.clone(),
                    (r.lon, r.lat - 2.5),
                    font(9 * s, &MUTED).pos(Pos::new(HPos::Center, VPos::Top)),
                )
            }))
            .map_err(backend_err)?;

        // Scale bar along the bottom margin
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        let bar_w = (w / 3).min(240 * si);
        let steps = 24;
        let y0 = h - 34 * si;
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            let color = rgb(style::color_scale(min + t * (max - min), min, max));
            let x0 = 12 * si + bar_w * i / steps;
            let x1 = 12 * si + bar_w * (i + 1) / steps;
            area.draw(&Rectangle::new([(x0, y0), (x1, y0 + 8 * si)], color.filled()))
                .map_err(backend_err)?;
        }
        area.draw(&Text::new(
            format!("{:.1}", min),
            (12 * si, y0 + 12 * si),
            font(10 * s, &MUTED),
        ))
        .map_err(backend_err)?;
        area.draw(&Text::new(
            format!("{:.1} {}", max, payload.unit),
            (12 * si + bar_w, y0 + 12 * si),
            font(10 * s, &MUTED).pos(Pos::new(HPos::Right, VPos::Top)),
        ))
        .map_err(backend_err)?;
        area.draw(&Text::new(
            payload.metric.clone(),
            (24 * si + bar_w, y0 - 2 * si),
            font(11 * s, &BLACK),
        ))
        .map_err(backend_err)?;

        Ok(())
    }

    fn draw_unsupported<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        kind: &str,
        s: u32,
    ) -> Result<(), RenderError> {
        let si = s as i32;
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        area.draw(&Rectangle::new(
            [(2 * si, 2 * si), (w - 2 * si, h - 2 * si)],
            MUTED.stroke_width(s),
        ))
        .map_err(backend_err)?;
        area.draw(&Text::new(
            format!("Unsupported visualization type: {}", kind),
            (w / 2, h / 2),
            font(14 * s, &MUTED).pos(Pos::new(HPos::Center, VPos::Center)),
        ))
        .map_err(backend_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::dispatcher::tests::{chart_data, map_data, table_data};
    use crate::charts::dispatcher::{DisplayOptions, VisualizationDispatcher};
    use crate::data::TimeSeries;

    fn render_svg(view: &VisualizationView<'_>) -> String {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 400)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            StaticChartRenderer::draw_view(&root, view, 1).unwrap();
            root.present().unwrap();
        }
        svg
    }

    #[test]
    fn chart_svg_contains_title_and_series() {
        let data = chart_data("chart-1");
        let options = DisplayOptions::default().with_insight(Some("Warmest on record".into()));
        let svg = render_svg(&VisualizationDispatcher::dispatch(&data, &options));
        assert!(svg.contains("Anomaly"));
        assert!(svg.contains("Warmest on record"));
        assert!(svg.contains("<polyline") || svg.contains("<path"));
    }

    #[test]
    fn chart_with_overlay_renders() {
        let data = chart_data("chart-1");
        let options = DisplayOptions::default().with_time_series(Some(TimeSeries {
            name: "Continental anomaly".into(),
            points: vec![(2022, 0.44), (2023, 0.61)],
        }));
        let svg = render_svg(&VisualizationDispatcher::dispatch(&data, &options));
        assert!(svg.contains("Continental anomaly"));
    }

    #[test]
    fn table_svg_contains_cells() {
        let data = table_data("table-1");
        let options = DisplayOptions::default();
        let svg = render_svg(&VisualizationDispatcher::dispatch(&data, &options));
        assert!(svg.contains("Station"));
        assert!(svg.contains("Dakar"));
    }

    #[test]
    fn map_svg_contains_region_codes() {
        let data = map_data("map-1");
        let options = DisplayOptions::default();
        let svg = render_svg(&VisualizationDispatcher::dispatch(&data, &options));
        assert!(svg.contains("KEN"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn unsupported_renders_placeholder() {
        let view = VisualizationView::Unsupported {
            kind: "globe",
            title: "Globe",
        };
        let svg = render_svg(&view);
        assert!(svg.contains("Unsupported visualization type: globe"));
    }

    #[test]
    fn fit_text_truncates_long_labels() {
        assert_eq!(fit_text("Kenya", 200, 12), "Kenya");
        let cut = fit_text("Democratic Republic of the Congo", 60, 12);
        assert!(cut.ends_with('…'));
        assert!(cut.chars().count() < 32);
    }
}
