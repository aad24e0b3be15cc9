//! Chart Plotter Module
//! Interactive renderer adapters (chart, table, map) drawn with egui/egui_plot.

use crate::charts::dispatcher::{ChartProps, MapProps, TableProps, VisualizationView};
use crate::charts::style;
use crate::data::{ChartType, TimeSeries};
use egui::{Align2, Color32, FontId, RichText, Sense, Stroke};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

/// Width used when a visualization is not responsive.
pub const FIXED_WIDTH: f32 = 720.0;

/// Longitude/latitude window covering the African continent.
pub const AFRICA_LON: (f64, f64) = (-20.0, 55.0);
pub const AFRICA_LAT: (f64, f64) = (-36.0, 38.0);

pub fn to_color32(rgb: (u8, u8, u8)) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

/// Interactive adapters behind one entry point per view.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Draw whatever the dispatcher selected.
    pub fn show(ui: &mut egui::Ui, view: &VisualizationView<'_>) {
        match view {
            VisualizationView::Chart(props) => Self::draw_chart(ui, props),
            VisualizationView::Table(props) => Self::draw_table(ui, props),
            VisualizationView::Map(props) => Self::draw_map(ui, props),
            VisualizationView::Unsupported { kind, .. } => Self::draw_unsupported(ui, kind),
        }
    }

    /// Place yearly overlay points on the category axis. Years without a
    /// matching label are dropped.
    pub fn overlay_points(labels: &[String], series: &TimeSeries) -> Vec<[f64; 2]> {
        series
            .points
            .iter()
            .filter_map(|(year, value)| {
                let year = year.to_string();
                labels
                    .iter()
                    .position(|l| l.trim() == year)
                    .map(|idx| [idx as f64, *value])
            })
            .collect()
    }

    /// Line, bar or area chart with optional overlay and insight.
    pub fn draw_chart(ui: &mut egui::Ui, props: &ChartProps<'_>) {
        let payload = props.payload;
        let labels = payload.labels.clone();

        let mut plot = Plot::new(format!("chart_{}", props.id))
            .height(props.height)
            .allow_zoom(props.show_controls)
            .allow_drag(props.show_controls)
            .allow_boxed_zoom(props.show_controls)
            .allow_scroll(false)
            .x_axis_label(payload.x_label.clone())
            .y_axis_label(payload.y_label.clone())
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            });
        if props.show_controls {
            plot = plot.legend(Legend::default());
        }
        if !props.responsive {
            plot = plot.width(FIXED_WIDTH);
        }

        let series_count = payload.series.len().max(1);
        let bar_width = 0.8 / series_count as f64;

        plot.show(ui, |plot_ui| {
            for (s_idx, series) in payload.series.iter().enumerate() {
                let color = to_color32(style::series_color(series, s_idx));
                match payload.chart_type {
                    ChartType::Line | ChartType::Area => {
                        let points: PlotPoints = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| [i as f64, v])
                            .collect();
                        let mut line = Line::new(points)
                            .color(color)
                            .width(2.0)
                            .name(&series.name);
                        if payload.chart_type == ChartType::Area {
                            line = line.fill(0.0_f32);
                        }
                        plot_ui.line(line);
                    }
                    ChartType::Bar => {
                        let offset = (s_idx as f64 - (series_count as f64 - 1.0) / 2.0) * bar_width;
                        let bars: Vec<Bar> = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| {
                                Bar::new(i as f64 + offset, v)
                                    .width(bar_width * 0.95)
                                    .fill(color)
                            })
                            .collect();
                        plot_ui.bar_chart(BarChart::new(bars).color(color).name(&series.name));
                    }
                }
            }

            if let Some(ts) = props.time_series {
                let overlay = Self::overlay_points(&payload.labels, ts);
                if !overlay.is_empty() {
                    let color = to_color32(style::OVERLAY);
                    plot_ui.line(
                        Line::new(PlotPoints::from_iter(overlay.iter().copied()))
                            .color(color)
                            .width(1.5)
                            .style(egui_plot::LineStyle::dashed_loose())
                            .name(&ts.name),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(overlay.iter().copied()))
                            .radius(3.0)
                            .color(color),
                    );
                }
            }
        });

        if let Some(source) = &payload.source {
            ui.label(
                RichText::new(format!("Source: {}", source))
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        }
        if let Some(insight) = props.insight {
            Self::draw_insight(ui, insight);
        }
    }

    fn draw_insight(ui: &mut egui::Ui, insight: &str) {
        egui::Frame::none()
            .fill(Color32::from_rgb(254, 249, 231))
            .stroke(Stroke::new(1.0, Color32::from_rgb(243, 156, 18)))
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new("💡 Insight").strong().size(12.0));
                ui.label(RichText::new(insight).size(12.0));
            });
    }

    /// Striped table; numbers are right-aligned.
    pub fn draw_table(ui: &mut egui::Ui, props: &TableProps<'_>) {
        let payload = props.payload;

        egui::ScrollArea::both()
            .id_salt(format!("table_scroll_{}", props.id))
            .max_height(props.height)
            .show(ui, |ui| {
                egui::Grid::new(format!("table_{}", props.id))
                    .striped(true)
                    .min_col_width(60.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        for column in &payload.columns {
                            ui.label(RichText::new(column).strong().size(12.0));
                        }
                        ui.end_row();

                        for row in &payload.rows {
                            for cell in row {
                                let text = RichText::new(cell.to_string()).size(12.0);
                                match cell {
                                    crate::data::Cell::Number(_) => {
                                        ui.with_layout(
                                            egui::Layout::right_to_left(egui::Align::Center),
                                            |ui| ui.label(text),
                                        );
                                    }
                                    crate::data::Cell::Text(_) => {
                                        ui.label(text);
                                    }
                                }
                            }
                            ui.end_row();
                        }
                    });
            });

        if props.show_controls {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("{} rows", payload.rows.len()))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                if let Some(caption) = &payload.caption {
                    ui.label(RichText::new(caption).size(11.0).color(Color32::GRAY));
                }
            });
        }
    }

    /// Proportional symbol map at country centroids.
    pub fn draw_map(ui: &mut egui::Ui, props: &MapProps<'_>) {
        let payload = props.payload;
        let width = if props.responsive {
            ui.available_width()
        } else {
            FIXED_WIDTH
        };
        let sense = if props.show_controls {
            Sense::hover()
        } else {
            Sense::focusable_noninteractive()
        };
        let (rect, response) = ui.allocate_exact_size(egui::vec2(width, props.height), sense);
        let painter = ui.painter_at(rect);

        painter.rect_filled(rect, 4.0, Color32::from_rgb(234, 242, 248));
        painter.rect_stroke(rect, 4.0, Stroke::new(1.0, Color32::from_gray(180)));

        let project = |lon: f64, lat: f64| {
            let x = (lon - AFRICA_LON.0) / (AFRICA_LON.1 - AFRICA_LON.0);
            let y = (AFRICA_LAT.1 - lat) / (AFRICA_LAT.1 - AFRICA_LAT.0);
            egui::pos2(
                rect.left() + x as f32 * rect.width(),
                rect.top() + y as f32 * rect.height(),
            )
        };

        // Equator
        painter.line_segment(
            [project(AFRICA_LON.0, 0.0), project(AFRICA_LON.1, 0.0)],
            Stroke::new(0.5, Color32::from_gray(190)),
        );

        let (min, max) = payload.value_range();
        let radius = (rect.width().min(rect.height()) / 40.0).max(4.0);
        let mut hovered = None;

        for region in &payload.regions {
            let center = project(region.lon, region.lat);
            let fill = to_color32(style::color_scale(region.value, min, max));
            painter.circle_filled(center, radius, fill);
            painter.circle_stroke(center, radius, Stroke::new(1.0, Color32::from_gray(90)));
            painter.text(
                center + egui::vec2(0.0, radius + 2.0),
                Align2::CENTER_TOP,
                &region.code,
                FontId::proportional(10.0),
                Color32::from_gray(60),
            );

            if let Some(pointer) = response.hover_pos() {
                if pointer.distance(center) <= radius + 2.0 {
                    hovered = Some(region);
                }
            }
        }

        // Legend
        let steps = 20;
        let legend_w = (rect.width() * 0.3).min(200.0);
        let legend_origin = rect.left_bottom() + egui::vec2(12.0, -24.0);
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            let color = to_color32(style::color_scale(min + t * (max - min), min, max));
            let x0 = legend_origin.x + legend_w * i as f32 / steps as f32;
            let seg = egui::Rect::from_min_size(
                egui::pos2(x0, legend_origin.y),
                egui::vec2(legend_w / steps as f32 + 0.5, 8.0),
            );
            painter.rect_filled(seg, 0.0, color);
        }
        painter.text(
            legend_origin + egui::vec2(0.0, 10.0),
            Align2::LEFT_TOP,
            format!("{:.1}", min),
            FontId::proportional(10.0),
            Color32::DARK_GRAY,
        );
        painter.text(
            legend_origin + egui::vec2(legend_w, 10.0),
            Align2::RIGHT_TOP,
            format!("{:.1} {}", max, payload.unit),
            FontId::proportional(10.0),
            Color32::DARK_GRAY,
        );

        if let Some(region) = hovered {
            response.on_hover_text(format!(
                "{} ({})\n{}: {:.2} {}",
                region.name, region.code, payload.metric, region.value, payload.unit
            ));
        }
    }

    /// Visible placeholder for types without a renderer.
    pub fn draw_unsupported(ui: &mut egui::Ui, kind: &str) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .stroke(Stroke::new(1.0, Color32::GRAY))
            .rounding(5.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_min_height(crate::charts::dispatcher::UNSUPPORTED_HEIGHT - 24.0);
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new(format!("Unsupported visualization type: {}", kind))
                            .size(14.0)
                            .color(Color32::GRAY),
                    );
                });
            });
    }
}
