//! Indicator Accordion
//! Collapsible key indicators on a topic page; at most one is open.

use crate::charts::{style, to_color32};
use crate::data::{Indicator, TimeSeries};
use egui::{Color32, RichText};
use egui_plot::{Line, Plot, PlotPoints};

const SPARKLINE_HEIGHT: f32 = 90.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorAccordion {
    open: Option<usize>,
}

impl IndicatorAccordion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.open == Some(index)
    }

    /// Open `index`, or close it when it is already the open one.
    pub fn toggle(&mut self, index: usize) {
        self.open = if self.is_open(index) { None } else { Some(index) };
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    /// Series of the open indicator, if it has one.
    pub fn open_series<'a>(&self, indicators: &'a [Indicator]) -> Option<&'a TimeSeries> {
        self.open
            .and_then(|i| indicators.get(i))
            .and_then(|indicator| indicator.time_series.as_ref())
    }

    pub fn show(&mut self, ui: &mut egui::Ui, indicators: &[Indicator]) {
        for (index, indicator) in indicators.iter().enumerate() {
            let open = self.is_open(index);
            let arrow = if open { "▼" } else { "▶" };
            let header = ui.add(
                egui::Button::new(
                    RichText::new(format!("{} {}   {}", arrow, indicator.label, indicator.value))
                        .size(14.0)
                        .strong(),
                )
                .frame(false),
            );
            if header.clicked() {
                self.toggle(index);
            }

            if open {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(18.0, 4.0))
                    .show(ui, |ui| {
                        ui.label(RichText::new(&indicator.description).size(12.0));
                        if let Some(series) = &indicator.time_series {
                            Self::sparkline(ui, index, series);
                            ui.label(
                                RichText::new("Shown as an overlay on this topic's charts")
                                    .size(10.0)
                                    .color(Color32::GRAY),
                            );
                        }
                    });
            }
            ui.separator();
        }
    }

    fn sparkline(ui: &mut egui::Ui, index: usize, series: &TimeSeries) {
        let points: PlotPoints = series
            .points
            .iter()
            .map(|(year, value)| [*year as f64, *value])
            .collect();
        Plot::new(format!("indicator_sparkline_{}", index))
            .height(SPARKLINE_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .show_axes([true, false])
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .color(to_color32(style::OVERLAY))
                        .width(1.5)
                        .name(&series.name),
                );
            });
    }
}
