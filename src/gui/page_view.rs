//! Page View
//! Central panel rendering a resolved page, and the render-tree mirror of its
//! visualization cards used by exports.

use crate::auth::{AccessGate, IdentityProvider};
use crate::charts::{ChartPlotter, DisplayOptions, VisualizationDispatcher};
use crate::data::{Article, TimeSeries, Topic, VisualizationData, VisualizationPayload};
use crate::export::{Document, ExportFormat, Node, NodeKind};
use crate::gui::indicators::IndicatorAccordion;
use crate::gui::route::{Page, PageResponse, Route};
use egui::{Color32, RichText};

const CARD_SPACING: f32 = 15.0;
const CHART_HEIGHT: f32 = 360.0;
const ACCENT: Color32 = Color32::from_rgb(211, 84, 0);

/// One visualization card on a page.
#[derive(Debug, Clone, Copy)]
pub struct Card<'a> {
    pub data: &'a VisualizationData,
    pub insight: Option<&'a str>,
    pub description: &'a str,
}

impl<'a> Card<'a> {
    fn plain(data: &'a VisualizationData) -> Self {
        Self {
            data,
            insight: None,
            description: &data.description,
        }
    }

    /// Overlays only apply to line/bar/area charts.
    pub fn options(&self, overlay: Option<&TimeSeries>) -> DisplayOptions {
        let overlay = match &self.data.payload {
            VisualizationPayload::Chart(_) => overlay.cloned(),
            _ => None,
        };
        DisplayOptions::default()
            .with_height(CHART_HEIGHT)
            .with_time_series(overlay)
            .with_insight(self.insight.map(str::to_string))
    }
}

/// Visualization cards shown on `page`, in display order.
pub fn cards<'a>(page: &Page<'a>) -> Vec<Card<'a>> {
    match *page {
        Page::Topic {
            ref charts,
            ref visualizations,
            ..
        } => {
            let mut out: Vec<Card<'a>> = charts
                .iter()
                .copied()
                .filter_map(|chart| {
                    visualizations
                        .iter()
                        .copied()
                        .find(|v| v.id == chart.visualization_id)
                        .map(|data| Card {
                            data,
                            insight: chart.insight.as_deref(),
                            description: &chart.description,
                        })
                })
                .collect();
            for vis in visualizations.iter().copied() {
                if !out.iter().any(|c| c.data.id == vis.id) {
                    out.push(Card::plain(vis));
                }
            }
            out
        }
        Page::Article {
            visualization: Some(data),
            ..
        } => vec![Card::plain(data)],
        Page::Chart {
            chart,
            visualization,
        } => vec![Card {
            data: visualization,
            insight: chart.insight.as_deref(),
            description: &chart.description,
        }],
        Page::Visualization(data) => vec![Card::plain(data)],
        _ => Vec::new(),
    }
}

/// Render tree of the page's cards: one block per card, keyed by the
/// visualization id.
pub fn build_document(cards: &[Card<'_>], overlay: Option<&TimeSeries>, width: u32) -> Document {
    let mut doc = Document::new(width);
    let body = doc.body();
    for card in cards {
        let block = doc.append(body, Node::new(NodeKind::Block).with_id(card.data.id.clone()));
        doc.append(block, Node::new(NodeKind::Heading(card.data.title.clone())));
        if !card.description.is_empty() {
            doc.append(block, Node::new(NodeKind::Text(card.description.to_string())));
        }
        doc.append(
            block,
            Node::new(NodeKind::Visualization {
                data: Box::new(card.data.clone()),
                options: card.options(overlay),
            }),
        );
    }
    doc
}

/// What the user asked for this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    None,
    Navigate(Route),
    Export {
        element_ids: Vec<String>,
        format: ExportFormat,
    },
    OpenSignIn,
    OpenSignUp,
    Status(String),
}

/// Everything a page needs besides the resolved content.
pub struct PageContext<'a> {
    pub gate: &'a AccessGate,
    pub provider: &'a dyn IdentityProvider,
    pub accordion: &'a mut IndicatorAccordion,
    pub exporting: bool,
}

pub struct PageView;

impl PageView {
    pub fn show(ui: &mut egui::Ui, response: &PageResponse<'_>, ctx: PageContext<'_>) -> PageAction {
        let mut action = PageAction::None;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add_space(10.0);
                match &response.page {
                    Page::Home { topics, latest } => {
                        ui.label(RichText::new("Africa Climate Atlas").size(28.0).strong());
                        ui.label(
                            RichText::new("Data and stories on how the climate of Africa is changing.")
                                .size(14.0)
                                .color(Color32::GRAY),
                        );
                        ui.add_space(CARD_SPACING);
                        Self::topic_list(ui, topics, &mut action);
                        ui.add_space(CARD_SPACING);
                        ui.label(RichText::new("Latest articles").size(18.0).strong());
                        Self::article_list(ui, latest, &mut action);
                    }
                    Page::Topics(topics) => {
                        ui.label(RichText::new("Topics").size(24.0).strong());
                        Self::topic_list(ui, topics, &mut action);
                    }
                    Page::Topic { topic, articles, .. } => {
                        ui.label(RichText::new(&topic.title).size(24.0).strong());
                        ui.label(RichText::new(&topic.description).size(13.0));
                        ui.label(
                            RichText::new(format!(
                                "{} charts · {} articles",
                                topic.chart_count, topic.article_count
                            ))
                            .size(11.0)
                            .color(Color32::GRAY),
                        );
                        ui.add_space(CARD_SPACING);

                        if !topic.indicators.is_empty() {
                            ui.label(RichText::new("Key indicators").size(18.0).strong());
                            ctx.accordion.show(ui, &topic.indicators);
                            ui.add_space(CARD_SPACING);
                        }

                        let overlay = ctx.accordion.open_series(&topic.indicators);
                        let cards = cards(&response.page);
                        if !cards.is_empty() {
                            ctx.gate_row(ui, &mut action, |ui, action| {
                                ui.label("Download all:");
                                for format in ExportFormat::ALL {
                                    if ui
                                        .add_enabled(!ctx.exporting, egui::Button::new(format.label()))
                                        .clicked()
                                    {
                                        *action = PageAction::Export {
                                            element_ids: cards.iter().map(|c| c.data.id.clone()).collect(),
                                            format,
                                        };
                                    }
                                }
                            });
                        }
                        for card in &cards {
                            Self::card(ui, card, overlay, &ctx, &mut action);
                        }

                        if !articles.is_empty() {
                            ui.label(RichText::new("Articles").size(18.0).strong());
                            Self::article_list(ui, articles, &mut action);
                        }
                    }
                    Page::Articles(articles) => {
                        ui.label(RichText::new("Articles").size(24.0).strong());
                        Self::article_list(ui, articles, &mut action);
                    }
                    Page::Article { article, topic, .. } => {
                        Self::article(ui, article, *topic, &ctx, &mut action);
                        for card in cards(&response.page) {
                            Self::card(ui, &card, None, &ctx, &mut action);
                        }
                    }
                    Page::Chart { .. } | Page::Visualization(_) => {
                        for card in cards(&response.page) {
                            Self::card(ui, &card, None, &ctx, &mut action);
                        }
                    }
                    Page::SignIn | Page::SignUp => {
                        let sign_in = matches!(response.page, Page::SignIn);
                        ui.label(
                            RichText::new(if sign_in { "Sign in" } else { "Create an account" })
                                .size(24.0)
                                .strong(),
                        );
                        ui.label("Authentication continues in your browser.");
                        if ui.button("Open browser").clicked() {
                            action = if sign_in {
                                PageAction::OpenSignIn
                            } else {
                                PageAction::OpenSignUp
                            };
                        }
                    }
                    Page::NotFound(path) => {
                        ui.vertical_centered(|ui| {
                            ui.add_space(60.0);
                            ui.label(RichText::new("404").size(48.0).strong().color(ACCENT));
                            ui.label(RichText::new("Page not found").size(20.0));
                            ui.label(RichText::new(path).monospace().color(Color32::GRAY));
                            ui.add_space(10.0);
                            if ui.button("Back to home").clicked() {
                                action = PageAction::Navigate(Route::Home);
                            }
                        });
                    }
                }
            });

        action
    }

    fn topic_list(ui: &mut egui::Ui, topics: &[Topic], action: &mut PageAction) {
        for topic in topics {
            egui::Frame::none()
                .rounding(8.0)
                .stroke(egui::Stroke::new(1.0, Color32::from_gray(90)))
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    if ui
                        .link(RichText::new(&topic.title).size(16.0).strong())
                        .clicked()
                    {
                        *action = PageAction::Navigate(Route::Topic(topic.id.clone()));
                    }
                    ui.label(RichText::new(&topic.description).size(12.0));
                });
            ui.add_space(6.0);
        }
    }

    fn article_list(ui: &mut egui::Ui, articles: &[&Article], action: &mut PageAction) {
        for article in articles {
            ui.horizontal(|ui| {
                if ui.link(RichText::new(&article.title).size(14.0)).clicked() {
                    *action = PageAction::Navigate(Route::Article(article.id.clone()));
                }
                if article.is_new {
                    ui.label(RichText::new("NEW").size(10.0).strong().color(ACCENT));
                }
            });
            ui.label(
                RichText::new(format!(
                    "{} · {} · {} min read",
                    article.author, article.date, article.read_time
                ))
                .size(11.0)
                .color(Color32::GRAY),
            );
            ui.add_space(6.0);
        }
    }

    fn article(
        ui: &mut egui::Ui,
        article: &Article,
        topic: Option<&Topic>,
        ctx: &PageContext<'_>,
        action: &mut PageAction,
    ) {
        if let Some(topic) = topic {
            if ui.link(RichText::new(&topic.title).size(12.0)).clicked() {
                *action = PageAction::Navigate(Route::Topic(topic.id.clone()));
            }
        }
        ui.label(RichText::new(&article.title).size(26.0).strong());
        ui.label(
            RichText::new(format!(
                "By {} · {} · {} min read",
                article.author, article.date, article.read_time
            ))
            .size(12.0)
            .color(Color32::GRAY),
        );
        ui.add_space(8.0);
        ui.label(RichText::new(&article.excerpt).size(14.0).italics());
        ui.add_space(8.0);

        if let Some(e) = ctx.gate.show(ui, ctx.provider, |ui| {
            for paragraph in &article.body {
                ui.label(RichText::new(paragraph).size(14.0));
                ui.add_space(6.0);
            }
        }) {
            *action = PageAction::Status(e.to_string());
        }
        ui.add_space(CARD_SPACING);
    }

    fn card(
        ui: &mut egui::Ui,
        card: &Card<'_>,
        overlay: Option<&TimeSeries>,
        ctx: &PageContext<'_>,
        action: &mut PageAction,
    ) {
        let options = card.options(overlay);
        let view = VisualizationDispatcher::dispatch(card.data, &options);

        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(110)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(view.title()).size(18.0).strong());
                if !card.description.is_empty() {
                    ui.label(RichText::new(card.description).size(12.0).color(Color32::GRAY));
                }
                ui.add_space(6.0);
                ChartPlotter::show(ui, &view);
                ui.add_space(6.0);

                if view.is_supported() {
                    ctx.gate_row(ui, action, |ui, action| {
                        ui.label("Download:");
                        for format in ExportFormat::ALL {
                            if ui
                                .add_enabled(!ctx.exporting, egui::Button::new(format.label()))
                                .clicked()
                            {
                                *action = PageAction::Export {
                                    element_ids: vec![card.data.id.clone()],
                                    format,
                                };
                            }
                        }
                    });
                }
            });
        ui.add_space(CARD_SPACING);
    }
}

impl PageContext<'_> {
    /// A row of controls visible to signed-in users only.
    fn gate_row(
        &self,
        ui: &mut egui::Ui,
        action: &mut PageAction,
        add_contents: impl FnOnce(&mut egui::Ui, &mut PageAction),
    ) {
        let failure = self.gate.show(ui, self.provider, |ui| {
            ui.horizontal(|ui| add_contents(ui, action));
        });
        if let Some(e) = failure {
            *action = PageAction::Status(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Catalog, ContentSource};
    use crate::gui::route::resolve;

    #[test]
    fn topic_cards_follow_chart_cards_then_extras() {
        let catalog = Catalog::bundled().unwrap();
        let response = resolve(&Route::Topic("rising-temperatures".into()), &catalog);
        let ids: Vec<&str> = cards(&response.page).iter().map(|c| c.data.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"chart-1"));
        assert!(ids.contains(&"map-1"));
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn document_mirrors_cards() {
        let catalog = Catalog::bundled().unwrap();
        let response = resolve(&Route::Topic("rising-temperatures".into()), &catalog);
        let cards = cards(&response.page);
        let doc = build_document(&cards, None, 800);
        for card in &cards {
            assert!(doc.get_element_by_id(&card.data.id).is_some());
        }
    }

    #[test]
    fn pages_without_visualizations_have_no_cards() {
        let catalog = Catalog::bundled().unwrap();
        for route in [Route::Home, Route::Topics, Route::parse("/nowhere")] {
            assert!(cards(&resolve(&route, &catalog).page).is_empty());
        }
    }

    #[test]
    fn overlay_only_reaches_charts() {
        let catalog = Catalog::bundled().unwrap();
        let series = TimeSeries {
            name: "Continental anomaly".into(),
            points: vec![(2023, 0.61)],
        };
        let chart = Card::plain(catalog.visualization_by_id("chart-1").unwrap());
        let map = Card::plain(catalog.visualization_by_id("map-1").unwrap());
        assert!(chart.options(Some(&series)).time_series.is_some());
        assert!(map.options(Some(&series)).time_series.is_none());
    }
}
