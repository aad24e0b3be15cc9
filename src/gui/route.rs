//! Page routing: path-style routes resolved against the catalog.
//!
//! Unknown paths and unknown entity ids both resolve to the not-found page
//! with status 404.

use crate::data::{Article, Catalog, Chart, ContentSource, Topic, VisualizationData};

/// Number of articles listed on the home page.
pub const HOME_ARTICLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Topics,
    Topic(String),
    Articles,
    Article(String),
    Chart(String),
    Visualization(String),
    SignIn,
    SignUp,
    Unknown(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["topics"] => Route::Topics,
            ["topics", id] => Route::Topic(id.to_string()),
            ["articles"] => Route::Articles,
            ["articles", id] => Route::Article(id.to_string()),
            ["charts", id] => Route::Chart(id.to_string()),
            ["visualizations", id] => Route::Visualization(id.to_string()),
            ["sign-in", ..] => Route::SignIn,
            ["sign-up", ..] => Route::SignUp,
            _ => Route::Unknown(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Topics => "/topics".to_string(),
            Route::Topic(id) => format!("/topics/{}", id),
            Route::Articles => "/articles".to_string(),
            Route::Article(id) => format!("/articles/{}", id),
            Route::Chart(id) => format!("/charts/{}", id),
            Route::Visualization(id) => format!("/visualizations/{}", id),
            Route::SignIn => "/sign-in".to_string(),
            Route::SignUp => "/sign-up".to_string(),
            Route::Unknown(path) => path.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Page<'a> {
    Home {
        topics: &'a [Topic],
        latest: Vec<&'a Article>,
    },
    Topics(&'a [Topic]),
    Topic {
        topic: &'a Topic,
        charts: Vec<&'a Chart>,
        visualizations: Vec<&'a VisualizationData>,
        articles: Vec<&'a Article>,
    },
    Articles(Vec<&'a Article>),
    Article {
        article: &'a Article,
        topic: Option<&'a Topic>,
        visualization: Option<&'a VisualizationData>,
    },
    Chart {
        chart: &'a Chart,
        visualization: &'a VisualizationData,
    },
    Visualization(&'a VisualizationData),
    SignIn,
    SignUp,
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct PageResponse<'a> {
    /// HTTP-equivalent status: 200 or 404
    pub status: u16,
    pub page: Page<'a>,
}

impl<'a> PageResponse<'a> {
    fn ok(page: Page<'a>) -> Self {
        Self { status: 200, page }
    }

    fn not_found(route: &Route) -> Self {
        Self {
            status: 404,
            page: Page::NotFound(route.path()),
        }
    }
}

pub fn resolve<'a>(route: &Route, catalog: &'a Catalog) -> PageResponse<'a> {
    match route {
        Route::Home => PageResponse::ok(Page::Home {
            topics: catalog.topics(),
            latest: catalog.latest_articles(HOME_ARTICLES),
        }),
        Route::Topics => PageResponse::ok(Page::Topics(catalog.topics())),
        Route::Topic(id) => match catalog.topic_by_id(id) {
            Some(topic) => PageResponse::ok(Page::Topic {
                topic,
                charts: catalog.charts_by_topic(id),
                visualizations: catalog.visualizations_by_topic(id),
                articles: catalog.articles_by_topic(id),
            }),
            None => PageResponse::not_found(route),
        },
        Route::Articles => PageResponse::ok(Page::Articles(catalog.latest_articles(usize::MAX))),
        Route::Article(id) => match catalog.article_by_id(id) {
            Some(article) => PageResponse::ok(Page::Article {
                article,
                topic: catalog.topic_by_id(&article.topic_id),
                visualization: article
                    .visualization_id
                    .as_deref()
                    .and_then(|v| catalog.visualization_by_id(v)),
            }),
            None => PageResponse::not_found(route),
        },
        Route::Chart(id) => match catalog.chart_by_id(id).and_then(|chart| {
            catalog
                .visualization_by_id(&chart.visualization_id)
                .map(|visualization| (chart, visualization))
        }) {
            Some((chart, visualization)) => PageResponse::ok(Page::Chart {
                chart,
                visualization,
            }),
            None => PageResponse::not_found(route),
        },
        Route::Visualization(id) => match catalog.visualization_by_id(id) {
            Some(vis) => PageResponse::ok(Page::Visualization(vis)),
            None => PageResponse::not_found(route),
        },
        Route::SignIn => PageResponse::ok(Page::SignIn),
        Route::SignUp => PageResponse::ok(Page::SignUp),
        Route::Unknown(_) => PageResponse::not_found(route),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/topics/"), Route::Topics);
        assert_eq!(
            Route::parse("/topics/sea-level-rise"),
            Route::Topic("sea-level-rise".into())
        );
        assert_eq!(
            Route::parse("/articles/maize-under-heat?ref=home"),
            Route::Article("maize-under-heat".into())
        );
        assert_eq!(Route::parse("/sign-in/factor-one"), Route::SignIn);
        assert_eq!(
            Route::parse("/articles/a/b"),
            Route::Unknown("/articles/a/b".into())
        );
    }

    #[test]
    fn paths_round_trip() {
        for route in [
            Route::Home,
            Route::Topic("rainfall-variability".into()),
            Route::Chart("chart-2".into()),
            Route::Visualization("map-1".into()),
            Route::SignUp,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn unknown_article_is_404() {
        let catalog = Catalog::bundled().unwrap();
        let response = resolve(&Route::parse("/articles/no-such-article"), &catalog);
        assert_eq!(response.status, 404);
        assert!(matches!(response.page, Page::NotFound(ref p) if p == "/articles/no-such-article"));
    }

    #[test]
    fn unknown_path_is_404() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(resolve(&Route::parse("/about/team"), &catalog).status, 404);
        assert_eq!(resolve(&Route::Topic("atlantis".into()), &catalog).status, 404);
    }

    #[test]
    fn known_article_resolves_with_visualization() {
        let catalog = Catalog::bundled().unwrap();
        let response = resolve(&Route::Article("africa-warming-faster".into()), &catalog);
        assert_eq!(response.status, 200);
        match response.page {
            Page::Article {
                article,
                topic,
                visualization,
            } => {
                assert_eq!(article.id, "africa-warming-faster");
                assert_eq!(topic.map(|t| t.id.as_str()), Some("rising-temperatures"));
                assert_eq!(visualization.map(|v| v.id.as_str()), Some("chart-1"));
            }
            _ => panic!("expected article page"),
        }
    }

    #[test]
    fn topic_page_collects_members() {
        let catalog = Catalog::bundled().unwrap();
        let response = resolve(&Route::Topic("rising-temperatures".into()), &catalog);
        let Page::Topic {
            charts,
            visualizations,
            articles,
            ..
        } = response.page
        else {
            panic!("expected topic page");
        };
        assert!(charts.iter().any(|c| c.id == "chart-1"));
        assert!(visualizations.iter().any(|v| v.id == "map-1"));
        assert_eq!(articles.len(), 2);
    }
}
