//! Image loading for export clones.
//!
//! Every pending image under the export root is decoded on the rayon pool.
//! Each decode reports exactly once over a channel; the wait is over when
//! the outstanding count reaches zero.

use super::document::{Document, ImageState, NodeId, NodeKind};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Decodes images referenced by the render tree, caching results by path.
#[derive(Debug, Default)]
pub struct ResourceLoader {
    cache: HashMap<PathBuf, Arc<RgbaImage>>,
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images under `root` still waiting for their pixels.
    pub fn pending(doc: &Document, root: NodeId) -> Vec<(NodeId, PathBuf)> {
        doc.descendants(root)
            .into_iter()
            .filter_map(|id| match doc.get(id).map(|n| &n.kind) {
                Some(NodeKind::Image {
                    source,
                    state: ImageState::Pending,
                    ..
                }) => Some((id, source.clone())),
                _ => None,
            })
            .collect()
    }

    /// Resolve every pending image under `root`. Blocks until all of them
    /// have either decoded or failed.
    pub fn wait_for_images(&mut self, doc: &mut Document, root: NodeId) -> LoadReport {
        let mut report = LoadReport::default();
        let mut to_decode = Vec::new();

        for (id, source) in Self::pending(doc, root) {
            match self.cache.get(&source) {
                Some(pixels) => {
                    set_state(doc, id, ImageState::Ready(Arc::clone(pixels)));
                    report.loaded += 1;
                }
                None => to_decode.push((id, source)),
            }
        }

        let mut outstanding = to_decode.len();
        if outstanding == 0 {
            return report;
        }
        debug!("Waiting for {} image(s)", outstanding);

        let (tx, rx) = channel();
        for (id, source) in to_decode {
            let tx = tx.clone();
            rayon::spawn(move || {
                let result = image::open(&source).map(|img| img.to_rgba8());
                let _ = tx.send((id, source, result));
            });
        }
        drop(tx);

        while outstanding > 0 {
            let Ok((id, source, result)) = rx.recv() else {
                break;
            };
            outstanding -= 1;
            match result {
                Ok(pixels) => {
                    let pixels = Arc::new(pixels);
                    self.cache.insert(source, Arc::clone(&pixels));
                    set_state(doc, id, ImageState::Ready(pixels));
                    report.loaded += 1;
                }
                Err(e) => {
                    warn!("Image {} failed to load: {}", source.display(), e);
                    set_state(doc, id, ImageState::Failed);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn set_state(doc: &mut Document, id: NodeId, new_state: ImageState) {
    if let Some(NodeKind::Image { state, .. }) = doc.get_mut(id).map(|n| &mut n.kind) {
        *state = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::document::Node;
    use image::Rgba;

    fn image_node(source: PathBuf) -> Node {
        Node::new(NodeKind::Image {
            source,
            width: 4,
            height: 4,
            state: ImageState::Pending,
        })
    }

    #[test]
    fn resolves_good_and_bad_images() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("logo.png");
        RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]))
            .save(&good)
            .unwrap();

        let mut doc = Document::new(200);
        let body = doc.body();
        let ok = doc.append(body, image_node(good.clone()));
        let bad = doc.append(body, image_node(dir.path().join("missing.png")));

        let mut loader = ResourceLoader::new();
        let report = loader.wait_for_images(&mut doc, body);
        assert_eq!(report, LoadReport { loaded: 1, failed: 1 });
        assert!(ResourceLoader::pending(&doc, body).is_empty());
        assert!(matches!(
            doc.get(ok).unwrap().kind,
            NodeKind::Image { state: ImageState::Ready(_), .. }
        ));
        assert!(matches!(
            doc.get(bad).unwrap().kind,
            NodeKind::Image { state: ImageState::Failed, .. }
        ));

        // Second document reuses the decoded pixels
        let mut other = Document::new(200);
        let other_body = other.body();
        other.append(other_body, image_node(good));
        std::fs::remove_dir_all(dir.path()).unwrap();
        let report = loader.wait_for_images(&mut other, other_body);
        assert_eq!(report.loaded, 1);
    }

    #[test]
    fn nothing_pending_returns_immediately() {
        let mut doc = Document::new(200);
        let body = doc.body();
        let report = ResourceLoader::new().wait_for_images(&mut doc, body);
        assert_eq!(report, LoadReport::default());
    }
}
