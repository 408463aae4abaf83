//! Batch loading of image files into textures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::StageError;

use super::{BaseTexture, Texture};

/// Progress reported after each resource, successful or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress<'a> {
    pub name: &'a str,
    pub loaded: usize,
    pub total: usize,
    pub failed: bool,
}

impl LoadProgress<'_> {
    /// Completion in percent (0..=100).
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.loaded as f32 / self.total as f32 * 100.0
        }
    }
}

type ProgressCallback = Box<dyn FnMut(&LoadProgress<'_>)>;

/// Queue of named image resources.
///
/// ```ignore
/// let resources = Loader::new()
///     .base_dir("assets")
///     .add("bunny", "bunny.png")
///     .on_progress(|p| log::info!("{:.0}%", p.percent()))
///     .load();
/// let bunny = resources.texture("bunny");
/// ```
#[derive(Default)]
pub struct Loader {
    base_dir: Option<PathBuf>,
    queue: Vec<(String, PathBuf)>,
    on_progress: Option<ProgressCallback>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory prepended to relative resource paths.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Queue a resource. A name that is already queued keeps its first path.
    pub fn add(mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let name = name.into();
        if self.queue.iter().any(|(queued, _)| *queued == name) {
            log::warn!("Resource '{}' is already queued, ignoring", name);
            return self;
        }
        let path = match &self.base_dir {
            Some(dir) if path.as_ref().is_relative() => dir.join(path),
            _ => path.as_ref().to_path_buf(),
        };
        self.queue.push((name, path));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(&LoadProgress<'_>) + 'static,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Load every queued resource. Failures are collected, not fatal.
    pub fn load(mut self) -> Resources {
        let total = self.queue.len();
        let mut resources = Resources::default();

        for (loaded, (name, path)) in self.queue.into_iter().enumerate() {
            let failed = match BaseTexture::from_path(&path) {
                Ok(base) => {
                    resources
                        .textures
                        .insert(name.clone(), Texture::from_base(base));
                    false
                }
                Err(err) => {
                    log::warn!("Failed to load '{}' from {}: {}", name, path.display(), err);
                    resources.errors.push(StageError::Load {
                        name: name.clone(),
                        path,
                        reason: err.to_string(),
                    });
                    true
                }
            };

            if let Some(callback) = self.on_progress.as_mut() {
                callback(&LoadProgress {
                    name: &name,
                    loaded: loaded + 1,
                    total,
                    failed,
                });
            }
        }

        log::debug!(
            "Loader finished: {} loaded, {} failed",
            resources.textures.len(),
            resources.errors.len()
        );
        resources
    }
}

/// Textures produced by a [`Loader`], keyed by resource name.
#[derive(Debug, Default)]
pub struct Resources {
    textures: HashMap<String, Texture>,
    errors: Vec<StageError>,
}

impl Resources {
    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.get(name)
    }

    pub fn errors(&self) -> &[StageError] {
        &self.errors
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stage2d-loader-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_collects_textures_and_errors() {
        let dir = temp_dir("mixed");
        write_png(&dir, "red.png");

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let resources = Loader::new()
            .base_dir(&dir)
            .add("red", "red.png")
            .add("missing", "nope.png")
            .on_progress(move |p| sink.borrow_mut().push((p.loaded, p.failed, p.percent())))
            .load();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources.texture("red").map(|t| t.width()), Some(2.0));
        assert!(!resources.is_complete());
        assert!(matches!(
            &resources.errors()[0],
            StageError::Load { name, .. } if name == "missing"
        ));
        assert_eq!(
            *events.borrow(),
            vec![(1, false, 50.0), (2, true, 100.0)]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let loader = Loader::new().add("a", "one.png").add("a", "two.png");
        assert_eq!(loader.len(), 1);
    }
}
