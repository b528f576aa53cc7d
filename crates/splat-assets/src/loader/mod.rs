//! Format loaders, selected by file extension.
//!
//! A [`Loader`] fetches bytes from a [`Source`] and decodes them into an
//! [`Asset`]. The [`LoaderRegistry`] maps extensions to loaders; the
//! standard registry covers every [`LoaderKind`].

mod obj;
mod ply;

use std::{collections::HashMap, fmt, future::Future, pin::Pin, sync::Arc};

pub use obj::parse_obj;
pub use ply::parse_ply;

use crate::{
    asset::{Asset, Payload, Texture},
    error::LoadError,
    events::ProgressReporter,
    manager::LoadOptions,
    source::{Source, strip_query},
};

/// Future type for loader invocations.
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Asset, LoadError>> + Send + 'a>>;

/// Decodes one family of file formats.
pub trait Loader: Send + Sync {
    /// Lowercase file extensions handled by this loader, without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Fetch `url` from `source` and decode it.
    fn load<'a>(
        &'a self,
        source: &'a dyn Source,
        url: &'a str,
        options: &'a LoadOptions,
        progress: &'a ProgressReporter,
    ) -> LoadFuture<'a>;
}

/// The built-in loader kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    /// PLY point clouds.
    PointCloud,
    /// OBJ meshes.
    Mesh,
    /// PNG and JPEG images.
    Texture,
    /// JSON documents.
    Structured,
    /// Anything kept as raw bytes.
    Binary,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 5] = [
        LoaderKind::PointCloud,
        LoaderKind::Mesh,
        LoaderKind::Texture,
        LoaderKind::Structured,
        LoaderKind::Binary,
    ];

    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            LoaderKind::PointCloud => &["ply"],
            LoaderKind::Mesh => &["obj"],
            LoaderKind::Texture => &["png", "jpg", "jpeg"],
            LoaderKind::Structured => &["json"],
            LoaderKind::Binary => &["bin", "binary", "splat"],
        }
    }

    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&extension.as_str()))
    }

    fn decode(self, data: Vec<u8>) -> Result<Payload, LoadError> {
        match self {
            LoaderKind::PointCloud => parse_ply(&data).map(Payload::Geometry),
            LoaderKind::Mesh => parse_obj(&data).map(Payload::Geometry),
            LoaderKind::Texture => {
                let image = image::load_from_memory(&data)
                    .map_err(|e| LoadError::parse("texture", e.to_string()))?
                    .to_rgba8();
                Ok(Payload::Texture(Texture {
                    width: image.width(),
                    height: image.height(),
                    pixels: image.into_raw(),
                }))
            }
            LoaderKind::Structured => serde_json::from_slice(&data)
                .map(Payload::Structured)
                .map_err(|e| LoadError::parse("json", e.to_string())),
            LoaderKind::Binary => Ok(Payload::Bytes(data)),
        }
    }
}

/// A loader for one of the built-in [`LoaderKind`]s.
#[derive(Debug, Clone, Copy)]
pub struct StandardLoader {
    kind: LoaderKind,
}

impl StandardLoader {
    #[must_use]
    pub fn new(kind: LoaderKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(&self) -> LoaderKind {
        self.kind
    }
}

impl Loader for StandardLoader {
    fn extensions(&self) -> &[&'static str] {
        self.kind.extensions()
    }

    fn load<'a>(
        &'a self,
        source: &'a dyn Source,
        url: &'a str,
        _options: &'a LoadOptions,
        progress: &'a ProgressReporter,
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            let data = source.fetch(url, progress).await?;
            tracing::debug!(url, kind = ?self.kind, bytes = data.len(), "decoding");
            let payload = self.kind.decode(data)?;
            Ok(Asset::new(url, payload))
        })
    }
}

/// Extension → loader table.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    by_extension: HashMap<String, Arc<dyn Loader>>,
}

impl LoaderRegistry {
    /// A registry with no loaders.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with a [`StandardLoader`] for every kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in LoaderKind::ALL {
            registry.register(StandardLoader::new(kind));
        }
        registry
    }

    /// Route every extension of `loader` to it, replacing earlier entries.
    pub fn register(&mut self, loader: impl Loader + 'static) {
        let loader: Arc<dyn Loader> = Arc::new(loader);
        for extension in loader.extensions() {
            self.by_extension
                .insert(extension.to_ascii_lowercase(), Arc::clone(&loader));
        }
    }

    /// Find the loader for an extension.
    #[must_use]
    pub fn get(&self, extension: &str) -> Option<Arc<dyn Loader>> {
        self.by_extension
            .get(&extension.to_ascii_lowercase())
            .cloned()
    }

    /// Find the loader for a URL by its extension.
    ///
    /// # Errors
    ///
    /// Returns the looked-up extension if no loader handles it.
    pub fn resolve(&self, url: &str) -> Result<Arc<dyn Loader>, String> {
        let extension = file_extension(url);
        self.get(&extension).ok_or(extension)
    }

    /// Registered extensions, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// The lowercase extension of the last path segment of `url`.
///
/// Returns an empty string if there is none.
#[must_use]
pub fn file_extension(url: &str) -> String {
    let path = strip_query(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("splats/banana.ply"), "ply");
        assert_eq!(file_extension("/a/b.PNG?cache=1"), "png");
        assert_eq!(file_extension("/a.dir/readme"), "");
        assert_eq!(file_extension("https://x.com/t.jpeg#frag"), "jpeg");
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!(LoaderKind::from_extension("JPG"), Some(LoaderKind::Texture));
        assert_eq!(LoaderKind::from_extension("splat"), Some(LoaderKind::Binary));
        assert_eq!(LoaderKind::from_extension("gltf"), None);
    }

    #[test]
    fn test_registry_resolve() {
        let registry = LoaderRegistry::standard();
        assert!(registry.resolve("a.ply").is_ok());
        assert_eq!(registry.resolve("a.fbx").err(), Some("fbx".to_string()));
        assert_eq!(registry.resolve("noext").err(), Some(String::new()));
        assert!(registry.extensions().contains(&"json"));
    }

    #[tokio::test]
    async fn test_structured_and_binary() {
        let source = MemorySource::new();
        source.insert("/a.json", br#"{"points": 3}"#.to_vec());
        source.insert("/a.bin", vec![0xff, 0x00]);

        let options = LoadOptions::default();
        let progress = ProgressReporter::silent("test");

        let json = StandardLoader::new(LoaderKind::Structured)
            .load(&source, "/a.json", &options, &progress)
            .await
            .unwrap();
        assert_eq!(
            json.payload,
            Payload::Structured(serde_json::json!({ "points": 3 }))
        );

        let bin = StandardLoader::new(LoaderKind::Binary)
            .load(&source, "/a.bin", &options, &progress)
            .await
            .unwrap();
        assert_eq!(bin.payload, Payload::Bytes(vec![0xff, 0x00]));
    }

    #[tokio::test]
    async fn test_bad_json_is_parse_error() {
        let source = MemorySource::new();
        source.insert("/bad.json", b"{ nope".to_vec());

        let result = StandardLoader::new(LoaderKind::Structured)
            .load(
                &source,
                "/bad.json",
                &LoadOptions::default(),
                &ProgressReporter::silent("test"),
            )
            .await;
        assert!(matches!(result, Err(LoadError::Parse { context: "json", .. })));
    }

    #[tokio::test]
    async fn test_texture_decodes_png() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 4]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let source = MemorySource::new();
        source.insert("/t.png", png);

        let asset = StandardLoader::new(LoaderKind::Texture)
            .load(
                &source,
                "/t.png",
                &LoadOptions::default(),
                &ProgressReporter::silent("test"),
            )
            .await
            .unwrap();
        let Payload::Texture(texture) = asset.payload else {
            panic!("expected a texture");
        };
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(&texture.pixels[..4], &[1, 2, 3, 4]);
    }
}
