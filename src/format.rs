//! Keypoint coordinate formats and the registry that resolves them by name.
//!
//! Every format is defined by a pair of pure functions into and out of the
//! canonical format, absolute pixel `xy`. Converting between two formats
//! always routes through the canonical one, so N formats need 2N functions
//! rather than N×M.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::PanpointError;
use crate::keypoints::{Coord, ImageSize, Pixel, Relative};

/// Name of the canonical absolute-pixel format.
pub const XY: &str = "xy";

/// Name of the image-relative format.
pub const REL_XY: &str = "rel_xy";

/// Maps an (x, y) pair in some format to canonical pixel coordinates.
///
/// The image size is `Some` whenever the format requires images.
pub type ToCanonical = fn([f64; 2], Option<ImageSize>) -> Coord<Pixel>;

/// Maps canonical pixel coordinates to an (x, y) pair in some format.
pub type FromCanonical = fn(Coord<Pixel>, Option<ImageSize>) -> [f64; 2];

/// A named keypoint coordinate format.
#[derive(Clone)]
pub struct KeypointFormat {
    name: String,
    description: String,
    requires_images: bool,
    to_canonical: ToCanonical,
    from_canonical: FromCanonical,
}

impl KeypointFormat {
    /// Creates a format that needs no image information.
    ///
    /// Names are stored lowercase; lookups are case-insensitive.
    pub fn new(
        name: impl Into<String>,
        to_canonical: ToCanonical,
        from_canonical: FromCanonical,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            description: String::new(),
            requires_images: false,
            to_canonical,
            from_canonical,
        }
    }

    /// Marks the format as relative to image dimensions.
    pub fn requiring_images(mut self) -> Self {
        self.requires_images = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether converting into or out of this format needs image sizes.
    pub fn requires_images(&self) -> bool {
        self.requires_images
    }

    #[inline]
    pub fn to_canonical(&self, pair: [f64; 2], image: Option<ImageSize>) -> Coord<Pixel> {
        (self.to_canonical)(pair, image)
    }

    #[inline]
    pub fn from_canonical(&self, point: Coord<Pixel>, image: Option<ImageSize>) -> [f64; 2] {
        (self.from_canonical)(point, image)
    }
}

impl fmt::Debug for KeypointFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypointFormat")
            .field("name", &self.name)
            .field("requires_images", &self.requires_images)
            .finish()
    }
}

/// The absolute-pixel format. It is the canonical format, so both directions
/// are the identity.
pub fn xy() -> KeypointFormat {
    KeypointFormat::new(
        XY,
        |pair, _| Coord::from_pair(pair),
        |point, _| point.to_pair(),
    )
    .with_description("absolute pixel coordinates (canonical)")
}

/// The image-relative format: x is divided by the image width and y by the
/// image height.
pub fn rel_xy() -> KeypointFormat {
    KeypointFormat::new(REL_XY, rel_xy_to_xy, xy_to_rel_xy)
        .requiring_images()
        .with_description("coordinates relative to image width and height")
}

fn rel_xy_to_xy(pair: [f64; 2], image: Option<ImageSize>) -> Coord<Pixel> {
    let rel = Coord::<Relative>::from_pair(pair);
    match image {
        Some(image) => rel.to_pixel(image),
        None => Coord::new(f64::NAN, f64::NAN),
    }
}

fn xy_to_rel_xy(point: Coord<Pixel>, image: Option<ImageSize>) -> [f64; 2] {
    match image {
        Some(image) => point.to_relative(image).to_pair(),
        None => [f64::NAN, f64::NAN],
    }
}

/// A set of keypoint formats keyed by lowercase name.
///
/// Built once and then only read, so a registry can be shared freely between
/// threads.
#[derive(Clone, Debug, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, KeypointFormat>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `xy` and `rel_xy` formats.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for format in [xy(), rel_xy()] {
            registry.formats.insert(format.name.clone(), format);
        }
        registry
    }

    /// Adds a format.
    ///
    /// # Errors
    /// Returns [`PanpointError::DuplicateFormat`] if the name is taken.
    pub fn register(&mut self, format: KeypointFormat) -> Result<(), PanpointError> {
        if self.formats.contains_key(&format.name) {
            return Err(PanpointError::DuplicateFormat(format.name));
        }
        self.formats.insert(format.name.clone(), format);
        Ok(())
    }

    /// Looks up a format by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&KeypointFormat> {
        self.formats.get(&name.to_lowercase())
    }

    /// Looks up the format passed as `argument` (`"source"` or `"target"`).
    pub fn resolve(
        &self,
        argument: &'static str,
        name: &str,
    ) -> Result<&KeypointFormat, PanpointError> {
        self.get(name)
            .ok_or_else(|| PanpointError::UnsupportedFormat {
                argument,
                name: name.to_string(),
                supported: format!("[{}]", self.names().collect::<Vec<_>>().join(", ")),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// Registered formats, sorted by name.
    pub fn formats(&self) -> impl Iterator<Item = &KeypointFormat> {
        self.formats.values()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
