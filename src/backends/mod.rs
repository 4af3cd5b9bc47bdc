//! Decode backends: raster in, located (and ideally decoded) symbols out.
//!
//! Backends are stateless per call. Finding nothing is an empty vector,
//! never an error.

pub mod geometric;
pub mod multi;

pub use geometric::GeometricBackend;
pub use multi::MultiSymbolBackend;

use crate::models::Quad;
use image::GrayImage;

/// One located symbol in the pixel space of the raster it was found in
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Decoded text; `None` when the geometry was found but reading failed
    pub payload: Option<String>,
    /// Symbol outline
    pub quad: Quad,
}

impl Symbol {
    /// Decoded symbol
    pub fn decoded(payload: String, quad: Quad) -> Self {
        Self {
            payload: Some(payload),
            quad,
        }
    }

    /// Located symbol whose payload could not be read
    pub fn unreadable(quad: Quad) -> Self {
        Self { payload: None, quad }
    }
}

/// A raster → symbols decoder
pub trait DecodeBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// All symbols this backend finds in `gray`
    fn decode(&self, gray: &GrayImage) -> Vec<Symbol>;
}

/// Backends in tie-break order: the multi-symbol reader, then the geometric one
pub fn default_backends() -> Vec<Box<dyn DecodeBackend>> {
    vec![
        Box::new(MultiSymbolBackend),
        Box::new(GeometricBackend::default()),
    ]
}

/// Decode a grayscale buffer with rqrr, returning every readable grid.
///
/// rqrr asserts on some degenerate finder layouts; a panic there counts as
/// nothing found.
pub(crate) fn read_grids(gray: &GrayImage) -> Vec<(String, [rqrr::Point; 4])> {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            gray.get_pixel(x as u32, y as u32)[0]
        });
        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_, content)) => Some((content, grid.bounds)),
                Err(err) => {
                    tracing::trace!("grid located but not decoded: {err}");
                    None
                }
            })
            .collect()
    }));
    result.unwrap_or_else(|_| {
        tracing::debug!(width, height, "rqrr panicked while reading grids, treating as no symbols");
        Vec::new()
    })
}
