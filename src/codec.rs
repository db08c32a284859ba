//! Image codec boundary - decoding tiles and encoding finished sheets

use image::io::Reader;
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StitchError};
use crate::output::temp_file_beside;
use crate::tile::Tile;

/// Decode and encode raster files.
///
/// Implementations must be shareable across threads so tiles can be decoded
/// concurrently.
pub trait TileCodec: Sync {
    /// Decode the file at `path` into a tile.
    fn decode(&self, path: &Path) -> Result<Tile>;

    /// Encode `image` to `path`. Nothing may appear at `path` unless the
    /// whole image was written.
    fn encode(&self, image: &RgbaImage, path: &Path) -> Result<()>;
}

/// [`TileCodec`] backed by the `image` crate.
///
/// The output format is chosen from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl TileCodec for ImageCodec {
    fn decode(&self, path: &Path) -> Result<Tile> {
        let codec_error = |source: image::ImageError| StitchError::Codec {
            stage: "decode",
            path: path.to_path_buf(),
            source,
        };
        // Content sniffing first, so a mislabelled file still decodes
        let image = Reader::open(path)
            .and_then(Reader::with_guessed_format)
            .map_err(|e| codec_error(image::ImageError::IoError(e)))?
            .decode()
            .map_err(codec_error)?
            .to_rgba8();

        if image.width() == 0 || image.height() == 0 {
            return Err(codec_error(image::ImageError::Limits(
                image::error::LimitError::from_kind(image::error::LimitErrorKind::DimensionError),
            )));
        }

        Ok(Tile::new(path, image))
    }

    fn encode(&self, image: &RgbaImage, path: &Path) -> Result<()> {
        let format = ImageFormat::from_path(path).map_err(|source| StitchError::Codec {
            stage: "encode",
            path: path.to_path_buf(),
            source,
        })?;

        // Encode next to the target, then rename over it in one step
        let temp = temp_file_beside(path)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            image.write_to(&mut writer, format).map_err(|source| StitchError::Codec {
                stage: "encode",
                path: path.to_path_buf(),
                source,
            })?;
            writer.flush().map_err(|e| StitchError::output_write(path, e))?;
        }
        temp.persist(path).map_err(|e| StitchError::output_write(path, e.error))?;

        debug!(path = %path.display(), width = image.width(), height = image.height(), "encoded");
        Ok(())
    }
}

/// Decode every path, keeping input order.
///
/// With `jobs > 1` decoding runs on a dedicated rayon pool. The first failure
/// aborts the whole batch.
pub fn decode_all<C, P>(codec: &C, paths: &[P], jobs: usize) -> Result<Vec<Tile>>
where
    C: TileCodec + ?Sized,
    P: AsRef<Path> + Sync,
{
    if jobs <= 1 || paths.len() <= 1 {
        return paths.iter().map(|p| codec.decode(p.as_ref())).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build();
    match pool {
        Ok(pool) => pool.install(|| paths.par_iter().map(|p| codec.decode(p.as_ref())).collect()),
        Err(e) => {
            debug!(error = %e, "thread pool unavailable, decoding sequentially");
            paths.iter().map(|p| codec.decode(p.as_ref())).collect()
        }
    }
}
