//! Canvas compositing - draws planned tiles onto one RGBA sheet

use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::error::{Result, StitchError};
use crate::layout::LayoutPlan;
use crate::tile::Tile;

/// Fully transparent background
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Output sheet under construction.
///
/// The pixel buffer stays private until [`Canvas::into_image`], so nothing can
/// observe a half-composited sheet.
#[derive(Debug)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Allocate a canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, background) }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Composite `tile` with its top-left corner at `(x, y)`.
    ///
    /// Pixels are blended source-over; anything past the canvas edge is clipped.
    pub fn place(&mut self, tile: &RgbaImage, x: u32, y: u32) {
        blit_over(&mut self.image, tile, x, y);
    }

    /// Finish compositing and hand out the pixels for encoding.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Composite every placement of `plan` onto a fresh canvas.
///
/// Placements are drawn in planned order, so where oversized tiles overlap the
/// later one wins. Cells without a tile keep the background.
///
/// # Errors
///
/// [`StitchError::PlannerInvariant`] if a placement refers to a tile that is
/// not in `tiles`.
pub fn composite(tiles: &[Tile], plan: &LayoutPlan, background: Rgba<u8>) -> Result<Canvas> {
    if let Some(bad) = plan.placements.iter().find(|p| p.tile >= tiles.len()) {
        return Err(StitchError::PlannerInvariant(format!(
            "placement refers to tile {} but only {} tiles were decoded",
            bad.tile,
            tiles.len()
        )));
    }

    let (width, height) = plan.canvas_size();
    let mut canvas = Canvas::new(width, height, background);
    debug!(width, height, placements = plan.placements.len(), "compositing canvas");

    for placement in &plan.placements {
        let tile = &tiles[placement.tile];
        trace!(
            x = placement.x,
            y = placement.y,
            w = tile.width(),
            h = tile.height(),
            tile = %tile.name,
            "place"
        );
        canvas.place(&tile.image, placement.x, placement.y);
    }

    Ok(canvas)
}

/// Blit `src` onto `canvas` at `(x, y)` with source-over alpha blending.
fn blit_over(canvas: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    let canvas_width = canvas.width();
    let canvas_height = canvas.height();

    for (sy, row) in src.rows().enumerate() {
        let dest_y = y + sy as u32;
        if dest_y >= canvas_height {
            break;
        }

        for (sx, pixel) in row.enumerate() {
            let dest_x = x + sx as u32;
            if dest_x >= canvas_width {
                break;
            }

            // Fully transparent source, skip
            if pixel[3] == 0 {
                continue;
            }

            let dst = canvas.get_pixel(dest_x, dest_y);
            // Opaque source or empty destination: the source pixel is the result
            let out = if pixel[3] == 255 || dst[3] == 0 { *pixel } else { blend_over(pixel, dst) };
            canvas.put_pixel(dest_x, dest_y, out);
        }
    }
}

/// Porter-Duff "source over" for straight (non-premultiplied) RGBA.
fn blend_over(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let src_alpha = src[3] as f32 / 255.0;
    let dst_alpha = dst[3] as f32 / 255.0;

    // out_alpha = src_alpha + dst_alpha * (1 - src_alpha)
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
    if out_alpha == 0.0 {
        return TRANSPARENT;
    }

    // out_color = (src * src_alpha + dst * dst_alpha * (1 - src_alpha)) / out_alpha
    let channel = |s: u8, d: u8| -> u8 {
        let s = s as f32 / 255.0;
        let d = d as f32 / 255.0;
        let result = (s * src_alpha + d * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        (result.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{plan, ExplicitLayout, LayoutOptions, Strategy};
    use crate::tile::TileMeta;

    fn solid(name: &str, width: u32, height: u32, color: Rgba<u8>) -> Tile {
        Tile::new(name, RgbaImage::from_pixel(width, height, color))
    }

    fn metas(tiles: &[Tile]) -> Vec<TileMeta> {
        tiles.iter().map(Tile::meta).collect()
    }

    #[test]
    fn test_blend_over_opaque_destination() {
        let red_half = Rgba([255, 0, 0, 128]);
        let blue = Rgba([0, 0, 255, 255]);
        let out = blend_over(&red_half, &blue);
        assert_eq!(out[3], 255);
        assert!(out[0] > 120 && out[0] < 135, "red channel {}", out[0]);
        assert!(out[2] > 120 && out[2] < 135, "blue channel {}", out[2]);
    }

    #[test]
    fn test_canvas_starts_with_background() {
        let black = Rgba([0, 0, 0, 255]);
        let canvas = Canvas::new(2, 3, black);
        assert_eq!((canvas.width(), canvas.height()), (2, 3));
        let image = canvas.into_image();
        assert!(image.pixels().all(|p| *p == black));
    }

    #[test]
    fn test_place_clips_at_canvas_edge() {
        let mut canvas = Canvas::new(3, 3, TRANSPARENT);
        canvas.place(&RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])), 2, 2);
        let image = canvas.into_image();
        assert_eq!(*image.get_pixel(2, 2), Rgba([9, 9, 9, 255]));
        assert_eq!(*image.get_pixel(1, 1), TRANSPARENT);
    }

    #[test]
    fn test_translucent_pixels_survive_on_transparent_canvas() {
        let ghost = Rgba([10, 20, 30, 77]);
        let mut canvas = Canvas::new(1, 1, TRANSPARENT);
        canvas.place(&RgbaImage::from_pixel(1, 1, ghost), 0, 0);
        assert_eq!(*canvas.into_image().get_pixel(0, 0), ghost);
    }

    #[test]
    fn test_tiles_appear_unmodified_at_planned_offsets() {
        let tiles: Vec<Tile> = (0..5u8)
            .map(|i| {
                let mut image = RgbaImage::new(3 + i as u32, 2 + i as u32);
                for (x, y, p) in image.enumerate_pixels_mut() {
                    *p = Rgba([i * 40, x as u8 * 10, y as u8 * 10, 255 - i]);
                }
                Tile::new(format!("t{}.png", i), image)
            })
            .collect();

        let plan = plan(&metas(&tiles), &Strategy::Auto, &LayoutOptions::default()).unwrap();
        let image = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();
        assert_eq!(image.dimensions(), plan.canvas_size());

        for placement in &plan.placements {
            let tile = &tiles[placement.tile];
            for (x, y, p) in tile.image.enumerate_pixels() {
                assert_eq!(
                    image.get_pixel(placement.x + x, placement.y + y),
                    p,
                    "tile {} pixel ({}, {})",
                    placement.tile,
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_six_tiles_fill_grid() {
        let tiles: Vec<Tile> =
            (0..6u8).map(|i| solid(&format!("t{}.png", i), 128, 128, Rgba([i, 0, 0, 255])))
                .collect();
        let plan = plan(&metas(&tiles), &Strategy::Auto, &LayoutOptions::default()).unwrap();
        let image = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();

        assert_eq!(image.dimensions(), (384, 256));
        // Reverse input order, row-major
        assert_eq!(image.get_pixel(0, 0)[0], 5);
        assert_eq!(image.get_pixel(128, 0)[0], 4);
        assert_eq!(image.get_pixel(256, 0)[0], 3);
        assert_eq!(image.get_pixel(0, 128)[0], 2);
        assert_eq!(image.get_pixel(383, 255)[0], 0);
        assert!(image.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_index_auto_gap_is_transparent() {
        let red = Rgba([255, 0, 0, 255]);
        let tiles = vec![
            solid("DESERT1-0000.png", 4, 4, red),
            solid("DESERT1-0001.png", 4, 4, red),
            solid("DESERT1-0003.png", 4, 4, red),
        ];
        let plan = plan(&metas(&tiles), &Strategy::IndexAuto, &LayoutOptions::default()).unwrap();
        let image = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();

        assert_eq!(image.dimensions(), (8, 8));
        for y in 4..8 {
            for x in 0..4 {
                assert_eq!(*image.get_pixel(x, y), TRANSPARENT);
            }
        }
        assert_eq!(*image.get_pixel(4, 4), red);
    }

    #[test]
    fn test_later_placement_wins_on_overlap() {
        let tiles = vec![
            solid("big.png", 6, 6, Rgba([1, 1, 1, 255])),
            solid("small.png", 2, 2, Rgba([2, 2, 2, 255])),
        ];
        let layout = ExplicitLayout::parse("0,1", "/", ",").unwrap();
        let options = LayoutOptions { cell_size: Some((4, 4)), ..Default::default() };
        let plan = plan(&metas(&tiles), &Strategy::Explicit(layout), &options).unwrap();
        let image = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();

        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(4, 0)[0], 2);
        assert_eq!(image.get_pixel(5, 3)[0], 1);
    }

    #[test]
    fn test_composite_is_deterministic() {
        let tiles: Vec<Tile> = (0..7u8)
            .map(|i| solid(&format!("t{}.png", i), 3 + i as u32, 5, Rgba([i, 2 * i, 3 * i, 200])))
            .collect();
        let plan = plan(&metas(&tiles), &Strategy::Auto, &LayoutOptions::default()).unwrap();
        let a = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();
        let b = composite(&tiles, &plan, TRANSPARENT).unwrap().into_image();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_placement_out_of_range() {
        let tiles = vec![solid("a.png", 2, 2, Rgba([1, 1, 1, 255]))];
        let metas = vec![TileMeta::new("a.png", 2, 2), TileMeta::new("b.png", 2, 2)];
        let plan = plan(&metas, &Strategy::Horizontal, &LayoutOptions::default()).unwrap();
        let err = composite(&tiles, &plan, TRANSPARENT).unwrap_err();
        assert!(matches!(err, StitchError::PlannerInvariant(_)));
    }
}
