//! Rendering printable markers.

use crate::Dictionary;
use pcaruco_core::GrayImage;

/// Render marker `id` with a one-cell black border and a white quiet zone.
///
/// The result is `(marker_size + 2 + 2 * quiet_zone_cells) * cell_px` pixels
/// square. Returns `None` for an unknown id or a zero cell size.
///
/// With `quiet_zone_cells == 0` the border runs into the image edge and
/// [`ArucoDetector::detect`](crate::ArucoDetector::detect) will not see the
/// marker; pad the result or use a quiet zone of at least one cell.
pub fn render_marker(
    dict: &Dictionary,
    id: u32,
    cell_px: usize,
    quiet_zone_cells: usize,
) -> Option<GrayImage> {
    dict.code(id)?;
    if cell_px == 0 {
        return None;
    }

    let n = dict.marker_size;
    let marker_cells = n + 2;
    let cells = marker_cells + 2 * quiet_zone_cells;
    let side = cells * cell_px;
    let mut img = GrayImage::new(side, side, 255);

    for my in 0..marker_cells {
        for mx in 0..marker_cells {
            let border = mx == 0 || my == 0 || mx == marker_cells - 1 || my == marker_cells - 1;
            let white = !border && dict.bit(id, mx - 1, my - 1)?;
            if white {
                continue;
            }
            let x0 = (mx + quiet_zone_cells) * cell_px;
            let y0 = (my + quiet_zone_cells) * cell_px;
            for y in y0..y0 + cell_px {
                img.data[y * side + x0..y * side + x0 + cell_px].fill(0);
            }
        }
    }

    Some(img)
}
