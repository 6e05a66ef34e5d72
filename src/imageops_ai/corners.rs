use image::{Rgba, RgbaImage};

/// Corner pixels in the order top-left, top-right, bottom-left, bottom-right.
pub fn extract_corners(image: &RgbaImage) -> [Rgba<u8>; 4] {
    let (width, height) = image.dimensions();
    let right = width.saturating_sub(1);
    let bottom = height.saturating_sub(1);
    [
        *image.get_pixel(0, 0),
        *image.get_pixel(right, 0),
        *image.get_pixel(0, bottom),
        *image.get_pixel(right, bottom),
    ]
}

/// Largest per-channel difference over the colour channels.
pub fn channel_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> u8 {
    let Rgba([ar, ag, ab, _]) = *a;
    let Rgba([br, bg, bb, _]) = *b;
    ar.abs_diff(br).max(ag.abs_diff(bg)).max(ab.abs_diff(bb))
}

/// Picks the corner colour that the most other corners agree with.
///
/// Ties go to the earlier corner, so a uniform frame resolves to the
/// top-left pixel. The image must not be empty.
pub fn estimate_background(image: &RgbaImage, tolerance: u8) -> Rgba<u8> {
    let corners = extract_corners(image);
    let mut best = corners[0];
    let mut best_votes = 0;

    for candidate in &corners {
        let votes = corners
            .iter()
            .filter(|other| channel_distance(candidate, other) <= tolerance)
            .count();
        if votes > best_votes {
            best = *candidate;
            best_votes = votes;
        }
    }
    best
}
