//! Line-of-sight smoothing of raw search output.

use realmwalk_core::TileCoord;

/// Removes interior waypoints that a straight, unobstructed step can skip.
///
/// A waypoint is dropped when its predecessor and successor are 8-adjacent
/// and every tile on the line between them is passable, which collapses
/// stair-stepped corners while keeping every remaining step adjacent. Passes
/// repeat until nothing changes, so smoothing a smoothed route is a no-op.
/// `start` anchors the route and is not part of the output.
#[must_use]
pub fn smooth<F>(start: TileCoord, waypoints: Vec<TileCoord>, is_passable: F) -> Vec<TileCoord>
where
    F: Fn(TileCoord) -> bool,
{
    let mut current = waypoints;
    loop {
        let next = smoothing_pass(start, &current, &is_passable);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn smoothing_pass<F>(start: TileCoord, waypoints: &[TileCoord], is_passable: &F) -> Vec<TileCoord>
where
    F: Fn(TileCoord) -> bool,
{
    let mut kept = Vec::with_capacity(waypoints.len());
    let mut anchor = start;

    for (index, waypoint) in waypoints.iter().copied().enumerate() {
        if let Some(successor) = waypoints.get(index + 1).copied() {
            if anchor.is_adjacent(successor) && has_line_of_sight(anchor, successor, is_passable) {
                continue;
            }
        }
        kept.push(waypoint);
        anchor = waypoint;
    }

    kept
}

/// Walks the Bresenham line from `from` to `to` and checks every tile after `from`.
#[must_use]
pub fn has_line_of_sight<F>(from: TileCoord, to: TileCoord, is_passable: &F) -> bool
where
    F: Fn(TileCoord) -> bool,
{
    line_tiles(from, to).all(|tile| is_passable(tile))
}

fn line_tiles(from: TileCoord, to: TileCoord) -> impl Iterator<Item = TileCoord> {
    let (mut x, mut y) = (i64::from(from.x()), i64::from(from.y()));
    let (end_x, end_y) = (i64::from(to.x()), i64::from(to.y()));
    let dx = (end_x - x).abs();
    let dy = -(end_y - y).abs();
    let step_x = if x < end_x { 1 } else { -1 };
    let step_y = if y < end_y { 1 } else { -1 };
    let mut error = dx + dy;
    let mut done = x == end_x && y == end_y;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
        done = x == end_x && y == end_y;
        Some(TileCoord::new(x as u32, y as u32))
    })
}
