//! Shape rasterization for tile tools.
//!
//! Every generator is a pure function of its arguments and returns an ordered
//! list of integer cells. Tools call them again on every preview tick, so none
//! of them keep state.

use std::collections::HashSet;

use crate::coord::Coord;

/// Rasterize a line using Bresenham's algorithm.
///
/// The first cell is always `(x0, y0)` and the last is always `(x1, y1)`.
///
/// # Examples
///
/// ```
/// use pixtile::coord::Coord;
/// use pixtile::geometry::line;
///
/// let cells = line(0, 0, 3, 0);
/// assert_eq!(cells, vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0), Coord::new(3, 0)]);
/// ```
pub fn line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Coord> {
    let mut cells = Vec::new();

    let (mut x, mut y) = (x0 as i64, y0 as i64);
    let (x1, y1) = (x1 as i64, y1 as i64);

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        cells.push(Coord::new(x as i32, y as i32));

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    cells
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Border cells of the box spanned by two corners.
///
/// Cells come top row first, then the bottom row, then the left and right
/// columns between them. A single row or column is emitted once.
///
/// # Examples
///
/// ```
/// use pixtile::coord::Coord;
/// use pixtile::geometry::rect_outline;
///
/// let cells = rect_outline(0, 0, 2, 2);
/// assert_eq!(cells.len(), 8);
/// assert!(!cells.contains(&Coord::new(1, 1)));
/// ```
pub fn rect_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Coord> {
    let (min_x, max_x) = ordered(x0, x1);
    let (min_y, max_y) = ordered(y0, y1);
    let mut cells = Vec::new();

    for x in min_x..=max_x {
        cells.push(Coord::new(x, min_y));
    }
    if max_y != min_y {
        for x in min_x..=max_x {
            cells.push(Coord::new(x, max_y));
        }
    }
    // Columns between the two rows
    for y in min_y.saturating_add(1)..max_y {
        cells.push(Coord::new(min_x, y));
        if max_x != min_x {
            cells.push(Coord::new(max_x, y));
        }
    }

    cells
}

/// Every cell of the box spanned by two corners, row by row.
///
/// # Examples
///
/// ```
/// use pixtile::geometry::rect_fill;
///
/// assert_eq!(rect_fill(2, 1, 0, 0).len(), 6);
/// ```
pub fn rect_fill(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Coord> {
    let (min_x, max_x) = ordered(x0, x1);
    let (min_y, max_y) = ordered(y0, y1);
    let mut cells = Vec::new();

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            cells.push(Coord::new(x, y));
        }
    }

    cells
}

/// Integer square root, `floor(sqrt(n))`.
fn isqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut s = (n as f64).sqrt() as i64;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

/// `sqrt(n)` rounded to the nearest integer.
fn round_sqrt(n: i64) -> i64 {
    let s = isqrt(n);
    if n - s * s > s {
        s + 1
    } else {
        s
    }
}

/// Approximate digital circle outline.
///
/// Samples the circle once per column and once per row and merges the two
/// passes so steep and shallow arcs are both closed. Duplicates are dropped,
/// keeping the first occurrence. `r == 0` yields the center; negative radii
/// yield nothing.
///
/// # Examples
///
/// ```
/// use pixtile::coord::Coord;
/// use pixtile::geometry::circle_outline;
///
/// assert_eq!(circle_outline(4, 4, 0), vec![Coord::new(4, 4)]);
/// assert!(circle_outline(0, 0, 3).contains(&Coord::new(3, 0)));
/// ```
pub fn circle_outline(cx: i32, cy: i32, r: i32) -> Vec<Coord> {
    if r < 0 {
        return Vec::new();
    }
    let r = r as i64;
    let (cx, cy) = (cx as i64, cy as i64);
    let mut cells = Vec::new();

    for dx in -r..=r {
        let dy = round_sqrt(r * r - dx * dx);
        cells.push((cx + dx, cy + dy));
        cells.push((cx + dx, cy - dy));
    }
    for dy in -r..=r {
        let dx = round_sqrt(r * r - dy * dy);
        cells.push((cx + dx, cy + dy));
        cells.push((cx - dx, cy + dy));
    }

    dedup(cells.into_iter().filter_map(|(x, y)| cell(x, y)))
}

/// Cells past the edge of the `i32` grid are dropped.
fn cell(x: i64, y: i64) -> Option<Coord> {
    Some(Coord::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?))
}

/// Filled circle: one horizontal span per scanline of half-width
/// `floor(sqrt(r² - dy²))`. Negative radii yield nothing.
///
/// # Examples
///
/// ```
/// use pixtile::geometry::circle_fill;
///
/// assert_eq!(circle_fill(0, 0, 1).len(), 5);
/// assert!(circle_fill(0, 0, -1).is_empty());
/// ```
pub fn circle_fill(cx: i32, cy: i32, r: i32) -> Vec<Coord> {
    if r < 0 {
        return Vec::new();
    }
    let r = r as i64;
    let (cx, cy) = (cx as i64, cy as i64);
    let mut cells = Vec::new();

    for dy in -r..=r {
        let half = isqrt(r * r - dy * dy);
        for dx in -half..=half {
            cells.extend(cell(cx + dx, cy + dy));
        }
    }

    cells
}

/// Drop repeated cells, keeping first occurrences in order.
pub fn dedup(cells: impl IntoIterator<Item = Coord>) -> Vec<Coord> {
    let mut seen = HashSet::new();
    cells.into_iter().filter(|c| seen.insert(*c)).collect()
}
