//! Software drawing surface.
//!
//! Mirrors the small slice of a 2D canvas context the guest can reach: a
//! stroke color, a path made of polyline subpaths, `stroke` and `clear`.
//! Pixels are stored row-major, one [`Color`] per pixel.

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from unvalidated guest channels, clamping each to `0..=255`.
    #[must_use]
    pub fn from_channels(r: i32, g: i32, b: i32) -> Self {
        let clamp = |c: i32| u8::try_from(c.clamp(0, 255)).unwrap_or(u8::MAX);
        Self::rgb(clamp(r), clamp(g), clamp(b))
    }
}

type Point = (f64, f64);

#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    background: Color,
    stroke_color: Color,
    subpaths: Vec<Vec<Point>>,
    pixels: Vec<Color>,
}

impl Surface {
    /// Stroke color of a freshly created or resized surface.
    pub const DEFAULT_STROKE: Color = Color::BLACK;

    #[must_use]
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            stroke_color: Self::DEFAULT_STROKE,
            subpaths: Vec::new(),
            pixels: vec![background; pixel_count(width, height)],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn background(&self) -> Color {
        self.background
    }

    #[must_use]
    pub const fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    /// Row-major pixel data, `width * height` entries.
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    #[must_use]
    pub fn path_is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }

    /// Resize the surface. Like a canvas whose dimensions are assigned, this
    /// resets the contents and the drawing state.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.stroke_color = Self::DEFAULT_STROKE;
        self.subpaths.clear();
        self.pixels.clear();
        self.pixels.resize(pixel_count(width, height), self.background);
    }

    pub const fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    pub fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.subpaths.push(vec![(x, y)]);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        match self.subpaths.last_mut() {
            Some(subpath) => subpath.push((x, y)),
            None => self.move_to(x, y),
        }
    }

    /// Rasterize every segment of the current path with the stroke color. The
    /// path is kept, so stroking twice draws the same pixels.
    pub fn stroke(&mut self) {
        let subpaths = std::mem::take(&mut self.subpaths);
        for subpath in &subpaths {
            for segment in subpath.windows(2) {
                self.draw_segment(segment[0], segment[1]);
            }
        }
        self.subpaths = subpaths;
    }

    /// Erase everything to the background color and drop the current path.
    pub fn clear(&mut self) {
        self.pixels.fill(self.background);
        self.subpaths.clear();
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn plot(&mut self, x: i64, y: i64) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = self.stroke_color;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn draw_segment(&mut self, from: Point, to: Point) {
        let Some((from, to)) =
            clip_segment(from, to, f64::from(self.width), f64::from(self.height))
        else {
            return;
        };

        // Clipped endpoints lie inside the surface, so these fit in i64 and the
        // walk below is bounded by width + height steps.
        let (mut x0, mut y0) = (from.0.floor() as i64, from.1.floor() as i64);
        let (x1, y1) = (to.0.floor() as i64, to.1.floor() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x0, y0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

fn outcode((x, y): Point, width: f64, height: f64) -> u8 {
    let mut code = 0;
    if x < 0.0 {
        code |= LEFT;
    } else if x > width {
        code |= RIGHT;
    }
    if y < 0.0 {
        code |= TOP;
    } else if y > height {
        code |= BOTTOM;
    }
    code
}

/// Cohen-Sutherland clip of a segment against `[0, width] x [0, height]`.
///
/// The clipped coordinate is set exactly on the boundary, so segments with
/// enormous endpoints keep their on-surface part intact.
fn clip_segment(
    mut from: Point,
    mut to: Point,
    width: f64,
    height: f64,
) -> Option<(Point, Point)> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if ![from.0, from.1, dx, dy].iter().all(|v| v.is_finite()) {
        return None;
    }

    // Each pass pins one endpoint to one boundary; four per endpoint suffice.
    for _ in 0..8 {
        let code_from = outcode(from, width, height);
        let code_to = outcode(to, width, height);
        if code_from | code_to == 0 {
            return Some((from, to));
        }
        if code_from & code_to != 0 {
            return None;
        }

        let out = if code_from == 0 { code_to } else { code_from };
        let (x0, y0) = from;
        let (dx, dy) = (to.0 - x0, to.1 - y0);
        let point = if out & BOTTOM != 0 {
            (x0 + dx * ((height - y0) / dy), height)
        } else if out & TOP != 0 {
            (x0 + dx * (-y0 / dy), 0.0)
        } else if out & RIGHT != 0 {
            (width, y0 + dy * ((width - x0) / dx))
        } else {
            (0.0, y0 + dy * (-x0 / dx))
        };

        if out == code_from {
            from = point;
        } else {
            to = point;
        }
    }

    let clamp = |(x, y): Point| (x.clamp(0.0, width), y.clamp(0.0, height));
    Some((clamp(from), clamp(to)))
}
