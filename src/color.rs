use palette::Srgb;

/// 8-bit RGB pixel written to display surfaces.
pub type Rgb8 = Srgb<u8>;

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Gradient used to turn a normalized magnitude into a pixel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heatmap {
    /// black -> red
    TwoStop,
    /// black -> blue -> green -> red
    ThreeStop,
}

impl Heatmap {
    /// Color for `v`, clamped to [0, 1].
    pub fn color(self, v: f32) -> Rgb8 {
        let v = v.clamp(0.0, 1.0);
        let rgb = match self {
            Heatmap::TwoStop => lerp_rgb(BLACK, RED, v),
            Heatmap::ThreeStop => {
                // Spans are 0.33, 0.33 and 0.34 wide.
                if v < 0.33 {
                    lerp_rgb(BLACK, BLUE, v / 0.33)
                } else if v < 0.66 {
                    lerp_rgb(BLUE, GREEN, (v - 0.33) / 0.33)
                } else {
                    lerp_rgb(GREEN, RED, (v - 0.66) / 0.34)
                }
            }
        };
        Srgb::new(rgb[0], rgb[1], rgb[2]).into_format()
    }
}

/// Interpolate between two colors
pub fn lerp_rgb(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
