/// Contiguous bin range covering a frequency band of an N-bin spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyWindow {
    min_bin: usize,
    max_bin: usize,
}

impl FrequencyWindow {
    /// Map `[min_frequency, max_frequency]` onto the bins of a `bins`-point
    /// spectrum sampled at `sample_rate`.
    ///
    /// The lower edge rounds down and the upper edge rounds up, both clamped
    /// to `[0, bins - 1]`. A reversed band collapses to its lower bin.
    pub fn new(sample_rate: u32, bins: usize, min_frequency: f32, max_frequency: f32) -> Self {
        let nyquist = sample_rate as f32 * 0.5;
        let last = bins.saturating_sub(1) as f32;

        let min_bin = (min_frequency / nyquist * bins as f32).floor().clamp(0.0, last) as usize;
        let max_bin = (max_frequency / nyquist * bins as f32).ceil().clamp(0.0, last) as usize;

        Self {
            min_bin,
            max_bin: max_bin.max(min_bin),
        }
    }

    pub fn min_bin(&self) -> usize {
        self.min_bin
    }

    pub fn max_bin(&self) -> usize {
        self.max_bin
    }

    pub fn visible_bins(&self) -> usize {
        self.max_bin - self.min_bin + 1
    }

    #[inline]
    pub fn contains(&self, bin: usize) -> bool {
        (self.min_bin..=self.max_bin).contains(&bin)
    }

    /// The in-range part of `spectrum`.
    pub fn crop<'a>(&self, spectrum: &'a [f32]) -> &'a [f32] {
        let end = (self.max_bin + 1).min(spectrum.len());
        let start = self.min_bin.min(end);
        &spectrum[start..end]
    }
}

/// Linearly interpolated value of output row `row` when `column` is
/// stretched (or squeezed) to `rows` rows.
///
/// Row 0 maps onto the first source bin and row `rows - 1` onto the last, both
/// exactly. An empty column reads as zero.
pub fn sample_row(column: &[f32], row: usize, rows: usize) -> f32 {
    let visible = column.len();
    if visible == 0 {
        return 0.0;
    }
    if rows <= 1 || visible == 1 {
        return column[0];
    }

    let t = row as f32 / (rows - 1) as f32;
    let bin_pos = t * (visible - 1) as f32;
    let b0 = (bin_pos.floor() as usize).min(visible - 1);
    let b1 = (b0 + 1).min(visible - 1);
    let frac = bin_pos - b0 as f32;

    lerp(column[b0], column[b1], frac)
}

/// Resample `column` into `out`, one value per output row.
pub fn resample(column: &[f32], out: &mut [f32]) {
    let rows = out.len();
    for (row, value) in out.iter_mut().enumerate() {
        *value = sample_row(column, row, rows);
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}
