/// Circular (time slot x row) store of spectral values, one plane per channel.
///
/// `cursor` is the column the next capture writes to. Reading from the cursor
/// onward visits columns oldest first, ending with the newest at
/// `time_width - 1`.
pub struct SpectralBuffer {
    time_width: usize,
    rows: usize,
    channels: usize,
    /// Laid out as `[channel][column][row]`
    cells: Vec<f32>,
    cursor: usize,
}

impl SpectralBuffer {
    /// Every cell starts at `fill`, normally the scaled value of silence.
    pub fn new(time_width: usize, rows: usize, channels: usize, fill: f32) -> Self {
        let time_width = time_width.max(1);
        Self {
            time_width,
            rows,
            channels,
            cells: vec![fill; channels * time_width * rows],
            cursor: 0,
        }
    }

    pub fn time_width(&self) -> usize {
        self.time_width
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Overwrite `column` of `channel` with `frame`. Rows past the end of a
    /// short frame keep their previous values.
    pub fn write(&mut self, column: usize, channel: usize, frame: &[f32]) {
        let start = self.offset(channel, column);
        let len = frame.len().min(self.rows);
        self.cells[start..start + len].copy_from_slice(&frame[..len]);
    }

    /// Move the cursor one column forward, wrapping. Returns the new cursor.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.time_width;
        self.cursor
    }

    /// Physical column holding the frame `offset` slots after the oldest.
    #[inline]
    pub fn chronological_index(&self, offset: usize) -> usize {
        (self.cursor + offset) % self.time_width
    }

    /// Physical column of the most recent write.
    #[inline]
    pub fn latest_column(&self) -> usize {
        (self.cursor + self.time_width - 1) % self.time_width
    }

    pub fn column(&self, channel: usize, column: usize) -> &[f32] {
        let start = self.offset(channel, column);
        &self.cells[start..start + self.rows]
    }

    /// Columns of `channel` from oldest to newest.
    pub fn chronological(&self, channel: usize) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.time_width).map(move |offset| self.column(channel, self.chronological_index(offset)))
    }

    #[inline]
    fn offset(&self, channel: usize, column: usize) -> usize {
        assert!(channel < self.channels && column < self.time_width);
        (channel * self.time_width + column) * self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(buffer: &SpectralBuffer) -> Vec<Vec<f32>> {
        buffer.chronological(0).map(|c| c.to_vec()).collect()
    }

    fn push(buffer: &mut SpectralBuffer, frame: &[f32]) {
        let column = buffer.cursor();
        buffer.write(column, 0, frame);
        buffer.advance();
    }

    #[test]
    fn test_cursor_tracks_capture_count() {
        let mut buffer = SpectralBuffer::new(5, 2, 1, 0.0);
        for t in 1..=17usize {
            push(&mut buffer, &[t as f32, 0.0]);
            assert_eq!(buffer.cursor(), t % 5);
            // The column behind the cursor holds the newest frame.
            assert_eq!(buffer.column(0, buffer.latest_column())[0], t as f32);
        }
    }

    #[test]
    fn test_wraparound_scenario() {
        let mut buffer = SpectralBuffer::new(3, 4, 1, 0.0);
        push(&mut buffer, &[1.0, 0.0, 0.0, 0.0]);
        push(&mut buffer, &[0.0, 1.0, 0.0, 0.0]);
        push(&mut buffer, &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(
            frames(&buffer),
            vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ]
        );

        push(&mut buffer, &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(buffer.cursor(), 1);
        assert_eq!(buffer.column(0, 0), &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            frames(&buffer),
            vec![
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
                vec![0.0, 0.0, 0.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_chronological_order_from_any_cursor() {
        let width = 4;
        let mut buffer = SpectralBuffer::new(width, 1, 1, -1.0);
        for t in 0..11 {
            push(&mut buffer, &[t as f32]);
            let values: Vec<f32> = buffer.chronological(0).map(|c| c[0]).collect();
            let newest = t as f32;
            let expected: Vec<f32> = (0..width)
                .map(|i| {
                    let v = newest - (width - 1 - i) as f32;
                    if v < 0.0 { -1.0 } else { v }
                })
                .collect();
            assert_eq!(values, expected, "after capture {t}");
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let mut buffer = SpectralBuffer::new(2, 2, 2, 0.0);
        buffer.write(0, 0, &[1.0, 2.0]);
        buffer.write(0, 1, &[3.0, 4.0]);
        assert_eq!(buffer.column(0, 0), &[1.0, 2.0]);
        assert_eq!(buffer.column(1, 0), &[3.0, 4.0]);
        assert_eq!(buffer.column(1, 1), &[0.0, 0.0]);
    }

    #[test]
    fn test_short_frame_keeps_remaining_rows() {
        let mut buffer = SpectralBuffer::new(1, 3, 1, 9.0);
        buffer.write(0, 0, &[1.0]);
        assert_eq!(buffer.column(0, 0), &[1.0, 9.0, 9.0]);
        buffer.write(0, 0, &[5.0, 5.0, 5.0, 5.0]);
        assert_eq!(buffer.column(0, 0), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_single_column_buffer() {
        let mut buffer = SpectralBuffer::new(1, 1, 1, 0.0);
        push(&mut buffer, &[3.0]);
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(buffer.latest_column(), 0);
        assert_eq!(frames(&buffer), vec![vec![3.0]]);
    }
}
