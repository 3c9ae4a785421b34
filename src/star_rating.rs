/// Star-rating lookup for IRPF declaration history.
///
/// The table is a fixed triangular matrix: row `d` holds the ratings for
/// `d` declarations across refund counts `0..=d`. Rows are right-padded
/// with the `UNRATED` sentinel so every row has the same width, which makes
/// an out-of-range refund count a sentinel lookup instead of a panic.
/// Read-only after construction.

/// Rating returned when the (declarations, refunds) pair has no table entry.
pub const UNRATED: i8 = -1;

/// Declaration count at which the rating saturates to the maximum.
const SATURATION_DECLARATIONS: u32 = 16;

/// Maximum rating, returned for any saturated declaration count.
const MAX_STARS: i8 = 5;

const BASE_ROWS: [&[i8]; 16] = [
    &[0],
    &[1, 1],
    &[1, 1, 1],
    &[1, 1, 1, 1],
    &[1, 1, 1, 2, 2],
    &[1, 1, 2, 2, 3, 3],
    &[1, 2, 2, 3, 3, 4, 4],
    &[2, 2, 3, 3, 4, 4, 4, 5],
    &[2, 3, 3, 4, 4, 4, 5, 5, 5],
    &[2, 3, 4, 4, 4, 5, 5, 5, 5, 5],
    &[3, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5],
    &[3, 4, 4, 5, 5, 5, 5, 5, 5, 5, 5, 5],
    &[3, 4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5],
    &[4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5],
    &[4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5],
    &[4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5],
];

/// Static triangular lookup from (declaration count, refund count) to a
/// 0–5 rating.
#[derive(Debug, Clone)]
pub struct StarRatingTable {
    rows: Vec<Vec<i8>>,
}

impl StarRatingTable {
    /// Builds the padded matrix once; all rows end up `max_width` wide.
    pub fn new() -> Self {
        let max_width = BASE_ROWS.iter().map(|row| row.len()).max().unwrap_or(0);

        let rows = BASE_ROWS
            .iter()
            .map(|row| {
                let mut padded = row.to_vec();
                padded.resize(max_width, UNRATED);
                padded
            })
            .collect();

        StarRatingTable { rows }
    }

    /// Rating for the given declaration and refund counts.
    ///
    /// Saturates to 5 at 16 or more declarations regardless of refunds.
    /// A pair outside the matrix yields the `UNRATED` sentinel; callers
    /// must treat it as "rating unavailable", never as a valid rating.
    pub fn rating(&self, declarations: u32, refunds: u32) -> i8 {
        if declarations >= SATURATION_DECLARATIONS {
            return MAX_STARS;
        }

        self.rows
            .get(declarations as usize)
            .and_then(|row| row.get(refunds as usize))
            .copied()
            .unwrap_or(UNRATED)
    }
}

impl Default for StarRatingTable {
    fn default() -> Self {
        Self::new()
    }
}
