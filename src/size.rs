//! Size strings (`"50%"`, `"1fr"`, `"200px"`) and the proportional allocation of an
//! extent among siblings.

use std::fmt;
use std::str::FromStr;

/// Length unit of a [`SizeWithUnit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeUnit {
    Pixel,
    Percent,
    Fractional,
}

impl SizeUnit {
    pub const ALL: &'static [Self] = &[Self::Pixel, Self::Percent, Self::Fractional];

    /// Units accepted for the `size` of a row/column child.
    pub const ITEM_SIZE: &'static [Self] = Self::ALL;

    /// Units accepted for `minSize` and the default minimum item sizes.
    pub const MIN_SIZE: &'static [Self] = &[Self::Pixel];

    pub fn token(self) -> &'static str {
        match self {
            Self::Pixel => "px",
            Self::Percent => "%",
            Self::Fractional => "fr",
        }
    }

    pub fn try_parse(token: &str) -> Option<Self> {
        match token {
            "px" => Some(Self::Pixel),
            "%" => Some(Self::Percent),
            "fr" => Some(Self::Fractional),
            _ => None,
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Errors from parsing a size string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SizeParseError {
    #[error("invalid size format: {0:?}")]
    InvalidSizeFormat(String),

    #[error("unknown size unit {unit:?} in {input:?}")]
    UnknownSizeUnit { input: String, unit: String },

    #[error("size unit {unit} is not supported here (in {input:?})")]
    UnsupportedSizeUnit { input: String, unit: SizeUnit },
}

/// A magnitude plus a unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeWithUnit {
    pub size: f32,
    pub unit: SizeUnit,
}

impl SizeWithUnit {
    pub const fn new(size: f32, unit: SizeUnit) -> Self {
        Self { size, unit }
    }

    pub const fn pixels(size: f32) -> Self {
        Self::new(size, SizeUnit::Pixel)
    }

    pub const fn percent(size: f32) -> Self {
        Self::new(size, SizeUnit::Percent)
    }

    pub const fn fractional(size: f32) -> Self {
        Self::new(size, SizeUnit::Fractional)
    }

    /// `1fr`, the size of an item that has not been given one.
    pub const DEFAULT: Self = Self::fractional(1.0);

    /// Parse `<number><unit>` and check the unit against `allowed`.
    ///
    /// Whitespace is not permitted anywhere, and unit tokens are case-sensitive.
    pub fn parse(input: &str, allowed: &[SizeUnit]) -> Result<Self, SizeParseError> {
        let split = input
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let (number, token) = input.split_at(split);

        if number.is_empty() || input.chars().any(char::is_whitespace) {
            return Err(SizeParseError::InvalidSizeFormat(input.to_owned()));
        }
        let size: f32 = number
            .parse()
            .map_err(|_err| SizeParseError::InvalidSizeFormat(input.to_owned()))?;
        if !size.is_finite() {
            return Err(SizeParseError::InvalidSizeFormat(input.to_owned()));
        }

        let Some(unit) = SizeUnit::try_parse(token) else {
            return Err(SizeParseError::UnknownSizeUnit {
                input: input.to_owned(),
                unit: token.to_owned(),
            });
        };
        if !allowed.contains(&unit) {
            return Err(SizeParseError::UnsupportedSizeUnit {
                input: input.to_owned(),
                unit,
            });
        }

        Ok(Self { size, unit })
    }
}

impl Default for SizeWithUnit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SizeWithUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.size, self.unit)
    }
}

impl FromStr for SizeWithUnit {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, SizeUnit::ALL)
    }
}

/// Resolve sibling sizes to pixel extents that sum to `total`.
///
/// Pixel sizes are reserved first (scaled down if they alone exceed `total`). The
/// remainder goes to percent siblings by their percentage. Fractional siblings get
/// whatever the percentages leave unused, or an extra 50% pool when the percentages
/// already reach 100%, after which everything is normalised back to 100%. Each
/// extent is floored to a whole pixel and the residual is added to the last sibling.
pub fn distribute(sizes: &[SizeWithUnit], total: f32) -> Vec<f32> {
    let n = sizes.len();
    if n == 0 {
        return Vec::new();
    }
    let total = total.max(0.0);

    let mut extents = vec![0.0_f32; n];

    let pixel_sum: f32 = sizes
        .iter()
        .filter(|s| s.unit == SizeUnit::Pixel)
        .map(|s| s.size.max(0.0))
        .sum();
    let pixel_scale = if pixel_sum > total && pixel_sum > 0.0 {
        total / pixel_sum
    } else {
        1.0
    };
    for (extent, size) in extents.iter_mut().zip(sizes) {
        if size.unit == SizeUnit::Pixel {
            *extent = size.size.max(0.0) * pixel_scale;
        }
    }
    let remaining = (total - pixel_sum * pixel_scale).max(0.0);

    let percent_sum: f32 = sizes
        .iter()
        .filter(|s| s.unit == SizeUnit::Percent)
        .map(|s| s.size.max(0.0))
        .sum();
    let fraction_sum: f32 = sizes
        .iter()
        .filter(|s| s.unit == SizeUnit::Fractional)
        .map(|s| s.size.max(0.0))
        .sum();
    let has_relative = sizes.iter().any(|s| s.unit != SizeUnit::Pixel);

    if has_relative {
        let fraction_pool = if fraction_sum > 0.0 {
            if percent_sum < 100.0 {
                100.0 - percent_sum
            } else {
                50.0
            }
        } else {
            0.0
        };

        let mut percents: Vec<f32> = sizes
            .iter()
            .map(|s| match s.unit {
                SizeUnit::Pixel => 0.0,
                SizeUnit::Percent => s.size.max(0.0),
                SizeUnit::Fractional if fraction_sum > 0.0 => {
                    fraction_pool * s.size.max(0.0) / fraction_sum
                }
                SizeUnit::Fractional => 0.0,
            })
            .collect();

        let allocated: f32 = percents.iter().sum();
        if allocated > 0.0 {
            for percent in &mut percents {
                *percent *= 100.0 / allocated;
            }
        } else {
            // Nothing asked for any space: share it evenly.
            let relative_count = sizes.iter().filter(|s| s.unit != SizeUnit::Pixel).count();
            for (percent, size) in percents.iter_mut().zip(sizes) {
                if size.unit != SizeUnit::Pixel {
                    *percent = 100.0 / relative_count as f32;
                }
            }
        }

        for ((extent, size), percent) in extents.iter_mut().zip(sizes).zip(percents) {
            if size.unit != SizeUnit::Pixel {
                *extent = remaining * percent / 100.0;
            }
        }
    }

    round_with_residual(&mut extents, total);
    extents
}

/// Like [`distribute`], then raise every extent below its floor, taking the deficit
/// from siblings that are above theirs.
///
/// Floors are ignored entirely when they alone do not fit in `total`.
pub fn distribute_with_min(sizes: &[SizeWithUnit], min_sizes: &[f32], total: f32) -> Vec<f32> {
    debug_assert_eq!(sizes.len(), min_sizes.len(), "one floor per size");

    let mut extents = distribute(sizes, total);
    let floor_sum: f32 = min_sizes.iter().map(|m| m.max(0.0)).sum();
    if floor_sum <= 0.0 || floor_sum > total {
        return extents;
    }

    // Each round pins at least one more sibling to its floor, so this terminates.
    for _ in 0..extents.len() {
        let mut deficit = 0.0;
        for (extent, &floor) in extents.iter_mut().zip(min_sizes) {
            if *extent < floor {
                deficit += floor - *extent;
                *extent = floor;
            }
        }
        if deficit <= 0.0 {
            break;
        }

        let slack: f32 = extents
            .iter()
            .zip(min_sizes)
            .map(|(extent, &floor)| (extent - floor.max(0.0)).max(0.0))
            .sum();
        if slack <= 0.0 {
            break;
        }
        for (extent, &floor) in extents.iter_mut().zip(min_sizes) {
            let spare = (*extent - floor.max(0.0)).max(0.0);
            *extent -= deficit * spare / slack;
        }
    }

    round_with_residual(&mut extents, total);
    extents
}

fn round_with_residual(extents: &mut [f32], total: f32) {
    for extent in extents.iter_mut() {
        *extent = extent.max(0.0).floor();
    }
    let sum: f32 = extents.iter().sum();
    if let Some(last) = extents.last_mut() {
        *last = (*last + (total - sum)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(specs: &[&str]) -> Vec<SizeWithUnit> {
        specs.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn sum(extents: &[f32]) -> f32 {
        extents.iter().sum()
    }

    #[test]
    fn parses_each_unit() {
        assert_eq!(
            "50%".parse::<SizeWithUnit>().unwrap(),
            SizeWithUnit::percent(50.0)
        );
        assert_eq!(
            "1.5fr".parse::<SizeWithUnit>().unwrap(),
            SizeWithUnit::fractional(1.5)
        );
        assert_eq!(
            "200px".parse::<SizeWithUnit>().unwrap(),
            SizeWithUnit::pixels(200.0)
        );
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(
            SizeWithUnit::parse("abc%", SizeUnit::ALL),
            Err(SizeParseError::InvalidSizeFormat(_))
        ));
        assert!(matches!(
            SizeWithUnit::parse("10 px", SizeUnit::ALL),
            Err(SizeParseError::InvalidSizeFormat(_))
        ));
        assert!(matches!(
            SizeWithUnit::parse("10em", SizeUnit::ALL),
            Err(SizeParseError::UnknownSizeUnit { .. })
        ));
        assert!(matches!(
            SizeWithUnit::parse("10PX", SizeUnit::ALL),
            Err(SizeParseError::UnknownSizeUnit { .. })
        ));
        assert_eq!(
            SizeWithUnit::parse("10px", &[SizeUnit::Percent, SizeUnit::Fractional]),
            Err(SizeParseError::UnsupportedSizeUnit {
                input: "10px".to_owned(),
                unit: SizeUnit::Pixel,
            })
        );
    }

    #[test]
    fn display_round_trips() {
        for s in ["50%", "1fr", "200px", "33.5%"] {
            assert_eq!(s.parse::<SizeWithUnit>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn percentages_fill_the_extent() {
        let extents = distribute(&sizes(&["50%", "50%"]), 400.0);
        assert_eq!(extents, vec![200.0, 200.0]);
    }

    #[test]
    fn under_allocated_percentages_are_normalised_without_fractions() {
        let extents = distribute(&sizes(&["20%", "20%"]), 300.0);
        assert_eq!(extents, vec![150.0, 150.0]);
    }

    #[test]
    fn fractions_take_the_leftover() {
        let extents = distribute(&sizes(&["50%", "1fr", "3fr"]), 800.0);
        assert_eq!(extents, vec![400.0, 100.0, 300.0]);
    }

    #[test]
    fn fractions_get_extra_pool_when_percentages_overflow() {
        // 150% + 50% pool, normalised to 100%: 75% / 25%.
        let extents = distribute(&sizes(&["150%", "1fr"]), 400.0);
        assert_eq!(extents, vec![300.0, 100.0]);
    }

    #[test]
    fn pixels_are_reserved_first() {
        let extents = distribute(&sizes(&["100px", "1fr", "1fr"]), 500.0);
        assert_eq!(extents, vec![100.0, 200.0, 200.0]);
    }

    #[test]
    fn oversized_pixels_are_scaled_into_the_extent() {
        let extents = distribute(&sizes(&["300px", "300px", "1fr"]), 300.0);
        assert_eq!(sum(&extents), 300.0);
        assert_eq!(extents[2], 0.0);
    }

    #[test]
    fn residual_goes_to_the_last_sibling() {
        let extents = distribute(&sizes(&["1fr", "1fr", "1fr"]), 100.0);
        assert_eq!(extents, vec![33.0, 33.0, 34.0]);
    }

    #[test]
    fn sums_exactly_for_many_mixes() {
        let mixes: &[&[&str]] = &[
            &["10%", "1fr", "20px"],
            &["0%", "0%"],
            &["0fr", "0fr", "0fr"],
            &["99%", "99%", "2fr", "5px"],
            &["1px"],
            &["33.3%", "33.3%", "33.3%"],
        ];
        for total in [0.0, 1.0, 7.0, 99.5, 1024.0] {
            for mix in mixes {
                let extents = distribute(&sizes(mix), total);
                assert!(extents.iter().all(|e| *e >= 0.0), "{mix:?} {extents:?}");
                assert!(
                    (sum(&extents) - total).abs() < 1e-3,
                    "{mix:?} at {total}: {extents:?}"
                );
            }
        }
    }

    #[test]
    fn min_sizes_are_respected_when_they_fit() {
        let extents = distribute_with_min(&sizes(&["90%", "10%"]), &[0.0, 50.0], 200.0);
        assert_eq!(extents, vec![150.0, 50.0]);
    }

    #[test]
    fn min_sizes_are_ignored_when_they_cannot_fit() {
        let extents = distribute_with_min(&sizes(&["50%", "50%"]), &[150.0, 150.0], 200.0);
        assert_eq!(extents, vec![100.0, 100.0]);
    }
}
