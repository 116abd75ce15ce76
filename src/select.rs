//! Background variant selection by goal percentage.

use crate::config::BackgroundSpec;

/// Outcome of picking a background variant for a percentage.
#[derive(Clone, Copy, Debug)]
pub struct Selection<'a> {
    /// The variant to render with.
    pub variant: &'a BackgroundSpec,
    /// True when no declared range matched and the last enumerated variant
    /// was used instead.
    pub fallback: bool,
}

/// Pick the first variant, in declared order, whose range contains `percent`.
///
/// Ranges are half-open (`min <= p < max`) except at the top: a variant with
/// `max >= 100` also matches `p >= 100`, so full goals land on the
/// open-ended top variant. When nothing matches, the last variant is
/// returned with `fallback` set and the creative is still rendered.
/// Returns `None` only for an empty variant list.
pub fn select_background(variants: &[BackgroundSpec], percent: f64) -> Option<Selection<'_>> {
    for variant in variants {
        if percent >= f64::from(variant.min_percent)
            && (percent < f64::from(variant.max_percent)
                || (variant.max_percent >= 100 && percent >= 100.0))
        {
            return Some(Selection {
                variant,
                fallback: false,
            });
        }
    }

    variants.last().map(|variant| Selection {
        variant,
        fallback: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(image: &str, min_percent: i32, max_percent: i32) -> BackgroundSpec {
        BackgroundSpec {
            image: image.to_string(),
            min_percent,
            max_percent,
            offset: (0, 0),
        }
    }

    fn contiguous() -> Vec<BackgroundSpec> {
        vec![
            variant("low.png", 0, 40),
            variant("mid.png", 40, 80),
            variant("high.png", 80, 100),
        ]
    }

    #[test]
    fn contiguous_ranges_select_exactly_the_containing_range() {
        let variants = contiguous();
        for p in 0..=100 {
            let sel = select_background(&variants, f64::from(p)).unwrap();
            assert!(!sel.fallback, "p={p} should not need the fallback");
            let expected = match p {
                0..=39 => "low.png",
                40..=79 => "mid.png",
                _ => "high.png",
            };
            assert_eq!(sel.variant.image, expected, "p={p}");
        }
    }

    #[test]
    fn zero_percent_matches_variant_starting_at_zero() {
        let variants = contiguous();
        let sel = select_background(&variants, 0.0).unwrap();
        assert_eq!(sel.variant.image, "low.png");
        assert!(!sel.fallback);
    }

    #[test]
    fn hundred_percent_matches_open_ended_top_variant() {
        let variants = contiguous();
        let sel = select_background(&variants, 100.0).unwrap();
        assert_eq!(sel.variant.image, "high.png");
        assert!(!sel.fallback);
    }

    #[test]
    fn first_match_wins_on_overlapping_ranges() {
        let variants = vec![variant("a.png", 0, 100), variant("b.png", 0, 100)];
        let sel = select_background(&variants, 50.0).unwrap();
        assert_eq!(sel.variant.image, "a.png");
    }

    #[test]
    fn no_match_falls_back_to_last_enumerated_variant() {
        let variants = vec![variant("a.png", 0, 20), variant("b.png", 20, 30)];
        let sel = select_background(&variants, 95.0).unwrap();
        assert_eq!(sel.variant.image, "b.png");
        assert!(sel.fallback);
    }

    #[test]
    fn single_full_range_variant_matches_any_percentage() {
        let variants = vec![variant("only.png", 0, 100)];
        for p in [0.0, 50.0, 99.9, 100.0] {
            let sel = select_background(&variants, p).unwrap();
            assert_eq!(sel.variant.image, "only.png");
            assert!(!sel.fallback, "p={p}");
        }
    }

    #[test]
    fn empty_variant_list_yields_none() {
        assert!(select_background(&[], 50.0).is_none());
    }
}
