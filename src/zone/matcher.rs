//! Trigger Name Classification
//!
//! Maps level-editor trigger names onto zone descriptors. This is a pure
//! function of the name: registration state lives in the registry.
//!
//! | Pattern                                  | Result                 |
//! |------------------------------------------|------------------------|
//! | `map_start`, `s1_start`, `stage1_start`, `timer_startzone`, `zone_start` | Start, track 0 |
//! | `map_end`, `timer_endzone`, `zone_end`   | End, track 0           |
//! | `b<N>_start`, `bonus<N>_start`, `timer_bonus<N>_startzone` | Start, track N |
//! | `b<N>_end`, `bonus<N>_end`, `timer_bonus<N>_endzone` | End, track N |
//! | `s<N>_start`, `stage<N>_start`            | Stage N, track 0       |
//! | `map_cp<N>`, `map_checkpoint<N>`          | Checkpoint N, track 0  |
//! | `b<T>_cp<C>`, `bonus<T>_checkpoint<C>`, ... | Checkpoint C, track T |

use super::ZoneKind;

const START_ZONE_NAMES: [&str; 5] = [
    "map_start",
    "s1_start",
    "stage1_start",
    "timer_startzone",
    "zone_start",
];

const END_ZONE_NAMES: [&str; 3] = ["map_end", "timer_endzone", "zone_end"];

/// Classification of a trigger name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneMatch {
    /// Zone type
    pub kind: ZoneKind,
    /// Track the zone belongs to
    pub track: u32,
    /// Stage or checkpoint number, 0 when not applicable
    pub index: u32,
}

impl ZoneMatch {
    const fn new(kind: ZoneKind, track: u32, index: u32) -> Self {
        Self { kind, track, index }
    }
}

/// Classify a trigger name. Returns `None` for names that are not zones.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn classify(name: &str) -> Option<ZoneMatch> {
    let name = name.trim().to_ascii_lowercase();
    let name = name.as_str();

    if START_ZONE_NAMES.contains(&name) {
        return Some(ZoneMatch::new(ZoneKind::Start, 0, 0));
    }

    if END_ZONE_NAMES.contains(&name) {
        return Some(ZoneMatch::new(ZoneKind::End, 0, 0));
    }

    if let Some(track) = bonus_boundary(name, "_start", "_startzone") {
        return Some(ZoneMatch::new(ZoneKind::Start, track, 0));
    }

    if let Some(track) = bonus_boundary(name, "_end", "_endzone") {
        return Some(ZoneMatch::new(ZoneKind::End, track, 0));
    }

    if let Some(stage) = stage_start(name) {
        return Some(ZoneMatch::new(ZoneKind::Stage, 0, stage));
    }

    if let Some(cp) = map_checkpoint(name) {
        return Some(ZoneMatch::new(ZoneKind::Checkpoint, 0, cp));
    }

    if let Some((track, cp)) = bonus_checkpoint(name) {
        return Some(ZoneMatch::new(ZoneKind::Checkpoint, track, cp));
    }

    None
}

/// `(b|bonus)<N><suffix>` or `timer_bonus<N><timer_suffix>`.
fn bonus_boundary(name: &str, suffix: &str, timer_suffix: &str) -> Option<u32> {
    if let Some(rest) = name.strip_prefix("timer_bonus") {
        return rest.strip_suffix(timer_suffix).and_then(parse_small);
    }

    let rest = strip_bonus_prefix(name)?;
    rest.strip_suffix(suffix).and_then(parse_small)
}

/// `(s|stage)<N>_start`
fn stage_start(name: &str) -> Option<u32> {
    let rest = name
        .strip_prefix("stage")
        .or_else(|| name.strip_prefix('s'))?;
    rest.strip_suffix("_start").and_then(parse_small)
}

/// `map_(cp|checkpoint)<N>`
fn map_checkpoint(name: &str) -> Option<u32> {
    let rest = name.strip_prefix("map_")?;
    let digits = rest
        .strip_prefix("checkpoint")
        .or_else(|| rest.strip_prefix("cp"))?;
    parse_small(digits)
}

/// `b(onus)?<T>_c(heck)?p(oint)?<C>`
fn bonus_checkpoint(name: &str) -> Option<(u32, u32)> {
    let rest = strip_bonus_prefix(name)?;
    let (track, rest) = rest.split_once('_')?;
    let track = parse_positive(track)?;

    let rest = rest.strip_prefix('c')?;
    let rest = rest.strip_prefix("heck").unwrap_or(rest);
    let rest = rest.strip_prefix('p')?;
    let rest = rest.strip_prefix("oint").unwrap_or(rest);

    Some((track, parse_positive(rest)?))
}

fn strip_bonus_prefix(name: &str) -> Option<&str> {
    name.strip_prefix("bonus").or_else(|| name.strip_prefix('b'))
}

/// One or two digits without a leading zero (1-99).
fn parse_small(digits: &str) -> Option<u32> {
    if digits.len() > 2 {
        return None;
    }
    parse_positive(digits)
}

/// Any positive integer without a leading zero.
fn parse_positive(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(kind: ZoneKind, track: u32, index: u32) -> Option<ZoneMatch> {
        Some(ZoneMatch::new(kind, track, index))
    }

    #[test]
    fn test_exact_start_and_end_names() {
        for name in START_ZONE_NAMES {
            assert_eq!(classify(name), m(ZoneKind::Start, 0, 0), "{}", name);
        }
        for name in END_ZONE_NAMES {
            assert_eq!(classify(name), m(ZoneKind::End, 0, 0), "{}", name);
        }
    }

    #[test]
    fn test_names_are_normalized() {
        assert_eq!(classify("  MAP_START "), m(ZoneKind::Start, 0, 0));
        assert_eq!(classify("Bonus2_End"), m(ZoneKind::End, 2, 0));
    }

    #[test]
    fn test_bonus_boundaries() {
        assert_eq!(classify("b1_start"), m(ZoneKind::Start, 1, 0));
        assert_eq!(classify("bonus12_start"), m(ZoneKind::Start, 12, 0));
        assert_eq!(classify("timer_bonus3_startzone"), m(ZoneKind::Start, 3, 0));
        assert_eq!(classify("b4_end"), m(ZoneKind::End, 4, 0));
        assert_eq!(classify("timer_bonus5_endzone"), m(ZoneKind::End, 5, 0));

        // timer_ form requires the zone suffix
        assert_eq!(classify("timer_bonus3_start"), None);
        // zero and leading zeros are not tracks
        assert_eq!(classify("b0_start"), None);
        assert_eq!(classify("b01_start"), None);
        // at most two digits
        assert_eq!(classify("b100_start"), None);
    }

    #[test]
    fn test_stage_zones() {
        assert_eq!(classify("s2_start"), m(ZoneKind::Stage, 0, 2));
        assert_eq!(classify("stage17_start"), m(ZoneKind::Stage, 0, 17));
        // stage 1 is the map start
        assert_eq!(classify("s1_start"), m(ZoneKind::Start, 0, 0));
        assert_eq!(classify("stage1_start"), m(ZoneKind::Start, 0, 0));
        assert_eq!(classify("s2_end"), None);
    }

    #[test]
    fn test_checkpoint_zones() {
        assert_eq!(classify("map_cp1"), m(ZoneKind::Checkpoint, 0, 1));
        assert_eq!(classify("map_checkpoint42"), m(ZoneKind::Checkpoint, 0, 42));
        assert_eq!(classify("map_cp0"), None);

        assert_eq!(classify("b1_cp3"), m(ZoneKind::Checkpoint, 1, 3));
        assert_eq!(classify("bonus2_checkpoint7"), m(ZoneKind::Checkpoint, 2, 7));
        assert_eq!(classify("b3_checkp1"), m(ZoneKind::Checkpoint, 3, 1));
        assert_eq!(classify("bonus1_cpoint150"), m(ZoneKind::Checkpoint, 1, 150));
        assert_eq!(classify("b1_cp0"), None);
        assert_eq!(classify("b1_chp2"), None);
    }

    #[test]
    fn test_unmatched_names() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("trigger_push"), None);
        assert_eq!(classify("map_start2"), None);
        assert_eq!(classify("bonus_start"), None);
        assert_eq!(classify("sx_start"), None);
    }
}
