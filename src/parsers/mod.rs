//! Text value parsers
//!
//! Turn the free-form text fragments shown on a job tile into numeric
//! signals. Both parsers are total: anything they cannot make sense of
//! becomes 0 and is logged at debug level, never surfaced as an error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency symbols, the trailing "+", thousands separators and the word "spent"
static SPEND_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$€£+,]|\bspent\b").unwrap());

/// Leading decimal number, the way a lenient float parser reads a prefix
static LEADING_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:e[+-]?\d+)?").unwrap());

static LESS_THAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"less than (\d+)").unwrap());
static RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+to\s+(\d+)").unwrap());
static OPEN_ENDED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\+").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Highest proposal count an open-ended "N+" label can stand for
pub const OPEN_ENDED_CAP: u32 = 100;

/// Threshold at which an open-ended label is treated as the cap itself
pub const OPEN_ENDED_SATURATION: u32 = 50;

/// Headroom added to an open-ended label below saturation
pub const OPEN_ENDED_HEADROOM: u32 = 10;

fn multiplier_for(suffix: char) -> Option<f64> {
    match suffix {
        'k' => Some(1e3),
        'm' => Some(1e6),
        'b' => Some(1e9),
        _ => None,
    }
}

/// Collapse runs of whitespace to one space and trim, like rendered text
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Parse a client-spend label such as `"$10k+ spent"` into a dollar amount.
///
/// The result is always finite and non-negative; unreadable input is 0.
pub fn parse_spend(text: &str) -> f64 {
    let lowered = text.trim().to_lowercase();
    let stripped = SPEND_NOISE.replace_all(&lowered, "");
    let cleaned = stripped.trim();

    if cleaned.is_empty() {
        return 0.0;
    }

    let value = match cleaned.chars().last().and_then(|c| multiplier_for(c).map(|m| (c, m))) {
        Some((suffix, multiplier)) => cleaned
            .strip_suffix(suffix)
            .and_then(leading_float)
            .map(|v| v * multiplier),
        None => leading_float(cleaned),
    };

    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        Some(_) => 0.0,
        None => {
            tracing::debug!("Unparseable spend text: {:?}", text);
            0.0
        }
    }
}

fn leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(text.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Parse a proposals label into the upper bound of the count it describes.
///
/// First match wins:
/// - `"less than N"` is `N - 1`, floored at 0
/// - `"N to M"` is `M`
/// - `"N+"` is [`open_ended_upper_bound`]
/// - a bare integer is itself
/// - anything without digits is 0
pub fn parse_proposals_bound(text: &str) -> u32 {
    let cleaned = text.trim().to_lowercase();

    if let Some(caps) = LESS_THAN.captures(&cleaned) {
        return parse_count(&caps[1], text).saturating_sub(1);
    }

    if let Some(caps) = RANGE.captures(&cleaned) {
        return parse_count(&caps[2], text);
    }

    if let Some(caps) = OPEN_ENDED.captures(&cleaned) {
        return open_ended_upper_bound(parse_count(&caps[1], text));
    }

    if let Some(caps) = NUMBER.captures(&cleaned) {
        return parse_count(&caps[1], text);
    }

    tracing::debug!("No proposal count in text: {:?}", text);
    0
}

/// Upper bound assumed for an open-ended `"N+"` proposals label.
///
/// The label only gives a lower bound, so this is a heuristic: labels at
/// or above [`OPEN_ENDED_SATURATION`] are treated as the cap, smaller ones
/// get [`OPEN_ENDED_HEADROOM`] added. The result never exceeds
/// [`OPEN_ENDED_CAP`].
pub fn open_ended_upper_bound(lower: u32) -> u32 {
    if lower >= OPEN_ENDED_SATURATION {
        OPEN_ENDED_CAP
    } else {
        (lower + OPEN_ENDED_HEADROOM).min(OPEN_ENDED_CAP)
    }
}

fn parse_count(digits: &str, original: &str) -> u32 {
    digits.parse().unwrap_or_else(|_| {
        tracing::debug!("Proposal count out of range in text: {:?}", original);
        0
    })
}
