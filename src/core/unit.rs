use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Physical unit attached to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Unit {
    #[default]
    Unknown,
    Foot,
    Inch,
    Pound,
    Kip,
    Psi,
    Volt,
    Degree,
    Radian,
    Second,
    Meter,
    Kilogram,
    Ampere,
    Kelvin,
    Hertz,
    Watt,
    Pascal,
    Joule,
    Farad,
    Ohm,
    Tesla,
    Lumen,
}

/// Symbol associations in declaration order. The first symbol of each entry
/// is the preferred one used for display; lookups are exact and
/// case-sensitive, so symbols are kept lowercase and callers normalize
/// before querying (see `schema::sniff`).
const SYMBOLS: &[(Unit, &[&str])] = &[
    (Unit::Unknown, &["?"]),
    (Unit::Foot, &["ft"]),
    (Unit::Inch, &["in"]),
    (Unit::Pound, &["lb"]),
    (Unit::Kip, &["kip"]),
    (Unit::Psi, &["psi"]),
    (Unit::Volt, &["v"]),
    (Unit::Degree, &["deg"]),
    (Unit::Radian, &["rad"]),
    (Unit::Second, &["sec", "s"]),
    (Unit::Meter, &["m"]),
    (Unit::Kilogram, &["kg", "k"]),
    (Unit::Ampere, &["a"]),
    (Unit::Kelvin, &["θ"]),
    (Unit::Hertz, &["hz"]),
    (Unit::Watt, &["w"]),
    (Unit::Pascal, &["pa", "p"]),
    (Unit::Joule, &["j"]),
    (Unit::Farad, &["f"]),
    (Unit::Ohm, &["ω"]),
    (Unit::Tesla, &["t"]),
    (Unit::Lumen, &["lm"]),
];

/// Symbol table built once for the process lifetime. First match wins on
/// collisions.
static SYMBOL_TABLE: Lazy<HashMap<&'static str, Unit>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for (unit, symbols) in SYMBOLS {
        for symbol in *symbols {
            table.entry(*symbol).or_insert(*unit);
        }
    }
    table
});

impl Unit {
    /// Look up a unit by its short symbol. Exact, case-sensitive match;
    /// unrecognized symbols resolve to `Unit::Unknown`.
    pub fn from_symbol(symbol: &str) -> Unit {
        SYMBOL_TABLE.get(symbol).copied().unwrap_or(Unit::Unknown)
    }

    /// Preferred short symbol for this unit.
    pub fn symbol(&self) -> &'static str {
        SYMBOLS
            .iter()
            .find(|(unit, _)| unit == self)
            .and_then(|(_, symbols)| symbols.first().copied())
            .unwrap_or("?")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_symbols_resolve() {
        assert_eq!(Unit::from_symbol("v"), Unit::Volt);
        assert_eq!(Unit::from_symbol("ft"), Unit::Foot);
        assert_eq!(Unit::from_symbol("psi"), Unit::Psi);
        assert_eq!(Unit::from_symbol("kip"), Unit::Kip);
    }

    #[test]
    fn test_unknown_symbol_is_not_an_error() {
        assert_eq!(Unit::from_symbol("furlong"), Unit::Unknown);
        assert_eq!(Unit::from_symbol(""), Unit::Unknown);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(Unit::from_symbol("V"), Unit::Unknown);
    }

    #[test]
    fn test_aliases_share_a_unit() {
        assert_eq!(Unit::from_symbol("sec"), Unit::Second);
        assert_eq!(Unit::from_symbol("s"), Unit::Second);
        assert_eq!(Unit::from_symbol("kg"), Unit::Kilogram);
        assert_eq!(Unit::from_symbol("k"), Unit::Kilogram);
    }

    #[test]
    fn test_display_uses_preferred_symbol() {
        assert_eq!(Unit::Volt.to_string(), "v");
        assert_eq!(Unit::Second.to_string(), "sec");
        assert_eq!(Unit::Unknown.to_string(), "?");
    }
}
