//! WMO weather interpretation codes as reported by Open-Meteo.

use crate::model::Intensity;

/// Codes that mean precipitation is falling right now (rain, snow, hail).
pub const RAIN_CODES: &[u16] = &[
    51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 80, 81, 82, 95, 96, 99,
];

/// Description and intensity for a weather code. Unknown codes count as dry.
pub fn describe(code: u16) -> (&'static str, Intensity) {
    use Intensity::*;

    match code {
        0 => ("Clear sky", Dry),
        1 => ("Mainly clear", Dry),
        2 => ("Partly cloudy", Dry),
        3 => ("Overcast", Dry),
        45 => ("Fog", Dry),
        51 => ("Drizzle (light)", Slight),
        53 => ("Drizzle (moderate)", Moderate),
        55 => ("Drizzle (dense)", Heavy),
        56 => ("Freezing drizzle (light)", Slight),
        57 => ("Freezing drizzle (dense)", Heavy),
        61 => ("Rain (slight)", Moderate),
        63 => ("Rain (moderate)", Heavy),
        65 => ("Rain (heavy)", VeryHeavy),
        66 => ("Freezing rain (slight)", Moderate),
        67 => ("Freezing rain (heavy)", VeryHeavy),
        71 => ("Snow fall (slight)", Moderate),
        73 => ("Snow fall (moderate)", Heavy),
        75 => ("Snow fall (heavy)", VeryHeavy),
        80 => ("Rain showers (slight)", Moderate),
        81 => ("Rain showers (moderate)", Heavy),
        82 => ("Rain showers (violent)", VeryHeavy),
        95 => ("Thunderstorm (slight or moderate)", Heavy),
        96 => ("Thunderstorm with slight hail", Moderate),
        99 => ("Thunderstorm with heavy hail", VeryHeavy),
        _ => ("Unknown", Dry),
    }
}

pub fn is_rain(code: u16) -> bool {
    RAIN_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_are_dry() {
        assert_eq!(describe(48), ("Unknown", Intensity::Dry));
        assert_eq!(describe(1000), ("Unknown", Intensity::Dry));
    }

    #[test]
    fn every_rain_code_has_wet_intensity() {
        for &code in RAIN_CODES {
            let (description, intensity) = describe(code);
            assert_ne!(description, "Unknown", "code {code}");
            assert!(!intensity.is_dry(), "code {code}");
        }
    }

    #[test]
    fn fog_and_overcast_are_not_rain() {
        assert!(!is_rain(3));
        assert!(!is_rain(45));
        assert!(is_rain(61));
    }
}
