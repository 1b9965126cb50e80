use anyhow::{Result, anyhow};
use regex::Regex;

/// A decoded scale line
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleReading {
    pub value: f64,
    pub unit: String,
    /// `false` when the scale flagged the sample as unstable (`US` prefix)
    pub stable: bool,
}

impl ScaleReading {
    /// Convert to grams according to the reported unit
    pub fn grams(&self) -> Result<f64> {
        let factor = match self.unit.to_lowercase().as_str() {
            "g" => 1.0,
            "kg" => 1000.0,
            "lb" | "lbs" => 453.592_37,
            "oz" => 28.349_523_125,
            other => return Err(anyhow!("Unsupported weight unit '{}'", other)),
        };
        Ok(self.value * factor)
    }
}

/// Parser for the ASCII weight lines sent by serial scales
///
/// Handles Mettler-Toledo style `ST,GS,  5.00kg`, CAS style `S  S  0.500 kg`
/// and bare `1.1g`. Comma decimals are accepted.
#[derive(Debug)]
pub struct ScaleParser {
    regex: Regex,
}

impl Default for ScaleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScaleParser {
    pub fn new() -> Self {
        // Optional sign, integer part, optional decimal part, optional exponent.
        // Not anchored: we search inside the line.
        let regex =
            Regex::new(r"([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)").expect("Invalid regex");
        Self { regex }
    }

    fn find_number_start(s: &str) -> Option<usize> {
        s.char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '+' || *c == '-' || *c == '.')
            .map(|(i, _)| i)
    }

    pub fn parse(&self, raw_value: &str) -> Result<ScaleReading> {
        let s = raw_value.trim().replace('\u{00A0}', "");
        if s.is_empty() {
            return Err(anyhow!("Empty input"));
        }

        let stable = !s.starts_with("US");

        // Skip prefixes (ST,GS, ...)
        let start = Self::find_number_start(&s).ok_or_else(|| anyhow!("No numeric value found"))?;

        let rest = s[start..].trim().replace(',', ".").replace(' ', "");

        let number = self
            .regex
            .captures(&rest)
            .and_then(|c| c.get(1))
            .ok_or_else(|| anyhow!("No numeric value found"))?;

        let num_str = number.as_str();
        let unit_str = rest[number.end()..].trim();

        let value: f64 = num_str
            .parse()
            .map_err(|_| anyhow!("Invalid number format: '{}'", num_str))?;

        if unit_str.is_empty() {
            return Err(anyhow!("No unit found"));
        }

        Ok(ScaleReading {
            value,
            unit: unit_str.to_string(),
            stable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilograms_to_grams() {
        let reading = ScaleReading {
            value: 1.25,
            unit: "kg".into(),
            stable: true,
        };
        assert_eq!(reading.grams().unwrap(), 1250.0);
    }

    #[test]
    fn test_pounds_to_grams() {
        let reading = ScaleReading {
            value: 2.0,
            unit: "LB".into(),
            stable: true,
        };
        assert!((reading.grams().unwrap() - 907.18474).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_unit() {
        let reading = ScaleReading {
            value: 2.0,
            unit: "ct".into(),
            stable: true,
        };
        assert!(reading.grams().is_err());
    }
}
