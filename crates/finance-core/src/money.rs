//! Cent rounding and BRL formatting.

/// Round a value to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tolerance used when comparing money totals.
pub const CENT_EPSILON: f64 = 0.005;

/// Format an amount the Brazilian way: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let int_part = (cents / 100).to_string();
    let dec_part = cents % 100;

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, dec_part)
}

/// Format a ratio (0.0865) as a percentage string (`8,65%`).
pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(-2.346), -2.35);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(12.5), "R$ 12,50");
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(4_800_000.0), "R$ 4.800.000,00");
        assert_eq!(format_brl(-99.9), "-R$ 99,90");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.086), "8,60%");
        assert_eq!(format_percent(1.0), "100,00%");
    }
}
