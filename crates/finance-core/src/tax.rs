//! Simples Nacional (Anexo III) tax projection and INSS.
//!
//! The revenue base for a new income is the trailing twelve months of gross
//! revenue plus the new income itself. The bracket containing that base sets
//! the nominal rate and deduction; the effective rate is
//! `(base * nominal - deduction) / base`.

use serde::{Deserialize, Serialize};

use crate::money::round2;

/// One row of the progressive table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bracket {
    /// 1-based bracket number.
    pub number: u8,
    /// Inclusive upper bound of trailing revenue for this bracket.
    pub upper_bound: f64,
    /// Nominal rate (0.06 = 6%).
    pub nominal_rate: f64,
    /// Amount deducted from `revenue * nominal_rate`.
    pub deduction: f64,
}

/// Anexo III brackets.
pub const BRACKETS: [Bracket; 6] = [
    Bracket {
        number: 1,
        upper_bound: 180_000.0,
        nominal_rate: 0.06,
        deduction: 0.0,
    },
    Bracket {
        number: 2,
        upper_bound: 360_000.0,
        nominal_rate: 0.112,
        deduction: 9_360.0,
    },
    Bracket {
        number: 3,
        upper_bound: 720_000.0,
        nominal_rate: 0.135,
        deduction: 17_640.0,
    },
    Bracket {
        number: 4,
        upper_bound: 1_800_000.0,
        nominal_rate: 0.16,
        deduction: 35_640.0,
    },
    Bracket {
        number: 5,
        upper_bound: 3_600_000.0,
        nominal_rate: 0.21,
        deduction: 125_640.0,
    },
    Bracket {
        number: 6,
        upper_bound: 4_800_000.0,
        nominal_rate: 0.33,
        deduction: 648_000.0,
    },
];

/// Ceiling of the whole regime.
pub const SIMPLES_LIMIT: f64 = 4_800_000.0;

/// The bracket containing `revenue`. Revenue above the regime limit stays in
/// the last bracket.
pub fn bracket_for(revenue: f64) -> &'static Bracket {
    BRACKETS
        .iter()
        .find(|b| revenue <= b.upper_bound)
        .unwrap_or(&BRACKETS[BRACKETS.len() - 1])
}

/// Effective rate for a revenue base. Zero revenue yields the first bracket's
/// nominal rate.
pub fn effective_rate(revenue: f64) -> f64 {
    if revenue <= 0.0 {
        return BRACKETS[0].nominal_rate;
    }
    let bracket = bracket_for(revenue);
    ((revenue * bracket.nominal_rate - bracket.deduction) / revenue).max(0.0)
}

/// INSS parameters read from settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InssConfig {
    /// Monthly pro-labore.
    pub pro_labore: f64,
    /// Contribution rate (0.11 = 11%).
    pub rate: f64,
    /// Contribution base ceiling.
    pub ceiling: f64,
}

impl Default for InssConfig {
    fn default() -> Self {
        Self {
            pro_labore: 1412.0,
            rate: 0.11,
            ceiling: 7786.02,
        }
    }
}

/// Monthly INSS on the capped pro-labore base.
pub fn inss(config: &InssConfig) -> f64 {
    round2(config.pro_labore.min(config.ceiling).max(0.0) * config.rate)
}

/// Raised when a new income moves revenue into a higher bracket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketWarning {
    pub from_bracket: u8,
    pub to_bracket: u8,
    /// Upper bound of the bracket that was left behind.
    pub threshold_crossed: f64,
    /// Upper bound of the bracket now occupied.
    pub next_threshold: f64,
    /// How far the new base is toward `next_threshold`, in percent.
    pub progress_percent: f64,
}

impl BracketWarning {
    /// User-facing message.
    pub fn message(&self) -> String {
        format!(
            "Esta receita move o faturamento da faixa {} para a faixa {} \
             ({:.1}% do limite da nova faixa).",
            self.from_bracket, self.to_bracket, self.progress_percent
        )
    }
}

/// Full result of a tax projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxCalculation {
    pub trailing_revenue: f64,
    pub new_income: f64,
    pub bracket: Bracket,
    pub nominal_rate: f64,
    pub effective_rate: f64,
    pub tax_amount: f64,
    pub net_amount: f64,
    pub inss_amount: f64,
    pub exceeds_simples_limit: bool,
    pub bracket_warning: Option<BracketWarning>,
}

/// Project the tax owed on `new_income` given `trailing_revenue`.
pub fn calculate(
    trailing_revenue: f64,
    new_income: f64,
    inss_config: &InssConfig,
) -> TaxCalculation {
    let trailing_revenue = trailing_revenue.max(0.0);
    let new_income = new_income.max(0.0);
    let base = trailing_revenue + new_income;

    let before = bracket_for(trailing_revenue);
    let after = *bracket_for(base);
    let rate = effective_rate(base);
    let tax_amount = round2(new_income * rate);

    let bracket_warning = (after.number > before.number).then(|| BracketWarning {
        from_bracket: before.number,
        to_bracket: after.number,
        threshold_crossed: before.upper_bound,
        next_threshold: after.upper_bound,
        progress_percent: round2(base / after.upper_bound * 100.0),
    });

    TaxCalculation {
        trailing_revenue,
        new_income,
        bracket: after,
        nominal_rate: after.nominal_rate,
        effective_rate: rate,
        tax_amount,
        net_amount: round2(new_income - tax_amount),
        inss_amount: inss(inss_config),
        exceeds_simples_limit: base > SIMPLES_LIMIT,
        bracket_warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bracket_boundaries_are_inclusive() {
        assert_eq!(bracket_for(0.0).number, 1);
        assert_eq!(bracket_for(180_000.0).number, 1);
        assert_eq!(bracket_for(180_000.01).number, 2);
        assert_eq!(bracket_for(360_000.0).number, 2);
        assert_eq!(bracket_for(720_000.0).number, 3);
        assert_eq!(bracket_for(1_800_000.0).number, 4);
        assert_eq!(bracket_for(3_600_000.0).number, 5);
        assert_eq!(bracket_for(4_800_000.0).number, 6);
        assert_eq!(bracket_for(9_000_000.0).number, 6);
    }

    #[test]
    fn test_effective_rate_at_exact_boundary() {
        // (360000 * 0.112 - 9360) / 360000
        assert!(approx(effective_rate(360_000.0), 0.086));
        assert!(approx(effective_rate(180_000.0), 0.06));
        // (720000 * 0.135 - 17640) / 720000
        assert!(approx(effective_rate(720_000.0), 0.1105));
    }

    #[test]
    fn test_effective_rate_zero_revenue() {
        assert!(approx(effective_rate(0.0), 0.06));
    }

    #[test]
    fn test_calculate_boundary_uses_boundary_bracket() {
        let calc = calculate(350_000.0, 10_000.0, &InssConfig::default());
        assert_eq!(calc.bracket.number, 2);
        assert!(approx(calc.effective_rate, 0.086));
        assert_eq!(calc.tax_amount, 860.0);
        assert_eq!(calc.net_amount, 9_140.0);
        assert!(calc.bracket_warning.is_none());
    }

    #[test]
    fn test_calculate_first_income() {
        let calc = calculate(0.0, 10_000.0, &InssConfig::default());
        assert_eq!(calc.bracket.number, 1);
        assert_eq!(calc.tax_amount, 600.0);
        assert!(calc.bracket_warning.is_none());
        assert!(!calc.exceeds_simples_limit);
    }

    #[test]
    fn test_bracket_warning_on_crossing() {
        let calc = calculate(175_000.0, 10_000.0, &InssConfig::default());
        let warning = calc.bracket_warning.expect("warning");
        assert_eq!(warning.from_bracket, 1);
        assert_eq!(warning.to_bracket, 2);
        assert_eq!(warning.threshold_crossed, 180_000.0);
        assert_eq!(warning.next_threshold, 360_000.0);
        assert_eq!(warning.progress_percent, 51.39);
        assert!(warning.message().contains("faixa 1 para a faixa 2"));
    }

    #[test]
    fn test_no_warning_when_landing_on_boundary() {
        let calc = calculate(170_000.0, 10_000.0, &InssConfig::default());
        assert_eq!(calc.bracket.number, 1);
        assert!(calc.bracket_warning.is_none());
    }

    #[test]
    fn test_exceeds_limit() {
        let calc = calculate(4_790_000.0, 20_000.0, &InssConfig::default());
        assert!(calc.exceeds_simples_limit);
        assert_eq!(calc.bracket.number, 6);
    }

    #[test]
    fn test_inss_capped() {
        let config = InssConfig {
            pro_labore: 10_000.0,
            rate: 0.11,
            ceiling: 7786.02,
        };
        assert_eq!(inss(&config), 856.46);

        let config = InssConfig {
            pro_labore: 1412.0,
            ..config
        };
        assert_eq!(inss(&config), 155.32);
    }
}
