//! Askama filters. Route modules import this module as `filters` so the
//! templates can write `{{ value|brl }}`.

use finance_core::money::{format_brl, format_percent};

/// Anything a template can hand to a money filter.
pub trait Amount {
    fn amount(&self) -> f64;
}

impl Amount for f64 {
    fn amount(&self) -> f64 {
        *self
    }
}

impl<T: Amount + ?Sized> Amount for &T {
    fn amount(&self) -> f64 {
        (**self).amount()
    }
}

/// `1234.5` → `R$ 1.234,50`.
pub fn brl<T: Amount>(value: T) -> askama::Result<String> {
    Ok(format_brl(value.amount()))
}

/// `0.065` → `6,50%`.
pub fn percent<T: Amount>(value: T) -> askama::Result<String> {
    Ok(format_percent(value.amount()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_accept_references() {
        let value = 1234.5;
        assert_eq!(brl(&value).unwrap(), format_brl(1234.5));
        assert_eq!(brl(&&value).unwrap(), format_brl(1234.5));
        assert_eq!(percent(&0.06).unwrap(), format_percent(0.06));
    }
}
