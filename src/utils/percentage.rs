use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value.min(100.)))
        }
    }

    /// Share of `part` in `whole`. Empty wholes give 0%.
    pub fn share(part: f64, whole: f64) -> Percentage {
        if whole <= 0. {
            return Percentage(0.);
        }
        Percentage::new_opt(part / whole * 100.).unwrap_or(Percentage(0.))
    }

    /// Renders the percentage as a bar of `width` cells.
    pub fn bar(&self, width: usize) -> String {
        let filled = ((self.0 / 100.) * width as f64).round() as usize;
        let filled = filled.min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::Percentage;

    #[test]
    fn test_share() {
        assert_eq!(*Percentage::share(30., 120.), 25.);
        assert_eq!(*Percentage::share(5., 0.), 0.);
    }

    #[test]
    fn test_rejects_negative() {
        assert!(Percentage::new_opt(-1.).is_none());
        assert_eq!(Percentage::new_opt(150.).map(|v| *v), Some(100.));
    }

    #[test]
    fn test_bar() {
        let p = Percentage::new_opt(50.).unwrap();
        assert_eq!(p.bar(4), "██░░");
        assert_eq!(p.to_string(), "50.0%");
    }
}
