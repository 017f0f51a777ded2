use retort_flowsheet::ConvergenceConfig;
use retort_solvers::equation::{bracket_search, iq_interpolation};
use serde::Deserialize;

use crate::SpecError;

/// Solver tunables shared by every specification of a flowsheet.
///
/// ```toml
/// [bracket]
/// step = 0.05
///
/// [root]
/// max_iters = 50
///
/// [convergence]
/// molar_tol = 0.01
/// method = "wegstein"
/// ```
///
/// Omitted tables and keys keep their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bracket: bracket_search::Config,
    pub root: iq_interpolation::Config,
    pub convergence: ConvergenceConfig,
}

impl Settings {
    /// Parses and validates settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Settings`] if the TOML is malformed, or a
    /// settings error if a tolerance is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, SpecError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the solver configurations.
    ///
    /// # Errors
    ///
    /// Returns the first invalid solver configuration.
    pub fn validate(&self) -> Result<(), SpecError> {
        self.bracket.validate()?;
        self.root.validate()?;
        if !(self.convergence.molar_tol.is_finite() && self.convergence.molar_tol > 0.0) {
            return Err(SpecError::InvalidValue {
                spec: "convergence".to_owned(),
                value: self.convergence.molar_tol,
                reason: "molar_tol must be finite and positive",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use retort_flowsheet::Method;

    #[test]
    fn empty_text_gives_defaults() {
        let settings = Settings::from_toml_str("").expect("valid");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.root.max_iters, 100);
        assert_eq!(settings.convergence.max_iters, 1500);
    }

    #[test]
    fn partial_tables_override_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [bracket]
            step = 0.05

            [convergence]
            molar_tol = 0.01
            method = "wegstein"
            "#,
        )
        .expect("valid");

        assert_eq!(settings.bracket.step, 0.05);
        assert_eq!(settings.bracket.probe, 1e-6);
        assert_eq!(settings.convergence.molar_tol, 0.01);
        assert_eq!(settings.convergence.method, Method::Wegstein);
    }

    #[test]
    fn rejects_invalid_tolerances() {
        let result = Settings::from_toml_str("[root]\nresidual_tol = -1.0\n");
        assert!(matches!(result, Err(SpecError::RootSettings(_))));

        let result = Settings::from_toml_str("[bracket]\nstep = 0.0\n");
        assert!(matches!(result, Err(SpecError::BracketSettings(_))));
    }

    #[test]
    fn rejects_unknown_tables() {
        let result = Settings::from_toml_str("[solver]\nstep = 0.1\n");
        assert!(matches!(result, Err(SpecError::Settings(_))));
    }
}
