use thiserror::Error;

/// Errors that can occur when creating a [`Bracket`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BracketError {
    /// One or more endpoints or residuals are non-finite.
    #[error("non-finite endpoint(s)")]
    NonFinite,
    /// Endpoints are equal, giving zero width.
    #[error("zero width")]
    ZeroWidth,
    /// Residual signs do not bracket a root.
    #[error("no sign change")]
    NoSignChange,
}

/// The sign of a residual for bracket logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Residual is positive (or zero).
    Positive,
    /// Residual is negative.
    Negative,
}

impl Sign {
    /// Returns the sign of a residual value.
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value >= 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }
}

/// A validated interval whose endpoint residuals have opposite signs.
///
/// Endpoints are stored in ascending `x` order together with the residual
/// observed at each one, so interpolating solvers can use the values and not
/// only the signs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    left: f64,
    right: f64,
    left_residual: f64,
    right_residual: f64,
}

impl Bracket {
    /// Creates a bracket from two evaluated points.
    ///
    /// The points may be given in either order.
    ///
    /// # Errors
    ///
    /// Returns a [`BracketError`] if any value is non-finite, the endpoints
    /// coincide, or the residuals share a sign.
    pub fn new(x: [f64; 2], residuals: [f64; 2]) -> Result<Self, BracketError> {
        let [x0, x1] = x;
        let [y0, y1] = residuals;

        if ![x0, x1, y0, y1].iter().all(|v| v.is_finite()) {
            return Err(BracketError::NonFinite);
        }

        #[allow(clippy::float_cmp)]
        if x0 == x1 {
            return Err(BracketError::ZeroWidth);
        }

        if Sign::of(y0) == Sign::of(y1) {
            return Err(BracketError::NoSignChange);
        }

        if x0 < x1 {
            Ok(Self {
                left: x0,
                right: x1,
                left_residual: y0,
                right_residual: y1,
            })
        } else {
            Ok(Self {
                left: x1,
                right: x0,
                left_residual: y1,
                right_residual: y0,
            })
        }
    }

    /// Returns the bracket bounds as an array.
    #[must_use]
    pub fn as_array(&self) -> [f64; 2] {
        [self.left, self.right]
    }

    /// Returns the residuals at the left and right bounds.
    #[must_use]
    pub fn residuals(&self) -> [f64; 2] {
        [self.left_residual, self.right_residual]
    }

    /// Returns the midpoint of the bracket.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.left + self.right)
    }

    /// Returns the bracket width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Returns true if `x` lies strictly between the bounds.
    #[must_use]
    pub fn contains_strictly(&self, x: f64) -> bool {
        x > self.left && x < self.right
    }

    /// Returns true if the bracket width satisfies the x tolerances.
    #[must_use]
    pub fn is_x_converged(&self, x_abs_tol: f64, x_rel_tol: f64) -> bool {
        self.width() <= x_abs_tol + x_rel_tol * self.midpoint().abs()
    }

    /// Returns the false-position estimate of the root.
    #[must_use]
    pub fn false_position(&self) -> f64 {
        let dy = self.right_residual - self.left_residual;
        self.left - self.left_residual * self.width() / dy
    }

    /// Shrinks the bracket by replacing the endpoint whose residual has the
    /// same sign as `residual`.
    ///
    /// Returns the replaced point as `(x, residual)`.
    pub(crate) fn shrink(&mut self, x: f64, residual: f64) -> (f64, f64) {
        if Sign::of(self.left_residual) == Sign::of(residual) {
            let old = (self.left, self.left_residual);
            self.left = x;
            self.left_residual = residual;
            old
        } else {
            let old = (self.right, self.right_residual);
            self.right = x;
            self.right_residual = residual;
            old
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn reorders_points() {
        let bracket = Bracket::new([3.0, 1.0], [-2.0, 4.0]).expect("valid bracket");
        assert_eq!(bracket.as_array(), [1.0, 3.0]);
        assert_eq!(bracket.residuals(), [4.0, -2.0]);
    }

    #[test]
    fn rejects_non_finite() {
        assert_eq!(
            Bracket::new([f64::NAN, 1.0], [1.0, -1.0]),
            Err(BracketError::NonFinite)
        );
        assert_eq!(
            Bracket::new([0.0, 1.0], [1.0, f64::NEG_INFINITY]),
            Err(BracketError::NonFinite)
        );
    }

    #[test]
    fn rejects_zero_width() {
        assert_eq!(
            Bracket::new([2.0, 2.0], [1.0, -1.0]),
            Err(BracketError::ZeroWidth)
        );
    }

    #[test]
    fn rejects_no_sign_change() {
        assert_eq!(
            Bracket::new([0.0, 1.0], [1.0, 2.0]),
            Err(BracketError::NoSignChange)
        );
    }

    #[test]
    fn false_position_of_linear_residual_is_exact() {
        // y = 2 - x on [0, 4], root at 2.
        let bracket = Bracket::new([0.0, 4.0], [2.0, -2.0]).expect("valid bracket");
        assert_relative_eq!(bracket.false_position(), 2.0);
    }

    #[test]
    fn shrink_replaces_same_sign_endpoint() {
        let mut bracket = Bracket::new([0.0, 2.0], [-1.0, 1.0]).expect("valid bracket");

        let replaced = bracket.shrink(1.0, -0.25);
        assert_eq!(replaced, (0.0, -1.0));
        assert_eq!(bracket.as_array(), [1.0, 2.0]);

        let replaced = bracket.shrink(1.5, 0.5);
        assert_eq!(replaced, (2.0, 1.0));
        assert_eq!(bracket.as_array(), [1.0, 1.5]);
        assert_eq!(bracket.residuals(), [-0.25, 0.5]);
    }
}
