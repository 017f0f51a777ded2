use retort_flowsheet::{
    Flowsheet, FlowsheetError, ParallelReaction, ReactionError, UnitId, units::Fermentor,
};
use tracing::debug;

use crate::SpecError;

/// Upper bound on the summed conversion of one substrate.
pub const CONVERSION_CAP: f64 = 1.0 - 1e-6;

const MICRO: f64 = 1e6;
const CAP_MICRO: i64 = 999_999;

/// Reactions of one substrate that a yield specification rewrites.
///
/// `product` receives the yield, `dependent` gives way first when the sum
/// would exceed [`CONVERSION_CAP`], and `fixed` gives way only once
/// `dependent` is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionGroup {
    pub product: usize,
    pub dependent: usize,
    pub fixed: usize,
}

/// A reactor (such as a seed train) whose conversions track the main
/// fermentor scaled by `ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Follower {
    pub unit: UnitId,
    pub ratio: f64,
}

/// Rewritten conversions of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversions {
    pub product: f64,
    pub dependent: f64,
    pub fixed: f64,
}

/// Sets the product conversion to `y` and shrinks the other conversions so
/// the group sums to at most [`CONVERSION_CAP`].
///
/// Arithmetic is done on whole millionths so the result never exceeds the
/// cap through floating-point residue; shrunk values are rounded down.
#[must_use]
pub fn renormalize(y: f64, base_dependent: f64, base_fixed: f64) -> Conversions {
    let product = to_micro(y).clamp(0, CAP_MICRO);
    let mut fixed = to_micro(base_fixed).max(0);
    let mut dependent = to_micro(base_dependent).min(CAP_MICRO - product - fixed);
    if dependent < 0 {
        dependent = 0;
        fixed = fixed.min(CAP_MICRO - product).max(0);
    }
    Conversions {
        product: from_micro(product),
        dependent: from_micro(dependent),
        fixed: from_micro(fixed),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_micro(value: f64) -> i64 {
    (value * MICRO).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn from_micro(value: i64) -> f64 {
    value as f64 / MICRO
}

/// Yield specification on a fermentor's parallel reaction set.
///
/// The base conversions of the dependent and fixed reactions are captured
/// when the specification is built, so every load starts from the same
/// selectivities regardless of earlier loads.
#[derive(Debug, Clone)]
pub struct YieldSpecification {
    fermentor: UnitId,
    groups: Vec<(ReactionGroup, [f64; 2])>,
    followers: Vec<(Follower, Vec<f64>)>,
}

impl YieldSpecification {
    /// Captures base conversions from the fermentor and its followers.
    ///
    /// # Errors
    ///
    /// Returns an error if a unit is not a [`Fermentor`] or a group refers
    /// to a reaction index out of range.
    pub fn new(
        flowsheet: &Flowsheet,
        fermentor: UnitId,
        groups: Vec<ReactionGroup>,
        followers: Vec<Follower>,
    ) -> Result<Self, SpecError> {
        let reactions = &flowsheet.unit::<Fermentor>(fermentor)?.reactions;
        let groups = groups
            .into_iter()
            .map(|group| {
                reactions.conversion(group.product)?;
                let base = [
                    reactions.conversion(group.dependent)?,
                    reactions.conversion(group.fixed)?,
                ];
                Ok((group, base))
            })
            .collect::<Result<Vec<_>, ReactionError>>()
            .map_err(FlowsheetError::from)?;

        let followers = followers
            .into_iter()
            .map(|follower| {
                let fixed = flowsheet.unit::<Fermentor>(follower.unit)?.reactions.conversions();
                Ok((follower, fixed.to_vec()))
            })
            .collect::<Result<Vec<_>, SpecError>>()?;

        Ok(Self {
            fermentor,
            groups,
            followers,
        })
    }

    #[must_use]
    pub fn fermentor(&self) -> UnitId {
        self.fermentor
    }

    /// Loads yield `y` into every group of the fermentor and its followers.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidValue`] if `y` lies outside
    /// `[0, CONVERSION_CAP]`, or a flowsheet error if a reaction rejects
    /// its new conversion.
    pub fn apply(&self, flowsheet: &mut Flowsheet, y: f64) -> Result<(), SpecError> {
        if !(0.0..=CONVERSION_CAP).contains(&y) {
            return Err(SpecError::InvalidValue {
                spec: "yield".to_owned(),
                value: y,
                reason: "yield must lie in [0, 1 - 1e-6]",
            });
        }

        let mut main = Vec::with_capacity(self.groups.len());
        let reactions = &mut flowsheet.unit_mut::<Fermentor>(self.fermentor)?.reactions;
        for &(group, [dependent, fixed]) in &self.groups {
            let x = renormalize(y, dependent, fixed);
            set_group(reactions, group, x)?;
            debug!(?group, ?x, "yield loaded");
            main.push((group, x));
        }

        for (follower, base) in &self.followers {
            let reactions = &mut flowsheet.unit_mut::<Fermentor>(follower.unit)?.reactions;
            for &(group, x) in &main {
                let fixed = base.get(group.fixed).copied().unwrap_or_default();
                let scaled = renormalize(
                    x.product * follower.ratio,
                    x.dependent * follower.ratio,
                    fixed,
                );
                set_group(reactions, group, scaled)?;
            }
        }
        Ok(())
    }
}

fn set_group(
    reactions: &mut ParallelReaction,
    group: ReactionGroup,
    x: Conversions,
) -> Result<(), FlowsheetError> {
    reactions.set_conversion(group.product, x.product)?;
    reactions.set_conversion(group.dependent, x.dependent)?;
    reactions.set_conversion(group.fixed, x.fixed)?;
    Ok(())
}
