//! Weighted nonlinear gain models producing the lab outputs.
//!
//! Each contributing variable is clamped to its range, normalized to
//! `[0, 1]` and passed through one curve family. The weighted sum is scaled
//! into the lab output's range.

use millgen_traits::NoiseSource;
use tracing::debug;

use crate::dataset::Dataset;
use crate::dynamics::FilterBank;
use crate::error::{GenError, Stage};
use crate::model::{CurveModel, GainTerm, ModelConfig};
use crate::noise::perturb;
use crate::util::FIRST_DATA_ROW;

/// Asymptote normalized into `[0, 1]`; blank means mid-range.
pub fn normalized_asymptote(asymptote: Option<f64>, min: f64, max: f64) -> f64 {
    match asymptote {
        None => 0.5,
        Some(a) if a > max => 1.0,
        Some(a) if a < min => 0.0,
        Some(a) => (a - min) / (max - min),
    }
}

/// Quadratic coefficients `(g2, g1, g0)` for the polynomial family.
pub fn polynomial_coefficients(
    order: f64,
    shape: f64,
    direction: f64,
    asym: f64,
) -> (f64, f64, f64) {
    if order != 2.0 {
        return if direction == 0.0 {
            (0.0, -1.0, 1.0)
        } else {
            (0.0, 1.0, 0.0)
        };
    }
    match (shape, direction == 0.0) {
        (s, true) if s == 0.0 => (1.0, -2.0, 1.0),
        (s, false) if s == 0.0 => (-1.0, 2.0, 0.0),
        (s, true) if s == 1.0 => (-0.5, -0.5, 1.0),
        (s, false) if s == 1.0 => (0.5, 0.5, 0.0),
        _ => {
            let g2 = 2.0 * (0.5 - direction) / (0.5 + (0.5 - asym).abs()).powi(2);
            let g1 = -2.0 * g2 * asym;
            let g0 = g2 * asym.powi(2) + direction;
            (g2, g1, g0)
        }
    }
}

/// Exponential family: `dir - (2dir - 1)(e^(k·s·(x - a)^n) - 1) / (e^(k·s) - 1)`.
pub fn exponential(x: f64, asym: f64, order: f64, slope: f64, shape: f64, direction: f64) -> f64 {
    let flip = |d: f64| if d == 0.0 { 1.0 } else { 0.0 };
    let (asym, sign, dir) = if order == 1.0 {
        let sign = if shape == 0.0 { -1.0 } else { 1.0 };
        (0.0, sign, flip(direction))
    } else if shape == 0.0 {
        (0.0, -1.0, flip(direction))
    } else if shape == 1.0 {
        (1.0, -1.0, 1.0 - flip(direction))
    } else {
        (asym, -1.0, direction)
    };
    let numerator = (slope * sign * (x - asym).powf(order)).exp() - 1.0;
    let denominator = (slope * sign).exp() - 1.0;
    dir - (2.0 * dir - 1.0) * (numerator / denominator)
}

/// Sigmoid family: `1 - (dir - (2dir - 1) / (1 + e^(-k(x - a))))`.
pub fn sigmoid(x: f64, asym: f64, slope: f64, direction: f64) -> f64 {
    let denominator = 1.0 + (-slope * (x - asym)).exp();
    1.0 - (direction - (2.0 * direction - 1.0) / denominator)
}

/// Curve value of one gain term for a raw `value` in `[min, max]` units.
pub fn curve(term: &GainTerm, value: f64, min: f64, max: f64) -> f64 {
    let x = (value.clamp(min, max) - min) / (max - min);
    let asym = normalized_asymptote(term.asymptote, min, max);
    match term.model {
        CurveModel::Polynomial => {
            let (g2, g1, g0) =
                polynomial_coefficients(term.order, term.shape, term.direction, asym);
            g2 * x * x + g1 * x + g0
        }
        CurveModel::Exponential => {
            exponential(x, asym, term.order, term.slope, term.shape, term.direction)
        }
        CurveModel::Sigmoid => sigmoid(x, asym, term.slope, term.direction),
    }
}

/// A gain term resolved against the dataset.
#[derive(Debug, Clone, Copy)]
struct Source<'a> {
    term: &'a GainTerm,
    col: usize,
    min: f64,
    max: f64,
}

fn resolve<'a>(ds: &Dataset, model: &'a ModelConfig) -> Result<Vec<Vec<Source<'a>>>, GenError> {
    let layout = ds.layout();
    let mut out = Vec::with_capacity(model.gains.len());
    for spec in &model.gains {
        let context = format!("gain spec '{}'", spec.lab);
        let mut sources = Vec::with_capacity(spec.terms.len());
        for term in &spec.terms {
            let (min, max) = if let Some(v) = model.inputs.get(&term.variable) {
                (v.min, v.max)
            } else {
                let v = model.state.require(&term.variable, &context)?;
                (v.min, v.max)
            };
            let col = layout.require(&term.variable, &context)?;
            sources.push(Source { term, col, min, max });
        }
        out.push(sources);
    }
    Ok(out)
}

/// Fill every lab output column on lab-cadence rows.
///
/// The filter for every referenced column advances on every row past
/// `dyn_row`, whether or not a lab value is due.
pub fn evaluate_labs(
    ds: &mut Dataset,
    model: &ModelConfig,
    dyn_row: usize,
    rng: &mut dyn NoiseSource,
) -> Result<(), GenError> {
    let specs = resolve(ds, model)?;
    let mut filtered: Vec<usize> = specs.iter().flatten().map(|s| s.col).collect();
    filtered.sort_unstable();
    filtered.dedup();

    let lab_rows = model.process.lab_rows();
    let mut bank = FilterBank::new(dyn_row, Stage::Gain);
    let mut samples = 0usize;
    for row in FIRST_DATA_ROW..=ds.final_row() {
        if row > dyn_row {
            for &col in &filtered {
                bank.apply(ds, model, row, col)?;
            }
        }
        if (row - FIRST_DATA_ROW) % lab_rows != 0 {
            continue;
        }
        for (i, (lab, sources)) in model.labs.iter().zip(&specs).enumerate() {
            let mut weighted = 0.0;
            for s in sources {
                let value = if row > dyn_row {
                    bank.output(s.col).ok_or_else(|| GenError::MissingValue {
                        stage: Stage::Gain,
                        row,
                        variable: s.term.variable.clone(),
                    })?
                } else {
                    ds.value(Stage::Gain, row, s.col)?
                };
                weighted += curve(s.term, value, s.min, s.max) * s.term.weight / 100.0;
            }
            let noise = perturb(rng, lab.noise);
            let col = ds.layout().lab_col(i);
            ds.set(row, col, Some(lab.min + (lab.max - lab.min) * weighted + noise));
        }
        samples += 1;
    }
    debug!(samples, lab_rows, "lab outputs evaluated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn term(model: CurveModel, order: f64, shape: f64, direction: f64) -> GainTerm {
        GainTerm {
            variable: "MV_A".into(),
            weight: 100.0,
            asymptote: None,
            order,
            slope: 1.0,
            model,
            direction,
            shape,
        }
    }

    #[rstest]
    #[case(Some(10.0), 1.0)]
    #[case(Some(0.0), 0.0)]
    #[case(Some(12.0), 1.0)]
    #[case(Some(-3.0), 0.0)]
    #[case(Some(2.5), 0.25)]
    #[case(None, 0.5)]
    fn asymptote_normalization(#[case] asym: Option<f64>, #[case] expected: f64) {
        assert_eq!(normalized_asymptote(asym, 0.0, 10.0), expected);
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(5.0, 0.25)]
    #[case(10.0, 0.0)]
    fn polynomial_order_two_shape_zero_is_x_minus_one_squared(
        #[case] v: f64,
        #[case] expected: f64,
    ) {
        let t = term(CurveModel::Polynomial, 2.0, 0.0, 0.0);
        assert!((curve(&t, v, 0.0, 10.0) - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(0.0, (0.0, -1.0, 1.0))]
    #[case(1.0, (0.0, 1.0, 0.0))]
    fn linear_polynomials(#[case] direction: f64, #[case] g: (f64, f64, f64)) {
        assert_eq!(polynomial_coefficients(1.0, 0.0, direction, 0.5), g);
        assert_eq!(polynomial_coefficients(1.0, 3.0, direction, 0.9), g);
    }

    #[test]
    fn general_quadratic_peaks_at_asymptote() {
        // direction 1: inverted parabola reaching 1 at the asymptote
        let (g2, g1, g0) = polynomial_coefficients(2.0, 2.0, 1.0, 0.3);
        let at = |x: f64| g2 * x * x + g1 * x + g0;
        assert!((at(0.3) - 1.0).abs() < 1e-12);
        assert!(at(0.0) < 1.0 && at(1.0) < 1.0);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let t = term(CurveModel::Polynomial, 1.0, 0.0, 1.0);
        assert_eq!(curve(&t, 50.0, 0.0, 10.0), 1.0);
        assert_eq!(curve(&t, -50.0, 0.0, 10.0), 0.0);
    }

    #[rstest]
    #[case(1.0, 0.0, 0.0)]
    #[case(1.0, 1.0, 1.0)]
    #[case(2.0, 0.0, 0.0)]
    #[case(2.0, 1.0, 1.0)]
    fn exponential_spans_unit_interval(
        #[case] order: f64,
        #[case] shape: f64,
        #[case] direction: f64,
    ) {
        let t = term(CurveModel::Exponential, order, shape, direction);
        let lo = curve(&t, 0.0, 0.0, 10.0);
        let hi = curve(&t, 10.0, 0.0, 10.0);
        let mut ends = [lo, hi];
        ends.sort_by(f64::total_cmp);
        assert!(ends[0].abs() < 1e-12, "{ends:?}");
        assert!((ends[1] - 1.0).abs() < 1e-12, "{ends:?}");
    }

    #[test]
    fn exponential_order_one_direction_zero_falls() {
        let t = term(CurveModel::Exponential, 1.0, 0.0, 0.0);
        assert!((curve(&t, 0.0, 0.0, 1.0) - 1.0).abs() < 1e-12);
        assert!(curve(&t, 1.0, 0.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn sigmoid_is_half_at_asymptote() {
        let mut t = term(CurveModel::Sigmoid, 1.0, 0.0, 1.0);
        t.slope = 8.0;
        assert!((curve(&t, 5.0, 0.0, 10.0) - 0.5).abs() < 1e-12);
        // direction 1 rises
        assert!(curve(&t, 9.0, 0.0, 10.0) > 0.9);
        t.direction = 0.0;
        assert!(curve(&t, 9.0, 0.0, 10.0) < 0.1);
    }
}
