//! Scheduled UPB trajectories for a batch of fixed-payment loans

use super::schedule::UpbMatrix;
use crate::error::{PipelineError, Result};
use rayon::prelude::*;

/// Balance recorded for ages at or beyond a loan's term
pub const MATURED_SENTINEL: f64 = -999.0;

/// Monthly rates for a batch, one entry per loan
#[derive(Debug, Clone, Copy)]
pub enum MonthlyRates<'a> {
    /// One rate per loan for its whole life
    Fixed(&'a [f64]),
    /// One rate per period per loan. `path[k]` is the rate accruing between
    /// age `k` and `k + 1`; the last rate carries forward past the end.
    Path(&'a [Vec<f64>]),
}

impl<'a> MonthlyRates<'a> {
    pub fn len(&self) -> usize {
        match self {
            MonthlyRates::Fixed(rates) => rates.len(),
            MonthlyRates::Path(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rate used to level the payment
    fn origination(&self, loan: usize) -> f64 {
        match self {
            MonthlyRates::Fixed(rates) => rates[loan],
            MonthlyRates::Path(paths) => paths[loan].first().copied().unwrap_or(f64::NAN),
        }
    }

    /// Rate accruing in the step that ends at `age` (age >= 1)
    fn for_step(&self, loan: usize, age: u32) -> f64 {
        match self {
            MonthlyRates::Fixed(rates) => rates[loan],
            MonthlyRates::Path(paths) => {
                let path = &paths[loan];
                let idx = (age as usize).saturating_sub(1).min(path.len().saturating_sub(1));
                path[idx]
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let bad = |index: usize, rate: f64| PipelineError::InvalidRate { index, rate };
        match self {
            MonthlyRates::Fixed(rates) => {
                for (index, &rate) in rates.iter().enumerate() {
                    if !(rate > 0.0 && rate.is_finite()) {
                        return Err(bad(index, rate));
                    }
                }
            }
            MonthlyRates::Path(paths) => {
                for (index, path) in paths.iter().enumerate() {
                    if path.is_empty() {
                        return Err(bad(index, f64::NAN));
                    }
                    if let Some(&rate) = path.iter().find(|r| !(**r > 0.0 && r.is_finite())) {
                        return Err(bad(index, rate));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Level monthly payment that retires `principal` over `term` months
pub fn monthly_payment(principal: f64, monthly_rate: f64, term: u32) -> f64 {
    principal * monthly_rate / (1.0 - (1.0 + monthly_rate).powi(-(term as i32)))
}

/// Compute scheduled balances for every loan over ages `start_period..end_period`.
///
/// The window holds `min(max(terms), max(1, end_period - start_period))`
/// columns; column `k` is the balance at age `start_period + k`. Balances at
/// or beyond a loan's term are `MATURED_SENTINEL`. Loans are processed in
/// parallel; each loan's recurrence runs sequentially across ages.
pub fn compute_amortization(
    principals: &[f64],
    monthly_rates: MonthlyRates<'_>,
    terms: &[u32],
    start_period: u32,
    end_period: u32,
) -> Result<UpbMatrix> {
    let n = principals.len();
    if monthly_rates.len() != n {
        return Err(PipelineError::ShapeMismatch {
            what: "monthly_rates",
            expected: n,
            actual: monthly_rates.len(),
        });
    }
    if terms.len() != n {
        return Err(PipelineError::ShapeMismatch {
            what: "terms",
            expected: n,
            actual: terms.len(),
        });
    }
    if let Some(index) = terms.iter().position(|&t| t == 0) {
        return Err(PipelineError::InvalidTerm { index, term: 0 });
    }
    monthly_rates.validate()?;

    let Some(&max_term) = terms.iter().max() else {
        return Ok(UpbMatrix::empty(start_period));
    };
    let ages = max_term.min(end_period.saturating_sub(start_period).max(1)) as usize;

    let mut values = vec![0.0; n * ages];
    values
        .par_chunks_mut(ages)
        .enumerate()
        .for_each(|(loan, row)| {
            let term = terms[loan];
            let payment = monthly_payment(principals[loan], monthly_rates.origination(loan), term);

            let mut upb = principals[loan];
            for age in 1..=start_period {
                upb -= payment - upb * monthly_rates.for_step(loan, age);
            }

            for (k, cell) in row.iter_mut().enumerate() {
                let age = start_period + k as u32;
                if k > 0 {
                    upb -= payment - upb * monthly_rates.for_step(loan, age);
                }
                *cell = if age >= term { MATURED_SENTINEL } else { upb };
            }
        });

    log::debug!(
        "amortized {} loans over ages {}..{}",
        n,
        start_period,
        start_period as usize + ages
    );

    Ok(UpbMatrix::new(start_period, n, ages, values))
}
