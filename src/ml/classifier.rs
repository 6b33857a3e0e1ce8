use crate::error::{AppError, Result};
use crate::ml::models::{ClassWeight, FitSummary, RegressionParams};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec};

/// Multinomial logistic regression over sparse features
///
/// Minimises the (optionally class-weighted) mean cross-entropy plus an L2
/// penalty of `1 / (2 C)` on the coefficients; the intercept is not
/// penalised. Optimised with Nesterov-accelerated gradient descent and
/// gradient-based restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    /// Solver configuration
    params: RegressionParams,

    /// Coefficients (n_classes × n_features)
    coefficients: Array2<f64>,

    /// Intercept per class
    intercept: Array1<f64>,

    /// Is trained
    trained: bool,
}

impl SoftmaxRegression {
    pub fn new(params: RegressionParams) -> Self {
        Self {
            params,
            coefficients: Array2::zeros((0, 0)),
            intercept: Array1::zeros(0),
            trained: false,
        }
    }

    /// Fit on CSR rows `x` with class indices `y` in `0..n_classes`
    pub fn fit(&mut self, x: &CsMat<f64>, y: &[usize], n_classes: usize) -> Result<FitSummary> {
        let n_samples = x.rows();
        let n_features = x.cols();

        if n_samples == 0 {
            return Err(AppError::Training("no training samples".to_string()));
        }
        if y.len() != n_samples {
            return Err(AppError::Training(format!(
                "{} feature rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_classes < 2 {
            return Err(AppError::Training(format!(
                "need at least 2 classes to fit a classifier, got {}",
                n_classes
            )));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(AppError::Training(format!(
                "label index {} out of range for {} classes",
                bad, n_classes
            )));
        }
        if !x.is_csr() {
            return Err(AppError::Training(
                "feature matrix must be in CSR layout".to_string(),
            ));
        }

        let sample_weights = self.sample_weights(y, n_classes);
        let total_weight: f64 = sample_weights.sum();
        let lambda = 1.0 / (self.params.c * total_weight);

        // Lipschitz bound of the gradient: softmax curvature is at most 1/2 per
        // sample, scaled by the squared row norm plus the intercept column.
        let max_row_sq_norm = x
            .outer_iterator()
            .map(|row| row.iter().map(|(_, v)| v * v).sum::<f64>())
            .fold(0.0_f64, f64::max);
        let step = 1.0 / (0.5 * (max_row_sq_norm + 1.0) + lambda);

        let mut weights = Array2::<f64>::zeros((n_classes, n_features));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let mut prev_weights = weights.clone();
        let mut prev_bias = bias.clone();
        let mut momentum = 1.0_f64;
        let mut summary = FitSummary {
            iterations: self.params.max_iter,
            converged: false,
        };

        for iteration in 1..=self.params.max_iter {
            let next_momentum = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
            let beta = (momentum - 1.0) / next_momentum;

            let look_weights = &weights + &((&weights - &prev_weights) * beta);
            let look_bias = &bias + &((&bias - &prev_bias) * beta);

            let (grad_weights, grad_bias) = gradient(
                x,
                y,
                &sample_weights,
                total_weight,
                lambda,
                &look_weights,
                &look_bias,
            );

            let grad_max = grad_weights
                .iter()
                .chain(grad_bias.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));

            if grad_max < self.params.tolerance {
                weights = look_weights;
                bias = look_bias;
                summary = FitSummary {
                    iterations: iteration,
                    converged: true,
                };
                break;
            }

            let next_weights = &look_weights - &(&grad_weights * step);
            let next_bias = &look_bias - &(&grad_bias * step);

            // Restart momentum when the step moves against the gradient
            let progress = (&grad_weights * &(&next_weights - &weights)).sum()
                + (&grad_bias * &(&next_bias - &bias)).sum();

            prev_weights = std::mem::replace(&mut weights, next_weights);
            prev_bias = std::mem::replace(&mut bias, next_bias);
            momentum = if progress > 0.0 { 1.0 } else { next_momentum };
        }

        if !summary.converged {
            tracing::warn!(
                max_iter = self.params.max_iter,
                "Logistic regression did not converge; consider raising max_iter"
            );
        }

        self.coefficients = weights;
        self.intercept = bias;
        self.trained = true;

        Ok(summary)
    }

    /// Class probabilities for every row of `x` (n_samples × n_classes)
    pub fn predict_proba(&self, x: &CsMat<f64>) -> Result<Array2<f64>> {
        self.ensure_trained()?;
        self.check_width(x.cols())?;

        let mut proba = Array2::zeros((x.rows(), self.n_classes()));
        for (row_idx, row) in x.outer_iterator().enumerate() {
            let scores = self.scores(row.iter());
            proba.row_mut(row_idx).assign(&scores);
        }
        Ok(proba)
    }

    /// Class probabilities for a single sparse vector
    pub fn predict_proba_one(&self, features: &CsVec<f64>) -> Result<Array1<f64>> {
        self.ensure_trained()?;
        self.check_width(features.dim())?;
        Ok(self.scores(features.iter()))
    }

    /// Predict class indices
    pub fn predict(&self, x: &CsMat<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.axis_iter(Axis(0)).map(argmax).collect())
    }

    pub fn n_classes(&self) -> usize {
        self.intercept.len()
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.ncols()
    }

    /// Check that there is one coefficient row per intercept
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.nrows() != self.intercept.len() {
            return Err(AppError::Artifact(format!(
                "classifier has {} coefficient rows but {} intercepts",
                self.coefficients.nrows(),
                self.intercept.len()
            )));
        }
        Ok(())
    }

    /// Check if model is trained
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    fn scores<'a>(&self, entries: impl Iterator<Item = (usize, &'a f64)>) -> Array1<f64> {
        let mut logits = self.intercept.clone();
        for (column, &value) in entries {
            logits.scaled_add(value, &self.coefficients.column(column));
        }
        softmax_in_place(&mut logits);
        logits
    }

    fn sample_weights(&self, y: &[usize], n_classes: usize) -> Array1<f64> {
        match self.params.class_weight {
            ClassWeight::Uniform => Array1::ones(y.len()),
            ClassWeight::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &label in y {
                    counts[label] += 1;
                }
                let n = y.len() as f64;
                let k = n_classes as f64;
                y.iter()
                    .map(|&label| n / (k * counts[label] as f64))
                    .collect()
            }
        }
    }

    fn ensure_trained(&self) -> Result<()> {
        if !self.trained {
            return Err(AppError::Inference("Model not trained".to_string()));
        }
        Ok(())
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features() {
            return Err(AppError::Inference(format!(
                "expected {} features, got {}",
                self.n_features(),
                width
            )));
        }
        Ok(())
    }
}

/// Gradient of the weighted mean cross-entropy plus L2 penalty
fn gradient(
    x: &CsMat<f64>,
    y: &[usize],
    sample_weights: &Array1<f64>,
    total_weight: f64,
    lambda: f64,
    weights: &Array2<f64>,
    bias: &Array1<f64>,
) -> (Array2<f64>, Array1<f64>) {
    let n_classes = bias.len();
    let mut grad_weights = weights * lambda;
    let mut grad_bias = Array1::<f64>::zeros(n_classes);
    let mut logits = Array1::<f64>::zeros(n_classes);

    for (row_idx, row) in x.outer_iterator().enumerate() {
        logits.assign(bias);
        for (column, &value) in row.iter() {
            logits.scaled_add(value, &weights.column(column));
        }
        softmax_in_place(&mut logits);

        let scale = sample_weights[row_idx] / total_weight;
        for class in 0..n_classes {
            let target = if y[row_idx] == class { 1.0 } else { 0.0 };
            let residual = (logits[class] - target) * scale;
            grad_bias[class] += residual;
            for (column, &value) in row.iter() {
                grad_weights[[class, column]] += residual * value;
            }
        }
    }

    (grad_weights, grad_bias)
}

/// Numerically stable softmax
pub(crate) fn softmax_in_place(logits: &mut Array1<f64>) {
    let max = logits.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    if sum > 0.0 {
        logits.mapv_inplace(|v| v / sum);
    }
}

/// Index of the largest value; the first one wins on ties
pub(crate) fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (idx, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = idx;
        }
    }
    best
}
