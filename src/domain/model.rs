//! Regularized linear baseline model.
//!
//! L2-regularized (ridge) regression fitted in closed form with an
//! unpenalized intercept: center X and y, solve (X'X + aI)b = X'y by
//! Cholesky decomposition, then recover the intercept from the column
//! means. No randomized initialization anywhere, so identical input
//! reproduces identical parameters bit for bit.

use crate::domain::error::PricecastError;
use crate::domain::features::FeatureTable;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Fitted regressor parameters plus the feature ordering it was trained
/// on. Later inference must apply the same ordering.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    pub alpha: f64,
}

impl ModelArtifact {
    pub fn label(&self) -> String {
        format!("Ridge(alpha={})", self.alpha)
    }

    /// intercept + dot(coefficients, features). The caller is responsible
    /// for checking that `features` follows [`ModelArtifact::feature_names`].
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept + ArrayView1::from(features).dot(&self.coefficients)
    }
}

/// Fit the ridge regression of target on the feature vector.
pub fn train_ridge(train: &FeatureTable, alpha: f64) -> Result<ModelArtifact, PricecastError> {
    let n = train.rows.len();
    let k = train.feature_names.len();
    if n < 2 {
        return Err(PricecastError::InsufficientData {
            stage: "model fit".to_string(),
            have: n,
            need: 2,
        });
    }

    let mut x = Array2::<f64>::zeros((n, k));
    let mut y = Array1::<f64>::zeros(n);
    for (i, row) in train.rows.iter().enumerate() {
        if row.features.len() != k {
            return Err(PricecastError::SchemaMismatch {
                reason: format!(
                    "row {} has {} features, table declares {}",
                    row.date,
                    row.features.len(),
                    k
                ),
            });
        }
        for (j, &value) in row.features.iter().enumerate() {
            x[[i, j]] = value;
        }
        y[i] = row.target;
    }

    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PricecastError::NumericComputation {
            context: "column means of empty design matrix".to_string(),
        })?;
    let y_mean = y.mean().ok_or_else(|| PricecastError::NumericComputation {
        context: "mean of empty target vector".to_string(),
    })?;

    let x_centered = &x - &x_mean;
    let y_centered = &y - y_mean;

    let mut xtx = x_centered.t().dot(&x_centered);
    for i in 0..k {
        xtx[[i, i]] += alpha;
    }
    let xty = x_centered.t().dot(&y_centered);

    let coefficients = cholesky_solve(&xtx, &xty)?;
    let intercept = y_mean - x_mean.dot(&coefficients);

    Ok(ModelArtifact {
        feature_names: train.feature_names.clone(),
        coefficients,
        intercept,
        alpha,
    })
}

/// Solve A x = b for symmetric positive-definite A via A = L * L^T
/// followed by forward and backward substitution.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, PricecastError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(PricecastError::NumericComputation {
                        context: "normal equations are not positive definite".to_string(),
                    });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}
