/// Ordinary least squares over positional indices
///
/// Fits `y = slope * x + intercept` where `x` is the position 0..n-1.

const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub observations: usize,
    /// Residual sum of squares on the fitted points
    pub ss_res: f64,
    /// Total sum of squares around the mean
    pub ss_tot: f64,
}

impl LinearFit {
    /// Returns `None` with fewer than two points.
    pub fn fit(data: &[f64]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let n = data.len() as f64;
        let sum_x: f64 = (0..data.len()).map(|i| i as f64).sum();
        let sum_y: f64 = data.iter().sum();
        let sum_xy: f64 = data.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
        let sum_x2: f64 = (0..data.len()).map(|i| (i * i) as f64).sum();

        let denominator = n * sum_x2 - sum_x * sum_x;
        if denominator.abs() < EPSILON {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;

        let mean_y = sum_y / n;
        let ss_tot: f64 = data.iter().map(|&y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = data
            .iter()
            .enumerate()
            .map(|(i, &y)| (y - (slope * i as f64 + intercept)).powi(2))
            .sum();

        Some(Self {
            slope,
            intercept,
            observations: data.len(),
            ss_res,
            ss_tot,
        })
    }

    pub fn predict_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Coefficient of determination on the fitted window.
    ///
    /// A flat window has no variance to explain: an exact fit scores 1,
    /// anything else 0.
    pub fn r_squared(&self) -> f64 {
        if self.ss_tot < EPSILON {
            return if self.ss_res < EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - self.ss_res / self.ss_tot
    }

    /// `r_squared` as a 0..=100 score.
    pub fn confidence(&self) -> f64 {
        (self.r_squared() * 100.0).clamp(0.0, 100.0)
    }
}

/// Pearson correlation of two series, truncated to the shorter one.
///
/// 0 with fewer than two points or when either side has no variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let count = n as f64;

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = count * sum_xy - sum_x * sum_y;
    let denominator =
        ((count * sum_x2 - sum_x * sum_x) * (count * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator.abs() < EPSILON || !denominator.is_finite() {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_line() {
        let data: Vec<f64> = (1..=14).map(|i| (i * 10) as f64).collect();
        let fit = LinearFit::fit(&data).unwrap();

        assert!((fit.slope - 10.0).abs() < 1e-9);
        assert!((fit.intercept - 10.0).abs() < 1e-9);
        assert!((fit.confidence() - 100.0).abs() < 1e-6);
        assert!((fit.predict_at(14.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        assert!(LinearFit::fit(&[]).is_none());
        assert!(LinearFit::fit(&[5.0]).is_none());
    }

    #[test]
    fn test_flat_window_is_exact_fit() {
        let fit = LinearFit::fit(&[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.confidence(), 100.0);
    }

    #[test]
    fn test_noisy_data_scores_below_perfect() {
        let fit = LinearFit::fit(&[10.0, 40.0, 5.0, 60.0, 0.0, 30.0]).unwrap();
        let confidence = fit.confidence();
        assert!(confidence >= 0.0 && confidence < 50.0);
    }

    #[test]
    fn test_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson_correlation(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-9);
        assert!((pearson_correlation(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-9);
        assert_eq!(pearson_correlation(&x, &[3.0, 3.0, 3.0, 3.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), 0.0);
    }
}
