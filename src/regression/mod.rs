//! Item → value linear regression over one-hot encoded item labels.
//!
//! With a single categorical feature the least-squares fit predicts each
//! item's training mean. The one-hot columns plus the intercept are
//! collinear, and the minimum-norm solution puts the intercept at the
//! unweighted mean of the item means. Items never seen in training
//! contribute nothing and fall back to that intercept.

use crate::config::ModelConfig;
use crate::models::CleanRecord;
use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ItemRegression {
    intercept: f64,
    /// Offset of each item's mean from the intercept.
    coefficients: HashMap<String, f64>,
}

impl ItemRegression {
    pub fn fit<'a>(samples: impl IntoIterator<Item = (&'a str, f64)>) -> Option<Self> {
        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();

        for (item, y) in samples {
            let entry = sums.entry(item.to_string()).or_insert((0.0, 0));
            entry.0 += y;
            entry.1 += 1;
        }

        if sums.is_empty() {
            return None;
        }

        let means: HashMap<String, f64> = sums
            .into_iter()
            .map(|(item, (sum, count))| (item, sum / count as f64))
            .collect();

        let intercept = means.values().sum::<f64>() / means.len() as f64;
        let coefficients = means
            .into_iter()
            .map(|(item, mean)| (item, mean - intercept))
            .collect();

        Some(Self { intercept, coefficients })
    }

    pub fn predict(&self, item: &str) -> f64 {
        self.intercept + self.coefficients.get(item).copied().unwrap_or(0.0)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn items(&self) -> usize {
        self.coefficients.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub items: usize,
    pub intercept: f64,
    pub mse: f64,
    pub sse: f64,
    pub target_item: String,
    pub target_prediction: f64,
}

/// Seeded shuffle, then the first `ceil(n * test_ratio)` rows become the test set.
pub fn train_test_split<T: Clone>(rows: &[T], test_ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut shuffled = rows.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let test_len = ((rows.len() as f64) * test_ratio.clamp(0.0, 1.0)).ceil() as usize;
    let train = shuffled.split_off(test_len.min(shuffled.len()));
    (train, shuffled)
}

/// Fit on a training split and score on the held-out rows.
pub fn evaluate(rows: &[CleanRecord], config: &ModelConfig) -> Result<RegressionReport> {
    if rows.len() < 2 {
        bail!("need at least 2 cleaned rows to fit and test, got {}", rows.len());
    }

    let (train, test) = train_test_split(rows, config.test_ratio, config.seed);
    if test.is_empty() || train.is_empty() {
        bail!(
            "test ratio {} leaves an empty split ({} train / {} test)",
            config.test_ratio,
            train.len(),
            test.len()
        );
    }

    let Some(model) = ItemRegression::fit(train.iter().map(|r| (r.item.as_str(), r.value_clean)))
    else {
        bail!("empty training set");
    };

    let sse: f64 = test
        .iter()
        .map(|r| (r.value_clean - model.predict(&r.item)).powi(2))
        .sum();
    let target_item = config.target_item.trim().to_lowercase();

    Ok(RegressionReport {
        train_rows: train.len(),
        test_rows: test.len(),
        items: model.items(),
        intercept: model.intercept(),
        mse: sse / test.len() as f64,
        sse,
        target_prediction: model.predict(&target_item),
        target_item,
    })
}
