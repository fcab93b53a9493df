//! Random forest over sparse TF-IDF features
//!
//! Gini trees grown on bootstrap samples, with a random subset of
//! `sqrt(n_features)` candidate features per split. Split search walks the
//! column index of the training matrix so only rows with a non-zero value in a
//! candidate feature are visited. Trees are grown in parallel; each tree owns
//! an RNG derived from the forest seed, so results do not depend on scheduling.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Classifier, check_dimension, check_training_data, class_counts};
use crate::error::{Result, SentimentError};
use crate::sentiment::{NUM_CLASSES, Posterior, Sentiment};
use crate::vectorizer::SparseVector;

type Distribution = [f64; NUM_CLASSES];

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Distribution,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn leaf(weights: &Distribution) -> Self {
        let total: f64 = weights.iter().sum();
        let mut distribution = [0.0; NUM_CLASSES];
        if total > 0.0 {
            for (d, w) in distribution.iter_mut().zip(weights) {
                *d = w / total;
            }
        }
        Node::Leaf { distribution }
    }

    fn predict(&self, x: &SparseVector) -> &Distribution {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x.get(*feature) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    balanced_class_weight: bool,
    seed: u64,
    n_features: Option<usize>,
    trees: Vec<Node>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            balanced_class_weight: true,
            seed: 42,
            n_features: None,
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Weight classes inversely to their frequency.
    pub fn with_balanced_class_weight(mut self, balanced: bool) -> Self {
        self.balanced_class_weight = balanced;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(Node::depth).max().unwrap_or(0)
    }
}

/// Column-major view of the training matrix shared by all trees.
struct TrainingSet<'a> {
    rows: &'a [SparseVector],
    labels: &'a [Sentiment],
    columns: Vec<Vec<(usize, f64)>>,
    class_weight: Distribution,
}

impl<'a> TrainingSet<'a> {
    fn new(rows: &'a [SparseVector], labels: &'a [Sentiment], n_features: usize, balanced: bool) -> Self {
        let mut columns = vec![Vec::new(); n_features];
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter() {
                columns[j].push((i, value));
            }
        }

        let counts = class_counts(labels);
        let present = counts.iter().filter(|&&c| c > 0).count() as f64;
        let mut class_weight = [1.0; NUM_CLASSES];
        if balanced {
            for c in 0..NUM_CLASSES {
                if counts[c] > 0 {
                    class_weight[c] = labels.len() as f64 / (present * counts[c] as f64);
                }
            }
        }

        Self {
            rows,
            labels,
            columns,
            class_weight,
        }
    }

    fn n_features(&self) -> usize {
        self.columns.len()
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    data: &'a TrainingSet<'a>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
    rng: StdRng,
    /// Bootstrap multiplicity of each training row in the node being split,
    /// zero outside of `find_split`.
    node_count: Vec<usize>,
}

fn gini(weights: &Distribution) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - weights.iter().map(|w| (w / total).powi(2)).sum::<f64>()
}

impl TreeBuilder<'_> {
    fn class_weights(&self, samples: &[usize]) -> Distribution {
        let mut weights = [0.0; NUM_CLASSES];
        for &i in samples {
            let c = self.data.labels[i].index();
            weights[c] += self.data.class_weight[c];
        }
        weights
    }

    fn build(&mut self, samples: Vec<usize>, depth: usize) -> Node {
        let weights = self.class_weights(&samples);
        let is_pure = weights.iter().filter(|&&w| w > 0.0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);

        if is_pure || depth_reached || samples.len() < self.min_samples_split {
            return Node::leaf(&weights);
        }

        let Some(split) = self.find_split(&samples, &weights) else {
            return Node::leaf(&weights);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.data.rows[i].get(split.feature) <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    /// Best Gini split over `max_features` random features. If none of them
    /// separates the node every feature is considered instead.
    fn find_split(&mut self, samples: &[usize], weights: &Distribution) -> Option<SplitCandidate> {
        for &i in samples {
            self.node_count[i] += 1;
        }

        let n_features = self.data.n_features();
        let sampled = index::sample(&mut self.rng, n_features, self.max_features.min(n_features));
        let mut best = self.best_over(sampled.iter(), samples.len(), weights);
        if best.is_none() {
            best = self.best_over(0..n_features, samples.len(), weights);
        }

        for &i in samples {
            self.node_count[i] = 0;
        }
        best
    }

    fn best_over(
        &self,
        features: impl Iterator<Item = usize>,
        n_samples: usize,
        weights: &Distribution,
    ) -> Option<SplitCandidate> {
        let parent = gini(weights) * weights.iter().sum::<f64>();
        let mut best: Option<SplitCandidate> = None;
        for feature in features {
            if let Some(candidate) = self.best_threshold(feature, n_samples, weights) {
                if candidate.impurity < parent - 1e-12
                    && best.as_ref().is_none_or(|b| candidate.impurity < b.impurity)
                {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_threshold(&self, feature: usize, n_samples: usize, weights: &Distribution) -> Option<SplitCandidate> {
        // TF-IDF features are non-negative; collect the non-zero entries of
        // this feature inside the node, one per bootstrap copy
        let mut entries: Vec<(f64, usize)> = Vec::new();
        for &(i, value) in &self.data.columns[feature] {
            for _ in 0..self.node_count[i] {
                entries.push((value, self.data.labels[i].index()));
            }
        }
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));

        // rows without the feature all sit at zero, left of every non-zero value
        let mut left = *weights;
        for &(_, c) in &entries {
            left[c] -= self.data.class_weight[c];
        }
        let mut right = [0.0; NUM_CLASSES];
        for &(_, c) in &entries {
            right[c] += self.data.class_weight[c];
        }
        let mut left_n = n_samples - entries.len();
        let mut right_n = entries.len();
        let mut previous = 0.0;
        let mut best: Option<SplitCandidate> = None;

        let mut k = 0;
        while k <= entries.len() {
            let value = entries.get(k).map(|e| e.0);
            // candidate boundary between `previous` and the next distinct value
            if let Some(next) = value {
                if next > previous
                    && left_n >= self.min_samples_leaf
                    && right_n >= self.min_samples_leaf
                {
                    let impurity = gini(&left) * left.iter().sum::<f64>()
                        + gini(&right) * right.iter().sum::<f64>();
                    if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                        best = Some(SplitCandidate {
                            feature,
                            threshold: (previous + next) / 2.0,
                            impurity,
                        });
                    }
                }
            } else {
                break;
            }

            // move every entry sharing this value to the left side
            let current = entries[k].0;
            while k < entries.len() && entries[k].0 == current {
                let c = entries[k].1;
                left[c] += self.data.class_weight[c];
                right[c] -= self.data.class_weight[c];
                left_n += 1;
                right_n -= 1;
                k += 1;
            }
            previous = current;
        }

        best
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "RandomForest"
    }

    fn fit(&mut self, x: &[SparseVector], y: &[Sentiment]) -> Result<()> {
        let n_features = check_training_data(x, y)?;
        let data = TrainingSet::new(x, y, n_features, self.balanced_class_weight);
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let n_samples = x.len();

        let trees: Vec<Node> = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n_samples)
                    .map(|_| rng.random_range(0..n_samples))
                    .collect();
                let mut builder = TreeBuilder {
                    data: &data,
                    max_depth: self.max_depth,
                    min_samples_split: self.min_samples_split,
                    min_samples_leaf: self.min_samples_leaf,
                    max_features,
                    rng,
                    node_count: vec![0; n_samples],
                };
                builder.build(bootstrap, 0)
            })
            .collect();

        self.trees = trees;
        self.n_features = Some(n_features);
        debug!(
            trees = self.trees.len(),
            max_depth = self.max_tree_depth(),
            max_features,
            "Fitted random forest"
        );
        Ok(())
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn check_parameters(&self) -> Result<()> {
        if self.n_features.is_none() || self.trees.is_empty() {
            return Err(SentimentError::ModelNotFitted);
        }
        Ok(())
    }

    fn predict_proba(&self, x: &SparseVector) -> Result<Posterior> {
        check_dimension(self.n_features, x)?;
        self.check_parameters()?;
        let mut mean = [0.0; NUM_CLASSES];
        for tree in &self.trees {
            for (m, p) in mean.iter_mut().zip(tree.predict(x)) {
                *m += p;
            }
        }
        let n = self.trees.len() as f64;
        for m in mean.iter_mut() {
            *m /= n;
        }
        Ok(Posterior(mean))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{toy_data, vector};
    use super::*;

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = toy_data();
        let mut a = RandomForest::new(10).with_seed(11);
        let mut b = RandomForest::new(10).with_seed(11);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }

    #[test]
    fn max_depth_is_respected() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::new(8).with_max_depth(1);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.n_trees(), 8);
        assert!(forest.max_tree_depth() <= 1);
    }

    #[test]
    fn min_samples_split_larger_than_data_gives_stumps() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::new(4).with_min_samples_split(100);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.max_tree_depth(), 0);
        // every tree is a single leaf holding its bootstrap class mix
        let posterior = forest.predict_proba(&vector(&[(0, 1.0)])).unwrap();
        assert!((posterior.0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn splits_on_single_informative_feature() {
        let x: Vec<SparseVector> = (0..20)
            .map(|i| {
                let value = if i < 10 { 0.0 } else { 0.5 + i as f64 / 100.0 };
                SparseVector::from_pairs(1, [(0, value)]).unwrap()
            })
            .collect();
        let y: Vec<Sentiment> = (0..20)
            .map(|i| if i < 10 { Sentiment::Negative } else { Sentiment::Positive })
            .collect();
        let mut forest = RandomForest::new(5).with_seed(1);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict(&x[0]).unwrap(), Sentiment::Negative);
        assert_eq!(forest.predict(&x[19]).unwrap(), Sentiment::Positive);
        assert_eq!(
            forest.predict(&SparseVector::zeros(1)).unwrap(),
            Sentiment::Negative
        );
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(gini(&[3.0, 0.0, 0.0]), 0.0);
        assert!((gini(&[1.0, 1.0, 0.0]) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn forest_without_trees_refuses_to_score() {
        let hollow = RandomForest {
            n_features: Some(6),
            ..RandomForest::new(3)
        };
        assert!(hollow.check_parameters().is_err());
        assert!(hollow.predict_proba(&vector(&[(0, 1.0)])).is_err());

        let (x, y) = toy_data();
        let mut forest = RandomForest::new(3);
        forest.fit(&x, &y).unwrap();
        assert!(forest.check_parameters().is_ok());
    }
}
