//! Command-line interface

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::analyzer::SentimentAnalyzer;
use crate::artifacts::ModelBundle;
use crate::classifier::Classifier;
use crate::dataset;
use crate::evaluation::{ClassificationReport, predict_all};
use crate::server::{ServerConfig, run_server};
use crate::synth;
use crate::tokenizer::{NormalizerMode, Tokenizer, TokenizerConfig};
use crate::training::{TrainConfig, train_from_files};

#[derive(Parser)]
#[command(name = "healthcare-sentiment")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sentiment classification for healthcare reviews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a synthetic labeled review corpus
    Generate {
        #[arg(short, long, default_value = "healthcare_reviews.csv")]
        output: PathBuf,
        #[arg(short, long, default_value_t = synth::DEFAULT_COUNT)]
        count: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Normalise a labeled corpus into review,processed_review,sentiment rows
    Preprocess {
        input: PathBuf,
        #[arg(short, long, default_value = "processed_reviews.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = NormalizerMode::Standard)]
        mode: NormalizerMode,
    },

    /// Train candidate models and persist the best one
    Train(TrainArgs),

    /// Score a labeled corpus with the persisted model
    Evaluate {
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,
        #[arg(long, env = "MODEL_DIR", default_value = ".")]
        model_dir: PathBuf,
    },

    /// Classify one or more texts
    Predict {
        #[arg(required = true)]
        texts: Vec<String>,
        #[arg(long, env = "MODEL_DIR", default_value = ".")]
        model_dir: PathBuf,
    },

    /// Write the bundled unlabeled sample reviews as a CSV for batch scoring
    SampleCsv {
        #[arg(short, long, default_value = "sample_reviews.csv")]
        output: PathBuf,
    },

    /// Start the HTTP API
    Serve {
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, env = "API_PORT", default_value_t = 5328)]
        port: u16,
        #[arg(long, env = "MODEL_DIR", default_value = ".")]
        model_dir: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct TrainArgs {
    /// Labeled CSV files, combined in order
    #[arg(short, long, required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,
    #[arg(long, env = "MODEL_DIR", default_value = ".")]
    pub model_dir: PathBuf,
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// 0 keeps every n-gram
    #[arg(long, default_value_t = 15_000)]
    pub max_features: usize,
    #[arg(long, default_value_t = 1)]
    pub ngram_min: usize,
    #[arg(long, default_value_t = 3)]
    pub ngram_max: usize,
    #[arg(long, default_value_t = 1)]
    pub min_df: usize,
    #[arg(long, default_value_t = 0.95)]
    pub max_df: f64,
    #[arg(long)]
    pub no_sublinear_tf: bool,
    #[arg(long, default_value_t = 0.5)]
    pub alpha: f64,
    #[arg(long, default_value_t = 200)]
    pub forest_trees: usize,
    /// 0 grows trees until the leaves are pure
    #[arg(long, default_value_t = 15)]
    pub forest_max_depth: usize,
    #[arg(long, default_value_t = 5)]
    pub forest_min_samples_split: usize,
    #[arg(long, default_value_t = 2)]
    pub forest_min_samples_leaf: usize,
    /// Do not append the short positive phrases to the corpus
    #[arg(long)]
    pub no_augment_short: bool,
    /// Cross-validate the multinomial NB smoothing
    #[arg(long)]
    pub tune_alpha: bool,
    #[arg(long, default_value_t = 5)]
    pub cv_folds: usize,
    #[arg(long, default_value_t = NormalizerMode::Standard)]
    pub tokenizer: NormalizerMode,
}

impl TrainArgs {
    pub fn config(&self) -> TrainConfig {
        TrainConfig {
            test_size: self.test_size,
            seed: self.seed,
            max_features: (self.max_features > 0).then_some(self.max_features),
            ngram_range: (self.ngram_min, self.ngram_max),
            min_df: self.min_df,
            max_df: self.max_df,
            sublinear_tf: !self.no_sublinear_tf,
            alpha: self.alpha,
            forest_trees: self.forest_trees,
            forest_max_depth: (self.forest_max_depth > 0).then_some(self.forest_max_depth),
            forest_min_samples_split: self.forest_min_samples_split,
            forest_min_samples_leaf: self.forest_min_samples_leaf,
            augment_short: !self.no_augment_short,
            tune_alpha: self.tune_alpha,
            cv_folds: self.cv_folds,
            tokenizer: self.tokenizer,
        }
    }
}

pub fn cmd_generate(output: &Path, count: usize, seed: u64) -> anyhow::Result<()> {
    let reviews = synth::generate(count, seed);
    dataset::write_labeled(output, &reviews)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(rows = reviews.len(), output = %output.display(), "Generated synthetic reviews");
    println!("Wrote {} reviews to {}", reviews.len(), output.display());
    Ok(())
}

pub fn cmd_preprocess(input: &Path, output: &Path, mode: NormalizerMode) -> anyhow::Result<()> {
    let tokenizer = Tokenizer::new(TokenizerConfig::new(mode));
    let stats = dataset::preprocess_file(input, output, &tokenizer)
        .with_context(|| format!("preprocessing {}", input.display()))?;
    println!(
        "Processed {} of {} reviews into {}",
        stats.written,
        stats.read,
        output.display()
    );
    Ok(())
}

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    let config = args.config();
    let outcome = train_from_files(&args.data, &args.model_dir, &config)
        .context("training failed, no artifacts were written")?;

    println!("Candidates:");
    for candidate in &outcome.report.candidates {
        println!("  {:<14} accuracy {:.4}", candidate.name, candidate.accuracy);
    }
    println!();
    println!("Best model: {}", outcome.report.best_model);
    println!("{}", outcome.evaluation);
    println!("Artifacts saved to {}", args.model_dir.display());
    Ok(())
}

pub fn cmd_evaluate(data: &[PathBuf], model_dir: &Path) -> anyhow::Result<()> {
    let bundle = ModelBundle::load(model_dir)
        .with_context(|| format!("loading model from {}", model_dir.display()))?;
    let reviews = dataset::load_labeled_many(data)?;
    let tokenizer = Tokenizer::new(bundle.vectorizer().tokenizer_config());

    let (x, y): (Vec<_>, Vec<_>) = reviews
        .iter()
        .map(|r| {
            let tokens = tokenizer.normalize(&r.text);
            (bundle.vectorizer().transform(&tokens), r.sentiment)
        })
        .unzip();
    let predicted = predict_all(bundle.model(), &x)?;
    let report = ClassificationReport::new(&y, &predicted);

    println!("Model: {}", bundle.model().name());
    println!("Reviews: {}", y.len());
    println!();
    println!("{report}");
    Ok(())
}

pub fn cmd_predict(texts: &[String], model_dir: &Path) -> anyhow::Result<()> {
    let analyzer = SentimentAnalyzer::load(model_dir);
    for text in texts {
        match analyzer.analyze(text) {
            Ok(p) => println!(
                "{:<8} {:.3} ({})  {}",
                p.sentiment.as_str(),
                p.confidence,
                p.source.as_str(),
                text.trim()
            ),
            Err(e) => println!("error: {e}  {text:?}"),
        }
    }
    Ok(())
}

pub fn cmd_sample_csv(output: &Path) -> anyhow::Result<()> {
    dataset::write_texts(output, &synth::SAMPLE_CSV_REVIEWS)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} sample reviews to {}",
        synth::SAMPLE_CSV_REVIEWS.len(),
        output.display()
    );
    Ok(())
}

pub async fn cmd_serve(host: String, port: u16, model_dir: PathBuf) -> anyhow::Result<()> {
    run_server(ServerConfig {
        host,
        port,
        model_dir,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["healthcare-sentiment", "train", "--data", "reviews.csv"]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.config(), TrainConfig::default());
    }

    #[test]
    fn zero_limits_disable_caps() {
        let cli = Cli::parse_from([
            "healthcare-sentiment",
            "train",
            "--data",
            "a.csv",
            "b.csv",
            "--max-features",
            "0",
            "--forest-max-depth",
            "0",
            "--tokenizer",
            "enhanced",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.data.len(), 2);
        let config = args.config();
        assert_eq!(config.max_features, None);
        assert_eq!(config.forest_max_depth, None);
        assert_eq!(config.tokenizer, NormalizerMode::Enhanced);
    }

    #[test]
    fn predict_requires_text() {
        assert!(Cli::try_parse_from(["healthcare-sentiment", "predict"]).is_err());
    }

    #[test]
    fn serve_flags_fill_server_settings() {
        let cli = Cli::parse_from([
            "healthcare-sentiment",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--model-dir",
            "models",
        ]);
        let Commands::Serve {
            host,
            port,
            model_dir,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 8080);
        assert_eq!(model_dir, PathBuf::from("models"));
    }
}
