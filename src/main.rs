use clap::Parser;
use healthcare_sentiment::cli::{
    Cli, Commands, cmd_evaluate, cmd_generate, cmd_predict, cmd_preprocess, cmd_sample_csv,
    cmd_serve, cmd_train,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthcare_sentiment=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            count,
            seed,
        } => cmd_generate(&output, count, seed)?,
        Commands::Preprocess {
            input,
            output,
            mode,
        } => cmd_preprocess(&input, &output, mode)?,
        Commands::Train(args) => {
            // forest fitting is CPU bound
            tokio::task::block_in_place(|| cmd_train(&args))?
        }
        Commands::Evaluate { data, model_dir } => cmd_evaluate(&data, &model_dir)?,
        Commands::Predict { texts, model_dir } => cmd_predict(&texts, &model_dir)?,
        Commands::SampleCsv { output } => cmd_sample_csv(&output)?,
        Commands::Serve {
            host,
            port,
            model_dir,
        } => cmd_serve(host, port, model_dir).await?,
    }

    Ok(())
}
