use std::{path::Path, sync::Arc};

use clap::Parser;
use resumerank::{
    cli::{Cli, Command, DEFAULT_JOB_DESCRIPTION, EntitiesArgs, RankArgs},
    config::RankingConfig,
    document::{DocumentSource, read_document},
    entities::{EntityExtractor, EntitySummary, Gazetteer, GazetteerExtractor},
    error,
    mcp,
    model_manager::ModelManager,
    pipeline::{RankingPipeline, RankingRequest},
    report,
    staging::InputStore,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RESUMERANK_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let Cli {
        data_dir,
        model,
        verbose,
        quiet,
        command,
    } = Cli::parse();
    init_tracing(verbose, quiet);

    match command {
        Command::Rank(args) => {
            cmd_rank(model, data_dir.as_deref(), &args)?;
        }
        Command::Entities(args) => {
            cmd_entities(&args)?;
        }
        Command::Mcp(args) => {
            let extractor = build_extractor(args.gazetteer.as_deref())?;
            let pipeline = RankingPipeline::new(
                Arc::new(model_manager(model)),
                RankingConfig::from_env()?,
            )?
            .with_extractor(Arc::new(extractor));
            mcp::run_mcp(pipeline)?;
        }
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

fn model_manager(model: Option<String>) -> ModelManager {
    model.map(ModelManager::with_model_id).unwrap_or_default()
}

fn build_extractor(
    gazetteer: Option<&Path>,
) -> error::Result<GazetteerExtractor> {
    match gazetteer {
        Some(path) => GazetteerExtractor::new(&Gazetteer::load(path)?),
        None => Ok(GazetteerExtractor::default()),
    }
}

fn cmd_rank(
    model: Option<String>,
    data_dir: Option<&Path>,
    args: &RankArgs,
) -> error::Result<()> {
    let job_description = match (&args.job, &args.job_file) {
        (Some(job), _) => job.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => DEFAULT_JOB_DESCRIPTION.to_string(),
    };

    let mut config = RankingConfig::from_env()?;
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.extract_entities = args.entities;

    let request = RankingRequest {
        job_description,
        uploads: args
            .uploads
            .iter()
            .map(|p| DocumentSource::UploadedFile(p.clone()))
            .collect(),
        folder: args.folder.clone(),
    };

    if args.keep_inputs {
        match InputStore::resolve(data_dir).and_then(|s| s.record(&request)) {
            Ok(copied) => tracing::info!(copied, "kept ranking inputs"),
            Err(e) => tracing::warn!("could not keep ranking inputs: {e}"),
        }
    }

    let mut pipeline =
        RankingPipeline::new(Arc::new(model_manager(model)), config)?;
    if args.entities {
        let extractor = build_extractor(args.gazetteer.as_deref())?;
        pipeline = pipeline.with_extractor(Arc::new(extractor));
    }

    let outcome = pipeline.rank(&request)?;

    if args.json {
        report::format_json(&outcome)?;
    } else {
        report::format_human(&outcome);
    }
    Ok(())
}

fn cmd_entities(args: &EntitiesArgs) -> error::Result<()> {
    let extractor = build_extractor(args.gazetteer.as_deref())?;
    let text = read_document(&DocumentSource::File(args.file.clone()))?;
    let spans = extractor.extract(&text)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&spans)?);
    } else if spans.is_empty() {
        println!("No skills or qualifications found.");
    } else {
        let summary = EntitySummary::from_spans(&spans);
        println!("Skills: {}", summary.skills.join(", "));
        println!("Qualifications: {}", summary.qualifications.join(", "));
    }
    Ok(())
}
