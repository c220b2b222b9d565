use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import from planfuse-core
use planfuse_core::export::{load_enriched_elements, load_fused_detections};
use planfuse_core::fusion::status_counts;
use planfuse_core::graphs::RunInfo;
use planfuse_core::rules::RuleTotals;
use planfuse_core::{
    BatchProcessor, ElementGraph, GraphBuilder, MatchStatus, PlanfuseConfig, RuleEngine,
    SemanticMapper, StepProfiler,
};

// Import CLI output helpers
use planfuse::{save_enrichment, save_fusion, save_graph, save_rule_report};

#[derive(Parser)]
#[command(name = "planfuse")]
#[command(about = "Fuse detector boxes with OCR text into typed plan elements, graph them and check rules")]
struct Cli {
    /// Path to custom config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the match overlap threshold
    #[arg(long, global = true)]
    iou: Option<f64>,

    /// Comma-separated detector class names, in class-id order
    #[arg(long, global = true)]
    classes: Option<String>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long, global = true)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match detections to OCR regions and write the fusion summary
    Fuse {
        #[command(flatten)]
        input: BatchInput,
        /// Output directory
        #[arg(short, long, default_value = "planfuse_out")]
        out_dir: String,
    },
    /// Map a fusion summary (JSON) to semantic classes/types
    Enrich {
        /// Fusion summary JSON
        #[arg(short, long)]
        input: String,
        #[arg(short, long, default_value = "planfuse_out")]
        out_dir: String,
    },
    /// Build the image -> element graph from enriched elements (JSON)
    Graph {
        /// Enrichment JSON
        #[arg(short, long)]
        input: String,
        #[arg(short, long, default_value = "planfuse_out")]
        out_dir: String,
    },
    /// Run the rule checks over a graph document
    Check {
        /// Graph JSON
        #[arg(short, long)]
        input: String,
        #[arg(short, long, default_value = "planfuse_out")]
        out_dir: String,
    },
    /// Run every stage and write every artifact
    Run {
        #[command(flatten)]
        input: BatchInput,
        #[arg(short, long, default_value = "planfuse_out")]
        out_dir: String,
    },
}

#[derive(Args)]
struct BatchInput {
    /// Directory of detector label files (<stem>.txt)
    #[arg(long)]
    labels: String,

    /// Directory of OCR documents (<stem>.json)
    #[arg(long)]
    ocr: String,

    /// Process only the first N images
    #[arg(long)]
    limit: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("planfuse=info,planfuse_core=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    println!("🦀 Planfuse");

    let config = load_config(&cli);
    let mut profiler = StepProfiler::new(cli.profile);

    let outcome = match cli.command {
        Command::Fuse { input, out_dir } => fuse(&input, &out_dir, config, &mut profiler),
        Command::Enrich { input, out_dir } => enrich(&input, &out_dir, &config, &mut profiler),
        Command::Graph { input, out_dir } => graph(&input, &out_dir, &config, &mut profiler),
        Command::Check { input, out_dir } => check(&input, &out_dir, &config, &mut profiler),
        Command::Run { input, out_dir } => run(&input, &out_dir, config, &mut profiler),
    };

    if let Err(e) = outcome {
        eprintln!("❌ Processing failed: {e:#}");
        std::process::exit(1);
    }

    profiler.print_summary();
    Ok(())
}

fn load_config(cli: &Cli) -> PlanfuseConfig {
    let mut config = PlanfuseConfig::load_with_fallback(cli.config.as_deref());

    if let Some(config_path) = &cli.config {
        println!("📋 Loaded config from: {config_path}");
    } else {
        println!("📋 Using default config");
    }

    // Apply CLI overrides to config
    if let Some(iou) = cli.iou {
        config.matching.overlap_threshold = iou;
    }
    if let Some(classes) = &cli.classes {
        config.set_class_names_from_csv(classes);
    }
    config
}

fn fuse(input: &BatchInput, out_dir: &str, config: PlanfuseConfig, profiler: &mut StepProfiler) -> Result<()> {
    let processor = BatchProcessor::new_from_dirs(&input.labels, &input.ocr, config);
    let fusion = profiler.time_step("Fusion", || processor.fuse(input.limit))?;

    print_batch(fusion.batch.processed.len(), &fusion.batch.skipped);
    print_status_counts(&fusion.status_counts());
    save_fusion(&fusion.rows, out_dir)
}

fn enrich(input: &str, out_dir: &str, config: &PlanfuseConfig, profiler: &mut StepProfiler) -> Result<()> {
    let rows = load_fused_detections(input)?;
    let mapper = SemanticMapper::from_config(config);
    let elements = profiler.time_step("Semantic mapping", || mapper.map_all(&rows));

    let conflicts = elements.iter().filter(|e| e.conflict).count();
    println!("🏷️  {} elements from {} rows ({conflicts} conflicts)", elements.len(), rows.len());
    save_enrichment(&elements, out_dir)
}

fn graph(input: &str, out_dir: &str, config: &PlanfuseConfig, profiler: &mut StepProfiler) -> Result<()> {
    let elements = load_enriched_elements(input)?;
    let run = RunInfo::new(config.config_hash()?);
    let graph = profiler.time_step("Graph building", || {
        GraphBuilder::new().build_graph_with_run(&elements, run)
    });
    println!(
        "🏗️  Graph: {} images, {} elements",
        graph.image_count(),
        graph.element_nodes().count()
    );
    save_graph(&graph, out_dir)
}

fn check(input: &str, out_dir: &str, config: &PlanfuseConfig, profiler: &mut StepProfiler) -> Result<()> {
    let graph = ElementGraph::load_from_json(input)?;
    let engine = RuleEngine::from_config(&config.rules);
    let results = profiler.time_step("Rule checks", || engine.evaluate(&graph));

    print_rule_totals(&RuleTotals::from_results(&results));
    save_rule_report(&results, out_dir)
}

fn run(input: &BatchInput, out_dir: &str, config: PlanfuseConfig, profiler: &mut StepProfiler) -> Result<()> {
    let mut processor = BatchProcessor::new_from_dirs(&input.labels, &input.ocr, config);
    let stages = processor.run(input.limit, profiler)?;

    print_batch(stages.batch.processed.len(), &stages.batch.skipped);
    print_status_counts(&status_counts(&stages.fused));
    println!("🏷️  {} elements", stages.elements.len());
    print_rule_totals(&RuleTotals::from_results(&stages.rule_results));

    println!("\n💾 Writing artifacts to: {out_dir}");
    save_fusion(&stages.fused, out_dir)?;
    save_enrichment(&stages.elements, out_dir)?;
    save_graph(&stages.graph, out_dir)?;
    save_rule_report(&stages.rule_results, out_dir)?;
    println!("\n✅ All stages written to: {out_dir}");
    Ok(())
}

fn print_batch(processed: usize, skipped: &[(String, String)]) {
    println!("📄 Processed {processed} images");
    if !skipped.is_empty() {
        println!("⚠️  Skipped {} images:", skipped.len());
        for (image, reason) in skipped {
            println!("   - {image}: {reason}");
        }
    }
}

fn print_status_counts(counts: &BTreeMap<(String, MatchStatus), usize>) {
    println!("📊 Match status per class:");
    for ((class_name, status), count) in counts {
        println!("   {:<20} {:<10} {}", class_name, status.as_str(), count);
    }
}

fn print_rule_totals(totals: &RuleTotals) {
    println!(
        "🔍 {} elements checked: {} checks passed, {} failed ({} elements with failures)",
        totals.elements, totals.passed_checks, totals.failed_checks, totals.elements_with_failures
    );
}
