//! rex - RNA-seq expression normalization CLI
//!
//! Command-line interface for TPM normalization and expression exploration.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use rnaseq_expr::data::{CountMatrix, GeneLengthTable, Metadata};
use rnaseq_expr::error::Result;
use rnaseq_expr::explore::{pca, sample_distances, DEFAULT_N_TOP_GENES};
use rnaseq_expr::filter::filter_total_count;
use rnaseq_expr::normalize::{log2_transform, norm_tpm};
use rnaseq_expr::pipeline::{Workflow, WorkflowConfig, WorkflowOutput};
use rnaseq_expr::profile::profile_depth;
use rnaseq_expr::summarize::condition_means;
use std::path::{Path, PathBuf};

/// RNA-seq expression normalization and exploration
#[derive(Parser)]
#[command(name = "rex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a count matrix to TPM
    Tpm {
        /// Count matrix TSV (genes × samples)
        #[arg(long)]
        counts: PathBuf,
        /// Gene length TSV (gene_id, length in kilobases)
        #[arg(long)]
        lengths: PathBuf,
        /// Output TPM TSV
        #[arg(short, long)]
        output: PathBuf,
        /// Drop genes with total count below this before normalizing
        #[arg(long)]
        min_total: Option<u64>,
    },
    /// Average TPM per condition
    Average {
        #[arg(long)]
        counts: PathBuf,
        #[arg(long)]
        lengths: PathBuf,
        /// Sample metadata TSV
        #[arg(long)]
        metadata: PathBuf,
        /// Metadata column holding the condition labels
        #[arg(long, default_value = "condition")]
        column: String,
        /// Output TSV of per-condition means
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compute PCA coordinates and sample distances on log2 TPM
    Explore {
        #[arg(long)]
        counts: PathBuf,
        #[arg(long)]
        lengths: PathBuf,
        /// Pseudocount for the log2 transform
        #[arg(long, default_value_t = 1.0)]
        pseudocount: f64,
        /// Number of most-variable genes used for PCA
        #[arg(long, default_value_t = DEFAULT_N_TOP_GENES)]
        top_genes: usize,
        /// Output TSV for PCA coordinates
        #[arg(long)]
        pca_out: PathBuf,
        /// Output TSV for the sample distance matrix
        #[arg(long)]
        distances_out: PathBuf,
    },
    /// Profile per-sample sequencing depth
    Profile {
        #[arg(long)]
        counts: PathBuf,
        /// Write the profile as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run a workflow from a YAML configuration file
    Run {
        /// Workflow YAML config
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        counts: PathBuf,
        #[arg(long)]
        lengths: PathBuf,
        #[arg(long)]
        metadata: PathBuf,
        /// Directory for output tables
        #[arg(short, long)]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(log_level).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Tpm {
            counts,
            lengths,
            output,
            min_total,
        } => {
            let mut counts = CountMatrix::from_tsv(&counts)?;
            let lengths = GeneLengthTable::from_tsv(&lengths)?;

            if let Some(min_total) = min_total {
                let (filtered, result) = filter_total_count(&counts, min_total)?;
                println!(
                    "Filtered {} of {} genes below total count {}",
                    result.n_removed, result.n_before, min_total
                );
                counts = filtered;
            }

            let aligned = lengths.subset(counts.gene_ids())?;
            let tpm = norm_tpm(&counts, &aligned)?;
            tpm.to_tsv(&output)?;
            println!(
                "Wrote TPM for {} genes × {} samples to {}",
                tpm.n_genes(),
                tpm.n_samples(),
                output.display()
            );
        }

        Commands::Average {
            counts,
            lengths,
            metadata,
            column,
            output,
        } => {
            let counts = CountMatrix::from_tsv(&counts)?;
            let lengths = GeneLengthTable::from_tsv(&lengths)?;
            let metadata = Metadata::from_tsv(&metadata)?;

            let aligned = lengths.subset(counts.gene_ids())?;
            let tpm = norm_tpm(&counts, &aligned)?;
            let means = condition_means(&tpm, &metadata, &column)?;
            means.to_tsv(&output)?;
            println!(
                "Wrote mean TPM for {} condition(s) to {}",
                means.n_conditions(),
                output.display()
            );
        }

        Commands::Explore {
            counts,
            lengths,
            pseudocount,
            top_genes,
            pca_out,
            distances_out,
        } => {
            let counts = CountMatrix::from_tsv(&counts)?;
            let lengths = GeneLengthTable::from_tsv(&lengths)?;

            let aligned = lengths.subset(counts.gene_ids())?;
            let tpm = norm_tpm(&counts, &aligned)?;
            let log2 = log2_transform(&tpm, pseudocount)?;

            let components = pca(&log2, top_genes)?;
            components.to_tsv(&pca_out)?;
            println!(
                "PC1 explains {:.1}% of variance ({} genes used)",
                components.explained[0] * 100.0,
                components.n_genes_used
            );

            let distances = sample_distances(&log2)?;
            distances.to_tsv(&distances_out)?;
            println!(
                "Wrote {} and {}",
                pca_out.display(),
                distances_out.display()
            );
        }

        Commands::Profile { counts, json } => {
            let counts = CountMatrix::from_tsv(&counts)?;
            let profile = profile_depth(&counts);
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                print!("{}", profile);
            }
        }

        Commands::Run {
            config,
            counts,
            lengths,
            metadata,
            out_dir,
        } => {
            let yaml = std::fs::read_to_string(&config)?;
            let config = WorkflowConfig::from_yaml(&yaml)?;
            let counts = CountMatrix::from_tsv(&counts)?;
            let lengths = GeneLengthTable::from_tsv(&lengths)?;
            let metadata = Metadata::from_tsv(&metadata)?;

            let output = Workflow::from_config(&config).run(&counts, &lengths, &metadata)?;
            write_workflow_output(&output, &out_dir)?;
        }
    }

    Ok(())
}

fn write_workflow_output(output: &WorkflowOutput, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    let tpm_path = out_dir.join("tpm.tsv");
    output.tpm.to_tsv(&tpm_path)?;
    println!("Wrote {}", tpm_path.display());

    if let Some(means) = &output.condition_means {
        let means_path = out_dir.join("condition_means.tsv");
        means.to_tsv(&means_path)?;
        println!("Wrote {}", means_path.display());
    }

    for (i, filter) in output.filters.iter().enumerate() {
        println!(
            "Filter {}: kept {} of {} genes",
            i + 1,
            filter.n_after,
            filter.n_before
        );
    }

    Ok(())
}
