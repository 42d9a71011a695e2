//! Basic example demonstrating the expression workflow.
//!
//! This example shows how to:
//! 1. Create synthetic count data with transcript lengths
//! 2. Profile sequencing depth
//! 3. Filter, normalize to TPM, and average per condition
//! 4. Compute PCA coordinates and sample distances

use rnaseq_expr::prelude::*;
use sprs::TriMat;
use std::io::Write;

fn main() -> Result<()> {
    println!("=== rnaseq-expr Example ===\n");

    let (counts, lengths, metadata) = create_example_data()?;

    println!("Data dimensions:");
    println!("  Genes:   {}", counts.n_genes());
    println!("  Samples: {}", counts.n_samples());
    println!();

    // Profile the data
    println!("=== Sequencing Depth ===\n");
    let depth = profile_depth(&counts);
    print!("{}", depth);
    println!();

    // Run the workflow
    println!("=== Running Workflow ===\n");

    let output = Workflow::new()
        .name("basic-example")
        .filter_total_count(10)
        .normalize_tpm()
        .log2_transform(1.0)
        .average_by_condition("condition")
        .run(&counts, &lengths, &metadata)?;

    for filter in &output.filters {
        println!(
            "Filter kept {} of {} genes ({:.0}%)",
            filter.n_after,
            filter.n_before,
            filter.proportion_retained * 100.0
        );
    }

    let tpm = &output.tpm;
    println!("\nTPM ({} genes × {} samples):", tpm.n_genes(), tpm.n_samples());
    for (i, gene_id) in tpm.gene_ids.iter().take(5).enumerate() {
        let row: Vec<String> = tpm.row(i).iter().map(|v| format!("{:.1}", v)).collect();
        println!("  {}\t{}", gene_id, row.join("\t"));
    }

    let means = output.condition_means.as_ref().expect("averaging step ran");
    println!("\nMean TPM per condition ({}):", means.conditions.join(", "));
    for (i, gene_id) in means.gene_ids.iter().take(5).enumerate() {
        let row: Vec<String> = (0..means.n_conditions())
            .map(|c| format!("{:.1}", means.get(i, c)))
            .collect();
        println!("  {}\t{}", gene_id, row.join("\t"));
    }

    // Explore sample structure
    println!("\n=== Exploration ===\n");

    let log2 = output.log2.as_ref().expect("log2 step ran");
    let components = pca(log2, DEFAULT_N_TOP_GENES)?;
    println!(
        "PC1 explains {:.1}% of variance, PC2 {:.1}%",
        components.explained[0] * 100.0,
        components.explained[1] * 100.0
    );
    for (j, sample_id) in components.sample_ids.iter().enumerate() {
        println!(
            "  {}\tPC1={:+.2}\tPC2={:+.2}",
            sample_id,
            components.get(j, 0),
            components.get(j, 1)
        );
    }

    let distances = sample_distances(log2)?;
    println!("\nLargest sample distance:");
    let mut max = (0, 0, 0.0_f64);
    for a in 0..distances.n_samples() {
        for b in (a + 1)..distances.n_samples() {
            if distances.get(a, b) > max.2 {
                max = (a, b, distances.get(a, b));
            }
        }
    }
    println!(
        "  {} vs {}: {:.2}",
        distances.sample_ids[max.0], distances.sample_ids[max.1], max.2
    );

    Ok(())
}

/// Create a small synthetic dataset: 6 genes × 6 samples, two conditions,
/// with two genes responding to treatment and one gene too rare to keep.
fn create_example_data() -> Result<(CountMatrix, GeneLengthTable, Metadata)> {
    let n_genes = 6;
    let n_samples = 6;
    let mut tri_mat = TriMat::new((n_genes, n_samples));

    // Baseline expression per gene, roughly depth 10k per sample; the last
    // gene stays below the filter threshold.
    let base = [2000u64, 3000, 1500, 2500, 1000, 1];
    for gene in 0..n_genes {
        for sample in 0..n_samples {
            let treated = sample >= 3;
            let mut count = base[gene];
            // Genes 0 and 1 respond to treatment.
            if treated && gene == 0 {
                count *= 4;
            }
            if treated && gene == 1 {
                count /= 2;
            }
            // Mild fixed depth differences between well-expressed genes.
            if gene < 5 {
                count += (sample as u64) * 17;
            }
            if count > 0 {
                tri_mat.add_triplet(gene, sample, count);
            }
        }
    }

    let gene_ids: Vec<String> = (0..n_genes).map(|i| format!("gene_{}", i)).collect();
    let sample_ids: Vec<String> = (0..n_samples).map(|i| format!("sample_{}", i)).collect();
    let counts = CountMatrix::new(tri_mat.to_csr(), gene_ids.clone(), sample_ids)?;

    // Transcript lengths between 0.5kb and 3kb.
    let lengths_kb = vec![1.0, 2.0, 0.5, 3.0, 1.5, 1.0];
    let lengths = GeneLengthTable::new(gene_ids, lengths_kb)?;

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "sample_id\tcondition\tlibrary_type")?;
    for i in 0..n_samples {
        let condition = if i < 3 { "control" } else { "treated" };
        writeln!(file, "sample_{}\t{}\tpaired", i, condition)?;
    }
    file.flush()?;
    let metadata = Metadata::from_tsv(file.path())?;

    Ok((counts, lengths, metadata))
}
