//! Basic example demonstrating the imputation pipeline.
//!
//! This example shows how to:
//! 1. Create synthetic data with abundance-dependent dropout
//! 2. Profile missingness
//! 3. Run filter, MCAR test, imputation and combination
//! 4. Examine the completed matrix

use proteo_impute::prelude::*;

fn main() -> Result<()> {
    println!("=== Proteomics Imputation Example ===\n");

    let matrix = create_example_data()?;

    println!("Data dimensions:");
    println!("  Proteins: {}", matrix.n_proteins());
    println!("  Samples:  {}", matrix.n_samples());
    println!();

    println!("=== Missingness Profile ===\n");
    let profile = profile_missingness(&matrix, 5)?;
    println!("{}", profile);

    println!("=== Running Pipeline ===\n");
    let output = Pipeline::new()
        .name("rf-example")
        .filter_missingness(0.2) // Keep proteins missing in ≤20% of samples
        .test_mcar()
        .impute(ImputeMethod::Rf, 3, 5, 42)
        .combine(Selection::Index(0))
        .run(&matrix)?;

    if let Some(filter) = &output.filter {
        println!("{}", filter);
    }
    match (&output.mcar, &output.mcar_error) {
        (Some(mcar), _) => println!("{}", mcar),
        (None, Some(err)) => println!("MCAR test skipped: {}\n", err),
        _ => {}
    }

    if let Some(ensemble) = &output.ensemble {
        println!("Imputed {} cells in {} datasets", ensemble.imputed_cells.len(), ensemble.len());
        for (k, run) in ensemble.members.iter().enumerate() {
            let last = run.trace.last().copied().unwrap_or(0.0);
            println!(
                "  member {}: {} iterations, final mean change {:.4}",
                k, run.iterations, last
            );
        }
        println!();
    }

    if let Some(completed) = &output.completed {
        println!("=== Completed Matrix (first 5 proteins) ===\n");
        print!("{:<12}", "Protein");
        for id in &completed.sample_ids {
            print!(" {:>9}", id);
        }
        println!();
        println!("{}", "-".repeat(12 + 10 * completed.n_samples()));
        for (i, id) in completed.protein_ids.iter().take(5).enumerate() {
            print!("{:<12}", id);
            for j in 0..completed.n_samples() {
                print!(" {:>9.3}", completed.get(i, j));
            }
            println!();
        }
        println!(
            "\nReference center {:.3}, reference spread {:.3}",
            completed.reference_center, completed.reference_spread
        );
    }

    println!("\n=== Pipeline Configuration (YAML) ===\n");
    let config = Pipeline::new()
        .name("rf-example")
        .filter_missingness(0.2)
        .test_mcar()
        .impute(ImputeMethod::Rf, 3, 5, 42)
        .combine(Selection::Index(0))
        .to_config(Some("Random-forest imputation with MAD normalization"));
    println!("{}", config.to_yaml()?);

    Ok(())
}

/// Create example data where low-abundance proteins drop out more often.
fn create_example_data() -> Result<AbundanceMatrix> {
    let n_proteins = 60;
    let n_samples = 10;

    let mut seed = 12345u64;
    let mut rand_uniform = || -> f64 {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut values = Vec::with_capacity(n_proteins * n_samples);
    for p in 0..n_proteins {
        let intensity = 1.0e5 * (1.0 + p as f64 * 0.15);
        let dropout = if p < 10 { 0.5 } else if p < 30 { 0.08 } else { 0.0 };
        for s in 0..n_samples {
            let loading = 0.8 + 0.05 * s as f64;
            let noise = 0.85 + 0.3 * rand_uniform();
            if rand_uniform() < dropout {
                values.push(f64::NAN);
            } else {
                values.push(intensity * loading * noise);
            }
        }
    }

    let protein_ids = (0..n_proteins).map(|i| format!("PROT{:03}", i)).collect();
    let sample_ids = (0..n_samples).map(|i| format!("S{:02}", i)).collect();
    AbundanceMatrix::from_row_slice(n_proteins, n_samples, &values, protein_ids, sample_ids)
}
