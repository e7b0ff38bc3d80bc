use env_logger::{Builder, Env};
use linfa::prelude::*;
use ndarray::{Array1, Array2, Zip};
use polychaos_doe::DesignBuilder;
use polychaos_pce::PolynomialChaos;
use polychaos_poly::{Basis, Distribution, TruncationRule};

const NB_SEGMENTS: usize = 15;

/// Tip deflection of a cantilever beam made of segments of given thicknesses
/// under a unit tip load (Euler-Bernoulli, unit width and Young modulus).
fn deflection(thicknesses: &Array2<f64>) -> Array1<f64> {
    let length = 1.;
    let dl = length / NB_SEGMENTS as f64;
    let mut y = Array1::zeros(thicknesses.nrows());
    Zip::from(&mut y)
        .and(thicknesses.rows())
        .for_each(|y, h| {
            *y = h
                .iter()
                .enumerate()
                .map(|(i, hi)| {
                    // bending moment arm at the segment middle
                    let arm = length - (i as f64 + 0.5) * dl;
                    let inertia = hi * hi * hi / 12.;
                    arm * arm * dl / inertia
                })
                .sum::<f64>()
                * 1e-3;
        });
    y
}

fn main() {
    let env = Env::new().filter_or("POLYCHAOS_LOG", "info");
    let mut builder = Builder::from_env(env);
    builder.target(env_logger::Target::Stdout).try_init().ok();

    let thickness = Distribution::uniform(0.05, 0.15).expect("valid distribution");
    let distributions = vec![thickness; NB_SEGMENTS];
    let basis =
        Basis::build(NB_SEGMENTS, 2, TruncationRule::TotalOrder).expect("basis built");
    println!("{basis}");

    let design = DesignBuilder::new(&basis, &distributions)
        .seed(42)
        .build()
        .expect("design built");
    println!("{design}");

    let xt = design.points().to_owned();
    let yt = deflection(&xt);
    let pce = PolynomialChaos::params(&distributions, basis)
        .fit(&Dataset::new(xt, yt))
        .expect("PCE fitted");
    println!("{pce}");

    let sobol = pce.sobol_indices();
    println!("First order Sobol' indices:");
    for (i, s) in sobol.first_order().iter().enumerate() {
        println!("  x{:<2} {s:.4}", i + 1);
    }
    let second = sobol.second_order();
    let max_interaction = second
        .iter()
        .fold(0f64, |acc, (_, s)| acc.max(*s));
    println!("Largest second order index: {max_interaction:.2e}");
    println!("Total Sobol' indices: {:.4}", sobol.total());
}
