use polychaos_doe::{DesignBuilder, MeshPolicy, QuadratureGrid, Random, SamplingMethod, SubsamplingPolicy};
use polychaos_poly::{Basis, Distribution, TruncationRule};

fn main() {
    let distributions = [
        Distribution::uniform(0., 1.).unwrap(),
        Distribution::uniform(-10., 10.).unwrap(),
        Distribution::normal(5., 1.).unwrap(),
    ];
    let n = 10;

    println!("Take {n} samples of");
    for d in distributions.iter() {
        println!("  {d}");
    }
    println!();

    println!("*** using random sampling");
    let samples = Random::new(&distributions).sample(n);
    println!("{samples}\n");

    println!("*** using quadrature grid sampling");
    let samples = QuadratureGrid::new(&distributions, &[3, 3, 3])
        .unwrap()
        .sample(n);
    println!("{samples}\n");

    let basis = Basis::build(3, 2, TruncationRule::TotalOrder).unwrap();
    println!("*** reduced design for {basis}");
    for (mesh, subsampling) in [
        (MeshPolicy::Tensor, SubsamplingPolicy::Random),
        (MeshPolicy::Tensor, SubsamplingPolicy::Qr),
        (MeshPolicy::MonteCarlo, SubsamplingPolicy::Random),
    ] {
        let design = DesignBuilder::new(&basis, &distributions)
            .mesh(mesh)
            .subsampling(subsampling)
            .seed(42)
            .build()
            .unwrap();
        println!("{mesh:?} mesh, {subsampling:?} subsampling: {design}");
        println!("{}\n", design.points());
    }
}
