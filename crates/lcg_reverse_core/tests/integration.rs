//! End-to-end tests: reduction, enumeration and seed recovery together.

use std::collections::BTreeSet;

use lcg_reverse_core::{
    enumerate, Lcg, Lll, LllConfig, Matrix, MatrixLike, Optimize, OptimizeBuilder, RandomReverser,
    Rational, Relation, ReverserConfig, SearchSpace, Vector, VectorLike,
};
use num_bigint::BigInt;

fn points(basis: &Matrix, origin: &Vector, region: &Optimize) -> BTreeSet<Vec<BigInt>> {
    let space = SearchSpace::new(basis, origin).expect("square basis");
    enumerate(basis, origin, region)
        .expect("bounded region")
        .map(|x| {
            space
                .point(&x)
                .expect("point")
                .iter()
                .map(|c| c.to_integer())
                .collect()
        })
        .collect()
}

#[test]
fn test_reduced_basis_enumerates_same_points() {
    let basis: Matrix = "{{7, 2, 0}, {12, 5, 1}, {3, 0, 4}}".parse().expect("parse");
    let origin = Vector::from_ints(&[1i64, 0, -1]);
    let mut builder = OptimizeBuilder::of_size(3);
    for i in 0..3 {
        builder = builder
            .with_lower_bound(i, Rational::from(-15i64))
            .with_upper_bound(i, Rational::from(15i64));
    }
    let region = builder
        .with_constraint(Vector::from_ints(&[1i64, 1, 1]), Relation::AtMost, Rational::from(20i64))
        .build()
        .expect("region");

    let reduced = Lll::reduce(&basis, &LllConfig::default()).expect("reduce");
    assert_eq!(reduced.dependent_rows, 0);
    assert_eq!(reduced.transformations.determinant().expect("det").abs(), Rational::one());

    let direct = points(&basis, &origin, &region);
    let via_reduced = points(&reduced.basis, &origin, &region);
    assert!(!direct.is_empty());
    assert_eq!(direct, via_reduced);
}

#[test]
fn test_java_lattice_is_reduced() {
    let lcg = Lcg::JAVA;
    let modulus = Rational::from(lcg.modulus());
    let mut rows = vec![(1..=4u64)
        .map(|step| Rational::from(lcg.combine(step).multiplier))
        .collect::<Vector>()];
    for i in 0..4 {
        let mut row = Vector::zeros(4);
        row[i] = modulus.clone();
        rows.push(row);
    }
    let lattice = Matrix::from_rows(&rows).expect("rows");

    let config = LllConfig::default();
    let reduced = Lll::reduce(&lattice, &config).expect("reduce");
    assert_eq!(reduced.basis.row_count(), 4);
    assert_eq!(reduced.dependent_rows, 1);
    assert!(Lll::is_reduced(&reduced.basis, &config));

    // every reduced row is still a combination of the generators
    let product = reduced.transformations.multiply(&lattice).expect("multiply");
    for i in 0..4 {
        assert!(product.row(i).expect("row").equals(&reduced.basis.row(i).expect("row")));
    }
    assert!(product.row(4).expect("row").is_zero());
}

fn observe(lcg: Lcg, secret: u64, config: ReverserConfig) -> RandomReverser {
    let mut reverser = RandomReverser::new(lcg, config);
    for step in 1..=6u64 {
        let bits = lcg.top_bits(lcg.skip(secret, step), 16);
        reverser.add_top_bits(step, 16, bits).expect("observation");
    }
    reverser
}

#[test]
fn test_java_seed_recovery() {
    let secret = 0x1234_5678_9ABC;
    let reverser = observe(Lcg::JAVA, secret, ReverserConfig::default());
    assert_eq!(reverser.find_seeds().expect("search"), vec![secret]);
}

#[test]
fn test_java_seed_recovery_parallel() {
    let secret = 0xBEEF_0000_4242;
    let config = ReverserConfig {
        parallel: true,
        ..ReverserConfig::default()
    };
    let reverser = observe(Lcg::JAVA, secret, config);
    assert_eq!(reverser.find_seeds().expect("search"), vec![secret]);

    let lazy: Vec<u64> = reverser.seeds().expect("search").collect();
    assert_eq!(lazy, vec![secret]);
}

#[test]
fn test_java_next_int_outputs() {
    // new Random(42).nextInt() twice
    let lcg = Lcg::JAVA;
    let user_seed = 42u64;
    let initial = lcg.scramble(user_seed);
    let outputs: Vec<u64> = (1..=2u64).map(|step| lcg.top_bits(lcg.skip(initial, step), 32)).collect();
    assert_eq!(outputs[0] as u32 as i32, -1170105035);

    let mut reverser = RandomReverser::new(lcg, ReverserConfig::default());
    for (step, &output) in (1u64..).zip(&outputs) {
        reverser.add_top_bits(step, 32, output).expect("observation");
    }
    let seeds = reverser.find_seeds().expect("search");
    assert_eq!(seeds, vec![initial]);
    assert_eq!(lcg.scramble(seeds[0]), user_seed);
}
