use bddcore::prelude::*;

fn factory() -> BddFactory {
    let _ = env_logger::try_init();
    BddFactory::new("standard", FactoryConfig::default()).unwrap()
}

#[test]
fn value_picks_out_exactly_one_encoding() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    for k in 0..8u64 {
        let bdd = int.value(k).unwrap();
        assert_eq!(bdd.sat_count().unwrap(), 1.0);
    }
}

#[test]
fn distinct_values_are_disjoint() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    let three = int.value(3).unwrap();
    let five = int.value(5).unwrap();
    assert!(three.and(&five).unwrap().is_zero());
}

#[test]
fn geq_counts_the_right_number_of_values() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    // values 4..=7 satisfy `>= 4`: 4 out of 8 encodings.
    let geq = int.geq(4).unwrap();
    assert_eq!(geq.sat_count().unwrap(), 4.0);
}

#[test]
fn geq_of_zero_is_always_true() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    assert!(int.geq(0).unwrap().is_one());
}

#[test]
fn geq_beyond_max_value_is_unsatisfiable() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    assert!(int.geq(8).unwrap().is_zero());
}

#[test]
fn leq_is_complement_of_geq_plus_one() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    let leq3 = int.leq(3).unwrap();
    let geq4 = int.geq(4).unwrap();
    assert!(leq3.and(&geq4).unwrap().is_zero());
    assert!(leq3.or(&geq4).unwrap().is_one());
}

#[test]
fn range_matches_intersection_of_geq_and_leq() {
    let f = factory();
    let int = BddInteger::at(&f, 0, 3).unwrap();
    let range = int.range(2, 5).unwrap();
    let expected = int.geq(2).unwrap().and(&int.leq(5).unwrap()).unwrap();
    assert_eq!(range, expected);
    assert_eq!(range.sat_count().unwrap(), 4.0);
}

#[test]
fn at_grows_var_num_as_needed() {
    let f = factory();
    assert_eq!(f.var_num(), 0);
    let _int = PacketLengthInteger::at(&f, 0, 16).unwrap();
    assert_eq!(f.var_num(), 16);
}

#[test]
fn zero_width_integer_is_rejected() {
    let f = factory();
    assert!(IcmpCodeInteger::at(&f, 0, 0).is_err());
}

#[test]
fn newtype_integers_share_the_underlying_comparator_logic() {
    let f = factory();
    let icmp_type = IcmpTypeInteger::at(&f, 0, 8).unwrap();
    let plain = BddInteger::at(&f, 8, 8).unwrap();
    assert_eq!(
        icmp_type.value(3).unwrap().sat_count().unwrap(),
        plain.value(3).unwrap().sat_count().unwrap()
    );
}
