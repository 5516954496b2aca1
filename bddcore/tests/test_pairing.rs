use bddcore::prelude::*;

fn factory(var_num: u32) -> BddFactory {
    let _ = env_logger::try_init();
    let config = FactoryConfig {
        var_num,
        ..FactoryConfig::default()
    };
    BddFactory::new("standard", config).unwrap()
}

#[test]
fn identity_pairing_is_a_no_op() {
    let f = factory(2);
    let fun = Bdd::ith_var(&f, 0).unwrap().and(&Bdd::ith_var(&f, 1).unwrap()).unwrap();
    let mut builder = PairingBuilder::new();
    builder.set_var(0, 0);
    builder.set_var(1, 1);
    let pairing = f.freeze_and_install(&builder);
    assert_eq!(fun.replace(pairing).unwrap(), fun);
}

#[test]
fn swapping_pairing_is_its_own_inverse() {
    let f = factory(2);
    let fun = Bdd::ith_var(&f, 0).unwrap().and(&Bdd::nith_var(&f, 1).unwrap()).unwrap();
    let mut builder = PairingBuilder::new();
    builder.set_var(0, 1);
    builder.set_var(1, 0);
    let pairing = f.freeze_and_install(&builder);
    let swapped_twice = fun.replace(pairing).unwrap().replace(pairing).unwrap();
    assert_eq!(swapped_twice, fun);
}

#[test]
fn reversing_order_falls_back_to_compose_but_still_substitutes_correctly() {
    let f = factory(3);
    let fun = Bdd::ith_var(&f, 0).unwrap().and(&Bdd::ith_var(&f, 2).unwrap()).unwrap();
    // 0 -> 2, 2 -> 0 reverses relative order, forcing the compose fallback.
    let mut builder = PairingBuilder::new();
    builder.set_var(0, 2);
    builder.set_var(2, 0);
    let pairing = f.freeze_and_install(&builder);
    let expected = Bdd::ith_var(&f, 2).unwrap().and(&Bdd::ith_var(&f, 0).unwrap()).unwrap();
    assert_eq!(fun.replace(pairing).unwrap(), expected);
}

#[test]
fn a_jump_over_an_unmapped_variable_also_falls_back_to_compose() {
    // var_num=3, only var 0 is remapped (to 2); var 1 is left implicit and keeps its own
    // position. The explicit entries alone look monotonic (there's only one), but 0 -> 2 jumps
    // past the untouched var 1, which would build a node whose child sits above its parent if
    // taken via the fast rename path.
    let f = factory(3);
    let fun = Bdd::ith_var(&f, 0).unwrap().and(&Bdd::ith_var(&f, 1).unwrap()).unwrap();
    let mut builder = PairingBuilder::new();
    builder.set_var(0, 2);
    let pairing = f.freeze_and_install(&builder);
    let expected = Bdd::ith_var(&f, 2).unwrap().and(&Bdd::ith_var(&f, 1).unwrap()).unwrap();
    let replaced = fun.replace(pairing).unwrap();
    assert_eq!(replaced, expected);
    assert_eq!(replaced.sat_count().unwrap(), 2.0);
}

#[test]
fn substituting_a_bdd_for_a_variable_matches_compose() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let x1 = Bdd::ith_var(&f, 1).unwrap();
    let x2 = Bdd::ith_var(&f, 2).unwrap();
    let target = x1.or(&x2).unwrap();
    let mut builder = PairingBuilder::new();
    builder.set_bdd(0, target.node_index());
    let pairing = f.freeze_and_install(&builder);
    let via_pairing = x0.replace(pairing).unwrap();
    let via_compose = x0.compose(0, &target).unwrap();
    assert_eq!(via_pairing, via_compose);
}

#[test]
fn identical_pairings_built_independently_share_an_id() {
    let f = factory(2);
    let mut builder_a = PairingBuilder::new();
    builder_a.set_var(0, 1);
    builder_a.set_var(1, 0);
    let mut builder_b = PairingBuilder::new();
    builder_b.set_var(1, 0);
    builder_b.set_var(0, 1);
    let id_a = f.freeze_and_install(&builder_a);
    let id_b = f.freeze_and_install(&builder_b);
    assert_eq!(id_a, id_b);
}

#[test]
fn unknown_pairing_id_is_rejected() {
    let f = factory(1);
    let x = Bdd::ith_var(&f, 0).unwrap();
    assert!(matches!(x.replace(999), Err(BddError::Configuration(_))));
}
