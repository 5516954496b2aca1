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
fn zero_and_one_are_distinct_terminals() {
    let f = factory(1);
    let zero = Bdd::zero(&f);
    let one = Bdd::one(&f);
    assert!(zero.is_zero());
    assert!(one.is_one());
    assert_ne!(zero, one);
}

#[test]
fn and_of_literals() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let z = x.and(&y).unwrap();
    assert_eq!(z.sat_count().unwrap(), 1.0);
}

#[test]
fn or_of_literals() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let z = x.or(&y).unwrap();
    assert_eq!(z.sat_count().unwrap(), 3.0);
}

#[test]
fn not_of_var_equals_nvar() {
    let f = factory(1);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let nx = Bdd::nith_var(&f, 0).unwrap();
    assert_eq!(x.not().unwrap(), nx);
}

#[test]
fn xor_is_not_biimp() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let xor = x.xor(&y).unwrap();
    let biimp = x.biimp(&y).unwrap();
    assert_eq!(xor, biimp.not().unwrap());
}

#[test]
fn ite_matches_shannon_expansion() {
    let f = factory(3);
    let c = Bdd::ith_var(&f, 0).unwrap();
    let t = Bdd::ith_var(&f, 1).unwrap();
    let e = Bdd::ith_var(&f, 2).unwrap();
    let ite = c.ite(&t, &e).unwrap();
    let expected = c.and(&t).unwrap().or(&c.not().unwrap().and(&e).unwrap()).unwrap();
    assert_eq!(ite, expected);
}

#[test]
fn and_all_matches_pairwise_and() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let x1 = Bdd::ith_var(&f, 1).unwrap();
    let x2 = Bdd::ith_var(&f, 2).unwrap();
    let folded = and_all(&f, &[x0.clone(), x1.clone(), x2.clone()]).unwrap();
    let expected = x0.and(&x1).unwrap().and(&x2).unwrap();
    assert_eq!(folded, expected);
}

#[test]
fn and_all_of_empty_is_one() {
    let f = factory(1);
    let folded = and_all(&f, &[]).unwrap();
    assert!(folded.is_one());
}

#[test]
fn or_all_of_empty_is_zero() {
    let f = factory(1);
    let folded = or_all(&f, &[]).unwrap();
    assert!(folded.is_zero());
}

#[test]
fn and_all_free_consumes_and_matches_and_all() {
    let f = factory(3);
    let operands = vec![
        Bdd::ith_var(&f, 0).unwrap(),
        Bdd::ith_var(&f, 1).unwrap(),
        Bdd::ith_var(&f, 2).unwrap(),
    ];
    let expected = and_all(&f, &operands).unwrap();
    let folded = and_all_free(&f, operands).unwrap();
    assert_eq!(folded, expected);
}

#[test]
fn and_literals_builds_a_cube() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let nx1 = Bdd::nith_var(&f, 1).unwrap();
    let x2 = Bdd::ith_var(&f, 2).unwrap();
    let cube = and_literals(&f, &[x0, nx1, x2]).unwrap();
    assert_eq!(cube.sat_count().unwrap(), 1.0);
}

#[test]
fn exist_removes_quantified_variable() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let conj = x.and(&y).unwrap();
    let cube = and_literals(&f, &[Bdd::ith_var(&f, 0).unwrap()]).unwrap();
    let projected = conj.exist(&cube).unwrap();
    assert_eq!(projected, y);
}

#[test]
fn forall_of_tautology_is_one() {
    let f = factory(1);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let nx = Bdd::nith_var(&f, 0).unwrap();
    let taut = x.or(&nx).unwrap();
    let cube = and_literals(&f, &[x]).unwrap();
    assert!(taut.forall(&cube).unwrap().is_one());
}

#[test]
fn restrict_fixes_a_variable() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let conj = x.and(&y).unwrap();
    let cube = and_literals(&f, &[Bdd::nith_var(&f, 0).unwrap()]).unwrap();
    let restricted = conj.restrict(&cube).unwrap();
    assert!(restricted.is_zero());
}

#[test]
fn relprod_combines_and_and_exist() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let cube = and_literals(&f, &[Bdd::ith_var(&f, 0).unwrap()]).unwrap();
    let via_relprod = x.relprod(&y, &cube).unwrap();
    let via_and_exist = x.and(&y).unwrap().exist(&cube).unwrap();
    assert_eq!(via_relprod, via_and_exist);
}

#[test]
fn compose_substitutes_a_bdd_for_a_variable() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let x1 = Bdd::ith_var(&f, 1).unwrap();
    let x2 = Bdd::ith_var(&f, 2).unwrap();
    let target = x1.and(&x2).unwrap();
    let composed = x0.compose(0, &target).unwrap();
    assert_eq!(composed, target);
}

#[test]
fn replace_renames_variables() {
    let f = factory(2);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let mut builder = PairingBuilder::new();
    builder.set_var(0, 1);
    builder.set_var(1, 0);
    let pairing = f.freeze_and_install(&builder);
    let swapped = x0.replace(pairing).unwrap();
    assert_eq!(swapped, Bdd::ith_var(&f, 1).unwrap());
}

#[test]
fn support_collects_every_variable_once() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let x1 = Bdd::ith_var(&f, 1).unwrap();
    let fun = x0.and(&x1).unwrap().or(&x0).unwrap();
    let supp = fun.support().unwrap();
    assert_eq!(supp, and_literals(&f, &[Bdd::ith_var(&f, 0).unwrap(), Bdd::ith_var(&f, 1).unwrap()]).unwrap());
}

#[test]
fn sat_count_counts_satisfying_assignments_over_all_variables() {
    let f = factory(3);
    let x0 = Bdd::ith_var(&f, 0).unwrap();
    let x1 = Bdd::ith_var(&f, 1).unwrap();
    let x2 = Bdd::ith_var(&f, 2).unwrap();
    let fun = x0.and(&x1.or(&x2).unwrap()).unwrap();
    assert_eq!(fun.sat_count().unwrap(), 3.0);
}

#[test]
fn path_count_counts_paths_to_one() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let fun = x.or(&y).unwrap();
    assert_eq!(fun.path_count().unwrap(), 2.0);
}

#[test]
fn sat_one_returns_a_single_satisfying_cube() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let fun = x.and(&y).unwrap();
    let witness = fun.sat_one().unwrap();
    assert_eq!(witness.sat_count().unwrap(), 1.0);
    assert_eq!(witness, fun);
}

#[test]
fn sat_one_of_false_is_an_error() {
    let f = factory(1);
    let zero = Bdd::zero(&f);
    assert!(zero.sat_one().is_err());
}

#[test]
fn node_count_excludes_terminals() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    assert_eq!(x.node_count(), 1);
    let fun = x.and(&y).unwrap();
    assert_eq!(fun.node_count(), 2);
}

#[test]
fn cross_factory_operations_are_rejected() {
    let f1 = factory(1);
    let f2 = factory(1);
    let x = Bdd::ith_var(&f1, 0).unwrap();
    let y = Bdd::ith_var(&f2, 0).unwrap();
    assert!(matches!(x.and(&y), Err(BddError::CrossFactory { .. })));
}

#[test]
fn unknown_variable_is_rejected() {
    let f = factory(1);
    assert!(matches!(Bdd::ith_var(&f, 5), Err(BddError::UnknownVariable(5))));
}

#[test]
fn growing_var_num_makes_new_variables_usable() {
    let f = factory(1);
    assert!(Bdd::ith_var(&f, 2).is_err());
    f.grow_var_num(3).unwrap();
    assert!(Bdd::ith_var(&f, 2).is_ok());
}

#[test]
fn dot_string_is_a_well_formed_graph() {
    let f = factory(2);
    let x = Bdd::ith_var(&f, 0).unwrap();
    let y = Bdd::ith_var(&f, 1).unwrap();
    let fun = x.and(&y).unwrap();
    let dot = fun.dot_string();
    assert!(dot.contains("digraph"));
    assert!(dot.contains("->"));
}
