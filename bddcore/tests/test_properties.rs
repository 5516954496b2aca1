use bddcore::prelude::*;
use quickcheck_macros::quickcheck;

const VAR_NUM: u32 = 4;

fn factory() -> BddFactory {
    let _ = env_logger::try_init();
    let config = FactoryConfig {
        var_num: VAR_NUM,
        ..FactoryConfig::default()
    };
    BddFactory::new("standard", config).unwrap()
}

fn lit(f: &BddFactory, choice: u8) -> Bdd {
    let v = (choice % VAR_NUM as u8) as u32;
    if choice % (VAR_NUM as u8 * 2) >= VAR_NUM as u8 {
        Bdd::nith_var(f, v).unwrap()
    } else {
        Bdd::ith_var(f, v).unwrap()
    }
}

#[quickcheck]
fn and_is_commutative(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.and(&y).unwrap() == y.and(&x).unwrap()
}

#[quickcheck]
fn or_is_commutative(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.or(&y).unwrap() == y.or(&x).unwrap()
}

#[quickcheck]
fn and_is_associative(a: u8, b: u8, c: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let z = lit(&f, c);
    x.and(&y).unwrap().and(&z).unwrap() == x.and(&y.and(&z).unwrap()).unwrap()
}

#[quickcheck]
fn or_is_associative(a: u8, b: u8, c: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let z = lit(&f, c);
    x.or(&y).unwrap().or(&z).unwrap() == x.or(&y.or(&z).unwrap()).unwrap()
}

#[quickcheck]
fn and_distributes_over_or(a: u8, b: u8, c: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let z = lit(&f, c);
    let lhs = x.and(&y.or(&z).unwrap()).unwrap();
    let rhs = x.and(&y).unwrap().or(&x.and(&z).unwrap()).unwrap();
    lhs == rhs
}

#[quickcheck]
fn double_negation_is_identity(a: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    x.not().unwrap().not().unwrap() == x
}

#[quickcheck]
fn de_morgan_and(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let lhs = x.and(&y).unwrap().not().unwrap();
    let rhs = x.not().unwrap().or(&y.not().unwrap()).unwrap();
    lhs == rhs
}

#[quickcheck]
fn de_morgan_or(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let lhs = x.or(&y).unwrap().not().unwrap();
    let rhs = x.not().unwrap().and(&y.not().unwrap()).unwrap();
    lhs == rhs
}

#[quickcheck]
fn idempotence(a: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    x.and(&x).unwrap() == x && x.or(&x).unwrap() == x
}

#[quickcheck]
fn xor_is_self_inverse(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.xor(&y).unwrap().xor(&y).unwrap() == x
}

#[quickcheck]
fn nand_is_and_then_not(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.nand(&y).unwrap() == x.and(&y).unwrap().not().unwrap()
}

#[quickcheck]
fn imp_matches_not_or(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.imp(&y).unwrap() == x.not().unwrap().or(&y).unwrap()
}

#[quickcheck]
fn ite_with_constant_condition_picks_a_branch(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    let one = Bdd::one(&f);
    let zero = Bdd::zero(&f);
    one.ite(&x, &y).unwrap() == x && zero.ite(&x, &y).unwrap() == y
}

#[quickcheck]
fn sat_count_is_invariant_under_and_commutativity(a: u8, b: u8) -> bool {
    let f = factory();
    let x = lit(&f, a);
    let y = lit(&f, b);
    x.and(&y).unwrap().sat_count().unwrap() == y.and(&x).unwrap().sat_count().unwrap()
}
