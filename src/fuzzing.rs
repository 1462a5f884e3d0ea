//! Randomized model testing (quickcheck).

use std::collections::HashMap;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpNet, Ipv4Net};
use itertools::Itertools;
use quickcheck::Arbitrary;

use super::*;

#[derive(Debug, PartialEq, Clone, Copy)]
enum Operation<P, T> {
    Add(P, T),
    Remove(P),
    RemoveSubtree(P),
}

const DEFAULT_NUM_TESTS: usize = 1000;
const DEFAULT_GEN_SIZE: usize = 100;

fn proptest_runner<A: Arbitrary + Debug + PartialEq, F: Fn(A) -> bool>(f: F) {
    let num_tests: usize = std::env::var("QUICKCHECK_TESTS")
        .ok()
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(DEFAULT_NUM_TESTS);

    let gen_size: usize = std::env::var("QUICKCHECK_GENERATOR_SIZE")
        .ok()
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(DEFAULT_GEN_SIZE);

    let mut gen = quickcheck::Gen::new(gen_size);

    for _ in 0..num_tests {
        let input = A::arbitrary(&mut gen);
        let input_c = input.clone();
        if !f(input_c) {
            shrink_failure(f, input)
        }
    }
}

fn shrink_failure<A: Arbitrary + Debug + PartialEq, F: Fn(A) -> bool>(f: F, input: A) -> ! {
    for i in input.shrink() {
        let i_c = i.clone();
        if !f(i_c) {
            shrink_failure(f, i)
        }
    }
    // if we reach this point, then all shrunken inputs work. Therefore,
    // `input` is the minimal failing input.
    panic!(
        "[QUICKCHECK] Test case failed!\n  Minimal input:\n    {:?}",
        input
    );
}

macro_rules! qc {
    ($name:ident, $f:ident) => {
        #[test]
        fn $name() {
            proptest_runner($f)
        }
    };
}

/// A masked IPv4 prefix with a short length, so that random prefixes
/// actually overlap and nest.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
struct TestPrefix(u32, u8);

impl TestPrefix {
    fn masked(addr: u32, len: u8) -> Self {
        let addr = if len == 0 { 0 } else { addr & (!0u32 << (32 - len)) };
        TestPrefix(addr, len)
    }

    fn net(self) -> IpNet {
        IpNet::V4(Ipv4Net::new(Ipv4Addr::from(self.0), self.1).unwrap())
    }

    fn contains(self, addr: u32) -> bool {
        self.1 == 0 || (addr ^ self.0) >> (32 - self.1 as u32) == 0
    }

    /// `other` lies inside `self`.
    fn covers(self, other: TestPrefix) -> bool {
        self.1 <= other.1 && self.contains(other.0)
    }
}

impl Debug for TestPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let addr = format!("{:032b}", self.0)[..10].to_string();
        write!(f, "0b{addr}/{}", self.1)
    }
}

impl Arbitrary for TestPrefix {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        #[rustfmt::skip]
        let len: u8 = *g
            .choose(&[
                0,
                1, 1,
                2, 2, 2,
                3, 3, 3, 3,
                4, 4, 4, 4, 4,
                5, 5, 5, 5, 5, 5,
                6, 6, 6, 6, 6, 6, 6,
                7, 7, 7, 7, 7, 7, 7, 7,
                8, 8, 8, 8, 8, 8, 8, 8, 8,
                9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
            ])
            .unwrap();
        Self::masked(u32::arbitrary(g), len)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        if self.1 == 0 {
            quickcheck::empty_shrinker()
        } else {
            quickcheck::single_shrinker(Self::masked(self.0, self.1 - 1))
        }
    }
}

impl<P: Arbitrary, T: Arbitrary> Arbitrary for Operation<P, T> {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let p = P::arbitrary(g);
        match g.choose(&[0, 0, 0, 0, 0, 0, 1, 1, 2]).copied().unwrap_or(0) {
            0 => Self::Add(p, T::arbitrary(g)),
            1 => Self::Remove(p),
            _ => Self::RemoveSubtree(p),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self {
            Operation::Add(p, t) => {
                let t = t.clone();
                Box::new(
                    p.clone()
                        .shrink()
                        .map(move |p| Operation::Add(p, t.clone())),
                )
            }
            Operation::Remove(p) => Box::new(p.clone().shrink().map(Operation::Remove)),
            Operation::RemoveSubtree(p) => {
                Box::new(p.clone().shrink().map(Operation::RemoveSubtree))
            }
        }
    }
}

fn entries(trie: &LpmTrie<i32>) -> Vec<(IpNet, i32)> {
    trie.iter().map(|(p, v)| (*p, *v)).collect()
}

fn model_entries(model: &HashMap<TestPrefix, i32>) -> Vec<(IpNet, i32)> {
    model.iter().map(|(p, t)| (p.net(), *t)).sorted().collect()
}

qc!(inserts_match_model, _inserts_match_model);
fn _inserts_match_model(list: Vec<(TestPrefix, i32)>) -> bool {
    let mut trie = LpmTrie::new();
    let mut model = HashMap::new();

    for (p, t) in list {
        trie.set_net(p.net(), t);
        model.insert(p, t);
    }

    trie.len() == model.len() && entries(&trie) == model_entries(&model)
}

qc!(mods_match_model, _mods_match_model);
fn _mods_match_model(list: Vec<Operation<TestPrefix, i32>>) -> bool {
    let mut trie = LpmTrie::new();
    let mut model = HashMap::new();

    for op in list {
        match op {
            Operation::Add(p, t) => {
                trie.set_net(p.net(), t);
                model.insert(p, t);
            }
            Operation::Remove(p) => {
                let _ = trie.remove_net(p.net());
                model.remove(&p);
            }
            Operation::RemoveSubtree(p) => {
                let _ = trie.remove_subtree_net(p.net());
                model.retain(|q, _| !p.covers(*q));
            }
        }
    }

    trie.len() == model.len() && entries(&trie) == model_entries(&model)
}

qc!(lpm_matches_model, _lpm_matches_model);
fn _lpm_matches_model(list: Vec<(TestPrefix, i32)>) -> bool {
    let mut trie = LpmTrie::new();
    let mut model = HashMap::new();

    for (p, t) in list {
        trie.set_net(p.net(), t);
        model.insert(p, t);
    }

    // probe the base address of every stored prefix plus a few constants
    let probes: Vec<u32> = model.keys().map(|p| p.0).chain([0, !0, 0x0a000001]).collect();
    probes.into_iter().all(|addr| {
        let expect = model
            .iter()
            .filter(|(p, _)| p.contains(addr))
            .max_by_key(|(p, _)| p.1)
            .map(|(_, t)| t);
        trie.find_addr(IpAddr::V4(Ipv4Addr::from(addr))) == expect
    })
}

qc!(removals_restore_the_trie, _removals_restore_the_trie);
fn _removals_restore_the_trie(list: Vec<(TestPrefix, i32)>) -> bool {
    let mut trie = LpmTrie::new();
    let empty_nodes = trie.table.len();

    for (p, t) in &list {
        trie.set_net(p.net(), *t);
    }
    for (p, _) in &list {
        let _ = trie.remove_net(p.net());
    }

    // every node outside the permanent ones is back on the free-list
    trie.is_empty() && trie.table.len() - trie.table.free_len() <= empty_nodes
}
