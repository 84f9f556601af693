use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a buyer relates to a seller through the trust graph.
///
/// `Owner` (serialized as `"self"`) models listing ownership, not an
/// actual transaction; only `Direct` and `SecondDegree` permit a paid
/// trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    #[serde(rename = "self")]
    Owner,
    Direct,
    SecondDegree,
    None,
}

impl Relation {
    /// True for every relation except `None`: the seller's listings are
    /// visible to this buyer.
    pub fn allowed(self) -> bool {
        self != Relation::None
    }

    /// True only for `Direct` and `SecondDegree`, the relations that
    /// permit placing an order.
    pub fn tradeable(self) -> bool {
        matches!(self, Relation::Direct | Relation::SecondDegree)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Owner => "self",
            Relation::Direct => "direct",
            Relation::SecondDegree => "second_degree",
            Relation::None => "none",
        }
    }
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    pub relation: Relation,
}

impl Verdict {
    pub fn new(relation: Relation) -> Self {
        Self {
            allowed: relation.allowed(),
            relation,
        }
    }
}

/// Read-only view of the friendship graph. The store guarantees the
/// relation is symmetric: `b ∈ direct_connections(a)` iff
/// `a ∈ direct_connections(b)`.
pub trait ConnectionReads {
    fn direct_connections(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

/// Classify buyer × seller with a breadth-first search of depth exactly
/// two. The bound is policy, not an optimization: trade only with people
/// your friends vouch for, transitively once. Do not deepen it.
pub fn evaluate<S: ConnectionReads>(store: &S, buyer_id: Uuid, seller_id: Uuid) -> Result<Verdict> {
    if buyer_id == seller_id {
        return Ok(Verdict::new(Relation::Owner));
    }

    let friends = store.direct_connections(buyer_id)?;
    if friends.contains(&seller_id) {
        return Ok(Verdict::new(Relation::Direct));
    }

    for friend in &friends {
        if store.direct_connections(*friend)?.contains(&seller_id) {
            return Ok(Verdict::new(Relation::SecondDegree));
        }
    }

    Ok(Verdict::new(Relation::None))
}

/// Everyone the viewer can see, classified in one pass: the viewer
/// itself, every direct friend, and every friend-of-a-friend. Users not
/// in the returned map are `Relation::None`.
///
/// Agrees with [`evaluate`] on every pair (direct precedence included);
/// the feed uses this to avoid a per-listing graph walk.
pub fn reachable_within_two_hops<S: ConnectionReads>(
    store: &S,
    viewer_id: Uuid,
) -> Result<HashMap<Uuid, Relation>> {
    let friends = store.direct_connections(viewer_id)?;

    let mut reach: HashMap<Uuid, Relation> = HashMap::new();
    for friend in &friends {
        for neighbor in store.direct_connections(*friend)? {
            if neighbor != viewer_id && !friends.contains(&neighbor) {
                reach.insert(neighbor, Relation::SecondDegree);
            }
        }
    }
    for friend in friends {
        reach.insert(friend, Relation::Direct);
    }
    reach.insert(viewer_id, Relation::Owner);

    Ok(reach)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemGraph {
        edges: HashMap<Uuid, HashSet<Uuid>>,
    }

    impl MemGraph {
        fn link(&mut self, a: Uuid, b: Uuid) {
            self.edges.entry(a).or_default().insert(b);
            self.edges.entry(b).or_default().insert(a);
        }
    }

    impl ConnectionReads for MemGraph {
        fn direct_connections(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
            Ok(self.edges.get(&user_id).cloned().unwrap_or_default())
        }
    }

    fn users(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn self_trade_regardless_of_graph() {
        let graph = MemGraph::default();
        let x = Uuid::new_v4();
        let verdict = evaluate(&graph, x, x).unwrap();
        assert!(verdict.allowed);
        assert_eq!(verdict.relation, Relation::Owner);
    }

    #[test]
    fn chain_stops_at_two_hops() {
        // A–B–C–D: C is two hops from A, D is three.
        let ids = users(4);
        let mut graph = MemGraph::default();
        graph.link(ids[0], ids[1]);
        graph.link(ids[1], ids[2]);
        graph.link(ids[2], ids[3]);

        let direct = evaluate(&graph, ids[0], ids[1]).unwrap();
        assert_eq!(direct.relation, Relation::Direct);

        let second = evaluate(&graph, ids[0], ids[2]).unwrap();
        assert!(second.allowed);
        assert_eq!(second.relation, Relation::SecondDegree);

        let third = evaluate(&graph, ids[0], ids[3]).unwrap();
        assert!(!third.allowed);
        assert_eq!(third.relation, Relation::None);
    }

    #[test]
    fn direct_wins_over_second_degree() {
        // A–B directly, and also A–C–B.
        let ids = users(3);
        let mut graph = MemGraph::default();
        graph.link(ids[0], ids[1]);
        graph.link(ids[0], ids[2]);
        graph.link(ids[2], ids[1]);

        let verdict = evaluate(&graph, ids[0], ids[1]).unwrap();
        assert_eq!(verdict.relation, Relation::Direct);
    }

    #[test]
    fn unreachable_seller() {
        let ids = users(3);
        let mut graph = MemGraph::default();
        graph.link(ids[0], ids[1]);

        let verdict = evaluate(&graph, ids[0], ids[2]).unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.relation, Relation::None);
    }

    #[test]
    fn tradeable_excludes_owner_and_none() {
        assert!(!Relation::Owner.tradeable());
        assert!(Relation::Direct.tradeable());
        assert!(Relation::SecondDegree.tradeable());
        assert!(!Relation::None.tradeable());
    }

    #[test]
    fn closure_agrees_with_evaluate() {
        // Dense-ish fixture: a hub, a triangle hanging off it, a chain,
        // and an isolated pair.
        let ids = users(9);
        let mut graph = MemGraph::default();
        graph.link(ids[0], ids[1]);
        graph.link(ids[0], ids[2]);
        graph.link(ids[0], ids[3]);
        graph.link(ids[1], ids[2]);
        graph.link(ids[3], ids[4]);
        graph.link(ids[4], ids[5]);
        graph.link(ids[5], ids[6]);
        graph.link(ids[7], ids[8]);

        for &viewer in &ids {
            let reach = reachable_within_two_hops(&graph, viewer).unwrap();
            for &other in &ids {
                let expected = evaluate(&graph, viewer, other).unwrap().relation;
                let got = reach.get(&other).copied().unwrap_or(Relation::None);
                assert_eq!(got, expected, "viewer {viewer} vs {other}");
            }
        }
    }

    #[test]
    fn viewer_with_no_friends_sees_only_itself() {
        let graph = MemGraph::default();
        let viewer = Uuid::new_v4();
        let reach = reachable_within_two_hops(&graph, viewer).unwrap();
        assert_eq!(reach.len(), 1);
        assert_eq!(reach.get(&viewer), Some(&Relation::Owner));
    }
}
