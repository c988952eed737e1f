//! Map topology: territories, adjacency, distances and route search.
//!
//! Distances are computed by breadth-first search over the adjacency lists.
//! The three static distance tables (land, sea, any) depend only on
//! topology, so they are built lazily once per map and reused for the rest
//! of the game. Searches that depend on live board state (ownership, enemy
//! units) take a predicate and run on demand.
//!
//! BFS visits neighbors in adjacency insertion order, which makes every route
//! and every tie between equal-length routes reproducible.

use std::collections::VecDeque;
use std::sync::OnceLock;

use super::order::Route;
use super::territory::{Territory, TerritoryId};

/// Distance value for unreachable pairs.
pub const UNREACHABLE: u32 = u32::MAX;

/// Which territories a distance table may step through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Passage {
    /// Passable land only.
    Land,
    /// Sea zones only.
    Sea,
    /// Any territory that is not impassable.
    Any,
}

/// Pre-computed all-pairs BFS distance table.
struct DistMatrix {
    n: usize,
    dist: Vec<u32>,
}

impl DistMatrix {
    fn get(&self, from: TerritoryId, to: TerritoryId) -> u32 {
        self.dist[from.index() * self.n + to.index()]
    }
}

/// Territories and their adjacency.
#[derive(Debug)]
pub struct GameMap {
    territories: Vec<Territory>,
    adjacency: Vec<Vec<TerritoryId>>,
    land: OnceLock<DistMatrix>,
    sea: OnceLock<DistMatrix>,
    any: OnceLock<DistMatrix>,
}

impl std::fmt::Debug for DistMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DistMatrix({}x{})", self.n, self.n)
    }
}

impl Clone for GameMap {
    fn clone(&self) -> Self {
        GameMap {
            territories: self.territories.clone(),
            adjacency: self.adjacency.clone(),
            land: OnceLock::new(),
            sea: OnceLock::new(),
            any: OnceLock::new(),
        }
    }
}

impl GameMap {
    /// Creates a map with no connections. Territory ids must equal their
    /// position in `territories`.
    pub fn new(territories: Vec<Territory>) -> Self {
        debug_assert!(territories
            .iter()
            .enumerate()
            .all(|(i, t)| t.id.index() == i));
        let n = territories.len();
        GameMap {
            territories,
            adjacency: vec![Vec::new(); n],
            land: OnceLock::new(),
            sea: OnceLock::new(),
            any: OnceLock::new(),
        }
    }

    /// Connects two territories in both directions. Duplicate and
    /// self connections are ignored.
    pub fn connect(&mut self, a: TerritoryId, b: TerritoryId) {
        if a == b || self.adjacency[a.index()].contains(&b) {
            return;
        }
        self.adjacency[a.index()].push(b);
        self.adjacency[b.index()].push(a);
        self.land = OnceLock::new();
        self.sea = OnceLock::new();
        self.any = OnceLock::new();
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }

    pub fn territory(&self, id: TerritoryId) -> &Territory {
        &self.territories[id.index()]
    }

    /// Mutable access for hosts that apply captures and factory changes.
    pub fn territory_mut(&mut self, id: TerritoryId) -> &mut Territory {
        &mut self.territories[id.index()]
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    /// Looks up a territory by name.
    pub fn find(&self, name: &str) -> Option<TerritoryId> {
        self.territories.iter().find(|t| t.name == name).map(|t| t.id)
    }

    pub fn neighbors(&self, t: TerritoryId) -> &[TerritoryId] {
        &self.adjacency[t.index()]
    }

    pub fn is_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.adjacency[a.index()].contains(&b)
    }

    /// Returns true when a land territory borders at least one sea zone.
    pub fn is_coastal(&self, t: TerritoryId) -> bool {
        !self.territory(t).is_water && self.neighbors(t).iter().any(|&n| self.territory(n).is_water)
    }

    /// Returns true when a land territory has no land neighbors.
    pub fn is_island(&self, t: TerritoryId) -> bool {
        !self.territory(t).is_water
            && !self
                .neighbors(t)
                .iter()
                .any(|&n| self.territory(n).is_passable_land())
    }

    fn admits(&self, t: TerritoryId, passage: Passage) -> bool {
        let terr = self.territory(t);
        match passage {
            Passage::Land => terr.is_passable_land(),
            Passage::Sea => terr.is_water,
            Passage::Any => !terr.impassable,
        }
    }

    fn matrix(&self, passage: Passage) -> &DistMatrix {
        let cell = match passage {
            Passage::Land => &self.land,
            Passage::Sea => &self.sea,
            Passage::Any => &self.any,
        };
        cell.get_or_init(|| self.build_matrix(passage))
    }

    /// Builds a BFS distance table restricted to one passage kind.
    fn build_matrix(&self, passage: Passage) -> DistMatrix {
        let n = self.territories.len();
        let mut dist = vec![UNREACHABLE; n * n];
        let mut queue = VecDeque::with_capacity(n);

        for src in 0..n {
            dist[src * n + src] = 0;
            if !self.admits(TerritoryId(src as u16), passage) {
                continue;
            }
            queue.clear();
            queue.push_back((src, 0u32));
            while let Some((cur, d)) = queue.pop_front() {
                for &next in &self.adjacency[cur] {
                    if !self.admits(next, passage) {
                        continue;
                    }
                    let cell = &mut dist[src * n + next.index()];
                    if *cell == UNREACHABLE {
                        *cell = d + 1;
                        queue.push_back((next.index(), d + 1));
                    }
                }
            }
        }

        DistMatrix { n, dist }
    }

    /// Steps between two territories through any passable territory.
    pub fn distance(&self, from: TerritoryId, to: TerritoryId) -> u32 {
        self.matrix(Passage::Any).get(from, to)
    }

    /// Steps between two land territories over land only.
    pub fn land_distance(&self, from: TerritoryId, to: TerritoryId) -> u32 {
        self.matrix(Passage::Land).get(from, to)
    }

    /// Steps between two sea zones over water only.
    pub fn sea_distance(&self, from: TerritoryId, to: TerritoryId) -> u32 {
        self.matrix(Passage::Sea).get(from, to)
    }

    /// Distance from `from` to every territory, indexed by territory id.
    pub fn distances_from(&self, from: TerritoryId, passage: Passage) -> Vec<u32> {
        let m = self.matrix(passage);
        (0..m.n)
            .map(|i| m.get(from, TerritoryId(i as u16)))
            .collect()
    }

    /// Shortest route from `from` to `to` in which every entered territory
    /// satisfies `passable`. The start is never tested.
    pub fn route<F>(&self, from: TerritoryId, to: TerritoryId, passable: F) -> Option<Route>
    where
        F: Fn(TerritoryId) -> bool,
    {
        if from == to {
            return Route::new(vec![from]);
        }
        let n = self.territories.len();
        let mut parent: Vec<Option<TerritoryId>> = vec![None; n];
        let mut seen = vec![false; n];
        seen[from.index()] = true;
        let mut queue = VecDeque::new();
        queue.push_back(from);

        while let Some(cur) = queue.pop_front() {
            for &next in self.neighbors(cur) {
                if seen[next.index()] || !passable(next) {
                    continue;
                }
                seen[next.index()] = true;
                parent[next.index()] = Some(cur);
                if next == to {
                    let mut path = vec![to];
                    let mut at = to;
                    while let Some(p) = parent[at.index()] {
                        path.push(p);
                        at = p;
                    }
                    path.reverse();
                    return Route::new(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Shortest route whose final step may be any territory while the
    /// intermediate steps satisfy `through`.
    pub fn route_into<F>(&self, from: TerritoryId, to: TerritoryId, through: F) -> Option<Route>
    where
        F: Fn(TerritoryId) -> bool,
    {
        self.route(from, to, |t| t == to || through(t))
    }

    /// Territories reachable from `t` in at most `radius` steps through
    /// territories satisfying `passable`, in BFS order. Excludes `t`.
    pub fn neighbors_within<F>(&self, t: TerritoryId, radius: u32, passable: F) -> Vec<TerritoryId>
    where
        F: Fn(TerritoryId) -> bool,
    {
        let n = self.territories.len();
        let mut seen = vec![false; n];
        seen[t.index()] = true;
        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((t, 0u32));

        while let Some((cur, d)) = queue.pop_front() {
            if d >= radius {
                continue;
            }
            for &next in self.neighbors(cur) {
                if seen[next.index()] || !passable(next) {
                    continue;
                }
                seen[next.index()] = true;
                out.push(next);
                queue.push_back((next, d + 1));
            }
        }
        out
    }

    /// Territories exactly `radius` steps away through non-impassable
    /// territory.
    pub fn exact_neighbors(&self, t: TerritoryId, radius: u32) -> Vec<TerritoryId> {
        let m = self.matrix(Passage::Any);
        (0..m.n)
            .map(|i| TerritoryId(i as u16))
            .filter(|&o| m.get(t, o) == radius)
            .collect()
    }
}
