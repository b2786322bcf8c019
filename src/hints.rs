//! Hints: which cells can still be matched and which chain to click next.
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::engine::{CellKey, Grid};
use crate::playability::MIN_MATCH_LEN;

/// Every cell that belongs to a same-color region of at least [`MIN_MATCH_LEN`]
/// cells, ignoring cells already matched and waiting for removal.
///
/// This is the set a front-end highlights as "possible moves".
///
/// # Examples
/// ```
/// use block_blast::hints::possible_moves;
/// use block_blast::utils::grid_from_str_array;
/// use std::collections::BTreeSet;
///
/// let grid = grid_from_str_array(&["001", "122"]).unwrap();
/// assert!(possible_moves(&grid, &BTreeSet::new()).is_empty());
/// ```
pub fn possible_moves(grid: &Grid, matched: &BTreeSet<CellKey>) -> BTreeSet<CellKey> {
    let excluded: HashSet<CellKey> = matched.iter().copied().collect();
    grid.find_all_regions(MIN_MATCH_LEN, &excluded)
        .into_iter()
        .flatten()
        .collect()
}

/// Orders the cells of a connected region into a chain the player can click.
///
/// Each cell of the returned chain is adjacent to the previous one, so clicking
/// them in order builds a valid selection. The walk is greedy: from every start
/// cell it repeatedly steps to the unvisited neighbour with the fewest onward
/// neighbours (ties go to the smaller cell key), and the longest walk wins. For a
/// region of `n >= 3` connected cells the chain has at least three cells.
///
/// # Arguments
/// * `grid`: the board the region was taken from.
/// * `region`: cells of one same-color region, in any order.
///
/// # Returns
/// The chain, empty if `region` is empty.
pub fn chain_through(grid: &Grid, region: &[CellKey]) -> Vec<CellKey> {
    let members: BTreeSet<CellKey> = region
        .iter()
        .copied()
        .filter(|k| grid.get(k.row, k.col).is_some())
        .collect();

    let mut best: Vec<CellKey> = Vec::new();
    for &start in &members {
        let walk = greedy_walk(&members, start);
        if walk.len() > best.len() {
            best = walk;
        }
        if best.len() == members.len() {
            break;
        }
    }
    best
}

fn neighbours<'a>(
    members: &'a BTreeSet<CellKey>,
    cell: CellKey,
    used: &'a HashSet<CellKey>,
) -> impl Iterator<Item = CellKey> + 'a {
    members
        .iter()
        .copied()
        .filter(move |k| k.is_adjacent_to(&cell) && !used.contains(k))
}

fn greedy_walk(members: &BTreeSet<CellKey>, start: CellKey) -> Vec<CellKey> {
    let mut used = HashSet::from([start]);
    let mut walk = vec![start];
    let mut current = start;

    loop {
        let next = neighbours(members, current, &used)
            .min_by_key(|&candidate| (neighbours(members, candidate, &used).count(), candidate));
        let Some(next) = next else {
            break;
        };
        used.insert(next);
        walk.push(next);
        current = next;
    }
    walk
}

/// How the scripted player picks its next chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The region yielding the longest clickable chain. Longer chains score more.
    LongestChain,
    /// The region with the most cells.
    LargestRegion,
    /// The first region in row-major order.
    FirstFound,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::LongestChain,
        Strategy::LargestRegion,
        Strategy::FirstFound,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::LongestChain => "longest-chain",
            Strategy::LargestRegion => "largest-region",
            Strategy::FirstFound => "first-found",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown strategy '{}', expected one of: longest-chain, largest-region, first-found",
                    s
                )
            })
    }
}

/// Suggests the next chain to click, in click order.
///
/// # Returns
/// * `Some(chain)` with at least [`MIN_MATCH_LEN`] cells.
/// * `None` if the board has no move left outside `matched`.
pub fn suggest_chain(
    grid: &Grid,
    matched: &BTreeSet<CellKey>,
    strategy: Strategy,
) -> Option<Vec<CellKey>> {
    let excluded: HashSet<CellKey> = matched.iter().copied().collect();
    let regions = grid.find_all_regions(MIN_MATCH_LEN, &excluded);

    let chain = match strategy {
        Strategy::FirstFound => regions.first().map(|region| chain_through(grid, region)),
        Strategy::LargestRegion => regions
            .iter()
            .enumerate()
            // earliest region wins ties
            .max_by_key(|(i, region)| (region.len(), std::cmp::Reverse(*i)))
            .map(|(_, region)| chain_through(grid, region)),
        Strategy::LongestChain => regions
            .iter()
            .map(|region| chain_through(grid, region))
            .enumerate()
            .max_by_key(|(i, chain)| (chain.len(), std::cmp::Reverse(*i)))
            .map(|(_, chain)| chain),
    }?;

    (chain.len() >= MIN_MATCH_LEN).then_some(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grid_from_str_array;

    fn keys(cells: &[(usize, usize)]) -> Vec<CellKey> {
        cells.iter().map(|&(r, c)| CellKey::new(r, c)).collect()
    }

    fn assert_clickable(chain: &[CellKey], grid: &Grid) {
        let color = grid.color_at(chain[0].row, chain[0].col);
        for pair in chain.windows(2) {
            assert!(pair[0].is_adjacent_to(&pair[1]), "{:?} breaks the chain", pair);
            assert_eq!(grid.color_at(pair[1].row, pair[1].col), color);
        }
    }

    #[test]
    fn test_possible_moves_skips_small_and_matched_regions() {
        let grid = grid_from_str_array(&[
            "0012", //
            "1112", //
            "2232",
        ])
        .unwrap();
        let moves = possible_moves(&grid, &BTreeSet::new());
        let expected: BTreeSet<CellKey> =
            keys(&[(0, 2), (1, 0), (1, 1), (1, 2), (0, 3), (1, 3), (2, 3)])
                .into_iter()
                .collect();
        assert_eq!(moves, expected);

        let matched: BTreeSet<CellKey> = keys(&[(1, 1)]).into_iter().collect();
        let moves = possible_moves(&grid, &matched);
        assert!(!moves.contains(&CellKey::new(1, 0)));
        assert!(moves.contains(&CellKey::new(2, 3)));
    }

    #[test]
    fn test_chain_through_line_and_l_shape() {
        let grid = grid_from_str_array(&[
            "000", //
            "110", //
            "220",
        ])
        .unwrap();
        let region = keys(&[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]);
        let chain = chain_through(&grid, &region);
        assert_eq!(chain.len(), 5);
        assert_clickable(&chain, &grid);
    }

    #[test]
    fn test_chain_through_plus_shape_finds_three() {
        let grid = grid_from_str_array(&[
            "101", //
            "000", //
            "101",
        ])
        .unwrap();
        let region = keys(&[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)]);
        let chain = chain_through(&grid, &region);
        assert_eq!(chain.len(), 3);
        assert_clickable(&chain, &grid);
    }

    #[test]
    fn test_chain_through_block_covers_all_cells() {
        let grid = grid_from_str_array(&[
            "000", //
            "000",
        ])
        .unwrap();
        let region: Vec<CellKey> = grid.blocks().map(|(k, _)| k).collect();
        let chain = chain_through(&grid, &region);
        assert_eq!(chain.len(), 6);
        assert_clickable(&chain, &grid);
        assert!(chain_through(&grid, &[]).is_empty());
    }

    #[test]
    fn test_strategies_pick_different_regions() {
        let grid = grid_from_str_array(&[
            "00012", //
            "11312", //
            "11332", //
            "44444",
        ])
        .unwrap();
        let none = BTreeSet::new();

        let first = suggest_chain(&grid, &none, Strategy::FirstFound).unwrap();
        assert_eq!(grid.color_at(first[0].row, first[0].col), Some(0));

        let largest = suggest_chain(&grid, &none, Strategy::LargestRegion).unwrap();
        assert_eq!(grid.color_at(largest[0].row, largest[0].col), Some(4));
        assert_eq!(largest.len(), 5);

        let longest = suggest_chain(&grid, &none, Strategy::LongestChain).unwrap();
        assert_eq!(longest.len(), 5);
        for chain in [&first, &largest, &longest] {
            assert_clickable(chain, &grid);
        }
    }

    #[test]
    fn test_no_suggestion_on_stuck_board() {
        let grid = grid_from_str_array(&[
            "0101", //
            "1010",
        ])
        .unwrap();
        for strategy in Strategy::ALL {
            assert_eq!(suggest_chain(&grid, &BTreeSet::new(), strategy), None);
        }
    }

    #[test]
    fn test_strategy_names_parse_back() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
        }
        assert!("best".parse::<Strategy>().is_err());
    }
}
