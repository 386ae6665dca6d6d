use std::collections::HashMap;

use glam::Vec2;

use crate::{core::particle::Particle, utils::math::cell_coord};

pub type CellCoord = (i32, i32);

const MOORE_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Uniform grid over particle centers used by the broad-phase.
///
/// Cells are square with side equal to the particle diameter, so any overlapping pair
/// sits in the same or an adjacent cell. Entries are dense particle indices; `cell_of`
/// is parallel to the particle array. Cells are created on first use, which in practice
/// limits them to the container's footprint.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<u32>>,
    cell_of: Vec<CellCoord>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            cell_of: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.cell_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_of.is_empty()
    }

    #[inline]
    pub fn cell_for(&self, position: Vec2) -> CellCoord {
        cell_coord(position, self.cell_size)
    }

    /// Cell currently recorded for the particle at `index`.
    pub fn cell_of(&self, index: usize) -> Option<CellCoord> {
        self.cell_of.get(index).copied()
    }

    pub fn cell(&self, coord: CellCoord) -> &[u32] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rebuilds every bucket from scratch. Cell allocations are reused.
    pub fn build(&mut self, particles: &[Particle]) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.cell_of.clear();
        self.cell_of.reserve(particles.len());

        for (index, particle) in particles.iter().enumerate() {
            let coord = self.cell_for(particle.position);
            self.cells.entry(coord).or_default().push(index as u32);
            self.cell_of.push(coord);
        }
    }

    /// Replaces the cell size and rebuilds.
    pub fn resize(&mut self, cell_size: f32, particles: &[Particle]) {
        self.cell_size = cell_size;
        self.cells.clear();
        self.build(particles);
    }

    /// Appends a particle that was pushed to the end of the particle array.
    pub fn push(&mut self, position: Vec2) -> usize {
        let index = self.cell_of.len();
        let coord = self.cell_for(position);
        self.cells.entry(coord).or_default().push(index as u32);
        self.cell_of.push(coord);
        index
    }

    /// Mirrors `Vec::swap_remove` on the particle array.
    pub fn swap_remove(&mut self, index: usize) {
        let Some(&coord) = self.cell_of.get(index) else {
            return;
        };
        let last = self.cell_of.len() - 1;

        self.remove_from_cell(coord, index as u32);
        if index != last {
            let last_coord = self.cell_of[last];
            if let Some(bucket) = self.cells.get_mut(&last_coord) {
                if let Some(entry) = bucket.iter_mut().find(|entry| **entry == last as u32) {
                    *entry = index as u32;
                }
            }
        }
        self.cell_of.swap_remove(index);
    }

    /// Moves `index` into the cell containing `position`. Returns whether the cell changed.
    pub fn rebucket(&mut self, index: usize, position: Vec2) -> bool {
        let coord = self.cell_for(position);
        let Some(current) = self.cell_of.get(index).copied() else {
            return false;
        };
        if current == coord {
            return false;
        }

        self.remove_from_cell(current, index as u32);
        self.cells.entry(coord).or_default().push(index as u32);
        self.cell_of[index] = coord;
        true
    }

    /// Re-establishes cell membership for every particle. Returns the number moved.
    pub fn rebucket_all(&mut self, particles: &[Particle]) -> usize {
        if particles.len() != self.cell_of.len() {
            self.build(particles);
            return particles.len();
        }
        particles
            .iter()
            .enumerate()
            .filter(|(index, particle)| self.rebucket(*index, particle.position))
            .count()
    }

    /// Calls `visit` for every index in the 3×3 block around `coord`.
    pub fn for_each_in_neighborhood(&self, coord: CellCoord, mut visit: impl FnMut(u32)) {
        for (dx, dy) in MOORE_OFFSETS {
            if let Some(bucket) = self.cells.get(&(coord.0 + dx, coord.1 + dy)) {
                for &other in bucket {
                    visit(other);
                }
            }
        }
    }

    /// Candidates for the particle at `index`, including itself.
    pub fn neighbors(&self, index: usize) -> Vec<u32> {
        let mut result = Vec::new();
        if let Some(coord) = self.cell_of(index) {
            self.for_each_in_neighborhood(coord, |other| result.push(other));
        }
        result
    }

    /// True when every particle is recorded in exactly the cell that contains it.
    pub fn is_consistent_with(&self, particles: &[Particle]) -> bool {
        if particles.len() != self.cell_of.len() {
            return false;
        }
        let bucketed: usize = self.cells.values().map(Vec::len).sum();
        bucketed == particles.len()
            && particles.iter().enumerate().all(|(index, particle)| {
                let coord = self.cell_for(particle.position);
                self.cell_of[index] == coord && self.cell(coord).contains(&(index as u32))
            })
    }

    fn remove_from_cell(&mut self, coord: CellCoord, index: u32) {
        if let Some(bucket) = self.cells.get_mut(&coord) {
            if let Some(pos) = bucket.iter().position(|entry| *entry == index) {
                bucket.swap_remove(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particles(points: &[(f32, f32)]) -> Vec<Particle> {
        points
            .iter()
            .map(|&(x, y)| Particle::at_rest(Vec2::new(x, y)))
            .collect()
    }

    #[test]
    fn neighbors_cover_moore_block() {
        let list = particles(&[(0.5, 0.5), (1.5, 1.5), (2.5, 0.5), (-0.5, -0.5)]);
        let mut grid = SpatialGrid::new(1.0);
        grid.build(&list);

        let mut found = grid.neighbors(0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 3]);
    }

    #[test]
    fn rebucket_is_idempotent() {
        let mut list = particles(&[(0.2, 0.2), (3.0, 3.0)]);
        let mut grid = SpatialGrid::new(1.0);
        grid.build(&list);

        assert!(!grid.rebucket(0, list[0].position));
        list[0].position = Vec2::new(1.2, -0.4);
        assert!(grid.rebucket(0, list[0].position));
        assert!(!grid.rebucket(0, list[0].position));
        assert_eq!(grid.cell_of(0), Some((1, -1)));
        assert!(grid.is_consistent_with(&list));
    }

    #[test]
    fn swap_remove_keeps_indices_aligned() {
        let mut list = particles(&[(0.5, 0.5), (4.5, 4.5), (8.5, 0.5)]);
        let mut grid = SpatialGrid::new(1.0);
        grid.build(&list);

        list.swap_remove(0);
        grid.swap_remove(0);

        assert!(grid.is_consistent_with(&list));
        assert_eq!(grid.cell((8, 0)), &[0]);
    }
}
