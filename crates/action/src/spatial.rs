use glam::Vec3;
use std::collections::HashMap;
use railwrench_common::{EntityId, Location};
use railwrench_ecs::Capability;

use crate::collab::EntityQuery;
use crate::error::{ActionError, Attribute};
use crate::join::find_join_candidate;

/// A 3D cell coordinate in the vehicle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Uniform bucket grid over vehicle positions.
///
/// Narrows a join search to the cells around the source instead of scanning
/// every vehicle. With a cell size equal to the join distance only the 27
/// surrounding cells can hold a candidate.
pub struct VehicleGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<EntityId>>,
}

impl VehicleGrid {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell_size must be positive"
        );
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Rebuild the grid from every vehicle the entity query knows about.
    pub fn rebuild<Q>(&mut self, entities: &Q) -> Result<(), ActionError>
    where
        Q: EntityQuery + ?Sized,
    {
        self.cells.clear();
        for vehicle in entities.entities_with(Capability::Vehicle) {
            let location = entities
                .location(vehicle)
                .ok_or(ActionError::MissingAttribute {
                    entity: vehicle,
                    attribute: Attribute::Location,
                })?;
            let coord = self.position_to_cell(location.position);
            self.cells.entry(coord).or_default().push(vehicle);
        }
        tracing::debug!(
            cells = self.cells.len(),
            vehicles = self.total_placements(),
            "vehicle grid rebuilt"
        );
        Ok(())
    }

    /// Cell holding `pos`. Coordinates past the `i32` range clamp to its ends.
    pub fn position_to_cell(&self, pos: Vec3) -> CellCoord {
        let cell = (pos / self.cell_size).floor();
        CellCoord::new(cell.x as i32, cell.y as i32, cell.z as i32)
    }

    /// Vehicles in every cell that could hold something within `distance` of `pos`,
    /// sorted by id.
    ///
    /// When the cube of cells around `pos` is larger than the set of occupied
    /// cells, the occupied cells are filtered directly instead.
    pub fn candidates_near(&self, pos: Vec3, distance: f32) -> Vec<EntityId> {
        let center = self.position_to_cell(pos);
        let reach = (distance / self.cell_size).ceil().max(1.0);
        let side = 2.0 * f64::from(reach) + 1.0;
        // Saturates for huge or infinite reach.
        let radius = reach as i64;

        let mut result = Vec::new();
        if side.powi(3) > self.cells.len() as f64 {
            for (coord, vehicles) in &self.cells {
                if within_cells(*coord, center, radius) {
                    result.extend_from_slice(vehicles);
                }
            }
        } else {
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    for dz in -radius..=radius {
                        let Some(coord) = offset(center, dx, dy, dz) else {
                            continue;
                        };
                        if let Some(vehicles) = self.cells.get(&coord) {
                            result.extend_from_slice(vehicles);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total number of vehicle placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

fn within_cells(coord: CellCoord, center: CellCoord, radius: i64) -> bool {
    let gap = |a: i32, b: i32| (i64::from(a) - i64::from(b)).abs();
    gap(coord.x, center.x) <= radius
        && gap(coord.y, center.y) <= radius
        && gap(coord.z, center.z) <= radius
}

fn offset(center: CellCoord, dx: i64, dy: i64, dz: i64) -> Option<CellCoord> {
    let shift = |c: i32, d: i64| i32::try_from(i64::from(c) + d).ok();
    Some(CellCoord::new(
        shift(center.x, dx)?,
        shift(center.y, dy)?,
        shift(center.z, dz)?,
    ))
}

/// [`find_join_candidate`] restricted to the grid cells around the source.
///
/// Returns the same vehicle as the full scan as long as the grid reflects the
/// current vehicle positions.
pub fn find_join_candidate_indexed<Q>(
    grid: &VehicleGrid,
    entities: &Q,
    source: EntityId,
    source_location: &Location,
    threshold: f32,
) -> Result<Option<EntityId>, ActionError>
where
    Q: EntityQuery + ?Sized,
{
    let nearby = grid.candidates_near(source_location.position, threshold);
    find_join_candidate(entities, source, source_location, &nearby, threshold)
}
