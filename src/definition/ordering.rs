use super::TapeDefinition;
use crate::block::TapeBlock;
use crate::error::{Result, TapeError};
use crate::mapper::BlockMap;
use crate::position::PhysicalPosition;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Logical,
    Physical,
}

impl Traversal {
    fn label(self) -> &'static str {
        match self {
            Traversal::Logical => "logical",
            Traversal::Physical => "physical",
        }
    }
}

/// Summary of the gaps in an ordered block list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub blocks: usize,
    pub safe_gaps: usize,
    pub unsafe_gaps: usize,
    pub missing_blocks: u64,
    pub unsafe_missing_blocks: u64,
}

impl GapReport {
    pub fn from_blocks(blocks: &[TapeBlock]) -> Self {
        let mut report = GapReport {
            blocks: blocks.len(),
            ..Default::default()
        };
        for block in blocks.iter().filter(|b| b.has_gap()) {
            report.missing_blocks += block.missing_run_length as u64;
            if block.missing_run_is_safe {
                report.safe_gaps += 1;
            } else {
                report.unsafe_gaps += 1;
                report.unsafe_missing_blocks += block.missing_run_length as u64;
            }
        }
        report
    }

    pub fn is_clean(&self) -> bool {
        self.unsafe_gaps == 0
    }
}

impl TapeDefinition {
    /// Blocks in logical order, each annotated with the run of missing
    /// logical positions that follows it.
    ///
    /// Blocks inside the parking zone have no logical number and are left out.
    pub fn create_logically_ordered_block_list(&self, map: &BlockMap) -> Result<Vec<TapeBlock>> {
        self.create_ordered_block_list(map, Traversal::Logical)
    }

    /// Blocks in serpentine tape order, including any found in the parking
    /// zone. Missing parking zone positions count as safe.
    pub fn create_physically_ordered_block_list(&self, map: &BlockMap) -> Result<Vec<TapeBlock>> {
        self.create_ordered_block_list(map, Traversal::Physical)
    }

    fn create_ordered_block_list(
        &self,
        map: &BlockMap,
        traversal: Traversal,
    ) -> Result<Vec<TapeBlock>> {
        let mut cursor = PhysicalPosition::new(self.cartridge)?;

        let mut remaining = match traversal {
            Traversal::Logical => {
                let unreachable = map
                    .keys()
                    .filter(|physical| !self.is_logically_addressable(**physical))
                    .count();
                if unreachable > 0 {
                    warn!(
                        "{} mapped blocks lie in the parking zone and cannot appear in logical order",
                        unreachable
                    );
                }
                map.len() - unreachable
            }
            Traversal::Physical => map.len(),
        };

        let mut ordered: Vec<TapeBlock> = Vec::with_capacity(remaining);
        let mut leading_gap = 0u32;

        while remaining > 0 {
            let physical = cursor.to_physical_block();

            match map.get(&physical) {
                Some(block) => {
                    remaining -= 1;
                    if self.is_force_skipped(physical) {
                        debug!("Force-skipping block at {}", cursor);
                        extend_gap(&mut ordered, &mut leading_gap, true);
                    } else {
                        if let Some(previous) = ordered.last() {
                            self.report_gap(previous);
                        }
                        let mut block = block.clone();
                        block.missing_run_length = 0;
                        block.missing_run_is_safe = true;
                        ordered.push(block);
                    }
                }
                None => {
                    let safe = self.is_force_skipped(physical)
                        || (traversal == Traversal::Physical && cursor.in_parking_zone());
                    extend_gap(&mut ordered, &mut leading_gap, safe);
                }
            }

            if remaining == 0 {
                break;
            }

            let advanced = match traversal {
                Traversal::Logical => cursor.try_increase_logical_block(),
                Traversal::Physical => cursor.try_increase_physical_block(false),
            };
            if !advanced {
                return Err(TapeError::geometry(format!(
                    "Ran out of {} blocks at {} with {} mapped blocks not yet visited",
                    traversal.label(),
                    cursor,
                    remaining
                )));
            }
        }

        if leading_gap > 0 {
            warn!(
                "{} {} positions missing before the first recovered block",
                leading_gap,
                traversal.label()
            );
        }

        let report = GapReport::from_blocks(&ordered);
        info!(
            "Ordered {} blocks ({}): {} safe gaps, {} unsafe gaps, {} missing blocks",
            report.blocks,
            traversal.label(),
            report.safe_gaps,
            report.unsafe_gaps,
            report.missing_blocks
        );
        Ok(ordered)
    }

    fn is_logically_addressable(&self, physical: u32) -> bool {
        PhysicalPosition::from_physical_block(self.cartridge, physical)
            .map(|p| p.is_representable_as_logical_block())
            .unwrap_or(false)
    }

    fn report_gap(&self, block: &TapeBlock) {
        if !block.has_unsafe_gap() {
            return;
        }
        let source = self
            .dump_files
            .get(block.file)
            .map(|f| f.name())
            .unwrap_or("?");
        let position = block
            .position(self.cartridge)
            .map(|p| format!("{} (logical {})", p, p.to_logical_block_string()))
            .unwrap_or_else(|_| block.physical_block.to_string());
        warn!(
            "Unsafe gap of {} blocks after {} from {} offset {}",
            block.missing_run_length, position, source, block.file_offset
        );
    }
}

/// Counts one missing position against the last emitted block.
fn extend_gap(ordered: &mut [TapeBlock], leading_gap: &mut u32, safe: bool) {
    match ordered.last_mut() {
        Some(previous) => {
            if previous.missing_run_length == 0 {
                previous.missing_run_is_safe = safe;
            } else {
                previous.missing_run_is_safe &= safe;
            }
            previous.missing_run_length += 1;
        }
        None => *leading_gap += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Signature;
    use crate::cartridge::CartridgeType;
    use std::ops::RangeInclusive;
    use std::path::Path;

    fn definition(cartridge: CartridgeType, skip: &[RangeInclusive<u32>]) -> TapeDefinition {
        TapeDefinition::from_parts(cartridge, Path::new("."), Vec::new(), skip).unwrap()
    }

    fn physical_of(cartridge: CartridgeType, logical: u32) -> u32 {
        PhysicalPosition::from_logical_block(cartridge, logical)
            .unwrap()
            .to_physical_block()
    }

    fn map_of(physical_blocks: &[u32]) -> BlockMap {
        physical_blocks
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, TapeBlock::new(0, i as u64 * 10, *p, Signature(*b"LIN4"))))
            .collect()
    }

    fn logical_map(cartridge: CartridgeType, logical: &[u32]) -> BlockMap {
        let physical: Vec<u32> = logical.iter().map(|l| physical_of(cartridge, *l)).collect();
        map_of(&physical)
    }

    #[test]
    fn test_skip_range_removes_blocks_from_both_orders() {
        let c = CartridgeType::Adr30;
        let definition = definition(c, &[10..=12]);
        let map = logical_map(c, &[9, 10, 11, 12, 13]);

        for ordered in [
            definition.create_logically_ordered_block_list(&map).unwrap(),
            definition.create_physically_ordered_block_list(&map).unwrap(),
        ] {
            let physical: Vec<u32> = ordered.iter().map(|b| b.physical_block).collect();
            assert_eq!(physical, vec![physical_of(c, 9), physical_of(c, 13)]);
            assert_eq!(ordered[0].missing_run_length, 3);
            assert!(ordered[0].missing_run_is_safe);
            assert_eq!(ordered[1].missing_run_length, 0);
        }
    }

    #[test]
    fn test_unlisted_gap_is_unsafe() {
        let c = CartridgeType::Adr30;
        let definition = definition(c, &[]);
        let map = logical_map(c, &[40, 42]);

        let ordered = definition.create_logically_ordered_block_list(&map).unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].missing_run_length, 1);
        assert!(!ordered[0].missing_run_is_safe);

        let report = GapReport::from_blocks(&ordered);
        assert_eq!(report.unsafe_gaps, 1);
        assert_eq!(report.missing_blocks, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_mixed_gap_is_unsafe() {
        let c = CartridgeType::Adr30;
        let definition = definition(c, &[41..=41]);
        let map = logical_map(c, &[40, 43]);

        let ordered = definition.create_logically_ordered_block_list(&map).unwrap();
        assert_eq!(ordered[0].missing_run_length, 2);
        assert!(!ordered[0].missing_run_is_safe);
    }

    #[test]
    fn test_parking_zone_gap_is_safe_in_physical_order() {
        let c = CartridgeType::Adr50;
        let definition = definition(c, &[]);
        let before = PhysicalPosition::from_grid(c, 0, 15929).unwrap().to_physical_block();
        let after = PhysicalPosition::from_grid(c, 0, 16029).unwrap().to_physical_block();
        let map = map_of(&[before, after]);

        let physical = definition.create_physically_ordered_block_list(&map).unwrap();
        assert_eq!(physical.len(), 2);
        assert_eq!(physical[0].missing_run_length, 99);
        assert!(physical[0].missing_run_is_safe);

        let logical = definition.create_logically_ordered_block_list(&map).unwrap();
        assert_eq!(logical.len(), 2);
        assert_eq!(logical[0].missing_run_length, 0);
    }

    #[test]
    fn test_parking_zone_blocks_only_in_physical_order() {
        let c = CartridgeType::Adr50;
        let definition = definition(c, &[]);
        let parked = PhysicalPosition::from_grid(c, 0, 15950).unwrap().to_physical_block();
        let map = map_of(&[5, parked, 20000]);

        let logical = definition.create_logically_ordered_block_list(&map).unwrap();
        assert_eq!(
            logical.iter().map(|b| b.physical_block).collect::<Vec<_>>(),
            vec![5, 20000]
        );

        let physical = definition.create_physically_ordered_block_list(&map).unwrap();
        assert_eq!(
            physical.iter().map(|b| b.physical_block).collect::<Vec<_>>(),
            vec![5, parked, 20000]
        );
        assert!(!physical[0].missing_run_is_safe);
    }

    #[test]
    fn test_serpentine_order_beats_block_numbers() {
        let c = CartridgeType::Adr30;
        let frames = c.frames_per_track().unwrap();
        let definition = definition(c, &[]);
        // Track 1 runs backwards, so its far end comes first
        let map = map_of(&[frames, 2 * frames - 1]);

        for ordered in [
            definition.create_logically_ordered_block_list(&map).unwrap(),
            definition.create_physically_ordered_block_list(&map).unwrap(),
        ] {
            assert_eq!(ordered[0].physical_block, 2 * frames - 1);
            assert_eq!(ordered[1].physical_block, frames);
            assert_eq!(ordered[0].missing_run_length, frames - 2);
        }
    }

    #[test]
    fn test_leading_gap_and_empty_map() {
        let c = CartridgeType::Adr30;
        let definition = definition(c, &[]);

        let ordered = definition
            .create_logically_ordered_block_list(&logical_map(c, &[5, 6]))
            .unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].missing_run_length, 0);

        assert!(definition
            .create_logically_ordered_block_list(&BlockMap::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_annotations_reset_on_emitted_blocks() {
        let c = CartridgeType::Adr30;
        let definition = definition(c, &[]);
        let mut map = logical_map(c, &[1, 2]);
        for block in map.values_mut() {
            block.missing_run_length = 99;
            block.missing_run_is_safe = false;
        }
        let ordered = definition.create_logically_ordered_block_list(&map).unwrap();
        assert!(ordered.iter().all(|b| b.missing_run_length == 0));
    }
}
