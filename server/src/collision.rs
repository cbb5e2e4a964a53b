//! # Collision Pipeline
//!
//! Runs once per tick, after every dirty transform was cleaned:
//!
//! 1. **Broad phase**: for each group pair the group matrix allows, for each
//!    chunk, pair up the chunk's entities of the two groups and drop pairs
//!    whose bounding boxes don't overlap.
//! 2. **Narrow phase**: test every hitbox of one entity against every hitbox
//!    of the other, gated by the bit/mask filters.
//! 3. **Resolution**: every recorded pair is resolved from both sides.
//!
//! An unordered entity pair is tested at most once per tick; the first
//! (group pair, chunk) that reaches it decides which side is the pushing one.

use crate::component::HitboxCollision;
use crate::entity::EntityId;
use crate::error::WorldResult;
use crate::transform::TransformComponent;
use crate::world::World;
use log::debug;
use serde::{Deserialize, Serialize};
use shared::{hitbox_contact, HitboxContact};
use std::collections::{HashMap, HashSet};

/// Coarse tag deciding which entities are even considered for collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionGroup {
    #[default]
    Default,
    Decoration,
    /// Damages what it touches and still gets pushed by ordinary entities.
    Damaging,
    /// Only interacts with the default group.
    ExclusivelyDamaging,
    None,
}

// Row: pushing group, column: pushed group, both in declaration order.
const GROUP_MATRIX: [[bool; CollisionGroup::COUNT]; CollisionGroup::COUNT] = [
    [true, true, true, false, false],
    [true, false, false, false, false],
    [true, true, false, false, false],
    [true, false, false, false, false],
    [false, false, false, false, false],
];

impl CollisionGroup {
    pub const COUNT: usize = 5;

    pub const ALL: [CollisionGroup; CollisionGroup::COUNT] = [
        CollisionGroup::Default,
        CollisionGroup::Decoration,
        CollisionGroup::Damaging,
        CollisionGroup::ExclusivelyDamaging,
        CollisionGroup::None,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether entities of this group push entities of `pushed`.
    pub const fn can_push(self, pushed: CollisionGroup) -> bool {
        GROUP_MATRIX[self.index()][pushed.index()]
    }
}

/// Every (pushing, pushed) group pair the matrix allows, in declaration order.
pub fn collision_group_pairs() -> impl Iterator<Item = (CollisionGroup, CollisionGroup)> {
    CollisionGroup::ALL.into_iter().flat_map(|pushing| {
        CollisionGroup::ALL
            .into_iter()
            .filter(move |pushed| pushing.can_push(*pushed))
            .map(move |pushed| (pushing, pushed))
    })
}

/// Two colliding hitboxes, by index into their owners' transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxPair {
    pub pushing_hitbox: usize,
    pub pushed_hitbox: usize,
    /// Axis points from the pushing hitbox toward the pushed one.
    pub contact: HitboxContact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRecord {
    pub pushing: EntityId,
    pub pushed: EntityId,
    pub hitbox_pairs: Vec<HitboxPair>,
}

impl CollisionRecord {
    /// Hitbox collisions as seen by the pushing entity.
    pub fn pushing_view(&self) -> Vec<HitboxCollision> {
        self.hitbox_pairs
            .iter()
            .map(|pair| HitboxCollision {
                own_hitbox: pair.pushing_hitbox,
                other_hitbox: pair.pushed_hitbox,
                point: pair.contact.point,
                axis: pair.contact.axis,
                overlap: pair.contact.overlap,
            })
            .collect()
    }

    /// Hitbox collisions as seen by the pushed entity.
    pub fn pushed_view(&self) -> Vec<HitboxCollision> {
        self.hitbox_pairs
            .iter()
            .map(|pair| {
                let contact = pair.contact.reversed();
                HitboxCollision {
                    own_hitbox: pair.pushed_hitbox,
                    other_hitbox: pair.pushing_hitbox,
                    point: contact.point,
                    axis: contact.axis,
                    overlap: contact.overlap,
                }
            })
            .collect()
    }

    pub fn involves(&self, entity: EntityId) -> bool {
        self.pushing == entity || self.pushed == entity
    }

    pub fn other(&self, entity: EntityId) -> Option<EntityId> {
        if self.pushing == entity {
            Some(self.pushed)
        } else if self.pushed == entity {
            Some(self.pushing)
        } else {
            None
        }
    }
}

/// Collisions found this tick. Rebuilt from scratch by every tick.
#[derive(Debug, Default, Clone)]
pub struct CollisionTable {
    records: Vec<CollisionRecord>,
    by_entity: HashMap<EntityId, Vec<usize>>,
}

impl CollisionTable {
    pub fn insert(&mut self, record: CollisionRecord) {
        let index = self.records.len();
        self.by_entity.entry(record.pushing).or_default().push(index);
        self.by_entity.entry(record.pushed).or_default().push(index);
        self.records.push(record);
    }

    /// Records in detection order.
    pub fn records(&self) -> &[CollisionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.by_entity.clear();
    }

    /// Entities colliding with `entity`, on either side, in detection order.
    pub fn get_entity_collisions(&self, entity: EntityId) -> Vec<EntityId> {
        self.by_entity
            .get(&entity)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&index| self.records[index].other(entity))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn are_colliding(&self, first: EntityId, second: EntityId) -> bool {
        self.get_entity_collisions(first).contains(&second)
    }

    /// Entities `entity` pushed this tick.
    pub fn pushed_by(&self, entity: EntityId) -> Vec<EntityId> {
        self.by_entity
            .get(&entity)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| &self.records[index])
                    .filter(|record| record.pushing == entity)
                    .map(|record| record.pushed)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn narrow_phase(pushing: &TransformComponent, pushed: &TransformComponent) -> Vec<HitboxPair> {
    let mut pairs = Vec::new();
    for (i, pushing_hitbox) in pushing.hitboxes().iter().enumerate() {
        for (j, pushed_hitbox) in pushed.hitboxes().iter().enumerate() {
            if !pushing_hitbox.can_collide_with(pushed_hitbox) {
                continue;
            }
            if let Some(contact) = hitbox_contact(pushing_hitbox, pushed_hitbox) {
                pairs.push(HitboxPair {
                    pushing_hitbox: i,
                    pushed_hitbox: j,
                    contact,
                });
            }
        }
    }
    pairs
}

impl World {
    /// Broad and narrow phase over the whole world. Replaces the collision table.
    pub(crate) fn detect_collisions(&mut self) -> WorldResult<()> {
        let transforms = self.components.array::<TransformComponent>()?;
        let mut table = CollisionTable::default();
        let mut tested: HashSet<(EntityId, EntityId)> = HashSet::new();

        for (pushing_group, pushed_group) in collision_group_pairs() {
            for chunk in self.chunks.chunks() {
                for &pushing in chunk.entities_in_group(pushing_group) {
                    for &pushed in chunk.entities_in_group(pushed_group) {
                        if pushing == pushed {
                            continue;
                        }
                        let key = (pushing.min(pushed), pushing.max(pushed));
                        if tested.contains(&key) {
                            continue;
                        }
                        let (Some(pushing_transform), Some(pushed_transform)) =
                            (transforms.get(pushing), transforms.get(pushed))
                        else {
                            continue;
                        };
                        tested.insert(key);

                        if !pushing_transform.bounds().overlaps(&pushed_transform.bounds())
                            || !pushing_transform.can_collide_with(pushed_transform)
                        {
                            continue;
                        }

                        let hitbox_pairs = narrow_phase(pushing_transform, pushed_transform);
                        if !hitbox_pairs.is_empty() {
                            table.insert(CollisionRecord {
                                pushing,
                                pushed,
                                hitbox_pairs,
                            });
                        }
                    }
                }
            }
        }

        if !table.is_empty() {
            debug!("Tick {}: {} colliding pairs", self.tick, table.len());
        }
        self.collisions = table;
        Ok(())
    }

    /// Resolves every recorded pair from both sides, pushed side first.
    pub(crate) fn resolve_collisions(&mut self) -> WorldResult<()> {
        for i in 0..self.collisions.len() {
            let record = self.collisions.records()[i].clone();
            self.collide(record.pushed, record.pushing, &record.pushed_view())?;
            self.collide(record.pushing, record.pushed, &record.pushing_view())?;
        }
        Ok(())
    }

    /// One side of a collision: separation and hitbox hooks per hitbox pair,
    /// then the entity hooks once.
    fn collide(&mut self, entity: EntityId, other: EntityId, collisions: &[HitboxCollision]) -> WorldResult<()> {
        for collision in collisions {
            self.apply_push(entity, other, collision)?;
            for hook in self.components.hooks_for(entity, |entry| entry.on_hitbox_collision) {
                hook(self, entity, other, collision);
            }
        }
        for hook in self.components.hooks_for(entity, |entry| entry.on_entity_collision) {
            hook(self, entity, other);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Point;

    fn id(index: u32) -> EntityId {
        EntityId::new(index, 0)
    }

    fn record(pushing: u32, pushed: u32) -> CollisionRecord {
        CollisionRecord {
            pushing: id(pushing),
            pushed: id(pushed),
            hitbox_pairs: vec![HitboxPair {
                pushing_hitbox: 1,
                pushed_hitbox: 0,
                contact: HitboxContact {
                    axis: Point::new(1.0, 0.0),
                    overlap: 2.0,
                    point: Point::new(5.0, 5.0),
                },
            }],
        }
    }

    #[test]
    fn test_group_matrix() {
        use CollisionGroup::*;
        assert!(Default.can_push(Default));
        assert!(Default.can_push(Decoration));
        assert!(Default.can_push(Damaging));
        assert!(!Default.can_push(ExclusivelyDamaging));
        assert!(Decoration.can_push(Default));
        assert!(!Decoration.can_push(Decoration));
        assert!(ExclusivelyDamaging.can_push(Default));
        assert!(!ExclusivelyDamaging.can_push(Damaging));
        assert!(CollisionGroup::ALL.iter().all(|group| !None.can_push(*group)));
        assert!(CollisionGroup::ALL.iter().all(|group| !group.can_push(None)));
    }

    #[test]
    fn test_group_pairs_are_in_declaration_order() {
        use CollisionGroup::*;
        let pairs: Vec<_> = collision_group_pairs().collect();
        assert_eq!(
            pairs,
            vec![
                (Default, Default),
                (Default, Decoration),
                (Default, Damaging),
                (Decoration, Default),
                (Damaging, Default),
                (Damaging, Decoration),
                (ExclusivelyDamaging, Default),
            ]
        );
    }

    #[test]
    fn test_views_mirror_each_other() {
        let record = record(1, 2);
        let pushing = record.pushing_view()[0];
        let pushed = record.pushed_view()[0];

        assert_eq!((pushing.own_hitbox, pushing.other_hitbox), (1, 0));
        assert_eq!((pushed.own_hitbox, pushed.other_hitbox), (0, 1));
        assert_eq!(pushing.axis, Point::new(1.0, 0.0));
        assert_eq!(pushed.axis, Point::new(-1.0, 0.0));
        assert_eq!(pushing.point, pushed.point);
    }

    #[test]
    fn test_table_lookups() {
        let mut table = CollisionTable::default();
        table.insert(record(1, 2));
        table.insert(record(3, 1));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get_entity_collisions(id(1)), vec![id(2), id(3)]);
        assert_eq!(table.get_entity_collisions(id(2)), vec![id(1)]);
        assert!(table.get_entity_collisions(id(4)).is_empty());
        assert!(table.are_colliding(id(3), id(1)));
        assert!(!table.are_colliding(id(2), id(3)));
        assert_eq!(table.pushed_by(id(1)), vec![id(2)]);
        assert_eq!(table.pushed_by(id(3)), vec![id(1)]);

        table.clear();
        assert!(table.is_empty());
        assert!(table.get_entity_collisions(id(1)).is_empty());
    }
}
