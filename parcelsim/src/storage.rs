//! Warehouse storage: per-destination LIFO sections with optional capacity limits.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use simcore::{Fifo, Stack};

use crate::{PackageId, WarehouseId};

/// Storage units and weight a package takes in a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Load {
    /// Storage units, see [`WeightClass::storage_space`](crate::WeightClass::storage_space).
    pub space: u32,
    /// Package weight.
    pub weight: u32,
}

/// Entry of a section or a waiting queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredPackage {
    /// Package ID.
    pub id: PackageId,
    /// Storage taken by the package.
    pub load: Load,
}

impl StoredPackage {
    /// Constructs a new entry.
    #[must_use]
    pub fn new(id: PackageId, load: Load) -> Self {
        Self { id, load }
    }
}

/// Maximum occupancy of a single section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLimits {
    /// Maximum total storage units.
    pub capacity: u32,
    /// Maximum total weight.
    pub weight: u32,
}

/// Limits of the whole warehouse, split evenly between its sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseLimits {
    /// Total storage units.
    pub capacity: u32,
    /// Total weight.
    pub weight_capacity: u32,
}

impl Default for WarehouseLimits {
    fn default() -> Self {
        Self {
            capacity: 1000,
            weight_capacity: 5000,
        }
    }
}

impl WarehouseLimits {
    #[allow(clippy::cast_possible_truncation)]
    fn per_section(self, num_sections: usize) -> SectionLimits {
        let sections = num_sections.max(1).min(u32::MAX as usize) as u32;
        SectionLimits {
            capacity: self.capacity / sections,
            weight: self.weight_capacity / sections,
        }
    }
}

/// Outcome of [`Warehouse::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The package went directly into the section.
    Stored,
    /// The section was full and the package was put in its waiting queue.
    Waiting,
}

/// Outcome of [`Warehouse::retrieve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    /// Retrieved package.
    pub package: StoredPackage,
    /// Packages moved from the waiting queue into the freed space, in admission order.
    pub admitted: Vec<PackageId>,
}

/// Packages waiting in a warehouse for transport to one particular neighbor.
///
/// Packages are kept on a stack, so the last stored is the first retrieved. If the section is
/// limited, packages that do not fit wait in a FIFO queue until enough space is freed.
#[derive(Debug, Clone, Default)]
pub struct Section {
    packages: Stack<StoredPackage>,
    waiting: Fifo<StoredPackage>,
    limits: Option<SectionLimits>,
    occupancy: u32,
    weight: u32,
}

impl Section {
    /// Constructs an empty section, unlimited if `limits` is `None`.
    #[must_use]
    pub fn new(limits: Option<SectionLimits>) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Checks if `load` fits in the remaining space.
    #[must_use]
    pub fn can_store(&self, load: Load) -> bool {
        self.limits.map_or(true, |limits| {
            self.occupancy + load.space <= limits.capacity
                && self.weight + load.weight <= limits.weight
        })
    }

    /// Checks if `load` would fit in this section if it were empty.
    #[must_use]
    pub fn can_ever_store(&self, load: Load) -> bool {
        self.limits.map_or(true, |limits| {
            load.space <= limits.capacity && load.weight <= limits.weight
        })
    }

    /// Top of the stack.
    #[must_use]
    pub fn peek(&self) -> Option<&StoredPackage> {
        self.packages.peek()
    }

    /// Number of stored packages, excluding the waiting ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Checks if no packages are stored in the section.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Number of packages waiting for space in the section.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Storage units taken.
    #[must_use]
    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    /// Total weight stored.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Space and weight limits, or `None` if the section is unbounded.
    #[must_use]
    pub fn limits(&self) -> Option<SectionLimits> {
        self.limits
    }

    /// Iterates over stored packages from the top of the stack.
    pub fn iter(&self) -> impl Iterator<Item = &StoredPackage> {
        self.packages.iter()
    }

    /// Iterates over waiting packages from the front of the queue.
    pub fn waiting(&self) -> impl Iterator<Item = &StoredPackage> {
        self.waiting.iter()
    }

    fn push(&mut self, package: StoredPackage) {
        self.occupancy += package.load.space;
        self.weight += package.load.weight;
        self.packages.push(package);
    }

    fn pop(&mut self) -> Option<StoredPackage> {
        let package = self.packages.pop()?;
        self.occupancy -= package.load.space;
        self.weight -= package.load.weight;
        Some(package)
    }

    fn enqueue(&mut self, package: StoredPackage) {
        if let Err(package) = self.waiting.push_back(package) {
            // Waiting queues are unbounded.
            log::error!("Dropped package {} from a full waiting queue", package.id);
        }
    }

    fn admit_waiting(&mut self) -> Vec<PackageId> {
        let mut admitted = Vec::new();
        while let Some(&front) = self.waiting.front() {
            if !self.can_store(front.load) {
                break;
            }
            self.waiting.pop_front();
            self.push(front);
            admitted.push(front.id);
        }
        admitted
    }
}

/// A warehouse with one section per warehouse in the network.
///
/// Section IDs are warehouse IDs: section `j` holds packages whose next hop is warehouse `j`.
/// All methods taking a section ID panic if the section does not exist.
#[derive(Debug, Clone)]
pub struct Warehouse {
    id: WarehouseId,
    sections: Vec<Section>,
    secondary: Option<WarehouseId>,
}

impl Warehouse {
    /// Constructs a warehouse with `num_sections` unlimited sections.
    #[must_use]
    pub fn new(id: WarehouseId, num_sections: usize) -> Self {
        Self {
            id,
            sections: vec![Section::new(None); num_sections],
            secondary: None,
        }
    }

    /// Constructs a warehouse whose total limits are split evenly between `num_sections`
    /// sections.
    #[must_use]
    pub fn with_limits(id: WarehouseId, num_sections: usize, limits: WarehouseLimits) -> Self {
        let limits = limits.per_section(num_sections);
        Self {
            id,
            sections: vec![Section::new(Some(limits)); num_sections],
            secondary: None,
        }
    }

    /// Warehouse ID.
    #[must_use]
    pub fn id(&self) -> WarehouseId {
        self.id
    }

    /// Number of sections, one per warehouse in the network.
    #[must_use]
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Section holding packages bound for `section`.
    #[must_use]
    pub fn section(&self, section: WarehouseId) -> &Section {
        &self.sections[usize::from(section)]
    }

    fn section_mut(&mut self, section: WarehouseId) -> &mut Section {
        &mut self.sections[usize::from(section)]
    }

    /// Checks if a package of the given `load` can be stored in `section` right now.
    #[must_use]
    pub fn can_store(&self, load: Load, section: WarehouseId) -> bool {
        self.section(section).can_store(load)
    }

    /// Checks if a package of the given `load` could ever be stored in `section`.
    #[must_use]
    pub fn can_ever_store(&self, load: Load, section: WarehouseId) -> bool {
        self.section(section).can_ever_store(load)
    }

    /// Stores the package only if it fits. Returns `true` on success.
    pub fn try_store(&mut self, package: StoredPackage, section: WarehouseId) -> bool {
        let section = self.section_mut(section);
        if section.can_store(package.load) {
            section.push(package);
            true
        } else {
            false
        }
    }

    /// Stores the package if it fits, otherwise puts it at the back of the waiting queue.
    pub fn store(&mut self, package: StoredPackage, section: WarehouseId) -> Admission {
        if self.try_store(package, section) {
            Admission::Stored
        } else {
            self.store_in_waiting_queue(package, section);
            Admission::Waiting
        }
    }

    /// Puts the package at the back of the waiting queue of `section`.
    pub fn store_in_waiting_queue(&mut self, package: StoredPackage, section: WarehouseId) {
        log::trace!(
            "Package {} waits at {} for section {}",
            package.id,
            self.id,
            section
        );
        self.section_mut(section).enqueue(package);
    }

    /// Removes the last stored package of `section` and admits as many waiting packages as
    /// the freed space allows.
    pub fn retrieve(&mut self, section: WarehouseId) -> Option<Retrieval> {
        let package = self.section_mut(section).pop()?;
        let admitted = self.process_waiting_queue(section);
        Some(Retrieval { package, admitted })
    }

    /// Moves packages from the front of the waiting queue into `section` as long as they fit.
    /// Returns the IDs of the admitted packages in order.
    pub fn process_waiting_queue(&mut self, section: WarehouseId) -> Vec<PackageId> {
        self.section_mut(section).admit_waiting()
    }

    /// ID of the package that would be retrieved next.
    #[must_use]
    pub fn peek(&self, section: WarehouseId) -> Option<PackageId> {
        self.section(section).peek().map(|package| package.id)
    }

    /// Checks if no packages bound for `section` are stored.
    #[must_use]
    pub fn is_section_empty(&self, section: WarehouseId) -> bool {
        self.section(section).is_empty()
    }

    /// Number of packages stored for `section`.
    #[must_use]
    pub fn section_size(&self, section: WarehouseId) -> usize {
        self.section(section).len()
    }

    /// Number of packages waiting for space in `section`.
    #[must_use]
    pub fn waiting_len(&self, section: WarehouseId) -> usize {
        self.section(section).waiting_len()
    }

    /// Remaining storage units of `section`, or `None` if it is unlimited.
    #[must_use]
    pub fn available_capacity(&self, section: WarehouseId) -> Option<u32> {
        let section = self.section(section);
        section
            .limits()
            .map(|limits| limits.capacity.saturating_sub(section.occupancy()))
    }

    /// Storage units taken across all sections.
    #[must_use]
    pub fn occupancy(&self) -> u32 {
        self.sections.iter().map(Section::occupancy).sum()
    }

    /// Percentage of storage units taken across all limited sections; 0 if unlimited.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        let capacity: u32 = self
            .sections
            .iter()
            .filter_map(|section| section.limits().map(|limits| limits.capacity))
            .sum();
        if capacity == 0 {
            0.0
        } else {
            f64::from(self.occupancy()) / f64::from(capacity) * 100.0
        }
    }

    /// Sets the warehouse taking over packages when a section is full.
    pub fn set_secondary_storage(&mut self, secondary: Option<WarehouseId>) {
        self.secondary = secondary;
    }

    /// Warehouse taking over packages this one has no room for.
    #[must_use]
    pub fn secondary_storage(&self) -> Option<WarehouseId> {
        self.secondary
    }
}

/// Storage of all warehouses, indexed by [`WarehouseId`].
#[derive(Debug, Clone, Default)]
pub struct Storage {
    warehouses: Vec<Warehouse>,
}

impl Storage {
    /// Wraps the given warehouses. The warehouse at position `i` must have ID `i`.
    #[must_use]
    pub fn new(warehouses: Vec<Warehouse>) -> Self {
        Self { warehouses }
    }

    /// Constructs `num_warehouses` warehouses with unlimited sections.
    #[must_use]
    pub fn unlimited(num_warehouses: usize) -> Self {
        Self::new(
            (0..num_warehouses)
                .map(|id| Warehouse::new(WarehouseId::from(id), num_warehouses))
                .collect(),
        )
    }

    /// Constructs `num_warehouses` warehouses with the same limits.
    #[must_use]
    pub fn limited(num_warehouses: usize, limits: WarehouseLimits) -> Self {
        Self::new(
            (0..num_warehouses)
                .map(|id| Warehouse::with_limits(WarehouseId::from(id), num_warehouses, limits))
                .collect(),
        )
    }

    /// Number of warehouses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warehouses.len()
    }

    /// Checks if there are no warehouses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warehouses.is_empty()
    }

    /// Warehouse with the given ID.
    #[must_use]
    pub fn warehouse(&self, id: WarehouseId) -> Option<&Warehouse> {
        self.warehouses.get(usize::from(id))
    }

    /// Mutable reference to the warehouse with the given ID.
    pub fn warehouse_mut(&mut self, id: WarehouseId) -> Option<&mut Warehouse> {
        self.warehouses.get_mut(usize::from(id))
    }

    /// Iterates over warehouses in order of their IDs.
    pub fn iter(&self) -> impl Iterator<Item = &Warehouse> {
        self.warehouses.iter()
    }

    /// Stores the package in `section` of the secondary storage of warehouse `from`.
    ///
    /// Returns the ID of the secondary warehouse, or `None` if `from` has no secondary storage
    /// or the package does not fit there.
    pub fn transfer_to_secondary_storage(
        &mut self,
        from: WarehouseId,
        package: StoredPackage,
        section: WarehouseId,
    ) -> Option<WarehouseId> {
        let secondary = self.warehouse(from)?.secondary_storage()?;
        if secondary == from {
            return None;
        }
        let target = self.warehouse_mut(secondary)?;
        if usize::from(section) < target.num_sections() && target.try_store(package, section) {
            Some(secondary)
        } else {
            None
        }
    }

    /// Highest occupancy among all warehouses.
    #[must_use]
    pub fn max_occupancy(&self) -> u32 {
        self.warehouses
            .iter()
            .map(Warehouse::occupancy)
            .max()
            .unwrap_or_default()
    }
}

impl Index<WarehouseId> for Storage {
    type Output = Warehouse;
    fn index(&self, id: WarehouseId) -> &Warehouse {
        &self.warehouses[usize::from(id)]
    }
}

impl IndexMut<WarehouseId> for Storage {
    fn index_mut(&mut self, id: WarehouseId) -> &mut Warehouse {
        &mut self.warehouses[usize::from(id)]
    }
}
