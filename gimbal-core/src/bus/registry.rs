//! Listener fan-out table for shared-bus messages
//!
//! Values arriving on the bus are cached per source identifier (node id)
//! and handed to every listener bound to that identifier. The table is
//! shared with other periodic tasks, so it lives behind an async mutex that
//! is only ever *tried*: a caller that finds it busy gets
//! [`RegistryError::Busy`] and skips the operation for this cycle.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use heapless::Vec;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Lock held elsewhere; retry next cycle
    Busy,
    /// No free listener or identifier slot
    Full,
    /// No identifier without a listener, or identifier never seen
    UnknownId,
    /// Listener is not bound to anything
    NotRegistered,
}

/// Consumer of bus values
pub trait BusListener<V> {
    /// Called with the latest value of a bound identifier
    fn handle(&self, value: &V);
}

struct IdSlot<V> {
    id: u8,
    /// Number of listeners bound to this id
    taken: u8,
    value: V,
}

struct ListenerSlot<'a, L: ?Sized> {
    id: u8,
    listener: &'a L,
}

struct Table<'a, L: ?Sized, V, const IDS: usize, const LISTENERS: usize> {
    ids: Vec<IdSlot<V>, IDS>,
    listeners: [Option<ListenerSlot<'a, L>>; LISTENERS],
}

impl<'a, L: ?Sized, V: Default, const IDS: usize, const LISTENERS: usize>
    Table<'a, L, V, IDS, LISTENERS>
{
    fn id_index(&self, id: u8) -> Option<usize> {
        self.ids.iter().position(|slot| slot.id == id)
    }

    fn allocate_id(&mut self, id: u8) -> Result<usize, RegistryError> {
        if let Some(index) = self.id_index(id) {
            return Ok(index);
        }
        self.ids
            .push(IdSlot {
                id,
                taken: 0,
                value: V::default(),
            })
            .map_err(|_| RegistryError::Full)?;
        Ok(self.ids.len() - 1)
    }

    fn bound_slot(&self, listener: &L, id: u8) -> Option<usize> {
        self.listeners.iter().position(|slot| {
            slot.as_ref().is_some_and(|s| {
                s.id == id && core::ptr::addr_eq(s.listener as *const L, listener as *const L)
            })
        })
    }
}

/// Slot-based listener registry
///
/// - `IDS`: distinct identifiers that can be cached
/// - `LISTENERS`: listener bindings across all identifiers
pub struct BusListenerRegistry<'a, M, L, V, const IDS: usize, const LISTENERS: usize>
where
    M: RawMutex,
    L: ?Sized + BusListener<V>,
{
    table: Mutex<M, Table<'a, L, V, IDS, LISTENERS>>,
}

impl<'a, M, L, V, const IDS: usize, const LISTENERS: usize>
    BusListenerRegistry<'a, M, L, V, IDS, LISTENERS>
where
    M: RawMutex,
    L: ?Sized + BusListener<V>,
    V: Default,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                ids: Vec::new(),
                listeners: core::array::from_fn(|_| None),
            }),
        }
    }

    /// Bind `listener` to an identifier
    ///
    /// With `preferred_id == 0` the listener is bound to the first known
    /// identifier that has no listener yet; otherwise to `preferred_id`,
    /// which is allocated if it has not been seen. Returns the 1-based
    /// listener slot. Binding a listener twice to the same identifier
    /// returns the existing slot.
    pub fn register(&self, listener: &'a L, preferred_id: u8) -> Result<u8, RegistryError> {
        let mut table = self.table.try_lock().map_err(|_| RegistryError::Busy)?;

        if preferred_id != 0 {
            if let Some(existing) = table.bound_slot(listener, preferred_id) {
                return Ok(existing as u8 + 1);
            }
        }

        // Listener slot first, so a full table allocates no identifier
        let free = table
            .listeners
            .iter()
            .position(Option::is_none)
            .ok_or(RegistryError::Full)?;

        let id_index = if preferred_id == 0 {
            table
                .ids
                .iter()
                .position(|slot| slot.taken == 0)
                .ok_or(RegistryError::UnknownId)?
        } else {
            table.allocate_id(preferred_id)?
        };
        let id = table.ids[id_index].id;
        table.listeners[free] = Some(ListenerSlot { id, listener });
        table.ids[id_index].taken = table.ids[id_index].taken.saturating_add(1);

        debug!("bus listener bound to id {} in slot {}", id, free + 1);
        Ok(free as u8 + 1)
    }

    /// Unbind `listener` from every identifier
    ///
    /// Returns the number of slots freed.
    pub fn remove(&self, listener: &L) -> Result<usize, RegistryError> {
        let mut table = self.table.try_lock().map_err(|_| RegistryError::Busy)?;
        let table = &mut *table;

        let mut freed = 0;
        for slot in table.listeners.iter_mut() {
            let Some(bound) = slot else { continue };
            if !core::ptr::addr_eq(bound.listener as *const L, listener as *const L) {
                continue;
            }
            let id = bound.id;
            *slot = None;
            freed += 1;
            if let Some(id_slot) = table.ids.iter_mut().find(|s| s.id == id) {
                id_slot.taken = id_slot.taken.saturating_sub(1);
            }
        }

        if freed == 0 {
            Err(RegistryError::NotRegistered)
        } else {
            Ok(freed)
        }
    }

    /// Run `f` on the cached value for `id`, allocating it if unseen
    pub fn find_or_allocate<R>(
        &self,
        id: u8,
        f: impl FnOnce(&mut V) -> R,
    ) -> Result<R, RegistryError> {
        let mut table = self.table.try_lock().map_err(|_| RegistryError::Busy)?;
        let index = table.allocate_id(id)?;
        Ok(f(&mut table.ids[index].value))
    }

    /// Hand the cached value for `id` to every listener bound to it
    ///
    /// Returns the number of listeners notified.
    pub fn update(&self, id: u8) -> Result<usize, RegistryError> {
        let table = self.table.try_lock().map_err(|_| RegistryError::Busy)?;
        let index = table.id_index(id).ok_or(RegistryError::UnknownId)?;
        let value = &table.ids[index].value;

        let mut notified = 0;
        for bound in table.listeners.iter().flatten() {
            if bound.id == id {
                bound.listener.handle(value);
                notified += 1;
            }
        }
        Ok(notified)
    }

    /// Store `value` for `id` and fan it out
    pub fn publish(&self, id: u8, value: V) -> Result<usize, RegistryError> {
        self.find_or_allocate(id, |cached| *cached = value)?;
        self.update(id)
    }

    /// Number of bound listener slots, or `None` while the lock is held
    pub fn listener_count(&self) -> Option<usize> {
        let table = self.table.try_lock().ok()?;
        Some(table.listeners.iter().flatten().count())
    }
}

impl<'a, M, L, V, const IDS: usize, const LISTENERS: usize> Default
    for BusListenerRegistry<'a, M, L, V, IDS, LISTENERS>
where
    M: RawMutex,
    L: ?Sized + BusListener<V>,
    V: Default,
{
    fn default() -> Self {
        Self::new()
    }
}
