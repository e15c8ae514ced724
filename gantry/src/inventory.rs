use std::fmt::Write;
use std::time::Duration;

use heapless::String;
use parking_lot::Mutex;

use crate::config::{CELL_COUNT, LOCK_TIMEOUT, PALLET_ID_MAX};
use crate::error::GantryError;
use crate::util::truncated;

pub type PalletId = String<PALLET_ID_MAX>;

pub fn pallet_id(text: &str) -> PalletId {
    truncated(text)
}

// "AA BB CC DD", the form the reader collaborator hands back
pub fn format_uid(bytes: &[u8]) -> PalletId {
    let mut id = PalletId::new();
    for (idx, byte) in bytes.iter().enumerate() {
        let sep = if idx == 0 { "" } else { " " };
        if write!(id, "{sep}{byte:02X}").is_err() {
            break;
        }
    }
    id
}

/// Which pallet sits in which cell. Only the worker writes, status readers
/// take snapshots. Every access waits at most `lock_timeout` for the lock.
pub struct InventoryStore {
    slots: Mutex<[Option<PalletId>; CELL_COUNT]>,
    lock_timeout: Duration,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new(LOCK_TIMEOUT)
    }
}

impl InventoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(Default::default()),
            lock_timeout,
        }
    }

    pub fn set(&self, cell_index: i32, id: &str) -> Result<(), GantryError> {
        let idx = slot_index(cell_index)?;
        let mut slots = self.lock()?;
        slots[idx] = Some(pallet_id(id));
        Ok(())
    }

    /// Empties the slot, handing back whatever was recorded there.
    pub fn clear(&self, cell_index: i32) -> Result<Option<PalletId>, GantryError> {
        let idx = slot_index(cell_index)?;
        let mut slots = self.lock()?;
        Ok(slots[idx].take())
    }

    pub fn get(&self, cell_index: i32) -> Result<Option<PalletId>, GantryError> {
        let idx = slot_index(cell_index)?;
        let slots = self.lock()?;
        Ok(slots[idx].clone())
    }

    pub fn snapshot(&self) -> Result<[Option<PalletId>; CELL_COUNT], GantryError> {
        self.with_slots(|slots| slots.clone())
    }

    /// Read all six slots under one lock acquisition.
    pub fn with_slots<T>(
        &self,
        read: impl FnOnce(&[Option<PalletId>; CELL_COUNT]) -> T,
    ) -> Result<T, GantryError> {
        Ok(read(&*self.lock()?))
    }

    fn lock(
        &self,
    ) -> Result<parking_lot::MutexGuard<'_, [Option<PalletId>; CELL_COUNT]>, GantryError> {
        self.slots
            .try_lock_for(self.lock_timeout)
            .ok_or(GantryError::LockTimeout("inventory"))
    }
}

fn slot_index(cell_index: i32) -> Result<usize, GantryError> {
    if (0..CELL_COUNT as i32).contains(&cell_index) {
        Ok(cell_index as usize)
    } else {
        Err(GantryError::InvalidCellIndex(cell_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_get_clear() {
        let store = InventoryStore::default();
        assert_eq!(store.get(4).unwrap(), None);
        store.set(4, "AA BB CC DD").unwrap();
        assert_eq!(store.get(4).unwrap().unwrap().as_str(), "AA BB CC DD");
        let previous = store.clear(4).unwrap();
        assert_eq!(previous.unwrap().as_str(), "AA BB CC DD");
        assert_eq!(store.get(4).unwrap(), None);
    }

    #[test]
    fn out_of_range_cells_are_rejected() {
        let store = InventoryStore::default();
        assert_eq!(store.set(6, "AA"), Err(GantryError::InvalidCellIndex(6)));
        assert_eq!(store.get(-1), Err(GantryError::InvalidCellIndex(-1)));
    }

    #[test]
    fn held_lock_times_out_and_skips_the_write() {
        let store = InventoryStore::new(Duration::from_millis(5));
        let guard = store.slots.lock();
        let result = thread::scope(|s| s.spawn(|| store.set(1, "11 22")).join().unwrap());
        drop(guard);
        assert_eq!(result, Err(GantryError::LockTimeout("inventory")));
        assert_eq!(store.get(1).unwrap(), None);
    }

    #[test]
    fn uid_bytes_format_as_spaced_hex() {
        assert_eq!(format_uid(&[0xAA, 0xBB, 0x0C, 0xDD]).as_str(), "AA BB 0C DD");
        assert_eq!(format_uid(&[]).as_str(), "");
        // 10 byte uids fit the slot width
        assert_eq!(format_uid(&[0x11; 10]).len(), 29);
    }
}
