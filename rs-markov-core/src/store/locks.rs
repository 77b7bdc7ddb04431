use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::DatasetKey;

/// One reader/writer lock per dataset key.
///
/// Mutations of a dataset run under its exclusive lock, reads under its
/// shared lock; different keys never contend. Locks are created on first use
/// and dropped from the registry once no section holds or waits on them.
#[derive(Debug, Default)]
pub struct KeyLocks {
	locks: Mutex<HashMap<DatasetKey, Arc<RwLock<()>>>>,
}

impl KeyLocks {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock_for(&self, key: &DatasetKey) -> Arc<RwLock<()>> {
		let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(locks.entry(key.clone()).or_default())
	}

	/// Forgets the lock of `key` if the caller held the last outside handle.
	///
	/// Handles are only cloned under the registry mutex, so the count cannot
	/// grow while it is checked.
	fn release(&self, key: &DatasetKey, lock: Arc<RwLock<()>>) {
		let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
		if Arc::strong_count(&lock) == 2 && locks.get(key).is_some_and(|held| Arc::ptr_eq(held, &lock)) {
			locks.remove(key);
		}
	}

	/// Runs `f` while holding the exclusive lock of `key`.
	pub fn exclusive<T>(&self, key: &DatasetKey, f: impl FnOnce() -> T) -> T {
		let lock = self.lock_for(key);
		let result = {
			// The guarded data is `()`, a poisoned lock protects nothing broken.
			let _guard = lock.write().unwrap_or_else(PoisonError::into_inner);
			f()
		};
		self.release(key, lock);
		result
	}

	/// Runs `f` while holding the shared lock of `key`.
	pub fn shared<T>(&self, key: &DatasetKey, f: impl FnOnce() -> T) -> T {
		let lock = self.lock_for(key);
		let result = {
			let _guard = lock.read().unwrap_or_else(PoisonError::into_inner);
			f()
		};
		self.release(key, lock);
		result
	}

	/// Runs `f` while holding the exclusive lock of `target` and the shared
	/// locks of `sources`.
	///
	/// Each key is locked once, even when it is listed several times or is
	/// the target itself. Locks are taken in key order, so two such sections
	/// never wait on each other in a cycle.
	pub fn exclusive_with_shared<T>(&self, target: &DatasetKey, sources: &[&DatasetKey], f: impl FnOnce() -> T) -> T {
		let mut keys: Vec<&DatasetKey> = sources.iter().copied().filter(|key| *key != target).collect();
		keys.push(target);
		keys.sort();
		keys.dedup();

		let locks: Vec<(&DatasetKey, Arc<RwLock<()>>)> = keys.into_iter().map(|key| (key, self.lock_for(key))).collect();
		let result = {
			let mut writer = None;
			let mut readers = Vec::with_capacity(locks.len());
			for (key, lock) in &locks {
				if *key == target {
					writer = Some(lock.write().unwrap_or_else(PoisonError::into_inner));
				} else {
					readers.push(lock.read().unwrap_or_else(PoisonError::into_inner));
				}
			}
			let result = f();
			drop(readers);
			drop(writer);
			result
		};

		for (key, lock) in locks {
			self.release(key, lock);
		}
		result
	}

	/// Number of keys that currently have a lock.
	pub fn len(&self) -> usize {
		self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
