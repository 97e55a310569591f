use calendar_reminders_domain::{Entity, ID};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Useful functions for creating inmemory repositories

pub type Collection<T> = RwLock<HashMap<ID, T>>;

// A panic while holding the lock cannot leave a half written entry behind,
// so a poisoned collection is still usable.
pub fn read<T>(collection: &Collection<T>) -> RwLockReadGuard<'_, HashMap<ID, T>> {
    collection.read().unwrap_or_else(|e| e.into_inner())
}

pub fn write<T>(collection: &Collection<T>) -> RwLockWriteGuard<'_, HashMap<ID, T>> {
    collection.write().unwrap_or_else(|e| e.into_inner())
}

pub fn find<T: Clone>(val_id: &ID, collection: &Collection<T>) -> Option<T> {
    read(collection).get(val_id).cloned()
}

pub fn find_by<T: Clone, F: FnMut(&T) -> bool>(collection: &Collection<T>, mut compare: F) -> Vec<T> {
    read(collection)
        .values()
        .filter(|item| compare(item))
        .cloned()
        .collect()
}

pub fn find_one_by<T: Clone, F: FnMut(&T) -> bool>(
    collection: &Collection<T>,
    mut compare: F,
) -> Option<T> {
    read(collection).values().find(|item| compare(item)).cloned()
}

#[derive(Debug, PartialEq, Eq)]
pub enum WriteError {
    NotFound,
    Conflict,
}

fn has_conflict<T, F>(val: &T, collection: &HashMap<ID, T>, conflicts: &F) -> bool
where
    T: Entity,
    F: Fn(&T, &T) -> bool,
{
    collection
        .values()
        .any(|other| other.id() != val.id() && conflicts(other, val))
}

/// Inserts `val` unless another entity conflicts with it. The check and the
/// write happen under one lock.
pub fn insert_unless<T, F>(val: &T, collection: &Collection<T>, conflicts: F) -> Result<(), WriteError>
where
    T: Clone + Entity,
    F: Fn(&T, &T) -> bool,
{
    let mut collection = write(collection);
    if has_conflict(val, &collection, &conflicts) {
        return Err(WriteError::Conflict);
    }
    collection.insert(*val.id(), val.clone());
    Ok(())
}

/// Replaces the stored entity with the id of `val`, unless it is missing or
/// another entity conflicts with the new value. `keep` copies state owned by
/// the stored entity onto the replacement before it is written.
pub fn replace_unless<T, F, K>(
    val: &T,
    collection: &Collection<T>,
    conflicts: F,
    keep: K,
) -> Result<(), WriteError>
where
    T: Clone + Entity,
    F: Fn(&T, &T) -> bool,
    K: FnOnce(&T, &mut T),
{
    let mut collection = write(collection);
    if !collection.contains_key(val.id()) {
        return Err(WriteError::NotFound);
    }
    if has_conflict(val, &collection, &conflicts) {
        return Err(WriteError::Conflict);
    }
    let stored = collection.get_mut(val.id()).ok_or(WriteError::NotFound)?;
    let mut replacement = val.clone();
    keep(stored, &mut replacement);
    *stored = replacement;
    Ok(())
}

pub fn delete<T>(val_id: &ID, collection: &Collection<T>) -> Option<T> {
    write(collection).remove(val_id)
}

pub fn delete_by<T, F: Fn(&T) -> bool>(collection: &Collection<T>, compare: F) -> u64 {
    let mut collection = write(collection);
    let before = collection.len();
    collection.retain(|_, item| !compare(item));
    (before - collection.len()) as u64
}

/// Applies `update` to the entity with the given id, if present
pub fn update<T, U: FnOnce(&mut T)>(val_id: &ID, collection: &Collection<T>, update: U) -> bool {
    match write(collection).get_mut(val_id) {
        Some(item) => {
            update(item);
            true
        }
        None => false,
    }
}
