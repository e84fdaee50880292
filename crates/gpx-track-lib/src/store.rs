//! TrackStore - canonical, insertion-ordered collection of track records

use crate::track::{StrokeWeight, TrackColor, TrackId, TrackPatch, TrackRecord};
use crate::{Result, TrackError};
use std::collections::HashMap;
use std::fmt;

/// Millisecond clock used to stamp new track identities
pub trait Clock: fmt::Debug + Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock (milliseconds since the Unix epoch)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Issues `"<millis>-<seq>"` identities.
///
/// The `(millis, seq)` pair strictly increases: the clock is never allowed to go backwards and
/// the sequence number advances whenever two ids land in the same millisecond.
#[derive(Debug, Default)]
struct IdGenerator {
    last: Option<(u64, u32)>,
}

impl IdGenerator {
    fn next(&mut self, now_millis: u64) -> TrackId {
        let (millis, seq) = match self.last {
            Some((last_millis, seq)) if now_millis <= last_millis => (last_millis, seq + 1),
            _ => (now_millis, 0),
        };
        self.last = Some((millis, seq));
        TrackId::from(format!("{millis}-{seq}"))
    }
}

/// Ordered track records with an identity index for O(1) lookups
#[derive(Debug)]
pub struct TrackStore {
    /// Records in display (insertion) order
    records: Vec<TrackRecord>,
    /// Position of each record in `records`
    index: HashMap<TrackId, usize>,
    ids: IdGenerator,
    clock: Box<dyn Clock>,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrackStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            ids: IdGenerator::default(),
            clock: Box::new(clock),
        }
    }

    /// Append a new visible track and return its fresh identity
    pub fn add_track(
        &mut self,
        name: impl Into<String>,
        color: TrackColor,
        weight: StrokeWeight,
    ) -> TrackId {
        let id = self.ids.next(self.clock.now_millis());
        let record = TrackRecord::new(id.clone(), name.into(), color, weight);

        self.index.insert(id.clone(), self.records.len());
        self.records.push(record);

        tracing::debug!("Added track {id}");
        id
    }

    /// Merge `patch` into the record for `id`
    pub fn update(&mut self, id: &TrackId, patch: &TrackPatch) -> Result<&TrackRecord> {
        let position = self.position(id)?;
        let record = &mut self.records[position];
        record.apply(patch);
        Ok(record)
    }

    /// Remove the record for `id`, returning it
    pub fn delete(&mut self, id: &TrackId) -> Result<TrackRecord> {
        let position = self.position(id)?;
        self.index.remove(id);
        let record = self.records.remove(position);

        // Records after the removed one shift down by one
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        tracing::debug!("Deleted track {id}");
        Ok(record)
    }

    /// Records in display order
    #[inline]
    pub fn list(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn get(&self, id: &TrackId) -> Result<&TrackRecord> {
        self.position(id).map(|position| &self.records[position])
    }

    #[inline]
    pub fn contains(&self, id: &TrackId) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record. Identities issued so far are still never reused.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    fn position(&self, id: &TrackId) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| TrackError::NotFound(id.clone()))
    }
}
