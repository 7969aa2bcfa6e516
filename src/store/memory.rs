//! Thread-safe in-memory [`CorrelationStore`] implementation.

// self
use crate::{
	_prelude::*,
	store::{CorrelationStore, SessionData, StoreError},
};

const SHARD_COUNT: usize = 16;

type Shard = Mutex<HashMap<String, Entry>>;

#[derive(Debug)]
struct Entry {
	session: SessionData,
	expires_at: OffsetDateTime,
}
impl Entry {
	fn is_live(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}
}

/// Sharded in-process store; keys hash onto independent locks so unrelated exchanges never
/// contend.
///
/// Expired records are swept from a shard whenever it is written to or taken from, and
/// [`MemoryStore::purge_expired`] sweeps every shard on demand.
#[derive(Debug)]
pub struct MemoryStore(Box<[Shard; SHARD_COUNT]>);
impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self(Box::new(std::array::from_fn(|_| Mutex::new(HashMap::new()))))
	}

	/// Number of records held, expired or not.
	pub fn len(&self) -> usize {
		self.0.iter().map(|shard| shard.lock().len()).sum()
	}

	/// Returns `true` when no record is held.
	pub fn is_empty(&self) -> bool {
		self.0.iter().all(|shard| shard.lock().is_empty())
	}

	/// Drops every record that expired at `now` and returns how many were dropped.
	pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
		self.0.iter().map(|shard| sweep(&mut shard.lock(), now)).sum()
	}

	fn shard(&self, key: &str) -> &Shard {
		let mut hasher = DefaultHasher::new();

		key.hash(&mut hasher);

		&self.0[hasher.finish() as usize % SHARD_COUNT]
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}
impl CorrelationStore for MemoryStore {
	fn put(
		&self,
		key: &str,
		session: SessionData,
		expires_at: OffsetDateTime,
	) -> Result<(), StoreError> {
		let mut shard = self.shard(key).lock();

		sweep(&mut shard, OffsetDateTime::now_utc());
		shard.insert(key.to_owned(), Entry { session, expires_at });

		Ok(())
	}

	fn get(&self, key: &str) -> Result<Option<SessionData>, StoreError> {
		let now = OffsetDateTime::now_utc();

		Ok(self
			.shard(key)
			.lock()
			.get(key)
			.filter(|entry| entry.is_live(now))
			.map(|entry| entry.session.clone()))
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.shard(key).lock().remove(key);

		Ok(())
	}

	fn take(&self, key: &str) -> Result<Option<SessionData>, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut shard = self.shard(key).lock();
		let entry = shard.remove(key);

		sweep(&mut shard, now);

		Ok(entry.filter(|entry| entry.is_live(now)).map(|entry| entry.session))
	}
}

fn sweep(shard: &mut HashMap<String, Entry>, now: OffsetDateTime) -> usize {
	let before = shard.len();

	shard.retain(|_, entry| entry.is_live(now));

	before - shard.len()
}
