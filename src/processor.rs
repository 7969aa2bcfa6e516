//! Request-argument processors and the chain that runs them.
//!
//! A processor is a pure transformation over the outbound argument mapping. It may read the
//! immutable [`ContextSnapshot`] but owns no state of its own. [`ProcessorChain`] gives every
//! processor the same guarantees:
//!
//! - every already-present key is checked against the rules *all* processors in the chain
//!   declare before any of them runs, and the first violation aborts the chain;
//! - [`OverwritePolicy::FillIfAbsent`] processors can never replace a key that already exists;
//! - the caller's mapping is only replaced once the whole chain has succeeded.

pub mod client;
pub mod grant;
pub mod nonce;
pub mod redirect;
pub mod request_uri;
pub mod response_type;
pub mod scope;

pub use client::*;
pub use grant::*;
pub use nonce::*;
pub use redirect::*;
pub use request_uri::*;
pub use response_type::*;
pub use scope::*;

// self
use crate::{_prelude::*, context::ContextSnapshot, error::ArgumentError, message::ParamRule};

/// Shared handle to a processor.
pub type ProcessorHandle = Arc<dyn RequestArgumentProcessor>;

/// How a processor treats keys that already exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverwritePolicy {
	/// Only absent keys are written.
	FillIfAbsent,
	/// The processor owns its keys and may rewrite them.
	AlwaysReplace,
}

/// A single step of a request-argument chain.
pub trait RequestArgumentProcessor
where
	Self: Debug + Send + Sync,
{
	/// Stable processor name used in errors.
	fn name(&self) -> &'static str;

	/// Overwrite policy; fixed for the processor's lifetime.
	fn policy(&self) -> OverwritePolicy {
		OverwritePolicy::FillIfAbsent
	}

	/// Shape rules for the keys this processor reads.
	fn verifications(&self) -> &'static [(&'static str, ParamRule)] {
		&[]
	}

	/// Applies the processor to `args`.
	fn process(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError>;
}

/// Ordered, fail-fast list of processors.
#[derive(Clone, Debug, Default)]
pub struct ProcessorChain(Vec<ProcessorHandle>);
impl ProcessorChain {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a processor.
	pub fn with(mut self, processor: impl RequestArgumentProcessor + 'static) -> Self {
		self.0.push(Arc::new(processor));

		self
	}

	/// Returns `true` when the chain has no processors.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Processor names in execution order.
	pub fn names(&self) -> Vec<&'static str> {
		self.0.iter().map(|processor| processor.name()).collect()
	}

	/// Runs every processor over `args`.
	pub fn run(&self, args: &mut Claims, context: &ContextSnapshot) -> Result<(), ArgumentError> {
		self.validate(args)?;

		let mut working = args.clone();

		for processor in &self.0 {
			match processor.policy() {
				OverwritePolicy::AlwaysReplace => processor.process(&mut working, context)?,
				OverwritePolicy::FillIfAbsent => {
					let mut scratch = working.clone();

					processor.process(&mut scratch, context)?;

					for (key, value) in scratch {
						working.entry(key).or_insert(value);
					}
				},
			}
		}

		*args = working;

		Ok(())
	}

	fn validate(&self, args: &Claims) -> Result<(), ArgumentError> {
		for processor in &self.0 {
			for (key, rule) in processor.verifications() {
				let Some(value) = args.get(*key) else {
					continue;
				};

				if !rule.accepts(value) {
					return Err(ArgumentError::InvalidParameter {
						processor: processor.name(),
						key: (*key).to_owned(),
						rule: rule.describe(),
					});
				}
			}
		}

		Ok(())
	}
}
impl FromIterator<ProcessorHandle> for ProcessorChain {
	fn from_iter<I: IntoIterator<Item = ProcessorHandle>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}
