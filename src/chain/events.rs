//! Dispatch results from `System.Events`
//!
//! An extrinsic can be included in a block and still fail. The outer dispatch reports through
//! `System.ExtrinsicFailed`; a multisig or proxy call that dispatched but whose inner call
//! failed reports through the `result` of `Multisig.MultisigExecuted` or `Proxy.ProxyExecuted`.

use crate::{
	chain::metadata::RuntimeTypes,
	error::{Result, SignetError},
};
use scale_value::{Composite, Primitive, Value, ValueDef};
use serde::{Deserialize, Serialize};

/// How an included extrinsic dispatched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum DispatchOutcome {
	Success,
	/// The extrinsic or the call it wraps failed; holds a readable reason
	Failed(String),
}

impl DispatchOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, DispatchOutcome::Success)
	}
}

/// Read the outcome of one extrinsic from an encoded `System.Events` value
pub fn dispatch_outcome(
	types: &RuntimeTypes,
	events: &[u8],
	extrinsic_index: u32,
) -> Result<DispatchOutcome> {
	let events_type = types.events_type().ok_or_else(|| {
		SignetError::Serialization("runtime metadata does not describe System.Events".to_string())
	})?;
	let value = scale_value::scale::decode_as_type(&mut &events[..], events_type, types.registry())
		.map_err(|e| SignetError::Serialization(format!("failed to decode events: {e}")))?;
	let ValueDef::Composite(records) = &value.value else {
		return Err(SignetError::Serialization("System.Events is not a sequence".to_string()));
	};

	let mut succeeded = false;
	let mut inner_failure = None;
	for record in values(records) {
		let ValueDef::Composite(record) = &record.value else { continue };
		if !applies_to(field(record, "phase"), extrinsic_index) {
			continue;
		}
		let Some((pallet, event, fields)) = field(record, "event").and_then(pallet_event) else {
			continue;
		};
		match (pallet, event) {
			("System", "ExtrinsicSuccess") => succeeded = true,
			("System", "ExtrinsicFailed") => {
				let reason = field(fields, "dispatch_error")
					.or_else(|| values(fields).next())
					.map(|e| describe_error(types, e))
					.unwrap_or_else(|| "unknown dispatch error".to_string());
				return Ok(DispatchOutcome::Failed(reason));
			},
			("Multisig", "MultisigExecuted") | ("Proxy", "ProxyExecuted") => {
				if let Some(reason) = field(fields, "result").and_then(|r| failed_result(types, r)) {
					inner_failure.get_or_insert(format!("{pallet} call failed: {reason}"));
				}
			},
			_ => {},
		}
	}

	match (succeeded, inner_failure) {
		(_, Some(reason)) => Ok(DispatchOutcome::Failed(reason)),
		(true, None) => Ok(DispatchOutcome::Success),
		(false, None) => Err(SignetError::Serialization(format!(
			"no dispatch event for extrinsic {extrinsic_index}"
		))),
	}
}

fn values<T>(composite: &Composite<T>) -> Box<dyn Iterator<Item = &Value<T>> + '_> {
	match composite {
		Composite::Named(named) => Box::new(named.iter().map(|(_, v)| v)),
		Composite::Unnamed(unnamed) => Box::new(unnamed.iter()),
	}
}

fn field<'a, T>(composite: &'a Composite<T>, name: &str) -> Option<&'a Value<T>> {
	match composite {
		Composite::Named(named) => named.iter().find(|(n, _)| n == name).map(|(_, v)| v),
		Composite::Unnamed(_) => None,
	}
}

fn as_number<T>(value: &Value<T>) -> Option<u128> {
	match &value.value {
		ValueDef::Primitive(Primitive::U128(n)) => Some(*n),
		// Newtypes and fixed arrays: take the first element
		ValueDef::Composite(inner) => values(inner).next().and_then(as_number),
		_ => None,
	}
}

fn applies_to<T>(phase: Option<&Value<T>>, extrinsic_index: u32) -> bool {
	let Some(ValueDef::Variant(phase)) = phase.map(|p| &p.value) else { return false };
	phase.name == "ApplyExtrinsic" &&
		values(&phase.values).next().and_then(as_number) == Some(extrinsic_index as u128)
}

/// `RuntimeEvent::Pallet(Event::Name { .. })` as names and fields
fn pallet_event<T>(event: &Value<T>) -> Option<(&str, &str, &Composite<T>)> {
	let ValueDef::Variant(pallet) = &event.value else { return None };
	let ValueDef::Variant(inner) = &values(&pallet.values).next()?.value else { return None };
	Some((pallet.name.as_str(), inner.name.as_str(), &inner.values))
}

/// Reason carried by a `Result::Err`, `None` for `Ok`
fn failed_result<T>(types: &RuntimeTypes, result: &Value<T>) -> Option<String> {
	let ValueDef::Variant(variant) = &result.value else { return None };
	if variant.name != "Err" {
		return None;
	}
	Some(
		values(&variant.values)
			.next()
			.map(|e| describe_error(types, e))
			.unwrap_or_else(|| "unknown dispatch error".to_string()),
	)
}

fn describe_error<T>(types: &RuntimeTypes, error: &Value<T>) -> String {
	let ValueDef::Variant(variant) = &error.value else { return error.to_string() };
	if variant.name == "Module" {
		let module = values(&variant.values).next().and_then(|m| match &m.value {
			ValueDef::Composite(m) => Some((field(m, "index")?, field(m, "error")?)),
			_ => None,
		});
		if let Some((index, code)) = module {
			if let (Some(index), Some(code)) = (as_number(index), as_number(code)) {
				let (index, code) = (index as u8, code as u8);
				return types
					.module_error(index, code)
					.unwrap_or_else(|| format!("module error {code} of pallet {index}"));
			}
		}
	}
	match values(&variant.values).next() {
		None => variant.name.clone(),
		Some(detail) => format!("{} ({detail})", variant.name),
	}
}
