//! Call data handling: decoding pasted hex, proxy wrapping and the canonical hash

use crate::{
	chain::call::{Call, CallCodec, ProxyCall},
	error::{Result, SignetError},
	vault::address::Address,
};
use sp_core::H256;
use sp_crypto_hashing::blake2_256;

/// Parse `0x`-prefixed (or bare) hex into bytes
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
	let body = input.trim().trim_start_matches("0x");
	hex::decode(body).map_err(|e| SignetError::InvalidCalldata {
		hex: input.trim().to_string(),
		reason: format!("not valid hex: {e}"),
	})
}

/// Decode hex call data against the chain's call table
pub fn decode_call_data(codec: &CallCodec, hex_data: &str) -> Result<Call> {
	let bytes = parse_hex(hex_data)?;
	if bytes.is_empty() {
		return Err(SignetError::invalid_calldata(&bytes, "empty call data"));
	}
	codec.decode(&bytes)
}

/// "As `proxied`, dispatch `inner`": no forced proxy type and no announcement
pub fn wrap_in_proxy_call(proxied: Address, inner: Call) -> Call {
	Call::Proxy(ProxyCall::Proxy { real: proxied, force_proxy_type: None, call: Box::new(inner) })
}

/// Hash that identifies a transaction on chain: blake2-256 of the encoded proxy-wrapped call
pub fn canonical_hash(codec: &CallCodec, proxy_call: &Call) -> Result<H256> {
	Ok(H256(blake2_256(&codec.encode(proxy_call)?)))
}

/// Outcome of checking whether a call is already a proxy call for a vault
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyWrapCheck {
	pub is_wrapped: bool,
	/// Encoded inner call, set when wrapped for the expected account
	pub inner_call: Option<Vec<u8>>,
	pub error: Option<String>,
}

impl ProxyWrapCheck {
	fn not_wrapped() -> Self {
		Self { is_wrapped: false, inner_call: None, error: None }
	}

	fn wrapped_with_error(error: String) -> Self {
		Self { is_wrapped: true, inner_call: None, error: Some(error) }
	}
}

/// Check whether `call` is already a delay-free proxy call for `expected_proxied`
pub fn is_extrinsic_proxy_wrapped(
	codec: &CallCodec,
	call: &Call,
	expected_proxied: &Address,
) -> ProxyWrapCheck {
	match call {
		Call::Proxy(ProxyCall::Proxy { real, call: inner, .. }) => {
			if real != expected_proxied {
				return ProxyWrapCheck::wrapped_with_error(format!(
					"proxy call targets {} instead of {}",
					real.to_pub_key(),
					expected_proxied.to_pub_key()
				));
			}
			match codec.encode(inner) {
				Ok(bytes) =>
					ProxyWrapCheck { is_wrapped: true, inner_call: Some(bytes), error: None },
				Err(e) => ProxyWrapCheck::wrapped_with_error(e.to_string()),
			}
		},
		Call::Proxy(ProxyCall::ProxyAnnounced { .. }) => ProxyWrapCheck::wrapped_with_error(
			"announced proxy calls carry a delay and cannot be approved by the vault".to_string(),
		),
		_ => ProxyWrapCheck::not_wrapped(),
	}
}

/// Return the inner call of a proxy call made for `proxied`.
///
/// Any other proxy target, announced proxy calls and calls that are not proxy calls at all
/// are `NotOurs`.
pub fn unwrap_for_vault<'c>(call: &'c Call, proxied: &Address) -> Result<&'c Call> {
	match call {
		Call::Proxy(ProxyCall::Proxy { real, call: inner, .. }) if real == proxied => Ok(inner),
		Call::Proxy(ProxyCall::Proxy { real, .. }) => Err(SignetError::NotOurs(format!(
			"proxy call for {} instead of {}",
			real.to_pub_key(),
			proxied.to_pub_key()
		))),
		Call::Proxy(ProxyCall::ProxyAnnounced { real, .. }) => Err(SignetError::NotOurs(format!(
			"announced proxy call for {}",
			real.to_pub_key()
		))),
		other => Err(SignetError::NotOurs(format!("{} is not a proxy call", other.name()))),
	}
}

/// Accept pasted call data that may or may not already carry the proxy wrapper.
///
/// Returns the proxy-wrapped call for `proxied`, wrapping only when needed.
pub fn ensure_proxy_wrapped(codec: &CallCodec, call: Call, proxied: Address) -> Result<Call> {
	let check = is_extrinsic_proxy_wrapped(codec, &call, &proxied);
	match (check.is_wrapped, check.error) {
		(true, None) => Ok(call),
		(true, Some(error)) => Err(SignetError::NotOurs(error)),
		(false, _) => Ok(wrap_in_proxy_call(proxied, call)),
	}
}
