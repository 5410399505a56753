//! Tokens known on a chain and balance formatting

use crate::config::ChainSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token identity: the chain's native token or an asset id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenId {
	Native,
	Asset(u32),
}

impl fmt::Display for TokenId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TokenId::Native => write!(f, "native"),
			TokenId::Asset(id) => write!(f, "asset #{id}"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	pub id: TokenId,
	pub symbol: String,
	pub decimals: u8,
}

impl Token {
	pub fn format(&self, amount: u128) -> String {
		format!("{} {}", format_balance(amount, self.decimals), self.symbol)
	}
}

/// The set of tokens the vault recognises on one chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRegistry {
	tokens: Vec<Token>,
}

impl TokenRegistry {
	pub fn new(native: Token) -> Self {
		Self { tokens: vec![native] }
	}

	pub fn from_chain(chain: &ChainSpec) -> Self {
		let mut registry = Self::new(Token {
			id: TokenId::Native,
			symbol: chain.native.symbol.clone(),
			decimals: chain.native.decimals,
		});
		for asset in &chain.assets {
			registry.register(Token {
				id: TokenId::Asset(asset.id),
				symbol: asset.symbol.clone(),
				decimals: asset.decimals,
			});
		}
		registry
	}

	pub fn register(&mut self, token: Token) {
		self.tokens.retain(|t| t.id != token.id);
		self.tokens.push(token);
	}

	pub fn get(&self, id: TokenId) -> Option<&Token> {
		self.tokens.iter().find(|t| t.id == id)
	}

	pub fn native(&self) -> &Token {
		// `new` always inserts the native token and `register` only replaces it
		self.tokens.iter().find(|t| t.id == TokenId::Native).unwrap_or(&self.tokens[0])
	}

	pub fn iter(&self) -> impl Iterator<Item = &Token> {
		self.tokens.iter()
	}
}

/// Format a base-unit amount with `decimals` places, trimming trailing zeros
pub fn format_balance(amount: u128, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}
	let unit = 10u128.pow(decimals as u32);
	let whole = amount / unit;
	let remainder = amount % unit;
	if remainder == 0 {
		whole.to_string()
	} else {
		let decimal_str = format!("{:0width$}", remainder, width = decimals as usize)
			.trim_end_matches('0')
			.to_string();
		format!("{}.{}", whole, decimal_str)
	}
}
