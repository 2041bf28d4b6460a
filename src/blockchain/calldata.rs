//! Call payload layouts for the token `transfer` function and the relay
//! contract's `execTransaction`.
//!
//! Detection decodes `transfer` with a fixed-offset reader so that a short
//! payload is a single checked branch. Construction goes through `sol!`.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::error::PayloadError;

sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }

    interface IRelaySafe {
        function execTransaction(
            address to,
            uint256 value,
            bytes data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes signatures
        ) external payable returns (bool success);
    }
}

/// `keccak256("transfer(address,uint256)")[..4]`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;
const ADDRESS_LEN: usize = 20;
const RECIPIENT_OFFSET: usize = SELECTOR_LEN;
const AMOUNT_OFFSET: usize = SELECTOR_LEN + WORD_LEN;

/// Minimum length of a well-formed `transfer` payload
pub const TRANSFER_CALL_LEN: usize = SELECTOR_LEN + 2 * WORD_LEN;

/// Decoded arguments of `transfer(address,uint256)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferArgs {
    pub recipient: Address,
    pub amount: U256,
}

pub fn has_transfer_selector(payload: &[u8]) -> bool {
    payload.len() >= SELECTOR_LEN && payload[..SELECTOR_LEN] == TRANSFER_SELECTOR
}

/// Decode `transfer` arguments. Trailing bytes past the two words are ignored.
pub fn decode_transfer(payload: &[u8]) -> Result<TransferArgs, PayloadError> {
    if !has_transfer_selector(payload) {
        return Err(PayloadError::SelectorMismatch);
    }

    if payload.len() < TRANSFER_CALL_LEN {
        return Err(PayloadError::Truncated {
            expected: TRANSFER_CALL_LEN,
            got: payload.len(),
        });
    }

    let recipient_word = &payload[RECIPIENT_OFFSET..RECIPIENT_OFFSET + WORD_LEN];
    let (padding, address) = recipient_word.split_at(WORD_LEN - ADDRESS_LEN);
    if padding.iter().any(|b| *b != 0) {
        return Err(PayloadError::DirtyAddressPadding);
    }

    Ok(TransferArgs {
        recipient: Address::from_slice(address),
        amount: U256::from_be_slice(&payload[AMOUNT_OFFSET..AMOUNT_OFFSET + WORD_LEN]),
    })
}

pub fn encode_transfer(recipient: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to: recipient, amount }.abi_encode().into()
}

/// Relay contract operation kind. Only plain calls are ever relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    Call = 0,
}

/// Arguments of one `execTransaction` on the relay contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
}

impl RelayCall {
    /// Move `amount` of the base currency to `destination`
    pub fn native(destination: Address, amount: U256) -> Self {
        Self {
            to: destination,
            value: amount,
            data: Bytes::new(),
            operation: Operation::Call,
        }
    }

    /// Call `token.transfer(destination, amount)` with no value attached
    pub fn token(token: Address, destination: Address, amount: U256) -> Self {
        Self {
            to: token,
            value: U256::ZERO,
            data: encode_transfer(destination, amount),
            operation: Operation::Call,
        }
    }

    /// `execTransaction` calldata; gas/refund fields zero, signatures empty
    pub fn encode(&self) -> Bytes {
        IRelaySafe::execTransactionCall {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: self.operation as u8,
            safeTxGas: U256::ZERO,
            baseGas: U256::ZERO,
            gasPrice: U256::ZERO,
            gasToken: Address::ZERO,
            refundReceiver: Address::ZERO,
            signatures: Bytes::new(),
        }
        .abi_encode()
        .into()
    }
}
