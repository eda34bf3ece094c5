//! Address and transaction envelope types for the LCD client.
//!
//! The envelope follows the Cosmos SDK `SIGN_MODE_DIRECT` layout: a
//! `TxBody`, an `AuthInfo` holding one signer info per signer plus the fee,
//! and a `SignDoc` that binds both to a chain id and an account number.

pub mod address;
pub mod tx;

pub use address::{AccAddress, AddressError, DEFAULT_HRP};
pub use tx::{
    auth_info_bytes, encode_tx_raw, tx_hash, Any, Fee, Msg, SignDoc, SignerInfo, TxEncodeError,
    UnsignedTx, SIGN_MODE_DIRECT,
};
