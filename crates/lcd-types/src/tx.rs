//! Transaction envelope types and their canonical protobuf encoding

use lcd_math::Coins;
use prost::Message;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// `SIGN_MODE_DIRECT` in the Cosmos SDK `SignMode` enum
pub const SIGN_MODE_DIRECT: i32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxEncodeError {
    #[error("fee amount must be whole numbers: {0}")]
    FractionalFee(String),

    #[error("fee amount must not be negative: {0}")]
    NegativeFee(String),
}

/// Protobuf `google.protobuf.Any`
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// An opaque chain message: a type discriminator and its encoded payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Msg {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl Msg {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }

    /// Wrap an already-typed protobuf message
    pub fn from_proto<M: Message>(type_url: impl Into<String>, msg: &M) -> Self {
        Self::new(type_url, msg.encode_to_vec())
    }

    fn to_any(&self) -> Any {
        Any {
            type_url: self.type_url.clone(),
            value: self.value.clone(),
        }
    }
}

/// Messages plus body metadata, before fee and signatures are attached
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnsignedTx {
    pub messages: Vec<Msg>,
    pub memo: Option<String>,
    pub timeout_height: Option<u64>,
}

impl UnsignedTx {
    pub fn new(messages: Vec<Msg>) -> Self {
        Self {
            messages,
            memo: None,
            timeout_height: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_timeout_height(mut self, height: u64) -> Self {
        self.timeout_height = Some(height);
        self
    }

    /// Protobuf `TxBody` bytes, identical for every signer
    pub fn body_bytes(&self) -> Vec<u8> {
        TxBodyProto {
            messages: self.messages.iter().map(Msg::to_any).collect(),
            memo: self.memo.clone().unwrap_or_default(),
            timeout_height: self.timeout_height.unwrap_or_default(),
        }
        .encode_to_vec()
    }
}

/// Gas limit and the amount paid for it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    pub gas_limit: u64,
    pub amount: Coins,
    pub payer: Option<String>,
    pub granter: Option<String>,
}

impl Fee {
    pub fn new(gas_limit: u64, amount: Coins) -> Self {
        Self {
            gas_limit,
            amount,
            payer: None,
            granter: None,
        }
    }

    fn to_proto(&self) -> Result<FeeProto, TxEncodeError> {
        if self.amount.is_any_negative() {
            return Err(TxEncodeError::NegativeFee(self.amount.to_string()));
        }
        if !self.amount.is_integral() {
            return Err(TxEncodeError::FractionalFee(self.amount.to_string()));
        }
        Ok(FeeProto {
            amount: self
                .amount
                .iter()
                .map(|coin| CoinProto {
                    denom: coin.denom.clone(),
                    amount: coin.amount.to_string(),
                })
                .collect(),
            gas_limit: self.gas_limit,
            payer: self.payer.clone().unwrap_or_default(),
            granter: self.granter.clone().unwrap_or_default(),
        })
    }
}

/// Public key (as a packed `Any`) and sequence for one signer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerInfo {
    pub public_key: Option<Any>,
    pub sequence: u64,
}

/// Protobuf `AuthInfo` bytes. Signer infos keep the given order, which is
/// the order signatures must appear in.
pub fn auth_info_bytes(signer_infos: &[SignerInfo], fee: &Fee) -> Result<Vec<u8>, TxEncodeError> {
    let proto = AuthInfoProto {
        signer_infos: signer_infos
            .iter()
            .map(|info| SignerInfoProto {
                public_key: info.public_key.clone(),
                mode_info: Some(ModeInfoProto {
                    sum: Some(mode_info_proto::Sum::Single(ModeInfoSingleProto {
                        mode: SIGN_MODE_DIRECT,
                    })),
                }),
                sequence: info.sequence,
            })
            .collect(),
        fee: Some(fee.to_proto()?),
    };
    Ok(proto.encode_to_vec())
}

/// The document a signer signs over
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignDoc {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

impl SignDoc {
    /// Canonical protobuf encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        SignDocProto {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            chain_id: self.chain_id.clone(),
            account_number: self.account_number,
        }
        .encode_to_vec()
    }
}

/// Protobuf `TxRaw` bytes, the form the node accepts for simulate and broadcast
pub fn encode_tx_raw(
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
    signatures: Vec<Vec<u8>>,
) -> Vec<u8> {
    TxRawProto {
        body_bytes,
        auth_info_bytes,
        signatures,
    }
    .encode_to_vec()
}

/// Uppercase hex SHA-256 of the raw tx bytes, as reported by the node
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct TxBodyProto {
    #[prost(message, repeated, tag = "1")]
    messages: Vec<Any>,
    #[prost(string, tag = "2")]
    memo: String,
    #[prost(uint64, tag = "3")]
    timeout_height: u64,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct AuthInfoProto {
    #[prost(message, repeated, tag = "1")]
    signer_infos: Vec<SignerInfoProto>,
    #[prost(message, optional, tag = "2")]
    fee: Option<FeeProto>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SignerInfoProto {
    #[prost(message, optional, tag = "1")]
    public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    mode_info: Option<ModeInfoProto>,
    #[prost(uint64, tag = "3")]
    sequence: u64,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ModeInfoProto {
    #[prost(oneof = "mode_info_proto::Sum", tags = "1")]
    sum: Option<mode_info_proto::Sum>,
}

mod mode_info_proto {
    use super::ModeInfoSingleProto;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub(crate) enum Sum {
        #[prost(message, tag = "1")]
        Single(ModeInfoSingleProto),
    }
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ModeInfoSingleProto {
    #[prost(int32, tag = "1")]
    mode: i32,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct FeeProto {
    #[prost(message, repeated, tag = "1")]
    amount: Vec<CoinProto>,
    #[prost(uint64, tag = "2")]
    gas_limit: u64,
    #[prost(string, tag = "3")]
    payer: String,
    #[prost(string, tag = "4")]
    granter: String,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct CoinProto {
    #[prost(string, tag = "1")]
    denom: String,
    #[prost(string, tag = "2")]
    amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SignDocProto {
    #[prost(bytes = "vec", tag = "1")]
    body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    chain_id: String,
    #[prost(uint64, tag = "4")]
    account_number: u64,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct TxRawProto {
    #[prost(bytes = "vec", tag = "1")]
    body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    signatures: Vec<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_msg() -> Msg {
        Msg::new("/cosmos.bank.v1beta1.MsgSend", vec![1, 2, 3])
    }

    fn fee(amount: &str) -> Fee {
        Fee::new(200_000, amount.parse().unwrap())
    }

    #[test]
    fn test_body_bytes_decode() {
        let tx = UnsignedTx::new(vec![send_msg()])
            .with_memo("hello")
            .with_timeout_height(42);
        let decoded = TxBodyProto::decode(tx.body_bytes().as_slice()).unwrap();
        assert_eq!(decoded.messages.len(), 1);
        assert_eq!(decoded.messages[0].type_url, "/cosmos.bank.v1beta1.MsgSend");
        assert_eq!(decoded.memo, "hello");
        assert_eq!(decoded.timeout_height, 42);
    }

    #[test]
    fn test_msg_from_proto() {
        let inner = Any {
            type_url: "/inner".to_string(),
            value: vec![9, 9],
        };
        let msg = Msg::from_proto("/cosmos.authz.v1beta1.MsgExec", &inner);
        assert_eq!(msg.value, inner.encode_to_vec());
        assert_eq!(Any::decode(msg.value.as_slice()).unwrap(), inner);
    }

    #[test]
    fn test_auth_info_keeps_signer_order() {
        let infos = vec![
            SignerInfo {
                public_key: None,
                sequence: 9,
            },
            SignerInfo {
                public_key: None,
                sequence: 3,
            },
        ];
        let bytes = auth_info_bytes(&infos, &fee("30000uinit")).unwrap();
        let decoded = AuthInfoProto::decode(bytes.as_slice()).unwrap();
        let sequences: Vec<u64> = decoded.signer_infos.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![9, 3]);
        let fee = decoded.fee.unwrap();
        assert_eq!(fee.gas_limit, 200_000);
        assert_eq!(fee.amount[0].amount, "30000");
    }

    #[test]
    fn test_fractional_fee_rejected() {
        let err = auth_info_bytes(&[], &fee("0.5uinit")).unwrap_err();
        assert!(matches!(err, TxEncodeError::FractionalFee(_)));
    }

    #[test]
    fn test_sign_doc_depends_on_account_number() {
        let doc = SignDoc {
            body_bytes: vec![1],
            auth_info_bytes: vec![2],
            chain_id: "initiation-2".to_string(),
            account_number: 1,
        };
        let other = SignDoc {
            account_number: 2,
            ..doc.clone()
        };
        assert_ne!(doc.to_bytes(), other.to_bytes());
        assert_eq!(doc.to_bytes(), doc.clone().to_bytes());
    }

    #[test]
    fn test_tx_hash_format() {
        let hash = tx_hash(b"tx bytes");
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
