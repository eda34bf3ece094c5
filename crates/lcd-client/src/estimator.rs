//! Gas and fee estimation
//!
//! Gas comes from the caller or from a node simulation scaled by the gas
//! adjustment. The fee is `ceil(gas_limit * price)` in one denomination of
//! the gas price table.

use crate::api::TxApi;
use crate::config::ResolvedConfig;
use crate::error::is_sequence_mismatch;
use crate::{Error, Result};
use lcd_crypto::PublicKey;
use lcd_log::debug;
use lcd_math::{Coin, Coins, Dec};
use lcd_types::{auth_info_bytes, encode_tx_raw, Fee, SignerInfo, UnsignedTx};
use std::sync::Arc;

/// Per-call replacements for the configured estimation inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeOverrides {
    pub gas_limit: Option<u64>,
    pub fee_amount: Option<Coins>,
    pub gas_prices: Option<Coins>,
    pub gas_adjustment: Option<Dec>,
    pub fee_denom: Option<String>,
}

impl FeeOverrides {
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_fee_amount(mut self, amount: Coins) -> Self {
        self.fee_amount = Some(amount);
        self
    }

    pub fn with_gas_prices(mut self, gas_prices: Coins) -> Self {
        self.gas_prices = Some(gas_prices);
        self
    }

    pub fn with_gas_adjustment(mut self, adjustment: Dec) -> Self {
        self.gas_adjustment = Some(adjustment);
        self
    }

    pub fn with_fee_denom(mut self, denom: impl Into<String>) -> Self {
        self.fee_denom = Some(denom.into());
        self
    }

    /// Gas limit and amount both given: the fee is fully determined
    pub fn is_complete(&self) -> bool {
        self.gas_limit.is_some() && self.fee_amount.is_some()
    }
}

/// Public key and sequence a signer will use, needed for simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub public_key: PublicKey,
    pub sequence: u64,
}

/// Scale simulated gas by `adjustment`, rounding up
pub fn adjust_gas(gas_used: u64, adjustment: &Dec) -> Result<u64> {
    (&Dec::from_u64(gas_used) * adjustment)
        .ceil_u64()
        .ok_or_else(|| Error::Estimation {
            reason: format!("gas {gas_used} times adjustment {adjustment} is out of range"),
            gas_used: Some(gas_used),
            denom: None,
        })
}

/// `ceil(gas_limit * price)` in `fee_denom`, or in the first denomination of
/// `gas_prices` when no denomination is requested
pub fn fee_for_gas(gas_limit: u64, gas_prices: &Coins, fee_denom: Option<&str>) -> Result<Coins> {
    let price = match fee_denom {
        Some(denom) => gas_prices.get(denom).ok_or_else(|| Error::Estimation {
            reason: format!("no gas price for fee denomination {denom}"),
            gas_used: None,
            denom: Some(denom.to_string()),
        })?,
        None => gas_prices
            .iter()
            .next()
            .ok_or_else(|| Error::estimation("gas price table is empty"))?,
    };

    let amount = (&Dec::from_u64(gas_limit) * &price.amount).ceil();
    let coin = Coin::new(price.denom.clone(), amount).map_err(|e| Error::Estimation {
        reason: e.to_string(),
        gas_used: None,
        denom: Some(price.denom.clone()),
    })?;
    Ok(Coins::from(coin))
}

fn with_gas_used(err: Error, used: Option<u64>) -> Error {
    match err {
        Error::Estimation {
            reason,
            gas_used: None,
            denom,
        } => Error::Estimation {
            reason,
            gas_used: used,
            denom,
        },
        other => other,
    }
}

/// Node rejections become estimation failures; network failures pass through
fn simulation_error(err: Error) -> Error {
    match err {
        Error::Transport {
            status: Some(status),
            message,
        } => {
            if is_sequence_mismatch(&message) {
                Error::sequence_conflict(&message)
            } else {
                Error::estimation(format!("simulation rejected ({status}): {message}"))
            }
        }
        Error::Decode(message) => Error::estimation(format!("unreadable simulation result: {message}")),
        other => other,
    }
}

#[derive(Clone, Debug)]
pub struct FeeEstimator {
    tx: TxApi,
    config: Arc<ResolvedConfig>,
}

impl FeeEstimator {
    pub fn new(tx: TxApi, config: Arc<ResolvedConfig>) -> Self {
        Self { tx, config }
    }

    /// Determine the fee for `tx` signed by `signers`.
    ///
    /// Full overrides are returned as given and a gas limit override skips
    /// simulation, so neither touches the network.
    #[tracing::instrument(skip_all, fields(messages = tx.messages.len(), signers = signers.len()))]
    pub async fn estimate(
        &self,
        tx: &UnsignedTx,
        signers: &[SignerData],
        overrides: &FeeOverrides,
    ) -> Result<Fee> {
        if let (Some(gas_limit), Some(amount)) = (overrides.gas_limit, &overrides.fee_amount) {
            return Ok(Fee::new(gas_limit, amount.clone()));
        }

        let gas_prices = overrides.gas_prices.as_ref().unwrap_or(&self.config.gas_prices);
        if gas_prices.is_any_negative() {
            return Err(Error::estimation(format!(
                "gas prices must not be negative: {gas_prices}"
            )));
        }
        let adjustment = overrides
            .gas_adjustment
            .as_ref()
            .unwrap_or(&self.config.gas_adjustment);
        if !adjustment.is_positive() {
            return Err(Error::estimation(format!(
                "gas adjustment must be positive, got {adjustment}"
            )));
        }

        let (gas_limit, gas_used) = match overrides.gas_limit {
            Some(gas_limit) => (gas_limit, None),
            None => {
                let used = self.simulate(tx, signers).await?;
                (adjust_gas(used, adjustment)?, Some(used))
            }
        };

        let amount = match &overrides.fee_amount {
            Some(amount) => amount.clone(),
            None => {
                let denom = overrides
                    .fee_denom
                    .as_deref()
                    .or(self.config.fee_denom.as_deref());
                fee_for_gas(gas_limit, gas_prices, denom).map_err(|e| with_gas_used(e, gas_used))?
            }
        };

        debug!(?gas_used, gas_limit, fee = %amount, "estimated fee");
        Ok(Fee::new(gas_limit, amount))
    }

    /// Gas consumed by `tx` in a node dry-run. Signatures are left empty and
    /// the fee zero, which the simulate endpoint accepts.
    pub async fn simulate(&self, tx: &UnsignedTx, signers: &[SignerData]) -> Result<u64> {
        if signers.is_empty() {
            return Err(Error::InvalidTx("simulation needs at least one signer".to_string()));
        }
        let signer_infos: Vec<SignerInfo> = signers
            .iter()
            .map(|signer| SignerInfo {
                public_key: Some(signer.public_key.to_any()),
                sequence: signer.sequence,
            })
            .collect();
        let auth_info = auth_info_bytes(&signer_infos, &Fee::new(0, Coins::empty()))?;
        let tx_bytes = encode_tx_raw(tx.body_bytes(), auth_info, vec![Vec::new(); signers.len()]);

        let result = self.tx.simulate(&tx_bytes).await.map_err(simulation_error)?;
        Ok(result.gas_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StaticDispatcher;
    use crate::config::{resolve_config, ClientConfig, GasPriceTable};
    use lcd_crypto::PrivateKey;
    use lcd_types::Msg;
    use serde_json::json;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    fn estimator(dispatcher: StaticDispatcher, config: ClientConfig) -> FeeEstimator {
        let resolved = resolve_config(&GasPriceTable::default(), &config).unwrap();
        FeeEstimator::new(TxApi::new(dispatcher.into_arc()), Arc::new(resolved))
    }

    fn simulating(gas_used: u64) -> StaticDispatcher {
        StaticDispatcher::default().with(
            "/cosmos/tx/v1beta1/simulate",
            json!({ "gas_info": { "gas_wanted": "0", "gas_used": gas_used.to_string() } }),
        )
    }

    fn tx() -> UnsignedTx {
        UnsignedTx::new(vec![Msg::new("/cosmos.bank.v1beta1.MsgSend", vec![1])])
    }

    fn signer() -> SignerData {
        SignerData {
            public_key: PrivateKey::generate_secp256k1().public_key(),
            sequence: 0,
        }
    }

    #[test]
    fn test_adjust_gas_rounds_up() {
        assert_eq!(adjust_gas(100_000, &dec("1.75")).unwrap(), 175_000);
        assert_eq!(adjust_gas(100_001, &dec("1.75")).unwrap(), 175_002);
        assert_eq!(adjust_gas(0, &dec("1.75")).unwrap(), 0);
        assert!(matches!(
            adjust_gas(u64::MAX, &dec("2")),
            Err(Error::Estimation { gas_used: Some(u64::MAX), .. })
        ));
    }

    #[test]
    fn test_fee_at_huge_price() {
        let prices = coins("100000000000000000000000000000wei");
        assert_eq!(
            fee_for_gas(1_000_000, &prices, None).unwrap(),
            coins("100000000000000000000000000000000000wei")
        );
    }

    #[test]
    fn test_fee_denomination_rule() {
        let prices = coins("0.15uinit,0.01uusdc");
        assert_eq!(fee_for_gas(175_000, &prices, None).unwrap(), coins("26250uinit"));
        assert_eq!(
            fee_for_gas(175_000, &prices, Some("uusdc")).unwrap(),
            coins("1750uusdc")
        );
        assert_eq!(fee_for_gas(3, &prices, None).unwrap(), coins("1uinit"));

        match fee_for_gas(1, &prices, Some("uatom")) {
            Err(Error::Estimation { denom, .. }) => assert_eq!(denom.as_deref(), Some("uatom")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            fee_for_gas(1, &Coins::empty(), None),
            Err(Error::Estimation { .. })
        ));
    }

    #[tokio::test]
    async fn test_simulated_estimate() {
        let est = estimator(simulating(100_000), ClientConfig::default());
        let fee = est.estimate(&tx(), &[signer()], &FeeOverrides::default()).await.unwrap();
        assert_eq!(fee.gas_limit, 175_000);
        assert_eq!(fee.amount, coins("26250uinit"));
    }

    #[tokio::test]
    async fn test_full_overrides_skip_network() {
        let dispatcher = std::sync::Arc::new(StaticDispatcher::default());
        let est = FeeEstimator::new(
            TxApi::new(dispatcher.clone()),
            Arc::new(resolve_config(&GasPriceTable::default(), &ClientConfig::default()).unwrap()),
        );
        let overrides = FeeOverrides::default()
            .with_gas_limit(90_000)
            .with_fee_amount(coins("5uinit"));
        let fee = est.estimate(&tx(), &[], &overrides).await.unwrap();
        assert_eq!(fee, Fee::new(90_000, coins("5uinit")));

        let fee = est
            .estimate(&tx(), &[], &FeeOverrides::default().with_gas_limit(200_000))
            .await
            .unwrap();
        assert_eq!(fee.amount, coins("30000uinit"));
        assert!(dispatcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_amount_override_keeps_simulated_gas() {
        let est = estimator(simulating(100_001), ClientConfig::default());
        let overrides = FeeOverrides::default().with_fee_amount(coins("7uusdc"));
        let fee = est.estimate(&tx(), &[signer()], &overrides).await.unwrap();
        assert_eq!(fee.gas_limit, 175_002);
        assert_eq!(fee.amount, coins("7uusdc"));
    }

    #[tokio::test]
    async fn test_override_precedence() {
        let config = ClientConfig::default()
            .with_gas_prices(coins("0.15uinit,0.01uusdc"))
            .with_fee_denom("uusdc");
        let est = estimator(simulating(100_000), config);

        let fee = est.estimate(&tx(), &[signer()], &FeeOverrides::default()).await.unwrap();
        assert_eq!(fee.amount, coins("1750uusdc"));

        let overrides = FeeOverrides::default()
            .with_fee_denom("uinit")
            .with_gas_adjustment(dec("2"));
        let fee = est.estimate(&tx(), &[signer()], &overrides).await.unwrap();
        assert_eq!(fee.gas_limit, 200_000);
        assert_eq!(fee.amount, coins("30000uinit"));
    }

    #[tokio::test]
    async fn test_missing_denom_reports_gas_used() {
        let est = estimator(simulating(100_000), ClientConfig::default());
        let overrides = FeeOverrides::default().with_fee_denom("uatom");
        match est.estimate(&tx(), &[signer()], &overrides).await {
            Err(Error::Estimation {
                gas_used, denom, ..
            }) => {
                assert_eq!(gas_used, Some(100_000));
                assert_eq!(denom.as_deref(), Some("uatom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_simulation_failures() {
        // No simulate route: the node answers 404
        let est = estimator(StaticDispatcher::default(), ClientConfig::default());
        let err = est
            .estimate(&tx(), &[signer()], &FeeOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Estimation { .. }));

        assert!(matches!(
            est.estimate(&tx(), &[], &FeeOverrides::default()).await,
            Err(Error::InvalidTx(_))
        ));
    }

    #[test]
    fn test_sequence_mismatch_from_simulation() {
        let err = simulation_error(Error::Transport {
            status: Some(400),
            message: "code 32: account sequence mismatch, expected 2, got 1".to_string(),
        });
        assert!(matches!(
            err,
            Error::SequenceConflict {
                expected: Some(2),
                got: Some(1),
                ..
            }
        ));
        assert!(matches!(
            simulation_error(Error::transport("connection refused")),
            Error::Transport { status: None, .. }
        ));
    }
}
